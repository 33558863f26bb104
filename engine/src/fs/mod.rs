//! SEFT 文件系统工具：原子写出与安全擦除。

pub mod atomic;
pub mod erase;
