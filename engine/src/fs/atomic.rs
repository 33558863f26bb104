//! SEFT 原子写入工具。
//!
//! 提供「先写临时文件，成功后再替换目标文件」的写出语义，
//! 任何一步失败都会删除临时文件，目标路径上不会留下半成品。

use std::fs::{self, File};
use std::path::Path;

use crate::error::{Result, SeftError};

/// 原子写文件。
///
/// 流程：
/// 1. 在目标目录创建以 `.{文件名}.` 为前缀的临时文件；
/// 2. 调用 `write_fn` 写入完整内容（包括解密后的完整性校验）；
/// 3. 写入成功后 sync，再 persist（rename）覆盖目标文件。
///
/// 任一步返回错误时 `tempfile::NamedTempFile` 被丢弃，临时文件随之删除。
pub fn write_atomic<T, F>(target: &Path, write_fn: F) -> Result<T>
where
    F: FnOnce(&mut File) -> Result<T>,
{
    let parent = output_parent(target)?;
    fs::create_dir_all(parent)?;

    let prefix = match target.file_name().and_then(|n| n.to_str()) {
        Some(name) if !name.is_empty() => format!(".{name}."),
        _ => ".seft-output.".to_string(),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(parent)?;

    let value = write_fn(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(value)
}

/// 在目标旁边创建匿名临时文件，用于打包 / 解密的中间数据。
///
/// 文件没有名字，句柄关闭即被系统回收，不会残留在目录中。
pub fn staging_file(target: &Path) -> Result<File> {
    let parent = output_parent(target)?;
    fs::create_dir_all(parent)?;
    Ok(tempfile::tempfile_in(parent)?)
}

fn output_parent(target: &Path) -> Result<&Path> {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => Ok(p),
        Some(_) => Ok(Path::new(".")),
        None => Err(SeftError::invalid_input("output path has no parent directory")),
    }
}
