//! SEFT 密码学基础：密钥派生与密钥生命周期。

pub mod kdf;
