//! SEFT 密钥派生函数（KDF）模块
//!
//! 本模块负责将用户输入的密码，通过 PBKDF2-HMAC-SHA256
//! 派生为 32 字节对称密钥，供 AES-GCM / AES-CBC / Fernet 使用。
//!
//! 设计目标：
//! - 每个容器使用独立的随机 salt
//! - 迭代次数可配置（默认 100000，配置层要求不低于 10000）
//! - 密钥只在一次加解密调用内存活，离开作用域即清零

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, SeftError};

/// 派生密钥长度（256-bit）
pub const KEY_LEN: usize = 32;

/// 每个容器随机生成的 salt 长度
pub const SALT_LEN: usize = 32;

pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// 配置层允许的最小迭代次数
pub const MIN_ITERATIONS: u32 = 10_000;

/// 对称密钥
///
/// 不实现 Clone，Debug 输出脱敏；无论正常返回、提前出错
/// 还是批处理取消，drop 时都会先覆写再释放。
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncryptionKey").field(&"<redacted>").finish()
    }
}

/// 生成用于 KDF 的随机 salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// 根据密码和 salt 派生对称加密密钥
///
/// 相同输入总是得到相同密钥。密码内容不会导致失败，
/// 只有空 salt 或零迭代次数返回 `InvalidInput`。
pub fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> Result<EncryptionKey> {
    if salt.is_empty() {
        return Err(SeftError::invalid_input("salt must not be empty"));
    }
    if iterations == 0 {
        return Err(SeftError::invalid_input("iterations must be at least 1"));
    }

    let mut key = EncryptionKey([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key.0);

    Ok(key)
}
