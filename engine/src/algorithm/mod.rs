//! SEFT 加密算法模块。
//!
//! 统一管理可选算法、nonce 长度、填充与尾部（tag / HMAC）规则，
//! 具体的增量加解密状态见子模块。
//!
//! 容器头不记录算法标识，解密时按 nonce 字段长度反推算法：
//! - 12 字节：AES-256-GCM
//! - 16 字节：AES-256-CBC
//! - 25 字节：Fernet 等价构造

pub mod aes_256_cbc;
pub mod aes_256_gcm;
pub mod fernet;

use std::fmt;

use rand::{RngCore, rngs::OsRng};

use crate::crypto::kdf::EncryptionKey;
use crate::error::{Result, SeftError};

/// AES 分组长度（128 bit）
pub const BLOCK_SIZE: usize = 16;

/// 支持的加密算法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Aes256Gcm,
    Aes256Cbc,
    Fernet,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Self::Aes256Gcm, Self::Aes256Cbc, Self::Fernet];

    pub fn name(self) -> &'static str {
        match self {
            Self::Aes256Gcm => "AES-256-GCM",
            Self::Aes256Cbc => "AES-256-CBC",
            Self::Fernet => "Fernet",
        }
    }

    /// 容器头中 nonce 字段的长度。
    pub fn nonce_len(self) -> usize {
        match self {
            Self::Aes256Gcm => aes_256_gcm::NONCE_SIZE,
            Self::Aes256Cbc => aes_256_cbc::IV_SIZE,
            Self::Fernet => fernet::NONCE_FIELD_SIZE,
        }
    }

    /// 密文之后追加的尾部长度。
    pub fn trailer_len(self) -> usize {
        match self {
            Self::Aes256Gcm => aes_256_gcm::TAG_SIZE,
            Self::Aes256Cbc => 0,
            Self::Fernet => fernet::HMAC_SIZE,
        }
    }

    /// 是否需要 PKCS#7 填充。
    pub fn is_padded(self) -> bool {
        match self {
            Self::Aes256Gcm => false,
            Self::Aes256Cbc | Self::Fernet => true,
        }
    }

    pub fn from_nonce_len(nonce_len: usize) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.nonce_len() == nonce_len)
            .ok_or(SeftError::UnsupportedAlgorithm { nonce_len })
    }

    /// 生成一次性使用的 nonce / IV，严禁复用。
    pub fn generate_nonce(self) -> Vec<u8> {
        match self {
            Self::Aes256Gcm | Self::Aes256Cbc => {
                let mut nonce = vec![0u8; self.nonce_len()];
                OsRng.fill_bytes(&mut nonce);
                nonce
            }
            Self::Fernet => fernet::generate_nonce_field().to_vec(),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 单次流式加密的密码状态。
///
/// 每个实例只服务于一条数据流，按顺序喂入，最后 `finalize` 一次。
pub(crate) enum CipherEncryptor {
    Gcm(aes_256_gcm::GcmEncryptor),
    Cbc(aes_256_cbc::CbcEncryptor<aes::Aes256>),
    Fernet(fernet::FernetEncryptor),
}

impl CipherEncryptor {
    pub fn new(algorithm: Algorithm, key: &EncryptionKey, nonce: &[u8]) -> Result<Self> {
        check_nonce(algorithm, nonce)?;
        Ok(match algorithm {
            Algorithm::Aes256Gcm => Self::Gcm(aes_256_gcm::GcmEncryptor::new(key, nonce)),
            Algorithm::Aes256Cbc => Self::Cbc(aes_256_cbc::encryptor(key, nonce)),
            Algorithm::Fernet => Self::Fernet(fernet::FernetEncryptor::new(key, nonce)?),
        })
    }

    /// 加密一段明文，密文追加到 `out`。
    pub fn update(&mut self, plaintext: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Gcm(c) => c.update(plaintext, out),
            Self::Cbc(c) => {
                c.update(plaintext, out);
                Ok(())
            }
            Self::Fernet(c) => {
                c.update(plaintext, out);
                Ok(())
            }
        }
    }

    /// 结束加密：输出剩余密文以及算法尾部。
    pub fn finalize(self, out: &mut Vec<u8>) {
        match self {
            Self::Gcm(c) => c.finalize(out),
            Self::Cbc(c) => c.finalize(out),
            Self::Fernet(c) => c.finalize(out),
        }
    }
}

/// 单次流式解密的密码状态。
pub(crate) enum CipherDecryptor {
    Gcm(aes_256_gcm::GcmDecryptor),
    Cbc(aes_256_cbc::CbcDecryptor<aes::Aes256>),
    Fernet(fernet::FernetDecryptor),
}

impl CipherDecryptor {
    pub fn new(algorithm: Algorithm, key: &EncryptionKey, nonce: &[u8]) -> Result<Self> {
        check_nonce(algorithm, nonce)?;
        Ok(match algorithm {
            Algorithm::Aes256Gcm => Self::Gcm(aes_256_gcm::GcmDecryptor::new(key, nonce)),
            Algorithm::Aes256Cbc => Self::Cbc(aes_256_cbc::decryptor(key, nonce)),
            Algorithm::Fernet => Self::Fernet(fernet::FernetDecryptor::new(key, nonce)?),
        })
    }

    /// 解密一段密文（不含尾部），明文追加到 `out`。
    pub fn update(&mut self, ciphertext: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Gcm(c) => c.update(ciphertext, out),
            Self::Cbc(c) => {
                c.update(ciphertext, out);
                Ok(())
            }
            Self::Fernet(c) => {
                c.update(ciphertext, out);
                Ok(())
            }
        }
    }

    /// 校验尾部并输出最后的明文。失败一律返回 `Integrity`。
    pub fn finalize(self, trailer: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Gcm(c) => c.finalize(trailer),
            Self::Cbc(c) => c.finalize(out),
            Self::Fernet(c) => c.finalize(trailer, out),
        }
    }
}

fn check_nonce(algorithm: Algorithm, nonce: &[u8]) -> Result<()> {
    if nonce.len() != algorithm.nonce_len() {
        return Err(SeftError::UnsupportedAlgorithm {
            nonce_len: nonce.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_length_identifies_algorithm() {
        for algorithm in Algorithm::ALL {
            assert_eq!(
                Algorithm::from_nonce_len(algorithm.nonce_len()).unwrap(),
                algorithm
            );
            assert_eq!(algorithm.generate_nonce().len(), algorithm.nonce_len());
        }
    }

    #[test]
    fn unknown_nonce_length_is_rejected() {
        let err = Algorithm::from_nonce_len(24).unwrap_err();
        assert!(matches!(err, SeftError::UnsupportedAlgorithm { nonce_len: 24 }));
    }

    #[test]
    fn only_gcm_and_fernet_carry_a_trailer() {
        assert_eq!(Algorithm::Aes256Gcm.trailer_len(), 16);
        assert_eq!(Algorithm::Aes256Cbc.trailer_len(), 0);
        assert_eq!(Algorithm::Fernet.trailer_len(), 32);
        assert!(!Algorithm::Aes256Gcm.is_padded());
        assert!(Algorithm::Aes256Cbc.is_padded());
    }
}
