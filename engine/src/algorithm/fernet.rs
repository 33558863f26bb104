//! SEFT Fernet 等价构造
//!
//! 与 Fernet token 相同的构造，封装进 SEFT 容器：
//! - 32 字节密钥拆分：前 16 字节为 HMAC-SHA256 签名密钥，后 16 字节为 AES-128 密钥
//! - nonce 字段 = 版本字节 0x80 || 时间戳（u64 大端）|| IV（16 字节）
//! - 密文为 PKCS#7 填充的 AES-128-CBC
//! - 尾部为 HMAC-SHA256(nonce 字段 || 密文)，共 32 字节
//!
//! 解密时先校验 HMAC，再去除填充。

use std::time::{SystemTime, UNIX_EPOCH};

use aes::Aes128;
use aes::cipher::KeyInit;
use aes::cipher::generic_array::GenericArray;
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;

use crate::algorithm::aes_256_cbc::{CbcDecryptor, CbcEncryptor};
use crate::crypto::kdf::EncryptionKey;
use crate::error::{Result, SeftError};

type HmacSha256 = Hmac<Sha256>;

pub const VERSION_BYTE: u8 = 0x80;
pub const IV_SIZE: usize = 16;
pub const NONCE_FIELD_SIZE: usize = 1 + 8 + IV_SIZE;
pub const HMAC_SIZE: usize = 32;

const SIGNING_KEY: std::ops::Range<usize> = 0..16;
const ENCRYPTION_KEY: std::ops::Range<usize> = 16..32;

pub fn generate_nonce_field() -> [u8; NONCE_FIELD_SIZE] {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut field = [0u8; NONCE_FIELD_SIZE];
    field[0] = VERSION_BYTE;
    field[1..9].copy_from_slice(&timestamp.to_be_bytes());
    OsRng.fill_bytes(&mut field[9..]);
    field
}

fn iv(nonce_field: &[u8]) -> &[u8] {
    &nonce_field[1 + 8..]
}

fn signer(key: &EncryptionKey, nonce_field: &[u8]) -> Result<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(&key.as_bytes()[SIGNING_KEY])
        .map_err(|_| SeftError::invalid_input("invalid HMAC signing key"))?;
    mac.update(nonce_field);
    Ok(mac)
}

fn block_cipher(key: &EncryptionKey) -> Aes128 {
    Aes128::new(GenericArray::from_slice(&key.as_bytes()[ENCRYPTION_KEY]))
}

pub(crate) struct FernetEncryptor {
    cbc: CbcEncryptor<Aes128>,
    mac: HmacSha256,
}

impl FernetEncryptor {
    pub fn new(key: &EncryptionKey, nonce_field: &[u8]) -> Result<Self> {
        Ok(Self {
            cbc: CbcEncryptor::new(block_cipher(key), iv(nonce_field)),
            mac: signer(key, nonce_field)?,
        })
    }

    pub fn update(&mut self, plaintext: &[u8], out: &mut Vec<u8>) {
        let start = out.len();
        self.cbc.update(plaintext, out);
        self.mac.update(&out[start..]);
    }

    pub fn finalize(mut self, out: &mut Vec<u8>) {
        let start = out.len();
        self.cbc.finalize(out);
        self.mac.update(&out[start..]);
        out.extend_from_slice(&self.mac.finalize().into_bytes());
    }
}

pub(crate) struct FernetDecryptor {
    cbc: CbcDecryptor<Aes128>,
    mac: HmacSha256,
}

impl FernetDecryptor {
    pub fn new(key: &EncryptionKey, nonce_field: &[u8]) -> Result<Self> {
        Ok(Self {
            cbc: CbcDecryptor::new(block_cipher(key), iv(nonce_field)),
            mac: signer(key, nonce_field)?,
        })
    }

    pub fn update(&mut self, ciphertext: &[u8], out: &mut Vec<u8>) {
        self.mac.update(ciphertext);
        self.cbc.update(ciphertext, out);
    }

    pub fn finalize(self, trailer: &[u8], out: &mut Vec<u8>) -> Result<()> {
        self.mac
            .verify_slice(trailer)
            .map_err(|_| SeftError::Integrity)?;
        self.cbc.finalize(out)
    }
}
