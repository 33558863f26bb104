//! SEFT v1 容器头实现
//!
//! 容器头是整个 .enc 文件的“格式锚点”：
//! - 标识文件类型（magic）
//! - 指明版本号（必须与读取方完全一致，不做向后兼容解析）
//! - 提供密钥派生所需的 salt
//! - 提供加密算法所需的 nonce / IV
//! - 保存原始明文的 SHA-256，用于解密后的独立校验
//!
//! 字节布局（整数均为小端）：
//!
//! ```text
//! magic      4 字节  b"SEFT"
//! version    u32
//! salt_len   u32  + salt
//! nonce_len  u32  + nonce
//! hash_len   u32  + hash（32 字节）
//! ```
//!
//! 每个字段都显式带长度，从不推断。格式演进只需提升版本号，
//! 读取方遇到不一致的版本直接拒绝。

use std::io::{Read, Write};

use crate::algorithm::Algorithm;
use crate::error::{Result, SeftError};
use crate::format::read_full;

/// SEFT 文件魔数（ASCII）
pub const MAGIC: &[u8; 4] = b"SEFT";

/// 当前支持的唯一版本号
pub const VERSION: u32 = 1;

/// SHA-256 摘要长度
pub const HASH_LEN: usize = 32;

/// 单个长度前缀字段允许的最大长度，超过即视为格式错误
pub const MAX_FIELD_LEN: u32 = 1024;

const LEN_SIZE: usize = 4;

/// SEFT v1 容器头
///
/// 仅表示语义内容，字节序列化由 read / write 负责。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
    pub plaintext_hash: [u8; HASH_LEN],
}

impl Header {
    pub fn new(salt: &[u8], nonce: &[u8], plaintext_hash: [u8; HASH_LEN]) -> Self {
        Self {
            salt: salt.to_vec(),
            nonce: nonce.to_vec(),
            plaintext_hash,
        }
    }

    /// 按 nonce 长度反推加密算法。
    pub fn algorithm(&self) -> Result<Algorithm> {
        Algorithm::from_nonce_len(self.nonce.len())
    }

    /// 序列化后的字节长度。
    pub fn encoded_len(&self) -> usize {
        MAGIC.len() + LEN_SIZE + 3 * LEN_SIZE + self.salt.len() + self.nonce.len() + HASH_LEN
    }

    /// 将容器头写入输出流
    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        write_header(writer, &self.salt, &self.nonce, &self.plaintext_hash)
    }

    /// 从输入流读取并解析容器头
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        read_header(reader)
    }
}

/// 写入 magic、version 以及三个长度前缀字段（salt、nonce、hash，顺序固定）。
pub fn write_header<W: Write>(
    mut writer: W,
    salt: &[u8],
    nonce: &[u8],
    plaintext_hash: &[u8],
) -> Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;

    for field in [salt, nonce, plaintext_hash] {
        writer.write_all(&(field.len() as u32).to_le_bytes())?;
        writer.write_all(field)?;
    }

    Ok(())
}

/// 读取并校验容器头。
///
/// - magic 不匹配：`Format`
/// - 版本不一致：`UnsupportedVersion`
/// - 声明长度超过剩余字节：`Truncated`
pub fn read_header<R: Read>(mut reader: R) -> Result<Header> {
    let mut magic = [0u8; 4];
    let n = read_full(&mut reader, &mut magic)?;
    if n < magic.len() || &magic != MAGIC {
        return Err(SeftError::format("invalid SEFT magic"));
    }

    let version = read_u32(&mut reader, "version")?;
    if version != VERSION {
        return Err(SeftError::UnsupportedVersion {
            found: version,
            expected: VERSION,
        });
    }

    let salt = read_field(&mut reader, "salt")?;
    if salt.is_empty() {
        return Err(SeftError::format("empty salt"));
    }

    let nonce = read_field(&mut reader, "nonce")?;

    let hash = read_field(&mut reader, "hash")?;
    let plaintext_hash: [u8; HASH_LEN] = hash
        .as_slice()
        .try_into()
        .map_err(|_| SeftError::format("plaintext hash must be 32 bytes"))?;

    Ok(Header {
        salt,
        nonce,
        plaintext_hash,
    })
}

/// 只检查前 4 个字节是否为 magic，不做任何解密。
pub fn has_magic<R: Read>(mut reader: R) -> bool {
    let mut magic = [0u8; 4];
    matches!(read_full(&mut reader, &mut magic), Ok(4)) && &magic == MAGIC
}

fn read_u32<R: Read>(reader: &mut R, field: &'static str) -> Result<u32> {
    let mut buf = [0u8; LEN_SIZE];
    let n = read_full(reader, &mut buf)?;
    if n < LEN_SIZE {
        return Err(SeftError::Truncated {
            field,
            declared: LEN_SIZE as u64,
            available: n as u64,
        });
    }
    Ok(u32::from_le_bytes(buf))
}

fn read_field<R: Read>(reader: &mut R, field: &'static str) -> Result<Vec<u8>> {
    let declared = read_u32(reader, field)?;
    if declared > MAX_FIELD_LEN {
        return Err(SeftError::format("header field exceeds maximum length"));
    }

    let mut buf = Vec::with_capacity(declared as usize);
    reader
        .by_ref()
        .take(u64::from(declared))
        .read_to_end(&mut buf)?;

    if buf.len() < declared as usize {
        return Err(SeftError::Truncated {
            field,
            declared: u64::from(declared),
            available: buf.len() as u64,
        });
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header::new(&[1u8; 32], &[2u8; 12], [3u8; HASH_LEN])
    }

    fn encode(header: &Header) -> Vec<u8> {
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        buf
    }

    #[test]
    fn layout_is_bit_exact() {
        let buf = encode(&sample());

        assert_eq!(&buf[0..4], b"SEFT");
        assert_eq!(&buf[4..8], &1u32.to_le_bytes());
        assert_eq!(&buf[8..12], &32u32.to_le_bytes());
        assert_eq!(&buf[12..44], &[1u8; 32]);
        assert_eq!(&buf[44..48], &12u32.to_le_bytes());
        assert_eq!(&buf[48..60], &[2u8; 12]);
        assert_eq!(&buf[60..64], &32u32.to_le_bytes());
        assert_eq!(&buf[64..96], &[3u8; 32]);
        assert_eq!(buf.len(), sample().encoded_len());
    }

    #[test]
    fn read_back_matches_written_header() {
        let header = sample();
        let parsed = Header::read(encode(&header).as_slice()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.algorithm().unwrap(), Algorithm::Aes256Gcm);
    }

    #[test]
    fn altered_magic_is_a_format_error() {
        let mut buf = encode(&sample());
        buf[0] = b'X';
        assert!(matches!(
            Header::read(buf.as_slice()),
            Err(SeftError::Format { .. })
        ));
    }

    #[test]
    fn other_version_is_rejected() {
        let mut buf = encode(&sample());
        buf[4..8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            Header::read(buf.as_slice()),
            Err(SeftError::UnsupportedVersion { found: 2, expected: 1 })
        ));
    }

    #[test]
    fn declared_length_beyond_input_is_truncated() {
        let buf = encode(&sample());
        let err = Header::read(&buf[..30]).unwrap_err();
        assert!(matches!(
            err,
            SeftError::Truncated {
                field: "salt",
                declared: 32,
                available: 18
            }
        ));
    }

    #[test]
    fn oversized_field_is_rejected_before_reading() {
        let mut buf = encode(&sample());
        buf[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            Header::read(buf.as_slice()),
            Err(SeftError::Format { .. })
        ));
    }

    #[test]
    fn magic_check_needs_four_bytes() {
        assert!(has_magic(&b"SEFT and more"[..]));
        assert!(!has_magic(&b"SEF"[..]));
        assert!(!has_magic(&b"PK\x03\x04"[..]));
    }
}
