//! 容器检查：只读取容器头，不派生密钥、不解密。

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::algorithm::Algorithm;
use crate::encrypt::open_input;
use crate::error::{Result, SeftError};
use crate::format::header::{self, Header};

/// 从容器头推断出的元信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub algorithm: Algorithm,
    pub header_len: u64,
    /// 密文长度，不含 tag / HMAC 尾部
    pub ciphertext_len: u64,
    pub total_len: u64,
    pub salt_len: usize,
    pub nonce_len: usize,
}

impl fmt::Display for ContainerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "algorithm:  {}", self.algorithm)?;
        writeln!(f, "header:     {} bytes", self.header_len)?;
        writeln!(f, "ciphertext: {} bytes", self.ciphertext_len)?;
        writeln!(f, "total:      {} bytes", self.total_len)?;
        writeln!(f, "salt:       {} bytes", self.salt_len)?;
        write!(f, "nonce:      {} bytes", self.nonce_len)
    }
}

/// 解析容器头并报告尺寸信息。
pub fn inspect(path: &Path) -> Result<ContainerInfo> {
    let file = open_input(path)?;
    let total_len = file.metadata()?.len();

    let header = Header::read(BufReader::new(file))?;
    let algorithm = header.algorithm()?;
    let header_len = header.encoded_len() as u64;

    let body_len = total_len - header_len;
    let trailer_len = algorithm.trailer_len() as u64;
    if body_len < trailer_len {
        return Err(SeftError::Truncated {
            field: "trailer",
            declared: trailer_len,
            available: body_len,
        });
    }

    Ok(ContainerInfo {
        algorithm,
        header_len,
        ciphertext_len: body_len - trailer_len,
        total_len,
        salt_len: header.salt.len(),
        nonce_len: header.nonce.len(),
    })
}

/// 只检查 magic，文件不存在或不可读时返回 false。
pub fn is_container(path: &Path) -> bool {
    match File::open(path) {
        Ok(file) => header::has_magic(file),
        Err(_) => false,
    }
}
