//! SEFT 解密流程实现
//!
//! 本模块负责将 SEFT 容器解密还原为原始数据。
//!
//! 解密流程（严格顺序）：
//! 1. 读取并校验容器头（magic / version / 字段长度）
//! 2. 按 nonce 长度确定算法，使用容器头中的 salt + 密码派生密钥
//! 3. 流式解密，GCM 校验 tag、Fernet 校验 HMAC、CBC 校验填充
//! 4. 重新计算明文 SHA-256，与容器头中的哈希比对
//!
//! 注意：
//! - 任一校验失败都返回 `Integrity`，不区分具体原因
//! - 文件输出经由 `write_atomic`，校验失败时输出被删除

use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::crypto::kdf;
use crate::encrypt::open_input;
use crate::error::{Result, SeftError};
use crate::format::header::{HASH_LEN, Header};
use crate::format::stream::StreamDecryptor;
use crate::fs::atomic::write_atomic;

/// 使用密码解密文件
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    password: &str,
    config: &EngineConfig,
) -> Result<()> {
    let input = open_input(input_path)?;

    write_atomic(output_path, |output| {
        let reader = BufReader::new(input);
        let mut writer = BufWriter::new(output);
        decrypt_into(reader, &mut writer, password, config)?;
        writer.flush()?;
        Ok(())
    })?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        "file decrypted"
    );
    Ok(())
}

/// 解密内存中的完整容器。
pub fn decrypt_data(container: &[u8], password: &str, config: &EngineConfig) -> Result<Vec<u8>> {
    let mut plaintext = Vec::with_capacity(container.len());
    decrypt_into(container, &mut plaintext, password, config)?;
    Ok(plaintext)
}

/// 从 reader 读取完整容器，解密后写入 writer。
///
/// 明文在校验完成前就已写入 writer，调用方必须在出错时丢弃 writer 的内容。
pub(crate) fn decrypt_into<R, W>(
    mut reader: R,
    writer: W,
    password: &str,
    config: &EngineConfig,
) -> Result<()>
where
    R: Read,
    W: Write,
{
    // ---------- 读取并校验容器头 ----------
    let header = Header::read(&mut reader)?;
    let algorithm = header.algorithm()?;

    // ---------- KDF 派生密钥 ----------
    let key = kdf::derive_key(password.as_bytes(), &header.salt, config.iterations)?;
    debug!(%algorithm, "key derived");

    // ---------- Stream 解密 ----------
    let hash = StreamDecryptor::new(&key, algorithm, &header.nonce, config.chunk_size)
        .decrypt(reader, writer)?;

    // ---------- 独立的明文哈希校验 ----------
    verify_plaintext_hash(&hash, &header.plaintext_hash)
}

fn verify_plaintext_hash(actual: &[u8; HASH_LEN], expected: &[u8; HASH_LEN]) -> Result<()> {
    if bool::from(actual[..].ct_eq(&expected[..])) {
        Ok(())
    } else {
        Err(SeftError::Integrity)
    }
}
