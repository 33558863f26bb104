//! SEFT 加密流程实现
//!
//! 本模块负责将文件或内存数据加密为 SEFT 容器。
//!
//! 加密流程（严格顺序）：
//! 1. 生成 salt
//! 2. 使用 PBKDF2 从密码派生密钥
//! 3. 生成 nonce，写入容器头（明文哈希先占位）
//! 4. 使用 StreamEncryptor 流式加密，同时计算明文 SHA-256
//! 5. 回到容器头位置写入真实哈希
//!
//! 注意：
//! - 文件输出经由 `write_atomic`，失败时不会留下半成品
//! - 不处理文件夹、不做 UI / 密码输入

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::crypto::kdf::{self, generate_salt};
use crate::error::{Result, SeftError};
use crate::format::header::{HASH_LEN, Header};
use crate::format::stream::StreamEncryptor;
use crate::fs::atomic::write_atomic;

/// 使用密码加密文件
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    password: &str,
    config: &EngineConfig,
) -> Result<()> {
    let input = open_input(input_path)?;

    write_atomic(output_path, |output| {
        let reader = BufReader::new(input);
        let mut writer = BufWriter::new(output);
        encrypt_into(reader, &mut writer, password, config, |_| {})?;
        writer.flush()?;
        Ok(())
    })?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        algorithm = %config.algorithm,
        "file encrypted"
    );
    Ok(())
}

/// 加密内存数据，返回完整容器字节。
pub fn encrypt_data(data: &[u8], password: &str, config: &EngineConfig) -> Result<Vec<u8>> {
    let mut container = Cursor::new(Vec::with_capacity(data.len() + 160));
    encrypt_into(data, &mut container, password, config, |_| {})?;
    Ok(container.into_inner())
}

/// 将 reader 的全部明文加密为容器写入 writer。
///
/// writer 需要支持 Seek：明文哈希在流式加密结束后才知道，
/// 需要回写到容器头的占位处。
pub(crate) fn encrypt_into<R, W, F>(
    reader: R,
    mut writer: W,
    password: &str,
    config: &EngineConfig,
    on_chunk: F,
) -> Result<()>
where
    R: Read,
    W: Write + Seek,
    F: FnMut(u64),
{
    // ---------- 生成 salt 并派生密钥 ----------
    let salt = generate_salt();
    let key = kdf::derive_key(password.as_bytes(), &salt, config.iterations)?;
    debug!(iterations = config.iterations, "key derived");

    // ---------- 写入容器头（哈希占位） ----------
    let encryptor = StreamEncryptor::new(&key, config.algorithm, config.chunk_size);
    let mut header = Header::new(&salt, encryptor.nonce(), [0u8; HASH_LEN]);

    let header_start = writer.stream_position()?;
    header.write(&mut writer)?;

    // ---------- Stream 加密 ----------
    header.plaintext_hash = encryptor.encrypt_with_progress(reader, &mut writer, on_chunk)?;

    // ---------- 回写明文哈希 ----------
    let end = writer.stream_position()?;
    writer.seek(SeekFrom::Start(header_start))?;
    header.write(&mut writer)?;
    writer.seek(SeekFrom::Start(end))?;
    writer.flush()?;

    debug!(bytes = end - header_start, "container written");
    Ok(())
}

pub(crate) fn open_input(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(SeftError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(SeftError::invalid_input("input is not a regular file"));
    }
    Ok(File::open(path)?)
}
