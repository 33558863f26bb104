//! SEFT 文件夹加密/解密实现
//!
//! 设计要点：
//! - 目录先打包成单一归档流（写入目标旁的匿名临时文件），再整体加密为一个容器
//! - 解密时先完整解密并通过全部校验，再解包到目标目录
//! - 中间归档只存在于匿名临时文件中，函数返回即消失
//! - 进度：加密时打包占 0-50%、加密占 50-100%；解密时解密占 0-50%、解包占 50-100%

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::info;

use crate::config::EngineConfig;
use crate::decrypt::decrypt_into;
use crate::encrypt::{encrypt_into, open_input};
use crate::error::{Result, SeftError};
use crate::format::archive;
use crate::fs::atomic::{staging_file, write_atomic};
use crate::progress::{ProgressSink, scaled};

/// 解密结果的载荷类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    File,
    Folder,
}

/// 将整个目录加密为一个容器文件。
pub fn encrypt_folder(
    input_path: &Path,
    output_path: &Path,
    password: &str,
    config: &EngineConfig,
    progress: &ProgressSink,
) -> Result<()> {
    if !input_path.exists() {
        return Err(SeftError::NotFound {
            path: input_path.to_path_buf(),
        });
    }
    if !input_path.is_dir() {
        return Err(SeftError::invalid_input("folder input is not a directory"));
    }

    // ---------- 打包到临时归档 ----------
    let mut staging = staging_file(output_path)?;
    let packed = archive::pack_with_progress(input_path, BufWriter::new(&mut staging), |done, total, name| {
        if progress.is_enabled() {
            progress.emit(
                scaled(0.0, 50.0, done as u64, total as u64),
                format!("Archiving: {name}"),
            );
        }
    })?;

    let archive_len = staging.seek(SeekFrom::End(0))?;
    staging.seek(SeekFrom::Start(0))?;

    // ---------- 加密归档 ----------
    progress.emit(50.0, "Encrypting archive...");
    write_atomic(output_path, |output| {
        let mut writer = BufWriter::new(output);
        encrypt_into(
            BufReader::new(&mut staging),
            &mut writer,
            password,
            config,
            |done| progress.emit(scaled(50.0, 100.0, done, archive_len), "Encrypting archive..."),
        )?;
        writer.flush()?;
        Ok(())
    })?;

    progress.emit(100.0, "Folder encryption completed");
    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        files = packed.len(),
        "folder encrypted"
    );
    Ok(())
}

/// 将文件夹容器解密并还原到 `output_path` 目录。
pub fn decrypt_folder(
    input_path: &Path,
    output_path: &Path,
    password: &str,
    config: &EngineConfig,
    progress: &ProgressSink,
) -> Result<()> {
    progress.emit(0.0, "Decrypting archive...");
    let staging = decrypt_to_staging(input_path, output_path, password, config)?;

    progress.emit(50.0, "Extracting files...");
    let files = unpack_staging(staging, output_path, progress)?;

    progress.emit(100.0, "Folder decryption completed");
    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        files,
        "folder decrypted"
    );
    Ok(())
}

/// 解密任意容器：明文是归档则还原为目录，否则写为普通文件。
///
/// 判断依据是解密后的明文能否完整解析为归档，而不是文件名。
/// 只是以归档 magic 开头的普通文件仍按文件还原。
pub fn decrypt_path(
    input_path: &Path,
    output_path: &Path,
    password: &str,
    config: &EngineConfig,
    progress: &ProgressSink,
) -> Result<PayloadKind> {
    let mut staging = decrypt_to_staging(input_path, output_path, password, config)?;

    let is_folder = archive::validate(BufReader::new(&mut staging)).is_ok();
    staging.seek(SeekFrom::Start(0))?;

    if is_folder {
        unpack_staging(staging, output_path, progress)?;
        info!(output = %output_path.display(), "container restored as folder");
        return Ok(PayloadKind::Folder);
    }

    write_atomic(output_path, |output| {
        std::io::copy(&mut staging, output)?;
        Ok(())
    })?;
    progress.emit(100.0, "File decryption completed");
    info!(output = %output_path.display(), "container restored as file");
    Ok(PayloadKind::File)
}

/// 解密到目标旁的匿名临时文件，返回已通过全部校验、位于开头的句柄。
fn decrypt_to_staging(
    input_path: &Path,
    output_path: &Path,
    password: &str,
    config: &EngineConfig,
) -> Result<File> {
    let input = open_input(input_path)?;
    let mut staging = staging_file(output_path)?;

    {
        let mut writer = BufWriter::new(&mut staging);
        decrypt_into(BufReader::new(input), &mut writer, password, config)?;
        writer.flush()?;
    }

    staging.seek(SeekFrom::Start(0))?;
    Ok(staging)
}

fn unpack_staging(staging: File, output_path: &Path, progress: &ProgressSink) -> Result<usize> {
    let files = archive::unpack_with_progress(BufReader::new(staging), output_path, |done, total, name| {
        if progress.is_enabled() {
            progress.emit(
                scaled(50.0, 100.0, done as u64, total as u64),
                format!("Extracting: {name}"),
            );
        }
    })?;
    Ok(files.len())
}
