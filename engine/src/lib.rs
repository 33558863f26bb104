//! SEFT：基于密码的文件 / 数据 / 文件夹加密引擎。
//!
//! 顶层函数使用默认配置（PBKDF2 100 000 次迭代、64 KiB 分块），
//! 需要调整迭代次数或分块大小时使用 [`Engine`]。

mod decrypt;
mod encrypt;

pub mod algorithm;
pub mod batch;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod folder;
pub mod format;
pub mod fs;
pub mod inspect;
pub mod progress;

pub use algorithm::Algorithm;
pub use batch::{
    BatchCoordinator, BatchFailure, BatchResult, CancelFlag, PathValidation, SelectionStats, TypeStats,
    selection_stats, validate_paths,
};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{ErrorKind, Result, SeftError};
pub use folder::PayloadKind;
pub use format::archive::{FolderStats, folder_stats};
pub use fs::erase::DEFAULT_PASSES;
pub use inspect::{ContainerInfo, inspect, is_container};
pub use progress::{ProgressEvent, ProgressSink};

use std::path::{Path, PathBuf};

fn config_for(algorithm: Algorithm) -> EngineConfig {
    EngineConfig::default().with_algorithm(algorithm)
}

pub fn encrypt_file(input: &Path, output: &Path, password: &str, algorithm: Algorithm) -> Result<()> {
    encrypt::encrypt_file(input, output, password, &config_for(algorithm))
}

/// 算法由容器头中的 nonce 长度决定，无需调用方指定。
pub fn decrypt_file(input: &Path, output: &Path, password: &str) -> Result<()> {
    decrypt::decrypt_file(input, output, password, &EngineConfig::default())
}

pub fn encrypt_data(data: &[u8], password: &str, algorithm: Algorithm) -> Result<Vec<u8>> {
    encrypt::encrypt_data(data, password, &config_for(algorithm))
}

pub fn decrypt_data(container: &[u8], password: &str) -> Result<Vec<u8>> {
    decrypt::decrypt_data(container, password, &EngineConfig::default())
}

pub fn encrypt_folder(
    dir: &Path,
    output: &Path,
    password: &str,
    algorithm: Algorithm,
    progress: Option<&ProgressSink>,
) -> Result<()> {
    let none = ProgressSink::none();
    folder::encrypt_folder(dir, output, password, &config_for(algorithm), progress.unwrap_or(&none))
}

pub fn decrypt_folder(
    input: &Path,
    output_dir: &Path,
    password: &str,
    progress: Option<&ProgressSink>,
) -> Result<()> {
    let none = ProgressSink::none();
    folder::decrypt_folder(input, output_dir, password, &EngineConfig::default(), progress.unwrap_or(&none))
}

pub fn encrypt_many(
    items: &[PathBuf],
    output_dir: &Path,
    password: &str,
    algorithm: Algorithm,
) -> Result<BatchResult> {
    BatchCoordinator::new(&config_for(algorithm)).encrypt_many(items, output_dir, password)
}

pub fn decrypt_many(items: &[PathBuf], output_dir: &Path, password: &str) -> Result<BatchResult> {
    BatchCoordinator::new(&EngineConfig::default()).decrypt_many(items, output_dir, password)
}

/// 覆写 `passes` 轮后删除文件，见 [`fs::erase::erase`] 的局限说明。
pub fn erase(path: &Path, passes: u32) -> Result<()> {
    fs::erase::erase(path, passes)
}
