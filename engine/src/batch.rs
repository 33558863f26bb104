//! SEFT 批处理（BatchCoordinator）
//!
//! 对一组输入路径逐项执行加密或解密：
//! - 普通文件直接加密，目录先打包再加密，输出命名为 `<name>.enc`
//! - 解密时去掉 `.enc` 后缀，否则追加 `_decrypted`
//! - 单项失败只记录在结果中，绝不中断其余条目
//!
//! 并发模型：每个条目由 rayon 线程池中的一个 worker 处理，
//! 结果按输入顺序收集为一个 `BatchResult`。取消信号只在条目之间检查，
//! 已开始的单文件加解密不会被打断。
//!
//! 另提供选择阶段的辅助：`validate_paths` 拆分存在 / 不存在的输入，
//! `selection_stats` 汇总文件数、目录数、总大小与按扩展名的分布。

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::encrypt::encrypt_file;
use crate::error::{ErrorKind, Result, SeftError};
use crate::folder::{decrypt_path, encrypt_folder};
use crate::format::archive::folder_stats;
use crate::progress::{ProgressSink, scaled};

/// 加密输出的文件扩展名
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// 无法去掉 `.enc` 时追加的后缀
pub const DECRYPTED_SUFFIX: &str = "_decrypted";

/// 没有扩展名的文件在统计中的键
pub const NO_EXTENSION: &str = "no_extension";

/// 单个失败条目
#[derive(Debug)]
pub struct BatchFailure {
    pub item: String,
    pub error: SeftError,
}

impl BatchFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// 一次批处理的完整结果，每个输入恰好对应一项。
#[derive(Debug, Default)]
pub struct BatchResult {
    pub successful: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    fn record(&mut self, item: String, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.successful.push(item),
            Err(error) => self.failed.push(BatchFailure { item, error }),
        }
    }
}

/// 批级取消信号，可在其他线程中触发。
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 输入路径的预检结果，顺序与输入一致。
#[derive(Debug, Default)]
pub struct PathValidation {
    pub valid: Vec<PathBuf>,
    /// 每项的错误均为 `NotFound`
    pub invalid: Vec<BatchFailure>,
}

/// 把输入拆分为存在与不存在两组，不做任何读写。
pub fn validate_paths(items: &[PathBuf]) -> PathValidation {
    let mut result = PathValidation::default();
    for item in items {
        if item.exists() {
            result.valid.push(item.clone());
        } else {
            result.invalid.push(BatchFailure {
                item: item.display().to_string(),
                error: SeftError::NotFound { path: item.clone() },
            });
        }
    }
    result
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeStats {
    pub count: u64,
    pub bytes: u64,
}

/// 一组输入的汇总统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionStats {
    /// 直接选中的文件加上各目录中的文件
    pub files: u64,
    pub folders: u64,
    pub total_bytes: u64,
    /// 只统计直接选中的文件，键为小写扩展名（不含 `.`）
    pub by_extension: BTreeMap<String, TypeStats>,
}

/// 汇总一组输入；不存在或无法读取的条目被跳过。
pub fn selection_stats(items: &[PathBuf]) -> SelectionStats {
    let mut stats = SelectionStats::default();

    for item in items {
        if item.is_dir() {
            match folder_stats(item) {
                Ok(folder) => {
                    stats.folders += 1;
                    stats.files += folder.files;
                    stats.total_bytes += folder.total_bytes;
                }
                Err(err) => warn!(item = %item.display(), error = %err, "skipping unreadable folder"),
            }
            continue;
        }

        let Ok(metadata) = fs::metadata(item) else {
            continue;
        };
        let extension = item
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| NO_EXTENSION.to_string());

        stats.files += 1;
        stats.total_bytes += metadata.len();
        let entry = stats.by_extension.entry(extension).or_default();
        entry.count += 1;
        entry.bytes += metadata.len();
    }

    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// 批处理协调器
pub struct BatchCoordinator<'a> {
    config: &'a EngineConfig,
    workers: usize,
    cancel: CancelFlag,
    progress: ProgressSink,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            workers: 0,
            cancel: CancelFlag::new(),
            progress: ProgressSink::none(),
        }
    }

    /// worker 数量；0 表示使用 rayon 默认值，1 表示在当前线程顺序执行。
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// 批量加密文件与目录到 `output_dir`。
    ///
    /// 只有输出目录不可用时整个调用才会失败。
    pub fn encrypt_many(&self, items: &[PathBuf], output_dir: &Path, password: &str) -> Result<BatchResult> {
        self.run(Direction::Encrypt, items, output_dir, password)
    }

    /// 批量解密容器到 `output_dir`，文件夹容器还原为目录。
    pub fn decrypt_many(&self, items: &[PathBuf], output_dir: &Path, password: &str) -> Result<BatchResult> {
        self.run(Direction::Decrypt, items, output_dir, password)
    }

    fn run(
        &self,
        direction: Direction,
        items: &[PathBuf],
        output_dir: &Path,
        password: &str,
    ) -> Result<BatchResult> {
        prepare_output_dir(output_dir)?;

        let total = items.len();
        let done = AtomicUsize::new(0);

        let process = |input: &PathBuf| -> (String, Result<()>) {
            let item = input.display().to_string();

            let outcome = if self.cancel.is_cancelled() {
                Err(SeftError::Cancelled)
            } else {
                self.process_item(direction, input, output_dir, password)
            };

            if let Err(err) = &outcome {
                warn!(item = %item, error = %err, "batch item failed");
            }

            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            if self.progress.is_enabled() {
                self.progress.emit(
                    scaled(0.0, 100.0, finished as u64, total as u64),
                    format!("Processed: {item}"),
                );
            }
            (item, outcome)
        };

        let outcomes: Vec<(String, Result<()>)> = if self.workers == 1 {
            items.iter().map(process).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
                .map_err(io::Error::other)?;
            pool.install(|| items.par_iter().map(process).collect())
        };

        // 汇总只在这里发生，顺序与输入一致
        let mut result = BatchResult::default();
        for (item, outcome) in outcomes {
            result.record(item, outcome);
        }

        info!(
            succeeded = result.successful.len(),
            failed = result.failed.len(),
            "batch finished"
        );
        Ok(result)
    }

    fn process_item(
        &self,
        direction: Direction,
        input: &Path,
        output_dir: &Path,
        password: &str,
    ) -> Result<()> {
        if !input.exists() {
            return Err(SeftError::NotFound {
                path: input.to_path_buf(),
            });
        }

        let output = output_dir.join(output_name(direction, input)?);
        let item_progress = ProgressSink::none();

        match direction {
            Direction::Encrypt if input.is_dir() => {
                encrypt_folder(input, &output, password, self.config, &item_progress)
            }
            Direction::Encrypt => encrypt_file(input, &output, password, self.config),
            Direction::Decrypt => {
                decrypt_path(input, &output, password, self.config, &item_progress).map(|_| ())
            }
        }
    }
}

/// 按方向计算输出文件名。
fn output_name(direction: Direction, input: &Path) -> Result<String> {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| SeftError::invalid_input("input has no usable file name"))?;

    Ok(match direction {
        Direction::Encrypt => format!("{name}{ENCRYPTED_SUFFIX}"),
        Direction::Decrypt => match name.strip_suffix(ENCRYPTED_SUFFIX) {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => format!("{name}{DECRYPTED_SUFFIX}"),
        },
    })
}

fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() && !output_dir.is_dir() {
        return Err(SeftError::invalid_input("batch output path is not a directory"));
    }
    fs::create_dir_all(output_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_names_append_suffix() {
        let name = output_name(Direction::Encrypt, Path::new("dir/report.pdf")).unwrap();
        assert_eq!(name, "report.pdf.enc");
    }

    #[test]
    fn decrypt_names_strip_or_mark() {
        assert_eq!(
            output_name(Direction::Decrypt, Path::new("a/report.pdf.enc")).unwrap(),
            "report.pdf"
        );
        assert_eq!(
            output_name(Direction::Decrypt, Path::new("a/blob.bin")).unwrap(),
            "blob.bin_decrypted"
        );
        assert_eq!(
            output_name(Direction::Decrypt, Path::new(".enc")).unwrap(),
            ".enc_decrypted"
        );
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn validation_splits_existing_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"a").unwrap();
        let missing = dir.path().join("gone.txt");

        let checked = validate_paths(&[missing.clone(), file.clone(), dir.path().to_path_buf()]);
        assert_eq!(checked.valid, vec![file, dir.path().to_path_buf()]);
        assert_eq!(checked.invalid.len(), 1);
        assert_eq!(checked.invalid[0].item, missing.display().to_string());
        assert_eq!(checked.invalid[0].kind(), ErrorKind::NotFound);
    }

    #[test]
    fn result_keeps_one_entry_per_item() {
        let mut result = BatchResult::default();
        result.record("a".into(), Ok(()));
        result.record("b".into(), Err(SeftError::Cancelled));
        assert_eq!(result.total(), 2);
        assert!(!result.is_success());
        assert_eq!(result.failed[0].kind(), ErrorKind::Cancelled);
    }
}
