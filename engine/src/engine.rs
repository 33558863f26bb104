//! 已配置的引擎实例
//!
//! 构造时校验一次 `EngineConfig`，之后所有操作共享同一份只读配置。

use std::path::{Path, PathBuf};

use crate::batch::{BatchCoordinator, BatchResult};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::folder::PayloadKind;
use crate::progress::ProgressSink;
use crate::{decrypt, encrypt, folder};

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn encrypt_file(&self, input: &Path, output: &Path, password: &str) -> Result<()> {
        encrypt::encrypt_file(input, output, password, &self.config)
    }

    pub fn decrypt_file(&self, input: &Path, output: &Path, password: &str) -> Result<()> {
        decrypt::decrypt_file(input, output, password, &self.config)
    }

    pub fn encrypt_data(&self, data: &[u8], password: &str) -> Result<Vec<u8>> {
        encrypt::encrypt_data(data, password, &self.config)
    }

    pub fn decrypt_data(&self, container: &[u8], password: &str) -> Result<Vec<u8>> {
        decrypt::decrypt_data(container, password, &self.config)
    }

    pub fn encrypt_folder(
        &self,
        dir: &Path,
        output: &Path,
        password: &str,
        progress: &ProgressSink,
    ) -> Result<()> {
        folder::encrypt_folder(dir, output, password, &self.config, progress)
    }

    pub fn decrypt_folder(
        &self,
        input: &Path,
        output_dir: &Path,
        password: &str,
        progress: &ProgressSink,
    ) -> Result<()> {
        folder::decrypt_folder(input, output_dir, password, &self.config, progress)
    }

    /// 解密任意容器，按明文内容还原为文件或目录。
    pub fn decrypt_path(&self, input: &Path, output: &Path, password: &str) -> Result<PayloadKind> {
        folder::decrypt_path(input, output, password, &self.config, &ProgressSink::none())
    }

    /// 以本引擎配置创建批处理协调器，可继续设置 worker 数、取消与进度。
    pub fn batch(&self) -> BatchCoordinator<'_> {
        BatchCoordinator::new(&self.config)
    }

    pub fn encrypt_many(&self, items: &[PathBuf], output_dir: &Path, password: &str) -> Result<BatchResult> {
        self.batch().encrypt_many(items, output_dir, password)
    }

    pub fn decrypt_many(&self, items: &[PathBuf], output_dir: &Path, password: &str) -> Result<BatchResult> {
        self.batch().decrypt_many(items, output_dir, password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeftError;

    #[test]
    fn weak_iteration_count_is_rejected() {
        let err = Engine::new(EngineConfig::default().with_iterations(1_000)).unwrap_err();
        assert!(matches!(err, SeftError::InvalidInput { .. }));
    }

    #[test]
    fn data_roundtrip_through_engine() {
        let engine = Engine::new(EngineConfig::default().with_iterations(10_000)).unwrap();
        let sealed = engine.encrypt_data(b"engine payload", "pw").unwrap();
        assert_eq!(engine.decrypt_data(&sealed, "pw").unwrap(), b"engine payload");
    }
}
