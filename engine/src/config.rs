//! SEFT 引擎配置
//!
//! 算法、KDF 迭代次数与分块大小在构造引擎时显式传入，
//! 不存在进程级的可变全局配置。

use crate::algorithm::{Algorithm, BLOCK_SIZE};
use crate::crypto::kdf::{DEFAULT_ITERATIONS, MIN_ITERATIONS};
use crate::error::{Result, SeftError};

/// 默认明文分块大小：64 KiB
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub algorithm: Algorithm,
    pub iterations: u32,
    pub chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            iterations: DEFAULT_ITERATIONS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// 校验配置。
    ///
    /// - 迭代次数不低于 `MIN_ITERATIONS`
    /// - 分块大小为 AES 块长的非零整数倍
    pub fn validate(&self) -> Result<()> {
        if self.iterations < MIN_ITERATIONS {
            return Err(SeftError::invalid_input(
                "iterations below the minimum of 10000",
            ));
        }
        if self.chunk_size == 0 || self.chunk_size % BLOCK_SIZE != 0 {
            return Err(SeftError::invalid_input(
                "chunk size must be a non-zero multiple of 16",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.algorithm, Algorithm::Aes256Gcm);
        assert_eq!(config.iterations, 100_000);
        assert_eq!(config.chunk_size, 65_536);
        config.validate().unwrap();
    }

    #[test]
    fn low_iteration_count_is_rejected() {
        let config = EngineConfig::default().with_iterations(9_999);
        assert!(matches!(
            config.validate(),
            Err(SeftError::InvalidInput { .. })
        ));
    }

    #[test]
    fn unaligned_chunk_size_is_rejected() {
        assert!(EngineConfig::default().with_chunk_size(0).validate().is_err());
        assert!(EngineConfig::default().with_chunk_size(1000).validate().is_err());
        assert!(EngineConfig::default().with_chunk_size(4096).validate().is_ok());
    }
}
