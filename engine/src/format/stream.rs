//! SEFT v1 Stream 实现
//!
//! 本模块负责容器中“数据流（Stream）”部分的加密与解密。
//!
//! 职责范围：
//! - 将任意大小的输入按固定窗口（默认 64 KiB）读取，依次喂入同一个密码状态
//! - 加密时同步计算明文 SHA-256，解密时对恢复出的明文重新计算
//! - GCM 在末尾追加 16 字节 tag，Fernet 追加 32 字节 HMAC，CBC 无尾部
//!
//! 设计前提与约束：
//! - 一个密码状态只服务一条数据流，第 N+1 块永远在第 N 块写出之后处理
//! - 解密时尾部字节始终被扣留，直到确认到达 EOF 才交给 finalize
//! - 本模块不负责原子写入：校验失败时调用方负责删除半成品输出

use std::io::{Read, Write};

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::algorithm::{Algorithm, BLOCK_SIZE, CipherDecryptor, CipherEncryptor};
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::crypto::kdf::EncryptionKey;
use crate::error::{Result, SeftError};
use crate::format::header::HASH_LEN;
use crate::format::read_full;

/// 流式加密器
///
/// 构造时生成新的随机 nonce，调用方负责把它写进容器头。
pub struct StreamEncryptor<'k> {
    key: &'k EncryptionKey,
    algorithm: Algorithm,
    nonce: Vec<u8>,
    chunk_size: usize,
}

impl<'k> StreamEncryptor<'k> {
    pub fn new(key: &'k EncryptionKey, algorithm: Algorithm, chunk_size: usize) -> Self {
        Self {
            key,
            algorithm,
            nonce: algorithm.generate_nonce(),
            chunk_size,
        }
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// 从 reader 读取明文，加密后写入 writer，返回明文 SHA-256
    pub fn encrypt<R: Read, W: Write>(self, reader: R, writer: W) -> Result<[u8; HASH_LEN]> {
        self.encrypt_with_progress(reader, writer, |_| {})
    }

    /// 同 `encrypt`，每处理完一个窗口回调一次已处理的明文字节数。
    pub fn encrypt_with_progress<R, W, F>(
        self,
        mut reader: R,
        mut writer: W,
        mut on_chunk: F,
    ) -> Result<[u8; HASH_LEN]>
    where
        R: Read,
        W: Write,
        F: FnMut(u64),
    {
        let mut cipher = CipherEncryptor::new(self.algorithm, self.key, &self.nonce)?;
        let mut hasher = Sha256::new();

        let mut buffer = Zeroizing::new(vec![0u8; self.chunk_size]);
        let mut out = Vec::with_capacity(self.chunk_size + BLOCK_SIZE + self.algorithm.trailer_len());
        let mut processed = 0u64;

        loop {
            let read_len = read_full(&mut reader, &mut buffer)?;
            if read_len == 0 {
                break;
            }

            let plaintext = &buffer[..read_len];
            hasher.update(plaintext);

            out.clear();
            cipher.update(plaintext, &mut out)?;
            writer.write_all(&out)?;

            processed += read_len as u64;
            on_chunk(processed);

            if read_len < buffer.len() {
                break;
            }
        }

        // CBC 的最后一块填充、GCM tag、Fernet HMAC 都在这里输出
        out.clear();
        cipher.finalize(&mut out);
        writer.write_all(&out)?;

        Ok(hasher.finalize().into())
    }
}

/// 流式解密器
pub struct StreamDecryptor<'k> {
    key: &'k EncryptionKey,
    algorithm: Algorithm,
    nonce: &'k [u8],
    chunk_size: usize,
}

impl<'k> StreamDecryptor<'k> {
    pub fn new(
        key: &'k EncryptionKey,
        algorithm: Algorithm,
        nonce: &'k [u8],
        chunk_size: usize,
    ) -> Self {
        Self {
            key,
            algorithm,
            nonce,
            chunk_size,
        }
    }

    /// 从 reader 读取“密文 || 尾部”，解密后写入 writer，返回恢复明文的 SHA-256。
    ///
    /// 认证失败、填充无效一律返回 `Integrity`；输入短于尾部长度返回 `Truncated`。
    pub fn decrypt<R: Read, W: Write>(self, mut reader: R, mut writer: W) -> Result<[u8; HASH_LEN]> {
        let trailer_len = self.algorithm.trailer_len();
        let mut cipher = CipherDecryptor::new(self.algorithm, self.key, self.nonce)?;
        let mut hasher = Sha256::new();

        let mut buffer = vec![0u8; self.chunk_size + trailer_len];
        let mut out = Zeroizing::new(Vec::with_capacity(self.chunk_size + BLOCK_SIZE));
        // 上一轮扣留在 buffer 开头、可能属于尾部的字节数
        let mut held = 0usize;

        let trailer = loop {
            let read_len = read_full(&mut reader, &mut buffer[held..])?;
            let filled = held + read_len;
            let at_eof = filled < buffer.len();

            if at_eof && filled < trailer_len {
                return Err(SeftError::Truncated {
                    field: "trailer",
                    declared: trailer_len as u64,
                    available: filled as u64,
                });
            }

            let body_len = filled - trailer_len;

            out.clear();
            cipher.update(&buffer[..body_len], &mut out)?;
            hasher.update(out.as_slice());
            writer.write_all(&out)?;

            if at_eof {
                break buffer[body_len..filled].to_vec();
            }

            buffer.copy_within(body_len..filled, 0);
            held = trailer_len;
        };

        out.clear();
        cipher.finalize(&trailer, &mut out)?;
        hasher.update(out.as_slice());
        writer.write_all(&out)?;

        Ok(hasher.finalize().into())
    }
}

/// 生成新 nonce 并以默认窗口流式加密，返回 (nonce, 明文哈希)。
pub fn encrypt_stream<R: Read, W: Write>(
    reader: R,
    writer: W,
    key: &EncryptionKey,
    algorithm: Algorithm,
) -> Result<(Vec<u8>, [u8; HASH_LEN])> {
    let encryptor = StreamEncryptor::new(key, algorithm, DEFAULT_CHUNK_SIZE);
    let nonce = encryptor.nonce().to_vec();
    let hash = encryptor.encrypt(reader, writer)?;
    Ok((nonce, hash))
}

/// `encrypt_stream` 的逆操作，返回恢复明文的 SHA-256 供调用方与容器头比对。
pub fn decrypt_stream<R: Read, W: Write>(
    reader: R,
    writer: W,
    key: &EncryptionKey,
    algorithm: Algorithm,
    nonce: &[u8],
) -> Result<[u8; HASH_LEN]> {
    StreamDecryptor::new(key, algorithm, nonce, DEFAULT_CHUNK_SIZE).decrypt(reader, writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> EncryptionKey {
        EncryptionKey::from_bytes([0x42; 32])
    }

    fn roundtrip(algorithm: Algorithm, data: &[u8], chunk_size: usize) -> Vec<u8> {
        let key = key();
        let encryptor = StreamEncryptor::new(&key, algorithm, chunk_size);
        let nonce = encryptor.nonce().to_vec();

        let mut sealed = Vec::new();
        let hash = encryptor.encrypt(data, &mut sealed).unwrap();
        assert_eq!(hash, <[u8; 32]>::from(Sha256::digest(data)));

        let mut plain = Vec::new();
        let recovered = StreamDecryptor::new(&key, algorithm, &nonce, chunk_size)
            .decrypt(sealed.as_slice(), &mut plain)
            .unwrap();
        assert_eq!(recovered, hash);
        plain
    }

    #[test]
    fn small_windows_roundtrip_for_every_algorithm() {
        let data: Vec<u8> = (0..=255u8).cycle().take(16 * 5 + 3).collect();
        for algorithm in Algorithm::ALL {
            for chunk_size in [16, 32, 64, 4096] {
                assert_eq!(roundtrip(algorithm, &data, chunk_size), data);
            }
        }
    }

    #[test]
    fn chunk_sized_input_keeps_trailer_intact() {
        // 输入恰好等于窗口大小时，尾部会跨越两次读取
        let data = vec![0x5a; 64];
        for algorithm in Algorithm::ALL {
            assert_eq!(roundtrip(algorithm, &data, 64), data);
        }
    }

    #[test]
    fn empty_input_still_has_a_hash() {
        for algorithm in Algorithm::ALL {
            assert!(roundtrip(algorithm, b"", 64).is_empty());
        }
    }

    #[test]
    fn gcm_stream_shorter_than_tag_is_truncated() {
        let key = key();
        let nonce = [0u8; 12];
        let err = StreamDecryptor::new(&key, Algorithm::Aes256Gcm, &nonce, 64)
            .decrypt(&[1u8, 2, 3][..], Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            SeftError::Truncated {
                field: "trailer",
                declared: 16,
                available: 3
            }
        ));
    }

    #[test]
    fn cbc_ciphertext_of_wrong_length_fails_integrity() {
        let key = key();
        let iv = [0u8; 16];
        let err = StreamDecryptor::new(&key, Algorithm::Aes256Cbc, &iv, 64)
            .decrypt(&[0u8; 20][..], Vec::new())
            .unwrap_err();
        assert!(matches!(err, SeftError::Integrity));
    }
}
