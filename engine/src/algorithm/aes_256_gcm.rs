//! SEFT AES-256-GCM 增量加解密
//!
//! 由 AES 块加密、32 位大端计数器模式与 GHASH 组装出标准 GCM，
//! 整条数据流只产生一个 16 字节认证标签（无 AAD）。
//! 输出与一次性 AES-GCM 实现逐字节一致。

use aes::Aes256;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher};
use ctr::Ctr32BE;
use ghash::GHash;
use ghash::universal_hash::UniversalHash;

use crate::algorithm::BLOCK_SIZE;
use crate::crypto::kdf::EncryptionKey;
use crate::error::{Result, SeftError};

pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

/// 计数器、GHASH 与标签掩码，加解密共用。
struct GcmState {
    ctr: Ctr32BE<Aes256>,
    ghash: GHash,
    // E(K, J0)，与 GHASH 结果异或得到标签
    tag_mask: [u8; TAG_SIZE],
    // 未满一个块、尚未进入 GHASH 的密文
    pending: Vec<u8>,
    ciphertext_len: u64,
}

impl GcmState {
    fn new(key: &EncryptionKey, nonce: &[u8]) -> Self {
        let cipher = Aes256::new(GenericArray::from_slice(key.as_bytes()));

        let mut hash_key = ghash::Key::default();
        cipher.encrypt_block(&mut hash_key);

        let mut j0 = [0u8; BLOCK_SIZE];
        j0[..NONCE_SIZE].copy_from_slice(nonce);
        j0[BLOCK_SIZE - 1] = 1;

        let mut mask = GenericArray::clone_from_slice(&j0);
        cipher.encrypt_block(&mut mask);
        let mut tag_mask = [0u8; TAG_SIZE];
        tag_mask.copy_from_slice(&mask);

        // 数据从 inc32(J0) 开始加密
        let mut counter = j0;
        counter[BLOCK_SIZE - 1] = 2;
        let ctr = Ctr32BE::<Aes256>::new(
            GenericArray::from_slice(key.as_bytes()),
            GenericArray::from_slice(&counter),
        );

        Self {
            ctr,
            ghash: GHash::new(&hash_key),
            tag_mask,
            pending: Vec::with_capacity(BLOCK_SIZE),
            ciphertext_len: 0,
        }
    }

    fn apply_keystream(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ctr
            .try_apply_keystream(buf)
            .map_err(|_| SeftError::invalid_input("payload exceeds the GCM counter range"))
    }

    /// 只把完整的块交给 GHASH，剩余部分留到下次或 finalize。
    fn absorb(&mut self, ciphertext: &[u8]) {
        self.ciphertext_len += ciphertext.len() as u64;
        self.pending.extend_from_slice(ciphertext);

        let full = self.pending.len() / BLOCK_SIZE * BLOCK_SIZE;
        if full > 0 {
            self.ghash.update_padded(&self.pending[..full]);
            self.pending.drain(..full);
        }
    }

    /// 返回 GHASH(C) 与长度块的结果，尚未异或掩码。
    fn finish_ghash(mut self) -> (GHash, [u8; TAG_SIZE]) {
        self.ghash.update_padded(&self.pending);

        let mut lengths = [0u8; BLOCK_SIZE];
        lengths[8..].copy_from_slice(&(self.ciphertext_len * 8).to_be_bytes());
        self.ghash.update(&[GenericArray::clone_from_slice(&lengths)]);

        (self.ghash, self.tag_mask)
    }
}

pub(crate) struct GcmEncryptor {
    state: GcmState,
}

impl GcmEncryptor {
    pub fn new(key: &EncryptionKey, nonce: &[u8]) -> Self {
        Self {
            state: GcmState::new(key, nonce),
        }
    }

    pub fn update(&mut self, plaintext: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        out.extend_from_slice(plaintext);
        self.state.apply_keystream(&mut out[start..])?;
        self.state.absorb(&out[start..]);
        Ok(())
    }

    pub fn finalize(self, out: &mut Vec<u8>) {
        let (ghash, mask) = self.state.finish_ghash();
        let digest = ghash.finalize();

        out.extend(digest.iter().zip(mask.iter()).map(|(d, m)| d ^ m));
    }
}

pub(crate) struct GcmDecryptor {
    state: GcmState,
}

impl GcmDecryptor {
    pub fn new(key: &EncryptionKey, nonce: &[u8]) -> Self {
        Self {
            state: GcmState::new(key, nonce),
        }
    }

    pub fn update(&mut self, ciphertext: &[u8], out: &mut Vec<u8>) -> Result<()> {
        self.state.absorb(ciphertext);

        let start = out.len();
        out.extend_from_slice(ciphertext);
        self.state.apply_keystream(&mut out[start..])
    }

    /// 常量时间比较标签。
    pub fn finalize(self, tag: &[u8]) -> Result<()> {
        if tag.len() != TAG_SIZE {
            return Err(SeftError::Integrity);
        }

        let (ghash, mask) = self.state.finish_ghash();

        let mut expected = ghash::Block::default();
        for (i, b) in expected.iter_mut().enumerate() {
            *b = tag[i] ^ mask[i];
        }

        ghash.verify(&expected).map_err(|_| SeftError::Integrity)
    }
}
