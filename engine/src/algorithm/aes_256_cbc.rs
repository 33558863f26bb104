//! SEFT AES-CBC 增量加解密
//!
//! 逐块异或前一块密文后加密，PKCS#7 填充只作用于最后一块。
//! CBC 本身不提供认证，完整性依赖容器头中的明文 SHA-256。

use aes::Aes256;
use aes::cipher::consts::U16;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, BlockSizeUser, KeyInit};

use crate::algorithm::BLOCK_SIZE;
use crate::crypto::kdf::EncryptionKey;
use crate::error::{Result, SeftError};

pub const IV_SIZE: usize = 16;

pub(crate) fn encryptor(key: &EncryptionKey, iv: &[u8]) -> CbcEncryptor<Aes256> {
    CbcEncryptor::new(Aes256::new(GenericArray::from_slice(key.as_bytes())), iv)
}

pub(crate) fn decryptor(key: &EncryptionKey, iv: &[u8]) -> CbcDecryptor<Aes256> {
    CbcDecryptor::new(Aes256::new(GenericArray::from_slice(key.as_bytes())), iv)
}

pub(crate) struct CbcEncryptor<C> {
    cipher: C,
    chain: [u8; BLOCK_SIZE],
    pending: Vec<u8>,
}

impl<C> CbcEncryptor<C>
where
    C: BlockEncrypt + BlockSizeUser<BlockSize = U16>,
{
    pub fn new(cipher: C, iv: &[u8]) -> Self {
        let mut chain = [0u8; BLOCK_SIZE];
        chain.copy_from_slice(iv);
        Self {
            cipher,
            chain,
            pending: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    pub fn update(&mut self, plaintext: &[u8], out: &mut Vec<u8>) {
        self.pending.extend_from_slice(plaintext);

        let full = self.pending.len() / BLOCK_SIZE * BLOCK_SIZE;
        for block in self.pending[..full].chunks_exact(BLOCK_SIZE) {
            let ct = encrypt_block(&self.cipher, &mut self.chain, block);
            out.extend_from_slice(&ct);
        }
        self.pending.drain(..full);
    }

    pub fn finalize(mut self, out: &mut Vec<u8>) {
        // 剩余 0..=15 字节，填充值为 1..=16
        let pad = (BLOCK_SIZE - self.pending.len()) as u8;
        self.pending.resize(BLOCK_SIZE, pad);

        let ct = encrypt_block(&self.cipher, &mut self.chain, &self.pending);
        out.extend_from_slice(&ct);
    }
}

pub(crate) struct CbcDecryptor<C> {
    cipher: C,
    chain: [u8; BLOCK_SIZE],
    pending: Vec<u8>,
}

impl<C> CbcDecryptor<C>
where
    C: BlockDecrypt + BlockSizeUser<BlockSize = U16>,
{
    pub fn new(cipher: C, iv: &[u8]) -> Self {
        let mut chain = [0u8; BLOCK_SIZE];
        chain.copy_from_slice(iv);
        Self {
            cipher,
            chain,
            pending: Vec::with_capacity(2 * BLOCK_SIZE),
        }
    }

    pub fn update(&mut self, ciphertext: &[u8], out: &mut Vec<u8>) {
        self.pending.extend_from_slice(ciphertext);
        if self.pending.len() <= BLOCK_SIZE {
            return;
        }

        // 始终保留最后一个完整块，留给 finalize 去除填充
        let ready = (self.pending.len() - 1) / BLOCK_SIZE * BLOCK_SIZE;
        for block in self.pending[..ready].chunks_exact(BLOCK_SIZE) {
            let pt = decrypt_block(&self.cipher, &mut self.chain, block);
            out.extend_from_slice(&pt);
        }
        self.pending.drain(..ready);
    }

    pub fn finalize(mut self, out: &mut Vec<u8>) -> Result<()> {
        if self.pending.len() != BLOCK_SIZE {
            return Err(SeftError::Integrity);
        }

        let last = decrypt_block(&self.cipher, &mut self.chain, &self.pending);
        let unpadded = strip_padding(&last)?;
        out.extend_from_slice(unpadded);
        Ok(())
    }
}

fn encrypt_block<C>(cipher: &C, chain: &mut [u8; BLOCK_SIZE], plaintext: &[u8]) -> [u8; BLOCK_SIZE]
where
    C: BlockEncrypt + BlockSizeUser<BlockSize = U16>,
{
    let mut block = GenericArray::<u8, U16>::default();
    for (i, b) in block.iter_mut().enumerate() {
        *b = plaintext[i] ^ chain[i];
    }
    cipher.encrypt_block(&mut block);

    chain.copy_from_slice(&block);
    *chain
}

fn decrypt_block<C>(cipher: &C, chain: &mut [u8; BLOCK_SIZE], ciphertext: &[u8]) -> [u8; BLOCK_SIZE]
where
    C: BlockDecrypt + BlockSizeUser<BlockSize = U16>,
{
    let mut block = GenericArray::<u8, U16>::clone_from_slice(ciphertext);
    cipher.decrypt_block(&mut block);

    let mut plaintext = [0u8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        plaintext[i] = block[i] ^ chain[i];
    }
    chain.copy_from_slice(ciphertext);
    plaintext
}

fn strip_padding(block: &[u8; BLOCK_SIZE]) -> Result<&[u8]> {
    let pad = block[BLOCK_SIZE - 1] as usize;
    if pad == 0 || pad > BLOCK_SIZE {
        return Err(SeftError::Integrity);
    }
    if block[BLOCK_SIZE - pad..].iter().any(|&b| b as usize != pad) {
        return Err(SeftError::Integrity);
    }
    Ok(&block[..BLOCK_SIZE - pad])
}
