//! 单文件与内存数据的端到端加解密测试

use std::fs;
use std::io::Write;

use proptest::prelude::*;
use tempfile::tempdir;

use seft_engine::crypto::kdf::EncryptionKey;
use seft_engine::format::header::MAGIC;
use seft_engine::format::stream::StreamEncryptor;
use seft_engine::{Algorithm, Engine, EngineConfig, ErrorKind, SeftError};

const CHUNK: usize = 64 * 1024;

fn engine(algorithm: Algorithm) -> Engine {
    Engine::new(
        EngineConfig::default()
            .with_algorithm(algorithm)
            .with_iterations(10_000),
    )
    .expect("valid config")
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// 容器头长度：magic + version + 三个长度前缀 + salt(32) + nonce + hash(32)
fn header_len(algorithm: Algorithm) -> usize {
    4 + 4 + 3 * 4 + 32 + algorithm.nonce_len() + 32
}

#[test]
fn every_size_roundtrips_for_every_algorithm() {
    for algorithm in Algorithm::ALL {
        let engine = engine(algorithm);
        for len in [0, 1, CHUNK - 1, CHUNK, CHUNK + 1, 3 * CHUNK + 7] {
            let data = payload(len);
            let sealed = engine.encrypt_data(&data, "pw").expect("encrypt data");
            let opened = engine.decrypt_data(&sealed, "pw").expect("decrypt data");
            assert_eq!(opened, data, "{algorithm} with {len} bytes");
        }
    }
}

#[test]
fn file_roundtrip_creates_missing_output_dirs() {
    let temp = tempdir().expect("create temp dir");
    let input = temp.path().join("input.txt");
    let sealed = temp.path().join("out/nested/input.txt.enc");
    let opened = temp.path().join("plain/input.txt");

    let data = payload(3 * CHUNK + 7);
    fs::File::create(&input)
        .and_then(|mut f| f.write_all(&data))
        .expect("write input");

    for algorithm in Algorithm::ALL {
        let engine = engine(algorithm);
        engine.encrypt_file(&input, &sealed, "file-password").expect("encrypt file");
        engine.decrypt_file(&sealed, &opened, "file-password").expect("decrypt file");
        assert_eq!(fs::read(&opened).expect("read decrypted"), data);
    }
}

#[test]
fn hello_world_scenario() {
    let engine = engine(Algorithm::Aes256Gcm);

    let sealed = engine.encrypt_data(b"hello world", "Tr0ub4dor&3").expect("encrypt");
    assert_eq!(&sealed[..4], MAGIC);
    assert_eq!(
        engine.decrypt_data(&sealed, "Tr0ub4dor&3").expect("decrypt"),
        b"hello world"
    );

    let err = engine.decrypt_data(&sealed, "wrong").unwrap_err();
    assert!(matches!(err, SeftError::Integrity));
}

#[test]
fn wrong_password_is_an_integrity_error() {
    for algorithm in Algorithm::ALL {
        let engine = engine(algorithm);
        let sealed = engine.encrypt_data(&payload(1000), "correct").expect("encrypt");
        let err = engine.decrypt_data(&sealed, "incorrect").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity, "{algorithm}");
    }
}

#[test]
fn flipping_any_body_byte_is_detected() {
    for algorithm in Algorithm::ALL {
        let engine = engine(algorithm);
        let sealed = engine.encrypt_data(&payload(100), "pw").expect("encrypt");
        let body_start = header_len(algorithm);

        // 密文开头、中间、最后一个字节（GCM / Fernet 为尾部）
        for index in [body_start, (body_start + sealed.len()) / 2, sealed.len() - 1] {
            let mut tampered = sealed.clone();
            tampered[index] ^= 0x01;
            let err = engine.decrypt_data(&tampered, "pw").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Integrity, "{algorithm} byte {index}");
        }
    }
}

#[test]
fn altered_magic_is_rejected_as_format_error() {
    let engine = engine(Algorithm::Aes256Gcm);
    let mut sealed = engine.encrypt_data(b"payload", "pw").expect("encrypt");
    sealed[0] = b'X';

    let err = engine.decrypt_data(&sealed, "pw").unwrap_err();
    assert!(matches!(err, SeftError::Format { .. }));
}

#[test]
fn truncated_container_is_reported() {
    let engine = engine(Algorithm::Aes256Gcm);
    let sealed = engine.encrypt_data(b"payload", "pw").expect("encrypt");

    let err = engine.decrypt_data(&sealed[..20], "pw").unwrap_err();
    assert!(matches!(err, SeftError::Truncated { field: "salt", .. }));

    let body_start = header_len(Algorithm::Aes256Gcm);
    let err = engine.decrypt_data(&sealed[..body_start + 3], "pw").unwrap_err();
    assert!(matches!(err, SeftError::Truncated { field: "trailer", .. }));
}

#[test]
fn unknown_nonce_length_is_unsupported() {
    let mut container = Vec::new();
    seft_engine::format::header::write_header(&mut container, &[1; 32], &[2; 20], &[3; 32])
        .expect("write header");

    let err = engine(Algorithm::Aes256Gcm).decrypt_data(&container, "pw").unwrap_err();
    assert!(matches!(err, SeftError::UnsupportedAlgorithm { nonce_len: 20 }));
}

#[test]
fn failed_decrypt_leaves_no_output_file() {
    let temp = tempdir().expect("create temp dir");
    let input = temp.path().join("input.bin");
    let sealed = temp.path().join("input.bin.enc");
    let opened = temp.path().join("opened.bin");

    fs::write(&input, payload(2 * CHUNK)).expect("write input");

    let engine = engine(Algorithm::Aes256Cbc);
    engine.encrypt_file(&input, &sealed, "right").expect("encrypt file");

    let err = engine.decrypt_file(&sealed, &opened, "wrong").unwrap_err();
    assert!(matches!(err, SeftError::Integrity));
    assert!(!opened.exists());

    // 目录中只剩输入和容器，没有残留的临时文件
    assert_eq!(fs::read_dir(temp.path()).expect("list dir").count(), 2);
}

#[test]
fn missing_input_is_not_found() {
    let temp = tempdir().expect("create temp dir");
    let missing = temp.path().join("nope.txt");

    let err = engine(Algorithm::Aes256Gcm)
        .encrypt_file(&missing, &temp.path().join("nope.enc"), "pw")
        .unwrap_err();
    assert!(matches!(err, SeftError::NotFound { path } if path == missing));
}

#[test]
fn decrypt_uses_the_algorithm_stored_in_the_container() {
    // 加密端使用 CBC，解密端配置为默认 GCM，依然能够解密
    let sealed = engine(Algorithm::Aes256Cbc).encrypt_data(b"cross", "pw").expect("encrypt");
    let opened = engine(Algorithm::Aes256Gcm).decrypt_data(&sealed, "pw").expect("decrypt");
    assert_eq!(opened, b"cross");
}

#[test]
fn gcm_stream_matches_one_shot_aes_gcm() {
    use aes_gcm::aead::{Aead, KeyInit};
    use aes_gcm::{Aes256Gcm, Nonce};

    let key_bytes = [0x24u8; 32];
    let key = EncryptionKey::from_bytes(key_bytes);
    let data = payload(2 * 4096 + 5);

    let encryptor = StreamEncryptor::new(&key, Algorithm::Aes256Gcm, 4096);
    let nonce = encryptor.nonce().to_vec();
    let mut sealed = Vec::new();
    encryptor.encrypt(data.as_slice(), &mut sealed).expect("stream encrypt");

    let cipher = Aes256Gcm::new_from_slice(&key_bytes).expect("32-byte key");
    let opened = cipher
        .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
        .expect("aes-gcm accepts the stream output");
    assert_eq!(opened, data);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn arbitrary_payloads_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        for algorithm in Algorithm::ALL {
            let engine = engine(algorithm);
            let sealed = engine.encrypt_data(&data, "prop").unwrap();
            prop_assert_eq!(engine.decrypt_data(&sealed, "prop").unwrap(), data.clone());
        }
    }
}
