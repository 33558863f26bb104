//! is_container / inspect / erase 测试

use std::fs;

use tempfile::tempdir;

use seft_engine::{Algorithm, Engine, EngineConfig, SeftError};

fn engine(algorithm: Algorithm) -> Engine {
    Engine::new(
        EngineConfig::default()
            .with_algorithm(algorithm)
            .with_iterations(10_000),
    )
    .expect("valid config")
}

#[test]
fn is_container_only_after_real_encrypt() {
    let temp = tempdir().expect("create temp dir");
    let plain = temp.path().join("plain.txt");
    let sealed = temp.path().join("plain.txt.enc");
    fs::write(&plain, b"some ordinary text").expect("write plain");

    assert!(!seft_engine::is_container(&plain));
    assert!(!seft_engine::is_container(&sealed));
    assert!(!seft_engine::is_container(temp.path()));

    engine(Algorithm::Aes256Gcm)
        .encrypt_file(&plain, &sealed, "pw")
        .expect("encrypt file");
    assert!(seft_engine::is_container(&sealed));
}

#[test]
fn inspect_reports_sizes_per_algorithm() {
    let temp = tempdir().expect("create temp dir");
    let plain = temp.path().join("plain.bin");
    fs::write(&plain, vec![9u8; 100]).expect("write plain");

    // (算法, 头长度, 密文长度, 总长度)
    let cases = [
        (Algorithm::Aes256Gcm, 96, 100, 96 + 100 + 16),
        (Algorithm::Aes256Cbc, 100, 112, 100 + 112),
        (Algorithm::Fernet, 109, 112, 109 + 112 + 32),
    ];

    for (algorithm, header_len, ciphertext_len, total_len) in cases {
        let sealed = temp.path().join(format!("{}.enc", algorithm.name()));
        engine(algorithm).encrypt_file(&plain, &sealed, "pw").expect("encrypt");

        let info = seft_engine::inspect(&sealed).expect("inspect");
        assert_eq!(info.algorithm, algorithm);
        assert_eq!(info.header_len, header_len);
        assert_eq!(info.ciphertext_len, ciphertext_len);
        assert_eq!(info.total_len, total_len);
        assert_eq!(info.salt_len, 32);
        assert_eq!(info.nonce_len, algorithm.nonce_len());
    }
}

#[test]
fn inspect_rejects_non_containers() {
    let temp = tempdir().expect("create temp dir");
    let path = temp.path().join("random.bin");
    fs::write(&path, b"definitely not a container").expect("write");

    assert!(matches!(
        seft_engine::inspect(&path),
        Err(SeftError::Format { .. })
    ));
}

#[test]
fn erase_overwrites_and_removes() {
    let temp = tempdir().expect("create temp dir");
    let path = temp.path().join("secret.txt");
    fs::write(&path, vec![0x41u8; 10_000]).expect("write secret");

    seft_engine::erase(&path, seft_engine::DEFAULT_PASSES).expect("erase");
    assert!(!path.exists());
}

#[test]
fn erase_overwrites_the_shared_inode() {
    let temp = tempdir().expect("create temp dir");
    let path = temp.path().join("secret.txt");
    let link = temp.path().join("secret-link.txt");
    let original = vec![0x41u8; 10_000];
    fs::write(&path, &original).expect("write secret");
    // 硬链接与原文件共享数据块，erase 只删除原名，可借此观察覆写结果
    fs::hard_link(&path, &link).expect("create hard link");

    seft_engine::erase(&path, 2).expect("erase");

    assert!(!path.exists());
    let after = fs::read(&link).expect("read through link");
    assert_eq!(after.len(), original.len());
    assert_ne!(after, original);
    assert!(after.chunks(4096).all(|window| window.iter().any(|&b| b != 0x41)));
}

#[test]
fn erase_empty_file() {
    let temp = tempdir().expect("create temp dir");
    let path = temp.path().join("empty");
    fs::write(&path, b"").expect("write empty");

    seft_engine::erase(&path, 1).expect("erase");
    assert!(!path.exists());
}

#[test]
fn erase_rejects_bad_targets() {
    let temp = tempdir().expect("create temp dir");
    let missing = temp.path().join("missing");
    let file = temp.path().join("keep.txt");
    fs::write(&file, b"keep").expect("write");

    assert!(matches!(
        seft_engine::erase(&missing, 3),
        Err(SeftError::NotFound { .. })
    ));
    assert!(matches!(
        seft_engine::erase(temp.path(), 3),
        Err(SeftError::InvalidInput { .. })
    ));
    assert!(matches!(
        seft_engine::erase(&file, 0),
        Err(SeftError::InvalidInput { .. })
    ));
    assert_eq!(fs::read(&file).expect("still there"), b"keep");
}
