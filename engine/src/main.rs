//! seft 命令行入口
//!
//! 用法：
//!   seft encrypt <input> <output> [--algorithm gcm|cbc|fernet]
//!   seft decrypt <input> <output>
//!   seft encrypt-folder <dir> <output>
//!   seft decrypt-folder <input> <dir>
//!   seft encrypt-many <output-dir> <items>...
//!   seft decrypt-many <output-dir> <items>...
//!   seft inspect <container>
//!   seft stats <items>...
//!   seft erase <file> [--passes 3]
//!
//! 未提供 `--password` 时从终端读取密码。所有实际逻辑都委托给库。

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use seft_engine::config::DEFAULT_CHUNK_SIZE;
use seft_engine::crypto::kdf::DEFAULT_ITERATIONS;
use seft_engine::{Algorithm, BatchResult, DEFAULT_PASSES, Engine, EngineConfig, ProgressSink};

#[derive(Parser, Debug)]
#[command(name = "seft", version, about = "Password-based file, data and folder encryption")]
struct Cli {
    /// 加密算法（解密时由容器自动识别）
    #[arg(long, short = 'a', value_enum, default_value_t = AlgorithmArg::Gcm, global = true)]
    algorithm: AlgorithmArg,

    /// PBKDF2 迭代次数，加密与解密必须一致
    #[arg(long, default_value_t = DEFAULT_ITERATIONS, global = true)]
    iterations: u32,

    /// 流式处理的分块大小（字节）
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, global = true)]
    chunk_size: usize,

    /// 直接在命令行给出密码（会留在 shell 历史中）
    #[arg(long, global = true)]
    password: Option<String>,

    /// 输出 debug 日志
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encrypt a single file
    Encrypt { input: PathBuf, output: PathBuf },

    /// Decrypt a single file
    Decrypt { input: PathBuf, output: PathBuf },

    /// Encrypt a whole directory into one container
    EncryptFolder { dir: PathBuf, output: PathBuf },

    /// Restore a folder container into a directory
    DecryptFolder { input: PathBuf, output_dir: PathBuf },

    /// Encrypt many files and folders into an output directory
    EncryptMany {
        output_dir: PathBuf,
        #[arg(required = true)]
        items: Vec<PathBuf>,
        /// Worker threads (0 = one per CPU)
        #[arg(long, default_value_t = 0)]
        workers: usize,
    },

    /// Decrypt many containers into an output directory
    DecryptMany {
        output_dir: PathBuf,
        #[arg(required = true)]
        items: Vec<PathBuf>,
        #[arg(long, default_value_t = 0)]
        workers: usize,
    },

    /// Print header information of a container without decrypting it
    Inspect { input: PathBuf },

    /// Summarise a selection of files and folders before a batch
    Stats {
        #[arg(required = true)]
        items: Vec<PathBuf>,
    },

    /// Overwrite a file with random bytes, then delete it
    Erase {
        path: PathBuf,
        #[arg(long, default_value_t = DEFAULT_PASSES)]
        passes: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlgorithmArg {
    Gcm,
    Cbc,
    Fernet,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Gcm => Algorithm::Aes256Gcm,
            AlgorithmArg::Cbc => Algorithm::Aes256Cbc,
            AlgorithmArg::Fernet => Algorithm::Fernet,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = EngineConfig::default()
        .with_algorithm(cli.algorithm.into())
        .with_iterations(cli.iterations)
        .with_chunk_size(cli.chunk_size);
    let engine = Engine::new(config).context("invalid engine configuration")?;

    match cli.command {
        Command::Encrypt { input, output } => {
            let password = read_password(cli.password, true)?;
            engine
                .encrypt_file(&input, &output, &password)
                .with_context(|| format!("failed to encrypt {}", input.display()))?;
        }
        Command::Decrypt { input, output } => {
            let password = read_password(cli.password, false)?;
            engine
                .decrypt_file(&input, &output, &password)
                .with_context(|| format!("failed to decrypt {}", input.display()))?;
        }
        Command::EncryptFolder { dir, output } => {
            let password = read_password(cli.password, true)?;
            with_progress(|sink| engine.encrypt_folder(&dir, &output, &password, sink))
                .with_context(|| format!("failed to encrypt folder {}", dir.display()))?;
        }
        Command::DecryptFolder { input, output_dir } => {
            let password = read_password(cli.password, false)?;
            with_progress(|sink| engine.decrypt_folder(&input, &output_dir, &password, sink))
                .with_context(|| format!("failed to decrypt folder {}", input.display()))?;
        }
        Command::EncryptMany {
            output_dir,
            items,
            workers,
        } => {
            let password = read_password(cli.password, true)?;
            let result = engine
                .batch()
                .with_workers(workers)
                .encrypt_many(&items, &output_dir, &password)?;
            return Ok(report(&result));
        }
        Command::DecryptMany {
            output_dir,
            items,
            workers,
        } => {
            let password = read_password(cli.password, false)?;
            let result = engine
                .batch()
                .with_workers(workers)
                .decrypt_many(&items, &output_dir, &password)?;
            return Ok(report(&result));
        }
        Command::Inspect { input } => {
            let info = seft_engine::inspect(&input)
                .with_context(|| format!("failed to inspect {}", input.display()))?;
            println!("{info}");
        }
        Command::Stats { items } => {
            let checked = seft_engine::validate_paths(&items);
            for failure in &checked.invalid {
                println!("missing {}", failure.item);
            }

            let stats = seft_engine::selection_stats(&checked.valid);
            println!(
                "{} files, {} folders, {} bytes",
                stats.files, stats.folders, stats.total_bytes
            );
            for (extension, entry) in &stats.by_extension {
                println!("  {extension:<16} {:>6} files {:>12} bytes", entry.count, entry.bytes);
            }
            if !checked.invalid.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Erase { path, passes } => {
            seft_engine::erase(&path, passes)
                .with_context(|| format!("failed to erase {}", path.display()))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_password(given: Option<String>, confirm: bool) -> Result<Zeroizing<String>> {
    if let Some(password) = given {
        return Ok(Zeroizing::new(password));
    }

    let password = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if password.is_empty() {
        bail!("password must not be empty");
    }
    if confirm {
        let again = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);
        if *again != *password {
            bail!("passwords do not match");
        }
    }
    Ok(password)
}

/// 在后台线程打印进度事件，直到操作结束。
fn with_progress<T>(op: impl FnOnce(&ProgressSink) -> seft_engine::Result<T>) -> seft_engine::Result<T> {
    let (sink, rx) = ProgressSink::channel();
    let printer = thread::spawn(move || {
        for event in rx {
            eprintln!("[{:>5.1}%] {}", event.percent, event.message);
        }
    });

    let result = op(&sink);
    drop(sink);
    let _ = printer.join();
    result
}

fn report(result: &BatchResult) -> ExitCode {
    for item in &result.successful {
        println!("ok      {item}");
    }
    for failure in &result.failed {
        println!("failed  {}: {}", failure.item, failure.error);
    }
    println!(
        "{} succeeded, {} failed",
        result.successful.len(),
        result.failed.len()
    );

    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
