//! SEFT 安全擦除（尽力而为）
//!
//! 以读写方式原地打开文件，每一轮用新生成的安全随机数按 4 KiB 窗口
//! 覆写全部长度并强制同步到存储设备，最后删除路径。
//!
//! 局限：在写时复制文件系统、带磨损均衡的 SSD、快照或云存储上，
//! 覆写文件内容并不能保证旧数据在物理介质上被清除。
//! 本函数只保证通过该路径无法再读到原内容。

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use rand::{RngCore, rngs::OsRng};
use tracing::{debug, info};

use crate::error::{Result, SeftError};

pub const DEFAULT_PASSES: u32 = 3;

const WINDOW_SIZE: usize = 4096;

/// 覆写 `passes` 轮后删除文件。
pub fn erase(path: &Path, passes: u32) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SeftError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return Err(SeftError::invalid_input("only regular files can be erased"));
    }
    if passes == 0 {
        return Err(SeftError::invalid_input("at least one overwrite pass is required"));
    }

    let len = metadata.len();
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut window = [0u8; WINDOW_SIZE];

    for pass in 1..=passes {
        file.seek(SeekFrom::Start(0))?;

        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(WINDOW_SIZE as u64) as usize;
            OsRng.fill_bytes(&mut window[..n]);
            file.write_all(&window[..n])?;
            remaining -= n as u64;
        }

        file.flush()?;
        file.sync_all()?;
        debug!(path = %path.display(), pass, "overwrite pass synced");
    }

    drop(file);
    fs::remove_file(path)?;

    info!(path = %path.display(), passes, bytes = len, "file erased");
    Ok(())
}
