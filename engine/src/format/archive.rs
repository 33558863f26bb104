//! SEFT 目录归档（ArchivePacker）
//!
//! 把一棵目录树序列化为单一字节流，作为加密前的中间形态，
//! 解密后再还原为目录。归档本身从不单独落盘保存。
//!
//! 字节布局（整数均为小端）：
//!
//! ```text
//! magic    4 字节  b"SEFA"
//! version  u32
//! count    u32
//! 每个条目：
//!   path_len u32 + path（UTF-8，`/` 分隔的相对路径）
//!   data_len u64 + data
//! ```
//!
//! 设计要点：
//! - 按文件名排序遍历，同一输入总是得到相同的归档
//! - 只收录普通文件：空目录与符号链接不会被保存
//! - 解包时严格校验每个路径组件，拒绝 `..`、绝对路径等穿越写法
//! - 解包先落到临时目录，归档完整通过解析后才移入目标目录，
//!   失败时目标目录中已有的文件保持原样

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, SeftError};
use crate::format::read_full;

pub const ARCHIVE_MAGIC: &[u8; 4] = b"SEFA";
pub const ARCHIVE_VERSION: u32 = 1;

/// 条目路径的最大字节数
const MAX_PATH_LEN: u32 = 4096;

/// 待打包的单个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// `/` 分隔的相对路径
    pub relative_path: String,
    pub source: PathBuf,
    pub len: u64,
}

/// 目录统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderStats {
    pub files: u64,
    pub total_bytes: u64,
}

/// 递归遍历目录，按稳定顺序列出所有普通文件。
pub fn manifest(root: &Path) -> Result<Vec<ArchiveEntry>> {
    if !root.exists() {
        return Err(SeftError::NotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(SeftError::invalid_input("folder input is not a directory"));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(walkdir_to_io)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| SeftError::invalid_input("entry outside of the packed root"))?;

        entries.push(ArchiveEntry {
            relative_path: to_archive_path(rel)?,
            source: entry.path().to_path_buf(),
            len: entry.metadata().map_err(walkdir_to_io)?.len(),
        });
    }

    Ok(entries)
}

pub fn folder_stats(root: &Path) -> Result<FolderStats> {
    let entries = manifest(root)?;
    Ok(FolderStats {
        files: entries.len() as u64,
        total_bytes: entries.iter().map(|e| e.len).sum(),
    })
}

/// 将目录打包写入 writer，返回按顺序写入的相对路径。
pub fn pack<W: Write>(root: &Path, writer: W) -> Result<Vec<String>> {
    pack_with_progress(root, writer, |_, _, _| {})
}

/// 同 `pack`，每写完一个条目回调 `(已完成数, 总数, 相对路径)`。
pub fn pack_with_progress<W, F>(root: &Path, mut writer: W, mut on_entry: F) -> Result<Vec<String>>
where
    W: Write,
    F: FnMut(usize, usize, &str),
{
    let entries = manifest(root)?;
    let total = entries.len();
    let count = u32::try_from(total)
        .map_err(|_| SeftError::invalid_input("too many files to archive"))?;

    writer.write_all(ARCHIVE_MAGIC)?;
    writer.write_all(&ARCHIVE_VERSION.to_le_bytes())?;
    writer.write_all(&count.to_le_bytes())?;

    let mut packed = Vec::with_capacity(total);
    for (index, entry) in entries.into_iter().enumerate() {
        let path = entry.relative_path.as_bytes();
        writer.write_all(&(path.len() as u32).to_le_bytes())?;
        writer.write_all(path)?;
        writer.write_all(&entry.len.to_le_bytes())?;

        let file = File::open(&entry.source)?;
        let copied = io::copy(&mut file.take(entry.len), &mut writer)?;
        if copied != entry.len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} changed while packing", entry.source.display()),
            )
            .into());
        }

        debug!(path = %entry.relative_path, bytes = entry.len, "packed");
        on_entry(index + 1, total, &entry.relative_path);
        packed.push(entry.relative_path);
    }

    writer.flush()?;
    Ok(packed)
}

/// 只解析、不落盘：完整走一遍归档结构，返回条目数。
///
/// 与解包使用同一套校验（magic、版本、路径安全、长度、无尾随字节），
/// 通过校验的流一定能被 `unpack` 接受（磁盘错误除外）。
pub fn validate<R: Read>(mut reader: R) -> Result<usize> {
    let total = read_preamble(&mut reader)?;
    for _ in 0..total {
        let (_, _, data_len) = read_entry_header(&mut reader)?;
        copy_entry_data(&mut reader, data_len, &mut io::sink())?;
    }
    expect_end(&mut reader)?;
    Ok(total)
}

/// 把归档解包到 `dest`，按需创建父目录，返回写出的文件路径。
pub fn unpack<R: Read>(reader: R, dest: &Path) -> Result<Vec<PathBuf>> {
    unpack_with_progress(reader, dest, |_, _, _| {})
}

/// 同 `unpack`，每还原一个条目回调 `(已完成数, 总数, 相对路径)`。
///
/// 条目先全部解到 `dest` 旁的临时目录，整个归档解析成功后才移动到 `dest`。
/// 解析失败时 `dest` 中的已有文件不受影响；移动阶段出错时，
/// 删除本次新建的文件与目录后再返回错误。
pub fn unpack_with_progress<R, F>(reader: R, dest: &Path, on_entry: F) -> Result<Vec<PathBuf>>
where
    R: Read,
    F: FnMut(usize, usize, &str),
{
    let mut created = Created::default();
    match stage_and_commit(reader, dest, on_entry, &mut created) {
        Ok(written) => Ok(written),
        Err(err) => {
            created.rollback();
            Err(err)
        }
    }
}

fn stage_and_commit<R, F>(
    reader: R,
    dest: &Path,
    on_entry: F,
    created: &mut Created,
) -> Result<Vec<PathBuf>>
where
    R: Read,
    F: FnMut(usize, usize, &str),
{
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    created.dirs_for(parent, Path::new(""))?;

    // 与 dest 同目录，保证后续 rename 不跨文件系统；drop 时自动清理
    let staging = tempfile::Builder::new()
        .prefix(".seft-unpack-")
        .tempdir_in(parent)?;
    let entries = extract(reader, staging.path(), on_entry)?;

    created.dirs_for(dest, Path::new(""))?;
    let mut written = Vec::with_capacity(entries.len());
    for rel in entries {
        if let Some(dir) = rel.parent() {
            created.dirs_for(dest, dir)?;
        }
        let target = safe_join(dest, &rel)?;
        let existed = target.exists();
        fs::rename(staging.path().join(&rel), &target)?;
        if !existed {
            created.files.push(target.clone());
        }
        written.push(target);
    }
    Ok(written)
}

/// 解析归档并把全部条目写入空的临时目录，返回各条目的相对路径。
fn extract<R, F>(mut reader: R, root: &Path, mut on_entry: F) -> Result<Vec<PathBuf>>
where
    R: Read,
    F: FnMut(usize, usize, &str),
{
    let total = read_preamble(&mut reader)?;
    // total 来自未校验的输入，不据此预分配
    let mut entries = Vec::new();

    for index in 0..total {
        let (name, rel, data_len) = read_entry_header(&mut reader)?;
        let target = safe_join(root, &rel)?;
        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(SeftError::format("duplicate archive entry"));
            }
            Err(e) => return Err(e.into()),
        };
        copy_entry_data(&mut reader, data_len, &mut file)?;
        file.flush()?;

        debug!(path = %name, bytes = data_len, "unpacked");
        on_entry(index + 1, total, &name);
        entries.push(rel);
    }

    expect_end(&mut reader)?;
    Ok(entries)
}

/// 读取 magic、版本与条目数。
fn read_preamble<R: Read>(reader: &mut R) -> Result<usize> {
    let mut magic = [0u8; 4];
    if read_full(reader, &mut magic)? < magic.len() || &magic != ARCHIVE_MAGIC {
        return Err(SeftError::format("invalid archive magic"));
    }

    let version = read_u32(reader, "archive version")?;
    if version != ARCHIVE_VERSION {
        return Err(SeftError::UnsupportedVersion {
            found: version,
            expected: ARCHIVE_VERSION,
        });
    }

    Ok(read_u32(reader, "entry count")? as usize)
}

/// 读取条目头：原始名称、校验后的相对路径、数据长度。
fn read_entry_header<R: Read>(reader: &mut R) -> Result<(String, PathBuf, u64)> {
    let path_len = read_u32(reader, "entry path length")?;
    if path_len == 0 || path_len > MAX_PATH_LEN {
        return Err(SeftError::format("invalid entry path length"));
    }

    let mut raw = vec![0u8; path_len as usize];
    let got = read_full(reader, &mut raw)?;
    if got < raw.len() {
        return Err(SeftError::Truncated {
            field: "entry path",
            declared: u64::from(path_len),
            available: got as u64,
        });
    }
    let name = String::from_utf8(raw).map_err(|_| SeftError::format("entry path is not UTF-8"))?;
    let rel = sanitize_entry_path(&name)?;

    let data_len = read_u64(reader, "entry length")?;
    Ok((name, rel, data_len))
}

fn copy_entry_data<R: Read, W: Write>(reader: &mut R, data_len: u64, writer: &mut W) -> Result<()> {
    let copied = io::copy(&mut reader.by_ref().take(data_len), writer)?;
    if copied < data_len {
        return Err(SeftError::Truncated {
            field: "entry data",
            declared: data_len,
            available: copied,
        });
    }
    Ok(())
}

fn expect_end<R: Read>(reader: &mut R) -> Result<()> {
    let mut extra = [0u8; 1];
    if read_full(reader, &mut extra)? != 0 {
        return Err(SeftError::format("trailing bytes after the last archive entry"));
    }
    Ok(())
}

/// 本次解包创建的文件与目录，用于失败回滚。
#[derive(Default)]
struct Created {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl Created {
    /// 逐级创建 `root/rel`，只记录原本不存在的目录。
    fn dirs_for(&mut self, root: &Path, rel: &Path) -> io::Result<()> {
        let mut current = root.to_path_buf();
        if !current.exists() {
            fs::create_dir_all(&current)?;
            self.dirs.push(current.clone());
        }

        for comp in rel.components() {
            current.push(comp);
            if !current.exists() {
                fs::create_dir(&current)?;
                self.dirs.push(current.clone());
            }
        }
        Ok(())
    }

    fn rollback(self) {
        for file in self.files.iter().rev() {
            if let Err(e) = fs::remove_file(file) {
                warn!(path = %file.display(), "failed to remove partial file: {e}");
            }
        }
        // 目录按创建的逆序删除，只删空目录
        for dir in self.dirs.iter().rev() {
            let _ = fs::remove_dir(dir);
        }
    }
}

/// 相对路径转为归档中使用的 `/` 分隔形式。
fn to_archive_path(rel: &Path) -> Result<String> {
    let safe = validate_relative_path(rel)?;
    let segments = safe
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or_else(|| SeftError::invalid_input("file name is not valid UTF-8"))
        })
        .collect::<Result<Vec<_>>>()?;

    if segments.is_empty() {
        return Err(SeftError::invalid_input("empty relative path"));
    }
    Ok(segments.join("/"))
}

/// 校验归档中的条目路径，得到平台相关的相对路径。
fn sanitize_entry_path(name: &str) -> Result<PathBuf> {
    let unsafe_path = || SeftError::UnsafePath {
        path: name.to_string(),
    };

    if name.starts_with('/') || name.contains('\\') || name.contains('\0') {
        return Err(unsafe_path());
    }

    let mut rel = PathBuf::new();
    for segment in name.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(unsafe_path());
        }
        rel.push(segment);
    }

    validate_relative_path(&rel).map_err(|_| unsafe_path())
}

/// 校验相对路径仅包含安全组件，防止 `..`、绝对路径、盘符路径等穿越问题。
fn validate_relative_path(rel: &Path) -> Result<PathBuf> {
    let mut safe = PathBuf::new();
    for comp in rel.components() {
        match comp {
            Component::CurDir => {}
            Component::Normal(v) => safe.push(v),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SeftError::UnsafePath {
                    path: rel.display().to_string(),
                });
            }
        }
    }
    Ok(safe)
}

/// 在目标根目录下拼接已校验的相对路径，并再次校验结果不越界。
fn safe_join(root: &Path, rel: &Path) -> Result<PathBuf> {
    let joined = root.join(rel);
    if !joined.starts_with(root) {
        return Err(SeftError::UnsafePath {
            path: joined.display().to_string(),
        });
    }
    Ok(joined)
}

fn read_u32<R: Read>(reader: &mut R, field: &'static str) -> Result<u32> {
    let mut buf = [0u8; 4];
    let n = read_full(reader, &mut buf)?;
    if n < buf.len() {
        return Err(SeftError::Truncated {
            field,
            declared: 4,
            available: n as u64,
        });
    }
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R, field: &'static str) -> Result<u64> {
    let mut buf = [0u8; 8];
    let n = read_full(reader, &mut buf)?;
    if n < buf.len() {
        return Err(SeftError::Truncated {
            field,
            declared: 8,
            available: n as u64,
        });
    }
    Ok(u64::from_le_bytes(buf))
}

fn walkdir_to_io(err: walkdir::Error) -> io::Error {
    err.into()
}
