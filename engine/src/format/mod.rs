//! SEFT 文件格式：容器头、流式密文与目录归档。

pub mod archive;
pub mod header;
pub mod stream;

use std::io::{self, Read};

/// 尽量填满 `buf`，返回实际读取的字节数；小于 `buf.len()` 即表示已到 EOF。
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
