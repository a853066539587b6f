//! 日志记录边界扫描
//!
//! 只读取每条记录的 DER 头部，然后跳过内容，O(n) 时间得到所有记录的
//! `(offset, len)`。扫描器是有限的惰性序列，可以通过 `restart` 重新开始。

use crate::codec::{self, LogEntry};
use common::der::{self, TAG_SEQUENCE};
use common::{BaccError, LogOffset, Result, SecurityLevel};
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};

/// 文件头: u16-LE 安全级别
pub const FILE_HEADER_LEN: u64 = 2;

/// 一条记录在文件中的位置，`len` 包含 DER 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySpan {
    pub offset: LogOffset,
    pub len: u64,
}

pub struct EntryScanner<R> {
    reader: BufReader<R>,
    level: SecurityLevel,
    offset: u64,
    end: u64,
    done: bool,
}

fn format_eof(e: std::io::Error, what: &str) -> BaccError {
    match e.kind() {
        ErrorKind::UnexpectedEof => BaccError::Format(format!("truncated {}", what)),
        _ => BaccError::Io(e),
    }
}

impl<R: Read + Seek> EntryScanner<R> {
    /// 读取文件头，并定位到第一条记录
    pub fn new(mut inner: R) -> Result<Self> {
        let end = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        let mut header = [0u8; FILE_HEADER_LEN as usize];
        inner
            .read_exact(&mut header)
            .map_err(|e| format_eof(e, "file header"))?;
        let level = SecurityLevel::from_header(header)
            .map_err(|e| BaccError::Format(format!("bad file header: {}", e)))?;

        Ok(Self {
            reader: BufReader::new(inner),
            level,
            offset: FILE_HEADER_LEN,
            end,
            done: false,
        })
    }

    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    /// 回到第一条记录重新扫描
    pub fn restart(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(FILE_HEADER_LEN))?;
        self.offset = FILE_HEADER_LEN;
        self.done = false;
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    fn next_span(&mut self) -> Result<Option<EntrySpan>> {
        if self.offset >= self.end {
            return Ok(None);
        }
        let header = match der::read_header(&mut self.reader)? {
            Some(header) => header,
            None => return Ok(None),
        };
        if header.tag != TAG_SEQUENCE {
            return Err(BaccError::Format(format!(
                "entry at offset {} has tag 0x{:02x}, expected SEQUENCE",
                self.offset, header.tag
            )));
        }
        let len = header.total_len() as u64;
        if self.offset + len > self.end {
            return Err(BaccError::Format(format!(
                "entry at offset {} runs past the end of the file",
                self.offset
            )));
        }
        self.reader.seek_relative(header.content_len as i64)?;

        let span = EntrySpan {
            offset: self.offset,
            len,
        };
        self.offset += len;
        Ok(Some(span))
    }
}

impl<R: Read + Seek> Iterator for EntryScanner<R> {
    type Item = Result<EntrySpan>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_span() {
            Ok(Some(span)) => Some(Ok(span)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// 随机访问: 读取并解码从 `offset` 开始的第 `n` 条记录
pub fn read_entry_at<R: Read + Seek>(
    reader: &mut R,
    offset: LogOffset,
    elem_len: usize,
    n: usize,
) -> Result<LogEntry> {
    reader.seek(SeekFrom::Start(offset))?;
    let header = der::read_header(reader)?
        .ok_or_else(|| BaccError::Format(format!("no entry at offset {}", offset)))?;

    let mut buf = vec![0u8; header.total_len()];
    reader.seek(SeekFrom::Start(offset))?;
    reader
        .read_exact(&mut buf)
        .map_err(|e| format_eof(e, "log entry"))?;
    codec::decode(&buf, elem_len, n)
}
