//! DER 编解码基础工具
//!
//! 只支持日志格式用到的两种类型：SEQUENCE 和 OCTET STRING。
//! 长度采用最短编码（短格式 < 128，长格式 1..=4 个长度字节），不接受不定长编码。

use crate::error::{BaccError, Result};
use std::io::{ErrorKind, Read};

pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_OCTET_STRING: u8 = 0x04;

/// Longest header we produce or accept: tag + 0x84 + four length octets.
pub const MAX_HEADER_LEN: usize = 6;

/// A decoded tag-length header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub tag: u8,
    pub header_len: usize,
    pub content_len: usize,
}

impl Header {
    /// Header plus content.
    pub fn total_len(&self) -> usize {
        self.header_len + self.content_len
    }
}

/// 编码长度字段
pub fn encode_len(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = (len as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

/// 计算给定内容长度的头部长度
pub fn header_len(content_len: usize) -> usize {
    let mut buf = Vec::with_capacity(MAX_HEADER_LEN);
    encode_len(content_len, &mut buf);
    1 + buf.len()
}

/// 写入一个完整的 TLV
pub fn write_tlv(tag: u8, content: &[u8], out: &mut Vec<u8>) {
    out.push(tag);
    encode_len(content.len(), out);
    out.extend_from_slice(content);
}

pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(header_len(content.len()) + content.len());
    write_tlv(tag, content, &mut out);
    out
}

/// 校验长度字节并还原长度值
fn decode_long_len(octets: &[u8]) -> Result<usize> {
    if octets[0] == 0 {
        return Err(BaccError::Format("non-minimal DER length".to_string()));
    }
    let value = octets.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    if value < 0x80 {
        return Err(BaccError::Format("non-minimal DER length".to_string()));
    }
    usize::try_from(value).map_err(|_| BaccError::Format("DER length overflows usize".to_string()))
}

fn long_form_octets(first: u8) -> Result<usize> {
    match first {
        0x80 => Err(BaccError::Format("indefinite DER length".to_string())),
        b if (b & 0x7F) as usize > 4 => Err(BaccError::Format(format!(
            "DER length uses {} octets",
            b & 0x7F
        ))),
        b => Ok((b & 0x7F) as usize),
    }
}

/// 从字节切片解析头部，只要求头部本身完整
pub fn parse_header(bytes: &[u8]) -> Result<Header> {
    if bytes.len() < 2 {
        return Err(BaccError::Format("truncated DER header".to_string()));
    }
    let tag = bytes[0];
    let first = bytes[1];
    if first < 0x80 {
        return Ok(Header {
            tag,
            header_len: 2,
            content_len: first as usize,
        });
    }
    let count = long_form_octets(first)?;
    if bytes.len() < 2 + count {
        return Err(BaccError::Format("truncated DER header".to_string()));
    }
    let content_len = decode_long_len(&bytes[2..2 + count])?;
    Ok(Header {
        tag,
        header_len: 2 + count,
        content_len,
    })
}

/// 从流中读取头部
///
/// 在第一个字节之前遇到 EOF 时返回 `None`，头部读到一半遇到 EOF 则是格式错误。
pub fn read_header<R: Read>(reader: &mut R) -> Result<Option<Header>> {
    let mut first_two = [0u8; 2];
    match reader.read(&mut first_two[..1]) {
        Ok(0) => return Ok(None),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::Interrupted => return read_header(reader),
        Err(e) => return Err(e.into()),
    }
    read_exact_or_format(reader, &mut first_two[1..])?;

    let mut buf = [0u8; MAX_HEADER_LEN];
    buf[..2].copy_from_slice(&first_two);
    let mut filled = 2;
    if first_two[1] >= 0x80 {
        let count = long_form_octets(first_two[1])?;
        read_exact_or_format(reader, &mut buf[2..2 + count])?;
        filled += count;
    }
    parse_header(&buf[..filled]).map(Some)
}

fn read_exact_or_format<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => BaccError::Format("truncated DER header".to_string()),
        _ => BaccError::Io(e),
    })
}

/// Cursor over a DER buffer yielding the content of successive TLVs.
#[derive(Debug, Clone, Copy)]
pub struct DerReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> DerReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    /// Reads one TLV with the expected tag and returns its content.
    pub fn read(&mut self, expected_tag: u8) -> Result<&'a [u8]> {
        let rest = &self.bytes[self.offset..];
        let header = parse_header(rest)?;
        if header.tag != expected_tag {
            return Err(BaccError::Format(format!(
                "unexpected DER tag 0x{:02x} (expected 0x{:02x})",
                header.tag, expected_tag
            )));
        }
        if header.content_len > rest.len() - header.header_len {
            return Err(BaccError::Format(
                "DER length runs past the end of the buffer".to_string(),
            ));
        }
        let start = header.header_len;
        self.offset += header.total_len();
        Ok(&rest[start..start + header.content_len])
    }

    /// Reads an OCTET STRING if one is next.
    pub fn read_optional_octets(&mut self) -> Result<Option<&'a [u8]>> {
        if self.peek_tag() == Some(TAG_OCTET_STRING) {
            self.read(TAG_OCTET_STRING).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Fails if bytes remain after the last read.
    pub fn finish(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(BaccError::Format(format!(
                "{} trailing bytes after DER value",
                self.bytes.len() - self.offset
            )))
        }
    }
}
