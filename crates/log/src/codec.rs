//! 日志记录编解码
//!
//! 格式: SEQUENCE { OCTET STRING(acc), OCTET STRING(proof)?, OCTET STRING(sig)? }
//! 第一条记录没有 proof 和 sig，之后每条都必须同时带上两者。

use common::der::{self, DerReader, TAG_OCTET_STRING, TAG_SEQUENCE};
use common::{BaccError, Result};

/// 解码后的一条日志记录，各字段各自持有缓冲区
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub acc: Vec<u8>,
    pub proof: Option<Vec<u8>>,
    pub sig: Option<Vec<u8>>,
}

impl LogEntry {
    pub fn initial(acc: Vec<u8>) -> Self {
        Self {
            acc,
            proof: None,
            sig: None,
        }
    }

    pub fn signed(acc: Vec<u8>, proof: Vec<u8>, sig: Vec<u8>) -> Self {
        Self {
            acc,
            proof: Some(proof),
            sig: Some(sig),
        }
    }

    /// 签名覆盖的数据: acc || proof
    pub fn signed_payload(acc: &[u8], proof: &[u8]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(acc.len() + proof.len());
        payload.extend_from_slice(acc);
        payload.extend_from_slice(proof);
        payload
    }
}

/// 编码第 `n` 条记录
pub fn encode(entry: &LogEntry, n: usize, elem_len: usize) -> Result<Vec<u8>> {
    if n == 0 || entry.acc.len() != n * elem_len {
        return Err(BaccError::Params(format!(
            "entry {} must hold {} accumulator octets, got {}",
            n,
            n * elem_len,
            entry.acc.len()
        )));
    }

    let mut content = Vec::new();
    der::write_tlv(TAG_OCTET_STRING, &entry.acc, &mut content);
    match (n > 1, &entry.proof, &entry.sig) {
        (false, None, None) => {}
        (true, Some(proof), Some(sig)) => {
            der::write_tlv(TAG_OCTET_STRING, proof, &mut content);
            der::write_tlv(TAG_OCTET_STRING, sig, &mut content);
        }
        _ => {
            return Err(BaccError::Params(format!(
                "entry {} must carry a proof and signature exactly when n > 1",
                n
            )))
        }
    }
    Ok(der::tlv(TAG_SEQUENCE, &content))
}

/// 解码第 `n` 条记录，`bytes` 必须恰好是一条记录
pub fn decode(bytes: &[u8], elem_len: usize, n: usize) -> Result<LogEntry> {
    let mut outer = DerReader::new(bytes);
    let content = outer.read(TAG_SEQUENCE)?;
    outer.finish()?;

    let mut fields = DerReader::new(content);
    let acc = fields.read(TAG_OCTET_STRING)?;
    if acc.len() != n * elem_len {
        return Err(BaccError::Format(format!(
            "entry {} holds {} accumulator octets, expected {}",
            n,
            acc.len(),
            n * elem_len
        )));
    }

    let entry = if n > 1 {
        let proof = fields.read(TAG_OCTET_STRING)?;
        let sig = fields.read(TAG_OCTET_STRING)?;
        LogEntry::signed(acc.to_vec(), proof.to_vec(), sig.to_vec())
    } else {
        LogEntry::initial(acc.to_vec())
    };
    fields.finish()?;
    Ok(entry)
}
