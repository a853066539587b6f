use common::{BaccError, Result, SecurityLevel};

/// 展平后的累加器快照
///
/// 文件格式: u16-LE(l) || acc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub level: SecurityLevel,
    pub acc: Vec<u8>,
}

impl Snapshot {
    pub fn new(level: SecurityLevel, acc: Vec<u8>) -> Self {
        Self { level, acc }
    }

    /// 元素个数；长度不是 `elem_len` 的正整数倍时报格式错误
    pub fn element_count(&self, elem_len: usize) -> Result<usize> {
        if self.acc.is_empty() || elem_len == 0 || self.acc.len() % elem_len != 0 {
            return Err(BaccError::Format(format!(
                "snapshot of {} octets is not a whole number of {}-octet elements",
                self.acc.len(),
                elem_len
            )));
        }
        Ok(self.acc.len() / elem_len)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + self.acc.len());
        bytes.extend_from_slice(&self.level.to_header());
        bytes.extend_from_slice(&self.acc);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(BaccError::Format("snapshot is missing its header".to_string()));
        }
        let level = SecurityLevel::from_header([bytes[0], bytes[1]])
            .map_err(|e| BaccError::Format(format!("bad snapshot header: {}", e)))?;
        Ok(Self {
            level,
            acc: bytes[2..].to_vec(),
        })
    }
}
