use crate::checks::{check_entry, check_first_entry, ValidationReport};
use acc_crypto::{GroupMath, TrustAnchor};
use acc_log::{read_entry_at, EntryScanner};
use common::{BaccError, Result};
use std::fs::File;
use std::path::Path;

/// 顺序验证器
///
/// 状态 i = 1..n 依次推进，遇到第一条被拒绝的记录立即停止。
/// 只在内存中保留上一条快照。
pub struct ChainValidator<'a, G: GroupMath> {
    group: G,
    anchor: &'a dyn TrustAnchor,
}

impl<'a, G: GroupMath> ChainValidator<'a, G> {
    pub fn new(group: G, anchor: &'a dyn TrustAnchor) -> Self {
        Self { group, anchor }
    }

    pub fn validate(&self, path: &Path, expected_name: Option<&str>) -> Result<ValidationReport> {
        let scanner = EntryScanner::new(File::open(path)?)?;
        let level = scanner.level();
        let elem_len = self.group.elem_len(level);
        let mut reader = File::open(path)?;

        let mut prev: Option<Vec<u8>> = None;
        let mut i = 0usize;
        for span in scanner {
            let span = span?;
            i += 1;
            let entry = read_entry_at(&mut reader, span.offset, elem_len, i)?;
            match prev.as_deref() {
                None => check_first_entry(&self.group, level, &entry, expected_name)?,
                Some(prev_acc) => {
                    check_entry(&self.group, self.anchor, level, i, prev_acc, &entry)?
                }
            }
            debug!("entry {} accepted", i);
            prev = Some(entry.acc);
        }

        if i == 0 {
            return Err(BaccError::Format("log has no entries".to_string()));
        }
        info!("chain of {} entries accepted ({})", i, path.display());
        Ok(ValidationReport { level, entries: i })
    }
}
