//! 单条记录的验证规则，顺序和并行验证器共用

use acc_crypto::{name_hash, GroupMath, TrustAnchor};
use acc_log::LogEntry;
use common::{BaccError, Result, SecurityLevel};

/// 被接受的日志链概况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationReport {
    pub level: SecurityLevel,
    pub entries: usize,
}

/// 第一条记录：给定名字时检查绑定，否则直接接受
pub fn check_first_entry<G: GroupMath>(
    group: &G,
    level: SecurityLevel,
    entry: &LogEntry,
    expected_name: Option<&str>,
) -> Result<()> {
    let Some(name) = expected_name else {
        return Ok(());
    };
    let expected = group.init_bound(level, &name_hash(name.as_bytes(), level))?;
    if expected != entry.acc {
        warn!("entry 1 is not bound to '{}'", name);
        return Err(BaccError::NameBinding);
    }
    Ok(())
}

/// 第 `i` 条记录 (i > 1)：加法证明相对 `prev_acc` 成立，签名可由锚验证
pub fn check_entry<G: GroupMath>(
    group: &G,
    anchor: &dyn TrustAnchor,
    level: SecurityLevel,
    i: usize,
    prev_acc: &[u8],
    entry: &LogEntry,
) -> Result<()> {
    let (Some(proof), Some(sig)) = (entry.proof.as_deref(), entry.sig.as_deref()) else {
        return Err(BaccError::Format(format!(
            "entry {} lacks a proof or signature",
            i
        )));
    };

    group
        .vfy_add(level, proof, prev_acc, &entry.acc, i - 1, i)
        .and_then(|()| anchor.verify(&LogEntry::signed_payload(&entry.acc, proof), sig))
        .map_err(|e| {
            warn!("entry {} rejected: {}", i, e);
            e
        })
}
