//! 匿名成员证明
//!
//! 在展平后的快照上工作，与日志的历史格式无关：
//! - `der`: 已注册私钥对应的成员公钥
//! - `prvder`: 零知识证明调用者持有某个已注册私钥，可选绑定附加数据
//! - `vfyder`: 验证证明，附加数据必须与证明时完全一致

use crate::snapshot::Snapshot;
use acc_crypto::GroupMath;
use common::{BaccError, Result};
use rand_core::{CryptoRng, RngCore};

fn check_snapshot<G: GroupMath>(group: &G, snapshot: &Snapshot) -> Result<usize> {
    snapshot.element_count(group.elem_len(snapshot.level))
}

fn check_key(snapshot: &Snapshot, privkey: &[u8]) -> Result<()> {
    if privkey.len() != snapshot.level.key_len() {
        return Err(BaccError::Params(format!(
            "private key must be {} octets at level {}",
            snapshot.level.key_len(),
            snapshot.level
        )));
    }
    Ok(())
}

pub fn der<G: GroupMath>(group: &G, snapshot: &Snapshot, privkey: &[u8]) -> Result<Vec<u8>> {
    check_snapshot(group, snapshot)?;
    check_key(snapshot, privkey)?;
    group.der(snapshot.level, &snapshot.acc, privkey)
}

pub fn prvder<G: GroupMath, R: RngCore + CryptoRng>(
    group: &G,
    snapshot: &Snapshot,
    privkey: &[u8],
    adata: Option<&[u8]>,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let n = check_snapshot(group, snapshot)?;
    check_key(snapshot, privkey)?;
    let proof = group.prv_der(snapshot.level, &snapshot.acc, privkey, adata, rng)?;
    debug!(
        "membership proof over {} elements ({} octets, adata: {})",
        n,
        proof.len(),
        adata.is_some()
    );
    Ok(proof)
}

pub fn vfyder<G: GroupMath>(
    group: &G,
    snapshot: &Snapshot,
    pubkey: &[u8],
    proof: &[u8],
    adata: Option<&[u8]>,
) -> Result<()> {
    let elem_len = group.elem_len(snapshot.level);
    check_snapshot(group, snapshot)?;
    if pubkey.len() != elem_len {
        return Err(BaccError::Params(format!(
            "membership public key must be {} octets",
            elem_len
        )));
    }
    let result = group.vfy_der(snapshot.level, &snapshot.acc, pubkey, adata, proof);
    if let Err(e) = &result {
        warn!("membership proof rejected: {}", e);
    }
    result
}
