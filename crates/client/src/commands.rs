//! 子命令实现
//!
//! 每个函数对应一个子命令，随机数源由调用方注入。

use crate::files::{read_bytes, read_hex_secret, write_bytes, write_hex_secret, write_new};
use anyhow::{bail, Context, Result};
use blind_accumulator_toolkit::acc_crypto::{
    generate_key, Anchor, Certificate, Custodian, Issuer, RistrettoGroup,
};
use blind_accumulator_toolkit::acc_log::{membership, AccumulatorLog, Snapshot};
use blind_accumulator_toolkit::common::SecurityLevel;
use blind_accumulator_toolkit::validator::{
    ChainValidator, ParallelChainValidator, ValidationReport,
};
use rand::{CryptoRng, RngCore};
use std::path::Path;

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    Ok(Snapshot::from_bytes(&read_bytes(path)?)?)
}

fn read_adata(path: Option<&Path>) -> Result<Option<Vec<u8>>> {
    path.map(read_bytes).transpose()
}

pub fn init<R: RngCore + CryptoRng>(
    log_path: &Path,
    level: SecurityLevel,
    name: Option<&str>,
    force: bool,
    rng: &mut R,
) -> Result<()> {
    if !log_path.exists() {
        AccumulatorLog::new(log_path, RistrettoGroup::new()).init(level, name, rng)?;
    } else if force {
        replace_log(log_path, level, name, rng)?;
    } else {
        bail!("{} already exists (use --force to replace it)", log_path.display());
    }
    println!("✅ Created {} (level {})", log_path.display(), level);
    Ok(())
}

/// 先在同目录的临时文件中创建新日志，成功后再替换旧日志
fn replace_log<R: RngCore + CryptoRng>(
    log_path: &Path,
    level: SecurityLevel,
    name: Option<&str>,
    rng: &mut R,
) -> Result<()> {
    let file_name = log_path
        .file_name()
        .with_context(|| format!("{} is not a file path", log_path.display()))?;
    let tmp = log_path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    if tmp.is_file() {
        std::fs::remove_file(&tmp)
            .with_context(|| format!("failed to remove stale {}", tmp.display()))?;
    }

    let created = AccumulatorLog::new(&tmp, RistrettoGroup::new())
        .init(level, name, rng)
        .map_err(anyhow::Error::from)
        .and_then(|()| {
            std::fs::rename(&tmp, log_path)
                .with_context(|| format!("failed to replace {}", log_path.display()))
        });
    if created.is_err() && tmp.is_file() {
        let _ = std::fs::remove_file(&tmp);
    }
    created
}

pub fn add<R: RngCore + CryptoRng>(
    log_path: &Path,
    key: &Path,
    signer: &Path,
    cert: &Path,
    rng: &mut R,
) -> Result<usize> {
    let privkey = read_hex_secret(key)?;
    let cert = Certificate::from_der(&read_bytes(cert)?)?;
    let custodian = Custodian::new(&read_hex_secret(signer)?, cert)?;

    let n = AccumulatorLog::new(log_path, RistrettoGroup::new())
        .add_and_sign(&privkey, &custodian, rng)?;
    println!("✅ Registered key as entry {}", n);
    Ok(n)
}

pub fn validate(
    log_path: &Path,
    anchor: &Path,
    name: Option<&str>,
    threads: Option<usize>,
    sequential: bool,
) -> Result<ValidationReport> {
    let anchor = Anchor::from_der(&read_bytes(anchor)?)?;
    let group = RistrettoGroup::new();
    let report = if sequential {
        ChainValidator::new(group, &anchor).validate(log_path, name)
    } else {
        ParallelChainValidator::new(group, &anchor)
            .with_threads(threads)
            .validate(log_path, name)
    };
    let report = report.map_err(|e| {
        println!("❌ Log rejected: {} ({})", e, e.code());
        e
    })?;
    println!(
        "✅ Log accepted: {} entries at level {}",
        report.entries, report.level
    );
    Ok(report)
}

pub fn extract(log_path: &Path, offsets: bool, out: Option<&Path>) -> Result<()> {
    let extracted = AccumulatorLog::new(log_path, RistrettoGroup::new()).extract(offsets)?;
    println!("level:   {}", extracted.level);
    println!("entries: {}", extracted.n);
    if let Some(offsets) = &extracted.offsets {
        for (i, offset) in offsets.iter().enumerate() {
            println!("  entry {:>4} @ {}", i + 1, offset);
        }
    }
    match out {
        Some(out) => {
            write_bytes(out, &extracted.snapshot().to_bytes())?;
            println!("✅ Snapshot written to {}", out.display());
        }
        None => println!("acc:     {}", hex::encode(&extracted.acc)),
    }
    Ok(())
}

pub fn der(acc: &Path, key: &Path, out: Option<&Path>) -> Result<()> {
    let snapshot = read_snapshot(acc)?;
    let pubkey = membership::der(&RistrettoGroup::new(), &snapshot, &read_hex_secret(key)?)?;
    match out {
        Some(out) => {
            write_bytes(out, &pubkey)?;
            println!("✅ Membership public key written to {}", out.display());
        }
        None => println!("{}", hex::encode(&pubkey)),
    }
    Ok(())
}

pub fn prvder<R: RngCore + CryptoRng>(
    acc: &Path,
    key: &Path,
    adata: Option<&Path>,
    out: &Path,
    rng: &mut R,
) -> Result<()> {
    let snapshot = read_snapshot(acc)?;
    let adata = read_adata(adata)?;
    let proof = membership::prvder(
        &RistrettoGroup::new(),
        &snapshot,
        &read_hex_secret(key)?,
        adata.as_deref(),
        rng,
    )?;
    write_bytes(out, &proof)?;
    println!("✅ Membership proof written to {}", out.display());
    Ok(())
}

pub fn vfyder(acc: &Path, pubkey: &Path, proof: &Path, adata: Option<&Path>) -> Result<()> {
    let snapshot = read_snapshot(acc)?;
    let adata = read_adata(adata)?;
    membership::vfyder(
        &RistrettoGroup::new(),
        &snapshot,
        &read_bytes(pubkey)?,
        &read_bytes(proof)?,
        adata.as_deref(),
    )
    .map_err(|e| {
        println!("❌ Membership proof rejected: {} ({})", e, e.code());
        e
    })?;
    println!("✅ Membership proof verified");
    Ok(())
}

pub fn keygen<R: RngCore + CryptoRng>(level: SecurityLevel, out: &Path, rng: &mut R) -> Result<()> {
    let key = generate_key(level, rng)?;
    write_hex_secret(out, &key)?;
    println!("✅ {}-octet key written to {}", key.len(), out.display());
    Ok(())
}

pub fn anchor<R: RngCore + CryptoRng>(
    name: &str,
    key_out: &Path,
    anchor_out: &Path,
    rng: &mut R,
) -> Result<()> {
    let issuer = Issuer::generate(name, rng);
    write_hex_secret(key_out, &issuer.secret())?;
    write_new(anchor_out, &issuer.anchor().to_der())?;
    println!("✅ Trust anchor '{}' written to {}", name, anchor_out.display());
    Ok(())
}

pub fn certify<R: RngCore + CryptoRng>(
    issuer_key: &Path,
    issuer_name: &str,
    subject: &str,
    key_out: &Path,
    cert_out: &Path,
    rng: &mut R,
) -> Result<()> {
    let issuer = Issuer::from_secret(issuer_name, &read_hex_secret(issuer_key)?)?;
    let custodian = Custodian::enroll(&issuer, subject, rng);
    write_hex_secret(key_out, &custodian.secret())?;
    write_new(cert_out, &custodian.certificate().to_der())?;
    println!(
        "✅ Certificate for '{}' issued by '{}' written to {}",
        subject,
        issuer_name,
        cert_out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blind_accumulator_toolkit::common::BaccError;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_command_workflow() {
        println!("\n=== 测试命令行流程 ===");
        let dir = tempfile::tempdir().unwrap();
        let p = |name: &str| dir.path().join(name);
        let mut rng = ChaCha20Rng::seed_from_u64(77);

        anchor("root", &p("issuer.hex"), &p("anchor.der"), &mut rng).unwrap();
        certify(
            &p("issuer.hex"),
            "root",
            "custodian",
            &p("custodian.hex"),
            &p("custodian.cert"),
            &mut rng,
        )
        .unwrap();
        println!("✓ 信任锚和证书");

        init(&p("acc.log"), SecurityLevel::L192, Some("registry"), false, &mut rng).unwrap();
        assert!(init(&p("acc.log"), SecurityLevel::L192, None, false, &mut rng).is_err());

        for key in ["alice.hex", "bob.hex"] {
            keygen(SecurityLevel::L192, &p(key), &mut rng).unwrap();
            add(
                &p("acc.log"),
                &p(key),
                &p("custodian.hex"),
                &p("custodian.cert"),
                &mut rng,
            )
            .unwrap();
        }
        println!("✓ 注册两个私钥");

        let report = validate(&p("acc.log"), &p("anchor.der"), Some("registry"), Some(2), false).unwrap();
        assert_eq!(report.entries, 3);
        validate(&p("acc.log"), &p("anchor.der"), Some("registry"), None, true).unwrap();
        let err = validate(&p("acc.log"), &p("anchor.der"), Some("other"), None, true).unwrap_err();
        assert!(matches!(err.downcast_ref::<BaccError>(), Some(BaccError::NameBinding)));
        println!("✓ 日志验证");

        extract(&p("acc.log"), true, Some(&p("acc.snap"))).unwrap();
        std::fs::write(p("adata"), b"ballot 7").unwrap();
        der(&p("acc.snap"), &p("bob.hex"), Some(&p("bob.pub"))).unwrap();
        prvder(&p("acc.snap"), &p("bob.hex"), Some(&p("adata")), &p("bob.proof"), &mut rng).unwrap();
        vfyder(&p("acc.snap"), &p("bob.pub"), &p("bob.proof"), Some(&p("adata"))).unwrap();
        assert!(vfyder(&p("acc.snap"), &p("bob.pub"), &p("bob.proof"), None).is_err());
        println!("✓ 成员证明");

        // --force 重新创建日志
        init(&p("acc.log"), SecurityLevel::L128, None, true, &mut rng).unwrap();
        let err = validate(&p("acc.log"), &p("anchor.der"), Some("registry"), None, false).unwrap_err();
        assert!(matches!(err.downcast_ref::<BaccError>(), Some(BaccError::NameBinding)));
    }

    #[test]
    fn test_failed_force_init_keeps_old_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("acc.log");
        let mut rng = ChaCha20Rng::seed_from_u64(79);
        init(&log, SecurityLevel::L128, Some("registry"), false, &mut rng).unwrap();
        let before = std::fs::read(&log).unwrap();

        // 临时路径被目录占用，新日志无法创建
        std::fs::create_dir(dir.path().join(".acc.log.tmp")).unwrap();
        assert!(init(&log, SecurityLevel::L256, None, true, &mut rng).is_err());
        assert_eq!(std::fs::read(&log).unwrap(), before);

        std::fs::remove_dir(dir.path().join(".acc.log.tmp")).unwrap();
        init(&log, SecurityLevel::L256, None, true, &mut rng).unwrap();
        assert_ne!(std::fs::read(&log).unwrap(), before);
        assert!(!dir.path().join(".acc.log.tmp").exists());
    }

    #[test]
    fn test_add_with_foreign_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let p = |name: &str| dir.path().join(name);
        let mut rng = ChaCha20Rng::seed_from_u64(78);

        anchor("root", &p("issuer.hex"), &p("anchor.der"), &mut rng).unwrap();
        anchor("root", &p("rogue.hex"), &p("rogue.der"), &mut rng).unwrap();
        certify(&p("rogue.hex"), "root", "c", &p("c.hex"), &p("c.cert"), &mut rng).unwrap();

        init(&p("acc.log"), SecurityLevel::L128, None, false, &mut rng).unwrap();
        keygen(SecurityLevel::L128, &p("k.hex"), &mut rng).unwrap();
        add(&p("acc.log"), &p("k.hex"), &p("c.hex"), &p("c.cert"), &mut rng).unwrap();

        let err = validate(&p("acc.log"), &p("anchor.der"), None, None, false).unwrap_err();
        assert!(matches!(err.downcast_ref::<BaccError>(), Some(BaccError::CertChain(_))));
        validate(&p("acc.log"), &p("rogue.der"), None, None, true).unwrap();
    }
}
