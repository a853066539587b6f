/// 日志链验证集成测试
///
/// 顺序验证器和并行验证器在同一批文件上必须给出相同的判定。
use acc_crypto::{generate_key, Anchor, Custodian, Issuer, RistrettoGroup};
use acc_log::{extract, AccumulatorLog};
use common::der::parse_header;
use common::{BaccError, Result, SecurityLevel};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use validator::{ChainValidator, ParallelChainValidator, ValidationReport};

struct Fixture {
    _dir: TempDir,
    path: PathBuf,
    log: AccumulatorLog<RistrettoGroup>,
    issuer: Issuer,
    custodian: Custodian,
    rng: ChaCha20Rng,
}

impl Fixture {
    fn new(seed: u64, level: SecurityLevel, name: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acc.log");
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let issuer = Issuer::generate("root", &mut rng);
        let custodian = Custodian::enroll(&issuer, "custodian", &mut rng);
        let log = AccumulatorLog::new(&path, RistrettoGroup::new());
        log.init(level, name, &mut rng).unwrap();
        Self {
            _dir: dir,
            path,
            log,
            issuer,
            custodian,
            rng,
        }
    }

    fn add(&mut self, count: usize) {
        let level = extract(&self.path, &RistrettoGroup::new(), false).unwrap().level;
        for _ in 0..count {
            let key = generate_key(level, &mut self.rng).unwrap();
            self.log
                .add_and_sign(&key, &self.custodian, &mut self.rng)
                .unwrap();
        }
    }

    fn anchor(&self) -> Anchor {
        self.issuer.anchor()
    }
}

fn validate_both(
    path: &Path,
    anchor: &Anchor,
    name: Option<&str>,
    threads: Option<usize>,
) -> (Result<ValidationReport>, Result<ValidationReport>) {
    let group = RistrettoGroup::new();
    let sequential = ChainValidator::new(group, anchor).validate(path, name);
    let parallel = ParallelChainValidator::new(group, anchor)
        .with_threads(threads)
        .validate(path, name);
    (sequential, parallel)
}

/// 第 `index` 条记录中累加器内容的文件偏移范围
fn acc_range(path: &Path, index: usize) -> std::ops::Range<usize> {
    let extracted = extract(path, &RistrettoGroup::new(), true).unwrap();
    let offsets = extracted.offsets.unwrap();
    let bytes = std::fs::read(path).unwrap();
    let start = offsets[index - 1] as usize;
    let seq = parse_header(&bytes[start..]).unwrap();
    let acc_start = start + seq.header_len;
    let octets = parse_header(&bytes[acc_start..]).unwrap();
    let content = acc_start + octets.header_len;
    content..content + octets.content_len
}

/// 第 `index` 条记录结束处的文件偏移；签名是记录的最后一个字段
fn entry_end(path: &Path, index: usize) -> usize {
    let extracted = extract(path, &RistrettoGroup::new(), true).unwrap();
    let offsets = extracted.offsets.unwrap();
    match offsets.get(index) {
        Some(next) => *next as usize,
        None => std::fs::metadata(path).unwrap().len() as usize,
    }
}

fn flip_byte(path: &Path, offset: usize) {
    let mut bytes = std::fs::read(path).unwrap();
    bytes[offset] ^= 0x01;
    std::fs::write(path, bytes).unwrap();
}

fn is_rejection(err: &BaccError) -> bool {
    matches!(err, BaccError::Crypto(_) | BaccError::Format(_))
}

#[test]
fn test_clean_log_accepted_by_both() {
    println!("\n=== 测试正常日志 ===");
    let mut fx = Fixture::new(1, SecurityLevel::L128, Some("registry"));
    fx.add(6);

    for threads in [None, Some(1), Some(3), Some(64)] {
        let (seq, par) = validate_both(&fx.path, &fx.anchor(), Some("registry"), threads);
        let expected = ValidationReport {
            level: SecurityLevel::L128,
            entries: 7,
        };
        assert_eq!(seq.unwrap(), expected);
        assert_eq!(par.unwrap(), expected);
        println!("✓ threads = {:?}", threads);
    }
}

#[test]
fn test_single_entry_log() {
    let fx = Fixture::new(2, SecurityLevel::L192, None);
    let (seq, par) = validate_both(&fx.path, &fx.anchor(), None, None);
    assert_eq!(seq.unwrap().entries, 1);
    assert_eq!(par.unwrap().entries, 1);
}

#[test]
fn test_tampered_snapshot_rejected() {
    println!("\n=== 测试篡改检测 ===");
    let mut fx = Fixture::new(3, SecurityLevel::L128, None);
    fx.add(4);
    let original = std::fs::read(&fx.path).unwrap();

    // 对每个非最后一条的快照，翻转其中一个字节
    for index in 1..5 {
        let range = acc_range(&fx.path, index);
        for offset in [range.start, range.end - 1] {
            flip_byte(&fx.path, offset);
            let (seq, par) = validate_both(&fx.path, &fx.anchor(), None, Some(4));
            let seq_err = seq.unwrap_err();
            let par_err = par.unwrap_err();
            assert!(is_rejection(&seq_err), "entry {}: {}", index, seq_err);
            assert!(is_rejection(&par_err), "entry {}: {}", index, par_err);
            std::fs::write(&fx.path, &original).unwrap();
        }
        println!("✓ 第 {} 条快照被篡改后拒绝", index);
    }

    let (seq, par) = validate_both(&fx.path, &fx.anchor(), None, Some(4));
    assert!(seq.is_ok() && par.is_ok());
}

#[test]
fn test_tampered_signature_rejected() {
    println!("\n=== 测试签名篡改 ===");
    let mut fx = Fixture::new(9, SecurityLevel::L128, None);
    fx.add(4);
    let original = std::fs::read(&fx.path).unwrap();

    for index in 2..=5 {
        // 记录末尾的 64 个字节是 Ed25519 签名
        flip_byte(&fx.path, entry_end(&fx.path, index) - 3);
        let (seq, par) = validate_both(&fx.path, &fx.anchor(), None, Some(3));
        assert!(matches!(seq, Err(BaccError::Signature(_))), "entry {}: {:?}", index, seq);
        assert!(matches!(par, Err(BaccError::Signature(_))), "entry {}: {:?}", index, par);
        std::fs::write(&fx.path, &original).unwrap();
        println!("✓ 第 {} 条记录的签名被篡改后拒绝", index);
    }
}

#[test]
fn test_name_binding() {
    println!("\n=== 测试名字绑定 ===");
    let mut fx = Fixture::new(4, SecurityLevel::L128, Some("Alice"));
    fx.add(2);

    let (seq, par) = validate_both(&fx.path, &fx.anchor(), Some("Alice"), None);
    assert!(seq.is_ok() && par.is_ok());

    let (seq, par) = validate_both(&fx.path, &fx.anchor(), Some("Bob"), None);
    assert!(matches!(seq, Err(BaccError::NameBinding)));
    assert!(matches!(par, Err(BaccError::NameBinding)));

    // 不检查名字时按首次使用信任
    let (seq, par) = validate_both(&fx.path, &fx.anchor(), None, None);
    assert!(seq.is_ok() && par.is_ok());
    println!("✓ Alice 通过, Bob 被拒绝");
}

#[test]
fn test_foreign_anchor_rejected() {
    let mut fx = Fixture::new(5, SecurityLevel::L256, None);
    fx.add(3);

    let mut rng = ChaCha20Rng::seed_from_u64(55);
    let stranger = Issuer::generate("root", &mut rng).anchor();
    let (seq, par) = validate_both(&fx.path, &stranger, None, Some(2));
    assert!(matches!(seq, Err(BaccError::CertChain(_))));
    assert!(matches!(par, Err(BaccError::CertChain(_))));
}

#[test]
fn test_truncated_log_rejected() {
    let mut fx = Fixture::new(6, SecurityLevel::L128, None);
    fx.add(3);
    let bytes = std::fs::read(&fx.path).unwrap();
    std::fs::write(&fx.path, &bytes[..bytes.len() - 5]).unwrap();

    let (seq, par) = validate_both(&fx.path, &fx.anchor(), None, None);
    assert!(matches!(seq, Err(BaccError::Format(_))));
    assert!(matches!(par, Err(BaccError::Format(_))));
}

#[test]
fn test_snapshots_grow_by_one_element() {
    let mut fx = Fixture::new(7, SecurityLevel::L192, None);
    let group = RistrettoGroup::new();
    let mut previous = extract(&fx.path, &group, false).unwrap();
    for _ in 0..4 {
        fx.add(1);
        let current = extract(&fx.path, &group, false).unwrap();
        assert_eq!(current.n, previous.n + 1);
        assert_eq!(&current.acc[..previous.acc.len()], &previous.acc[..]);
        previous = current;
    }
}

#[test]
fn test_end_to_end_scenario() {
    println!("\n=== 端到端场景 ===");
    let mut fx = Fixture::new(8, SecurityLevel::L128, None);
    fx.add(1);
    let (seq, par) = validate_both(&fx.path, &fx.anchor(), None, None);
    assert!(seq.is_ok() && par.is_ok());
    println!("✓ 两条记录验证通过");

    // 第 10 个字节落在第一条记录的累加器内容中
    let original = std::fs::read(&fx.path).unwrap();
    flip_byte(&fx.path, 10);
    let (seq, par) = validate_both(&fx.path, &fx.anchor(), None, None);
    assert!(is_rejection(&seq.unwrap_err()));
    assert!(is_rejection(&par.unwrap_err()));
    println!("✓ 损坏后被拒绝");

    std::fs::write(&fx.path, &original).unwrap();
    fx.add(1);
    let extracted = extract(&fx.path, &RistrettoGroup::new(), false).unwrap();
    assert_eq!(extracted.level, SecurityLevel::L128);
    assert_eq!(extracted.n, 3);
    let (seq, par) = validate_both(&fx.path, &fx.anchor(), None, None);
    assert_eq!(seq.unwrap().entries, 3);
    assert_eq!(par.unwrap().entries, 3);
    println!("✓ 恢复后继续追加");
}
