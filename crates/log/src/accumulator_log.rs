use crate::codec::{self, LogEntry};
use crate::scanner::{read_entry_at, EntryScanner, EntrySpan};
use crate::snapshot::Snapshot;
use acc_crypto::{name_hash, GroupMath, LogSigner};
use common::{BaccError, LogOffset, Result, SecurityLevel};
use rand_core::{CryptoRng, RngCore};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// `extract` 的结果：级别、最后一条快照、记录数，以及可选的偏移索引
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub level: SecurityLevel,
    pub acc: Vec<u8>,
    pub n: usize,
    pub offsets: Option<Vec<LogOffset>>,
}

impl Extracted {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.level, self.acc.clone())
    }
}

/// 扫描日志文件：只读取各记录的 DER 头部来跳过内容，记录偏移（可选），
/// 最后只完整解码最后一条记录
pub fn extract<G: GroupMath>(path: &Path, group: &G, want_offsets: bool) -> Result<Extracted> {
    let mut scanner = EntryScanner::new(File::open(path)?)?;
    let level = scanner.level();

    let mut n = 0usize;
    let mut last: Option<EntrySpan> = None;
    let mut offsets = if want_offsets { Some(Vec::new()) } else { None };
    for span in scanner.by_ref() {
        let span = span?;
        n += 1;
        if let Some(offsets) = offsets.as_mut() {
            offsets.push(span.offset);
        }
        last = Some(span);
    }
    let last = last.ok_or_else(|| BaccError::Format("log has no entries".to_string()))?;

    let mut file = scanner.into_inner();
    let entry = read_entry_at(&mut file, last.offset, group.elem_len(level), n)?;
    debug!("extracted {} entries from {}", n, path.display());

    Ok(Extracted {
        level,
        acc: entry.acc,
        n,
        offsets,
    })
}

/// 追加写入的目标，失败时可以截断回原长度
trait AppendTarget: Write {
    fn current_len(&self) -> std::io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> std::io::Result<()>;
    fn sync(&mut self) -> std::io::Result<()>;
}

impl AppendTarget for File {
    fn current_len(&self) -> std::io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)?;
        self.sync_all()
    }

    fn sync(&mut self) -> std::io::Result<()> {
        self.sync_all()
    }
}

/// 整条记录要么完整写入并落盘，要么文件恢复到写入前的长度
fn append_or_rollback<T: AppendTarget>(target: &mut T, bytes: &[u8]) -> Result<()> {
    let len_before = target.current_len()?;
    let written = target.write_all(bytes).and_then(|()| target.sync());
    if let Err(e) = written {
        match target.truncate_to(len_before) {
            Ok(()) => warn!("append failed, log restored to {} octets: {}", len_before, e),
            Err(rollback) => error!("failed to roll back partial append: {}", rollback),
        }
        return Err(e.into());
    }
    Ok(())
}

/// 只追加的累加器日志文件
///
/// 文件格式: u16-LE(l) || DER(entry 1) || ... || DER(entry n)
pub struct AccumulatorLog<G: GroupMath> {
    path: PathBuf,
    group: G,
}

impl<G: GroupMath> AccumulatorLog<G> {
    pub fn new(path: impl AsRef<Path>, group: G) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            group,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }


    /// 创建日志并写入第一条记录
    ///
    /// 给定 `name` 时，第一个元素由名字的哈希确定性地生成；否则随机生成。
    /// 已存在的文件不会被覆盖。
    pub fn init<R: RngCore + CryptoRng>(
        &self,
        level: SecurityLevel,
        name: Option<&str>,
        rng: &mut R,
    ) -> Result<()> {
        let element = match name {
            Some(name) => self
                .group
                .init_bound(level, &name_hash(name.as_bytes(), level))?,
            None => self.group.init_unbound(level, rng)?,
        };

        let mut bytes = level.to_header().to_vec();
        bytes.extend(codec::encode(
            &LogEntry::initial(element),
            1,
            self.group.elem_len(level),
        )?);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;

        info!(
            "created accumulator log {} (level {}, {})",
            self.path.display(),
            level,
            if name.is_some() { "name-bound" } else { "unbound" }
        );
        Ok(())
    }

    /// 单次前向扫描，只完整解码最后一条记录
    pub fn extract(&self, want_offsets: bool) -> Result<Extracted> {
        extract(&self.path, &self.group, want_offsets)
    }

    /// 注册一个私钥：计算新快照、加法证明和签名，然后一次性追加
    ///
    /// 所有数据都在内存中准备好后才打开文件追加，出错时文件保持不变。
    /// 返回新的记录数。
    pub fn add_and_sign<R: RngCore + CryptoRng>(
        &self,
        privkey: &[u8],
        signer: &dyn LogSigner,
        rng: &mut R,
    ) -> Result<usize> {
        let Extracted { level, acc, n, .. } = self.extract(false)?;

        let element = self.group.add(level, &acc, privkey)?;
        let mut next = acc.clone();
        next.extend_from_slice(&element);

        let proof = self
            .group
            .prv_add(level, &acc, &next, n, n + 1, privkey, rng)?;
        let sig = signer.sign(&LogEntry::signed_payload(&next, &proof))?;
        let bytes = codec::encode(
            &LogEntry::signed(next, proof, sig),
            n + 1,
            self.group.elem_len(level),
        )?;

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        append_or_rollback(&mut file, &bytes)?;

        info!("appended entry {} to {}", n + 1, self.path.display());
        Ok(n + 1)
    }
}
