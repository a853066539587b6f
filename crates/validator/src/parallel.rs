use crate::checks::{check_entry, check_first_entry, ValidationReport};
use acc_crypto::{GroupMath, TrustAnchor};
use acc_log::read_entry_at;
use common::{BaccError, LogOffset, Result, SecurityLevel};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

/// 工作线程共享的状态，由同一把锁保护
struct WorkState {
    next_index: usize,
    error: Option<BaccError>,
}

/// 一次验证中所有工作线程只读共享的数据
struct Job<'p> {
    path: &'p Path,
    level: SecurityLevel,
    offsets: &'p [LogOffset],
}

/// 并行验证器
///
/// 第一阶段顺序扫描建立偏移索引，并只检查一次第一条记录的名字绑定；
/// 第二阶段工作线程从共享游标领取下标，各自打开文件、各自重新解码前驱快照，
/// 然后独立验证。第 i 条记录的验证只依赖第 i-1 条的字节，不依赖它的验证结果。
pub struct ParallelChainValidator<'a, G: GroupMath> {
    group: G,
    anchor: &'a dyn TrustAnchor,
    threads: Option<usize>,
}

impl<'a, G: GroupMath> ParallelChainValidator<'a, G> {
    pub fn new(group: G, anchor: &'a dyn TrustAnchor) -> Self {
        Self {
            group,
            anchor,
            threads: None,
        }
    }

    /// 线程池大小，`None` 表示逻辑 CPU 个数
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads.filter(|&t| t > 0);
        self
    }

    fn pool_size(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn validate(&self, path: &Path, expected_name: Option<&str>) -> Result<ValidationReport> {
        // 第一阶段：偏移索引 + 名字绑定，必须在任何工作线程启动前完成
        let extracted = acc_log::extract(path, &self.group, true)?;
        let level = extracted.level;
        let n = extracted.n;
        let offsets = extracted.offsets.unwrap_or_default();

        let mut file = File::open(path)?;
        let first = read_entry_at(&mut file, offsets[0], self.group.elem_len(level), 1)?;
        check_first_entry(&self.group, level, &first, expected_name)?;
        drop(file);

        let report = ValidationReport { level, entries: n };
        if n == 1 {
            return Ok(report);
        }

        // 第二阶段
        let workers = self.pool_size().min(n - 1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| BaccError::Concurrency(format!("failed to build worker pool: {}", e)))?;
        debug!("verifying {} entries with {} workers", n - 1, workers);

        let state = Mutex::new(WorkState {
            next_index: 2,
            error: None,
        });
        let job = Job {
            path,
            level,
            offsets: &offsets,
        };
        pool.scope(|scope| {
            for _ in 0..workers {
                let (state, job) = (&state, &job);
                scope.spawn(move |_| self.run_worker(job, state));
            }
        });

        let state = state
            .into_inner()
            .map_err(|_| BaccError::Concurrency("worker state lock poisoned".to_string()))?;
        match state.error {
            Some(e) => Err(e),
            None => {
                info!("chain of {} entries accepted ({})", n, path.display());
                Ok(report)
            }
        }
    }

    fn run_worker(&self, job: &Job<'_>, state: &Mutex<WorkState>) {
        // 每个工作线程使用自己的文件句柄
        let mut file = match File::open(job.path) {
            Ok(file) => file,
            Err(e) => return record_error(state, e.into()),
        };
        loop {
            let i = match claim(state, job.offsets.len()) {
                Ok(Some(i)) => i,
                Ok(None) => break,
                Err(e) => return record_error(state, e),
            };
            if let Err(e) = self.verify_entry(&mut file, job, i) {
                record_error(state, e);
            }
        }
    }

    /// 重新解码第 i-1 条快照，不与其他线程共享
    fn verify_entry(&self, file: &mut File, job: &Job<'_>, i: usize) -> Result<()> {
        let elem_len = self.group.elem_len(job.level);
        let entry = read_entry_at(file, job.offsets[i - 1], elem_len, i)?;
        let prev = read_entry_at(file, job.offsets[i - 2], elem_len, i - 1)?;
        check_entry(&self.group, self.anchor, job.level, i, &prev.acc, &entry)
    }
}

/// 领取下一个待验证的下标；已有错误或全部领取完毕时返回 `None`
fn claim(state: &Mutex<WorkState>, n: usize) -> Result<Option<usize>> {
    let mut guard = state
        .lock()
        .map_err(|_| BaccError::Concurrency("worker state lock poisoned".to_string()))?;
    if guard.error.is_some() || guard.next_index > n {
        return Ok(None);
    }
    let i = guard.next_index;
    guard.next_index += 1;
    Ok(Some(i))
}

/// 只保留第一个错误
fn record_error(state: &Mutex<WorkState>, err: BaccError) {
    match state.lock() {
        Ok(mut guard) => {
            if guard.error.is_none() {
                guard.error = Some(err);
            }
        }
        Err(_) => error!("worker state lock poisoned, dropping error: {}", err),
    }
}
