//! 日志链验证
//!
//! 检查注册历史本身是否可信：第 i 条记录（i > 1）的加法证明必须对第 i-1 条
//! 快照成立，签名必须能用信任锚验证。第一条记录按首次使用信任（可选地检查名字绑定）。
//!
//! - `ChainValidator`: 顺序遍历
//! - `ParallelChainValidator`: 先顺序建立偏移索引，再用线程池并发验证

#[macro_use]
extern crate log;

pub mod checks;
pub mod parallel;
pub mod sequential;

pub use checks::ValidationReport;
pub use parallel::ParallelChainValidator;
pub use sequential::ChainValidator;
