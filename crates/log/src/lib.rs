//! 累加器日志引擎
//!
//! - `codec`: 单条日志记录的 DER 编解码
//! - `scanner`: 按 DER 头部惰性扫描记录边界
//! - `accumulator_log`: init / extract / add_and_sign
//! - `snapshot`: 展平后的累加器快照
//! - `membership`: 基于快照的匿名成员证明

#[macro_use]
extern crate log;

pub mod accumulator_log;
pub mod codec;
pub mod membership;
pub mod scanner;
pub mod snapshot;

pub use accumulator_log::{extract, AccumulatorLog, Extracted};
pub use codec::LogEntry;
pub use scanner::{read_entry_at, EntryScanner, EntrySpan, FILE_HEADER_LEN};
pub use snapshot::Snapshot;
