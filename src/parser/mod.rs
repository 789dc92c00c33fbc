//! Parser 模块 - 解析 PostgreSQL 慢查询日志
//!
//! 此模块提供了完整的日志解析功能,包括:
//! - `log_line_prefix` 模板编译
//! - 逐行组装多行语句的状态机
//! - 流式读取（同步迭代器与后台扫描线程）
//! - 便捷 API 函数

mod api;
pub(crate) mod constants;
pub mod assembler;
pub mod prefix;
pub mod scanner;
pub mod slowlog_parser;

pub use api::{
    iter_slow_logs_from_file, parse_slow_logs_from_file, parse_slow_logs_from_files,
    parse_slow_logs_from_string,
};
pub use assembler::SlowLogAssembler;
pub use constants::DEFAULT_LOG_LINE_PREFIX;
pub use prefix::{PrefixPattern, SlowLogMatch};
pub use scanner::{ScanSession, SlowLogScanner};
pub use slowlog_parser::{BytesCounter, SlowLogParser, StopHandle};
