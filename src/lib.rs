//! # PG Slowlog Parser
//!
//! 一个流式的 PostgreSQL 慢查询日志解析器。
//!
//! PostgreSQL 的行首格式由 `log_line_prefix` 配置决定，无法写死，因此解析分两步：
//! 先把模板编译为行首正则，再用它区分“新记录的起始行”与“多行语句的继续行”，
//! 逐行组装出慢查询记录。
//!
//! ## 功能特性
//!
//! - **模板编译**: 支持 `log_line_prefix` 的全部占位符
//! - **流式处理**: 不会一次性加载整个日志，支持同步迭代器与后台扫描线程
//! - **多行语句**: 正确拼接跨行的 SQL 语句
//! - **字节统计**: 每条记录与整个扫描的已读字节数，便于断点续读
//! - **停止信号**: 停止时交出进行中的记录后结束
//!
//! ## 快速开始
//!
//! ### 批量解析
//!
//! ```rust
//! use pg_slowlog_parser::parse_slow_logs_from_string;
//!
//! let log = "2023-10-08 13:14:26.366 GMT [47] LOG:  duration: 1009.444 ms  statement: SELECT\n\tpg_sleep(1)\n";
//! let logs = parse_slow_logs_from_string(log, "%m [%p] ")?;
//!
//! for slowlog in &logs {
//!     println!("耗时: {:?}", slowlog.duration);
//!     println!("SQL: {}", slowlog.statement);
//! }
//! # Ok::<(), pg_slowlog_parser::ParseError>(())
//! ```
//!
//! ### 后台扫描
//!
//! ```rust
//! use pg_slowlog_parser::SlowLogScanner;
//!
//! let log = "2023-10-08 13:16:41.488 GMT [59] LOG:  duration: 1002.257 ms  statement: SELECT 1\n";
//! let mut session = SlowLogScanner::open(log.as_bytes(), "%m [%p] ")?.start()?;
//!
//! for slowlog in session.by_ref() {
//!     println!("{} ({} bytes)", slowlog.statement, slowlog.bytes_read);
//! }
//! // 通道关闭后检查是正常结束还是因错误中止
//! session.join()?;
//! # Ok::<(), pg_slowlog_parser::ParseError>(())
//! ```
//!
//! ### 从配置文件取得行首模板
//!
//! ```rust,no_run
//! use pg_slowlog_parser::{PgConfig, iter_slow_logs_from_file};
//!
//! let config = PgConfig::from_file("/etc/postgresql/16/main/postgresql.conf")?;
//! for result in iter_slow_logs_from_file("postgresql.log", config.log_line_prefix())? {
//!     println!("{}", result?.statement);
//! }
//! # Ok::<(), pg_slowlog_parser::ParseError>(())
//! ```
//!
//! ## 日志格式
//!
//! 以 `log_line_prefix = '%m [%p] '` 为例：
//!
//! ```text
//! 2023-10-08 13:14:26.366 GMT [47] LOG:  duration: 1009.444 ms  statement: SELECT
//! 	pg_sleep(1)
//! 2023-10-08 13:18:58.636 GMT [28] LOG:  checkpoint starting: time
//! ```

pub mod config;
pub mod error;
pub mod parser;
#[cfg(feature = "realtime")]
pub mod realtime;
pub mod slowlog;

pub use config::PgConfig;
pub use error::ParseError;
pub use parser::{
    BytesCounter,
    PrefixPattern,
    ScanSession,
    SlowLogAssembler,
    SlowLogParser,
    SlowLogScanner,
    StopHandle,
    iter_slow_logs_from_file,
    parse_slow_logs_from_file,
    parse_slow_logs_from_files,
    parse_slow_logs_from_string,
};
pub use slowlog::SlowLog;
