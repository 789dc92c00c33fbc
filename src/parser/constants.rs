//! 解析器使用的常量定义
//!
//! 定义了 `log_line_prefix` 占位符到正则片段的映射表、慢查询日志语法等。

use memchr::memmem;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// `%t` / `%m` / `%s` 输出的时间戳格式，如 `2023-10-08 13:14:26.366 GMT`
pub const TIMESTAMP_PATTERN: &str = r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}[.0-9]* [a-zA-Z]+";

/// 紧跟在行首之后的慢查询语法，捕获 duration 与语句首行
pub const SLOW_LOG_PATTERN: &str = r"LOG:\s+duration:\s+([0-9.]+)\s+ms\s+statement:\s+(.+)";

/// 行首与慢查询语法之间允许的空白
pub const PREFIX_SEPARATOR: &str = r"\s*";

/// PostgreSQL 10 起 `log_line_prefix` 的默认值
pub const DEFAULT_LOG_LINE_PREFIX: &str = "%m [%p] ";

/// 占位符的引导字符
pub const TOKEN_ESCAPE: char = '%';

/// `%q` 之后的部分只对会话进程输出
pub const SESSION_ONLY_MARKER: char = 'q';

/// 占位符（`%` 之后的字符）到正则片段的映射
///
/// 所有占位符都是定长的两字符序列，互不重叠，因此替换结果与遍历顺序无关。
pub static PREFIX_TOKENS: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ('a', r"\S*"),                             // Application name
        ('u', r"\S*"),                             // User name
        ('d', r"\S*"),                             // Database name
        ('r', r"\S*"),                             // Remote host name or IP address, and remote port
        ('h', r"\S*"),                             // Remote host name or IP address
        ('b', r"(?:\S+|\S+ \S+|\S+ \S+ \S+)"),     // Backend type
        ('p', r"\d+"),                             // Process ID
        ('P', r"\d*"),                             // Parallel group leader PID
        ('t', TIMESTAMP_PATTERN),                  // Time stamp without milliseconds
        ('m', TIMESTAMP_PATTERN),                  // Time stamp with milliseconds
        ('n', r"\d+[.0-9]*"),                      // Time stamp with milliseconds (Unix epoch)
        ('i', r"\S*"),                             // Command tag
        ('e', r"\S+"),                             // SQLSTATE error code
        ('c', r"\S+"),                             // Session ID
        ('l', r"\d+"),                             // Log line number per session
        ('s', TIMESTAMP_PATTERN),                  // Process start time stamp
        ('v', r"\S*"),                             // Virtual transaction ID
        ('x', r"\S+"),                             // Transaction ID
        ('Q', r"\d*"),                             // Query identifier
        (SESSION_ONLY_MARKER, ""),                 // Stop here in non-session processes
        (TOKEN_ESCAPE, "%"),                       // Literal %
    ])
});

/// 慢查询行必然包含的关键字，用于在运行完整正则前快速过滤
pub static DURATION_FINDER: Lazy<memmem::Finder<'static>> =
    Lazy::new(|| memmem::Finder::new(b"duration:"));
