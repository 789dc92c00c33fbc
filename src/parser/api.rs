//! 便捷 API 函数
//!
//! 提供了一组方便使用的高层 API，用于快速解析慢查询日志。

use crate::error::ParseError;
use crate::parser::prefix::PrefixPattern;
use crate::parser::slowlog_parser::SlowLogParser;
use crate::slowlog::SlowLog;
use rayon::prelude::*;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 从字符串解析所有慢查询记录
///
/// # 参数
///
/// * `content` - 日志文本
/// * `log_line_prefix` - 生成日志时使用的 `log_line_prefix` 模板
///
/// # 返回
///
/// * `Ok(Vec<SlowLog>)` - 按出现顺序排列的全部慢查询记录
/// * `Err(ParseError)` - 模板无法编译，或遇到无法解析的 duration
///
/// # 示例
///
/// ```
/// use pg_slowlog_parser::parse_slow_logs_from_string;
///
/// let log = "2023-10-08 13:14:26.366 GMT [47] LOG:  duration: 1009.444 ms  statement: SELECT 1\n";
/// let logs = parse_slow_logs_from_string(log, "%m [%p] ")?;
/// assert_eq!(logs[0].duration.as_nanos(), 1_009_444_000);
/// # Ok::<(), pg_slowlog_parser::ParseError>(())
/// ```
pub fn parse_slow_logs_from_string(
    content: &str,
    log_line_prefix: &str,
) -> Result<Vec<SlowLog>, ParseError> {
    SlowLogParser::open(content.as_bytes(), log_line_prefix)?.collect()
}

/// 打开文件并返回流式迭代器
///
/// 迭代器逐条读取，不会一次性加载整个文件，适合处理大文件。
///
/// # 参数
///
/// * `path` - 日志文件路径
/// * `log_line_prefix` - 生成日志时使用的 `log_line_prefix` 模板
///
/// # 返回
///
/// * `Ok(SlowLogParser)` - 流式迭代器，迭代项是 `Result<SlowLog, ParseError>`
/// * `Err(ParseError)` - 文件无法打开或模板无法编译
///
/// # 示例
///
/// ```no_run
/// use pg_slowlog_parser::iter_slow_logs_from_file;
///
/// for result in iter_slow_logs_from_file("postgresql.log", "%m [%p] ")? {
///     let log = result?;
///     println!("{:?} {}", log.duration, log.statement);
/// }
/// # Ok::<(), pg_slowlog_parser::ParseError>(())
/// ```
pub fn iter_slow_logs_from_file<P>(
    path: P,
    log_line_prefix: &str,
) -> Result<SlowLogParser<BufReader<File>>, ParseError>
where
    P: AsRef<Path>,
{
    let pattern = PrefixPattern::compile(log_line_prefix)?;
    open_with_pattern(path.as_ref(), &pattern)
}

/// 从文件读取所有慢查询记录
///
/// 遇到第一个致命错误即返回该错误。
pub fn parse_slow_logs_from_file<P>(
    path: P,
    log_line_prefix: &str,
) -> Result<Vec<SlowLog>, ParseError>
where
    P: AsRef<Path>,
{
    iter_slow_logs_from_file(path, log_line_prefix)?.collect()
}

/// 并行解析多个相互独立的日志文件（如按天轮转的日志）
///
/// 行首模板只编译一次，模板无法编译时直接返回错误。每个文件使用自己的解析器，
/// 内层结果与 `paths` 顺序一致。
///
/// # 返回
///
/// * `Ok(Vec<Result<..>>)` - 每个文件一个结果，单个文件失败不影响其他文件
/// * `Err(ParseError)` - 模板无法编译
///
/// # 示例
///
/// ```no_run
/// use pg_slowlog_parser::parse_slow_logs_from_files;
///
/// let paths = ["postgresql-Mon.log", "postgresql-Tue.log"];
/// let results = parse_slow_logs_from_files(&paths, "%m [%p] ")?;
/// for (path, result) in paths.iter().zip(results) {
///     match result {
///         Ok(logs) => println!("{}: {} 条慢查询", path, logs.len()),
///         Err(e) => eprintln!("{}: {}", path, e),
///     }
/// }
/// # Ok::<(), pg_slowlog_parser::ParseError>(())
/// ```
pub fn parse_slow_logs_from_files<P>(
    paths: &[P],
    log_line_prefix: &str,
) -> Result<Vec<Result<Vec<SlowLog>, ParseError>>, ParseError>
where
    P: AsRef<Path> + Sync,
{
    let pattern = PrefixPattern::compile(log_line_prefix)?;

    Ok(paths
        .par_iter()
        .map(|path| -> Result<Vec<SlowLog>, ParseError> {
            open_with_pattern(path.as_ref(), &pattern)?.collect()
        })
        .collect())
}

fn open_with_pattern(
    path: &Path,
    pattern: &PrefixPattern,
) -> Result<SlowLogParser<BufReader<File>>, ParseError> {
    let file = File::open(path).map_err(|e| ParseError::FileNotFound {
        path: format!("{}: {}", path.display(), e),
    })?;
    Ok(SlowLogParser::new(BufReader::new(file), pattern.clone()))
}
