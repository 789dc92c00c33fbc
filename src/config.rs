//! PostgreSQL 配置读取
//!
//! 从 `postgresql.conf` 中读取键值对，主要用于取得 `log_line_prefix`。
//!
//! 支持的语法：
//! - 空行与 `#` 开头的注释行
//! - `name = value` 或 `name value`（等号可以省略）
//! - 单引号值，`''` 或 `\'` 表示一个单引号，引号之后的内容忽略
//! - 无引号值到 `#` 为止
//!
//! 参数名不区分大小写；同名参数以最后一次出现为准。

use crate::error::ParseError;
use crate::parser::constants::DEFAULT_LOG_LINE_PREFIX;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;
use tracing::trace;

/// 解析后的 PostgreSQL 配置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgConfig {
    entries: HashMap<String, String>,
}

impl PgConfig {
    /// 从配置文本解析
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();
        for line in content.lines() {
            config.parse_line(line);
        }
        config
    }

    /// 从 Reader 逐行解析
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ParseError> {
        let mut config = Self::default();
        for line in reader.lines() {
            config.parse_line(&line?);
        }
        Ok(config)
    }

    /// 从文件解析
    ///
    /// # 参数
    ///
    /// * `path` - `postgresql.conf` 路径
    ///
    /// # 返回
    ///
    /// * `Ok(PgConfig)` - 解析后的配置
    /// * `Err(ParseError)` - 文件不存在（`FileNotFound`）或读取失败（`IoError`）
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use pg_slowlog_parser::{PgConfig, SlowLogParser};
    /// use std::fs::File;
    ///
    /// let config = PgConfig::from_file("/etc/postgresql/16/main/postgresql.conf")?;
    /// let file = File::open("/var/log/postgresql/postgresql-16-main.log")?;
    /// let parser = SlowLogParser::open(file, config.log_line_prefix())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ParseError::FileNotFound {
            path: format!("{}: {}", path.display(), e),
        })?;
        Self::from_reader(BufReader::new(file))
    }

    fn parse_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }

        let key_end = line
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(line.len());
        let (key, rest) = line.split_at(key_end);
        if key.is_empty() {
            trace!(line, "skip config line without a parameter name");
            return;
        }

        let rest = rest.trim_start();
        let rest = rest.strip_prefix('=').unwrap_or(rest).trim_start();

        self.entries
            .insert(key.to_ascii_lowercase(), parse_value(rest));
    }

    /// 读取参数值（参数名不区分大小写）
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有任何参数
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `log_line_prefix`，未配置时返回 PostgreSQL 的默认值 `%m [%p] `
    pub fn log_line_prefix(&self) -> &str {
        self.get("log_line_prefix")
            .unwrap_or(DEFAULT_LOG_LINE_PREFIX)
    }

    /// `log_min_duration_statement`
    ///
    /// 无单位时按毫秒计算，支持 `us`、`ms`、`s`、`min`、`h`、`d`。
    /// 未配置、为负数（禁用）或无法识别时返回 `None`。
    pub fn log_min_duration_statement(&self) -> Option<Duration> {
        parse_duration_setting(self.get("log_min_duration_statement")?)
    }
}

/// 解析等号之后的值
fn parse_value(raw: &str) -> String {
    let Some(quoted) = raw.strip_prefix('\'') else {
        let end = raw.find('#').unwrap_or(raw.len());
        return raw[..end].trim().to_string();
    };

    let mut value = String::with_capacity(quoted.len());
    let mut chars = quoted.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                value.push('\'');
            }
            '\'' => break,
            '\\' => match chars.peek() {
                Some(&next @ ('\'' | '\\')) => {
                    chars.next();
                    value.push(next);
                }
                _ => value.push(c),
            },
            _ => value.push(c),
        }
    }
    value
}

/// 解析带单位的时间设置，基础单位为毫秒
fn parse_duration_setting(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let number: f64 = number.parse().ok()?;
    if number < 0.0 {
        return None;
    }

    let millis = match unit.trim() {
        "" | "ms" => number,
        "us" => number / 1_000.0,
        "s" => number * 1_000.0,
        "min" => number * 60_000.0,
        "h" => number * 3_600_000.0,
        "d" => number * 86_400_000.0,
        _ => return None,
    };
    crate::slowlog::millis_to_duration(millis)
}
