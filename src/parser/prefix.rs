//! `log_line_prefix` 编译器
//!
//! 将 PostgreSQL 的 `log_line_prefix` 模板（如 `%m [%p] `）编译为正则表达式，
//! 用于判断一行日志是否为新记录的起始行，并与慢查询语法拼接后一次性提取
//! duration 与语句首行。
//!
//! ```text
//! %m [%p]  ->  ^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}[.0-9]* [a-zA-Z]+ \[\d+\]
//! ```

use crate::error::ParseError;
use crate::parser::constants::{
    DURATION_FINDER, PREFIX_SEPARATOR, PREFIX_TOKENS, SESSION_ONLY_MARKER, SLOW_LOG_PATTERN,
    TOKEN_ESCAPE,
};
use regex::{Regex, RegexBuilder};

/// 一条慢查询起始行中提取出的原始字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowLogMatch<'a> {
    /// duration 文本（毫秒，未解析）
    pub duration: &'a str,
    /// 语句在起始行上的部分
    pub statement: &'a str,
}

/// 编译后的行首模式
#[derive(Debug, Clone)]
pub struct PrefixPattern {
    template: String,
    header: Regex,
    slow_log: Regex,
}

impl PrefixPattern {
    /// 编译 `log_line_prefix` 模板
    ///
    /// # 错误
    ///
    /// 生成的正则无法编译时返回 [`ParseError::InvalidPrefix`]。
    pub fn compile(template: &str) -> Result<Self, ParseError> {
        Self::build(template, None)
    }

    /// 编译模板，并限制编译后正则的大小（字节）
    pub fn with_size_limit(template: &str, size_limit: usize) -> Result<Self, ParseError> {
        Self::build(template, Some(size_limit))
    }

    fn build(template: &str, size_limit: Option<usize>) -> Result<Self, ParseError> {
        let prefix = template_to_pattern(template);

        let compile = |pattern: &str| {
            let mut builder = RegexBuilder::new(pattern);
            if let Some(limit) = size_limit {
                builder.size_limit(limit);
            }
            builder.build().map_err(|source| ParseError::InvalidPrefix {
                template: template.to_string(),
                source,
            })
        };

        let header = compile(&format!("^{prefix}"))?;
        let slow_log = compile(&format!("^{prefix}{PREFIX_SEPARATOR}{SLOW_LOG_PATTERN}"))?;

        Ok(Self {
            template: template.to_string(),
            header,
            slow_log,
        })
    }

    /// 原始模板
    pub fn template(&self) -> &str {
        &self.template
    }

    /// 行首正则的源码
    pub fn as_str(&self) -> &str {
        self.header.as_str()
    }

    /// 判断一行是否以配置的行首开始（即新记录的起始行）
    #[inline]
    pub fn is_header(&self, line: &str) -> bool {
        self.header.is_match(line)
    }

    /// 按“行首 + 慢查询语法”匹配一行
    ///
    /// 行首匹配但消息不是慢查询（如 `checkpoint starting: time`）时返回 `None`。
    pub fn match_slow_log<'l>(&self, line: &'l str) -> Option<SlowLogMatch<'l>> {
        if DURATION_FINDER.find(line.as_bytes()).is_none() {
            return None;
        }
        let caps = self.slow_log.captures(line)?;
        Some(SlowLogMatch {
            duration: caps.get(1)?.as_str(),
            statement: caps.get(2)?.as_str(),
        })
    }
}

/// 将模板转换为（未锚定的）正则源码
///
/// 单遍从左到右扫描：能识别的两字符占位符替换为对应片段，其余字符按字面量转义。
/// 未知的 `%X` 以及末尾孤立的 `%` 均视为字面量。
/// `%q` 之后的部分只在会话进程中输出，因此整体变为可选分组。
pub fn template_to_pattern(template: &str) -> String {
    let mut pattern = String::with_capacity(template.len() * 8);
    let mut literal = String::new();
    let mut session_only_at: Option<usize> = None;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == TOKEN_ESCAPE {
            if let Some((&token, rule)) = chars
                .peek()
                .and_then(|next| PREFIX_TOKENS.get_key_value(next))
            {
                chars.next();
                pattern.push_str(&regex::escape(&literal));
                literal.clear();
                if token == SESSION_ONLY_MARKER {
                    session_only_at.get_or_insert(pattern.len());
                }
                pattern.push_str(rule);
                continue;
            }
        }
        literal.push(c);
    }
    pattern.push_str(&regex::escape(&literal));

    match session_only_at {
        Some(at) if at < pattern.len() => {
            let (head, tail) = pattern.split_at(at);
            format!("{head}(?:{tail})?")
        }
        _ => pattern,
    }
}
