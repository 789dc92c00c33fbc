//! 错误类型定义
//!
//! 定义了编译行首模式、扫描日志流过程中可能出现的所有错误类型。

use std::io;
use thiserror::Error;

/// 解析错误类型
///
/// 以下错误均为致命错误：出现后当前扫描立即中止。
/// 行首匹配但不是慢查询的行、以及没有进行中记录时的继续行都不会产生错误。
#[derive(Debug, Error)]
pub enum ParseError {
    /// `log_line_prefix` 无法编译为合法的正则表达式
    #[error("invalid log_line_prefix '{template}': {source}")]
    InvalidPrefix {
        /// 原始模板
        template: String,
        /// 正则编译错误
        #[source]
        source: regex::Error,
    },

    /// 读取底层数据流失败（不包括正常的流结束）
    #[error("failed to read log stream: {0}")]
    IoError(#[from] io::Error),

    /// 慢查询行的 duration 字段不是合法数字
    #[error("invalid duration: '{value}' is not a number of milliseconds")]
    InvalidDuration {
        /// 原始 duration 文本
        value: String,
    },

    /// 文件未找到或无法访问
    #[error("file not found or inaccessible: {path}")]
    FileNotFound {
        /// 文件路径及原因
        path: String,
    },

    /// 扫描线程异常退出
    #[error("scanner thread panicked")]
    ScannerPanicked,
}

impl ParseError {
    /// 判断错误是否由日志内容本身引起（而非 I/O 或配置）
    pub fn is_data_error(&self) -> bool {
        matches!(self, ParseError::InvalidDuration { .. })
    }
}
