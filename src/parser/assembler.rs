//! SlowLogAssembler - 将逐行输入组装为 SlowLog
//!
//! 两种状态：空闲（没有进行中的记录）与累积（有一条进行中的记录）。
//! PostgreSQL 日志没有语句结束标记，只有下一条记录的起始行或流结束才能说明
//! 多行语句已经结束，因此记录总是在“下一个边界”到来时才产出。
//!
//! 组装器本身不做 I/O，流式迭代器与实时跟踪器共用它。

use crate::error::ParseError;
use crate::parser::prefix::PrefixPattern;
use crate::slowlog::{SlowLog, millis_to_duration};
use tracing::trace;

/// 慢查询记录组装器
#[derive(Debug, Clone)]
pub struct SlowLogAssembler {
    pattern: PrefixPattern,
    pending: Option<SlowLog>,
}

impl SlowLogAssembler {
    /// 使用已编译的行首模式创建组装器
    pub fn new(pattern: PrefixPattern) -> Self {
        Self {
            pattern,
            pending: None,
        }
    }

    /// 行首模式
    pub fn pattern(&self) -> &PrefixPattern {
        &self.pattern
    }

    /// 是否有进行中的记录
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// 处理一行原始输入（可以包含行结束符）
    ///
    /// 字节数按原始输入计入记录；无效 UTF-8 按替换字符解码后再匹配。
    /// 因本行而结束的上一条记录通过 `emit` 交出。
    ///
    /// # 错误
    ///
    /// 慢查询行的 duration 无法解析时返回 [`ParseError::InvalidDuration`]。
    /// 上一条记录在返回错误之前已经交出；出错的这条记录被丢弃。
    pub fn push_line<F>(&mut self, raw: &[u8], mut emit: F) -> Result<(), ParseError>
    where
        F: FnMut(SlowLog),
    {
        let bytes = raw.len() as u64;
        let decoded = String::from_utf8_lossy(raw);
        let line = trim_line_ending(&decoded);

        if !self.pattern.is_header(line) {
            match self.pending.as_mut() {
                Some(log) => {
                    let continuation = line.strip_prefix('\t').unwrap_or(line);
                    log.statement.push('\n');
                    log.statement.push_str(continuation);
                    log.bytes_read += bytes;
                }
                None => trace!(bytes, "skip continuation line without a record"),
            }
            return Ok(());
        }

        if let Some(log) = self.finish() {
            emit(log);
        }

        let Some(m) = self.pattern.match_slow_log(line) else {
            trace!(bytes, "skip non slow-log line");
            return Ok(());
        };

        let duration = m
            .duration
            .parse::<f64>()
            .ok()
            .and_then(millis_to_duration)
            .ok_or_else(|| ParseError::InvalidDuration {
                value: m.duration.to_string(),
            })?;

        self.pending = Some(SlowLog {
            duration,
            statement: m.statement.to_string(),
            bytes_read: bytes,
        });
        Ok(())
    }

    /// 结束当前记录并返回（流结束或收到停止信号时调用）
    pub fn finish(&mut self) -> Option<SlowLog> {
        let mut log = self.pending.take()?;
        let trimmed = log.statement.trim_end_matches('\n').len();
        log.statement.truncate(trimmed);
        Some(log)
    }
}

/// 去掉行尾的 `\n` 或 `\r\n`
#[inline]
pub(crate) fn trim_line_ending(raw: &str) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> SlowLogAssembler {
        SlowLogAssembler::new(PrefixPattern::compile("%m [%p] ").unwrap())
    }

    fn push(asm: &mut SlowLogAssembler, raw: &str) -> Vec<SlowLog> {
        let mut out = Vec::new();
        asm.push_line(raw.as_bytes(), |log| out.push(log)).unwrap();
        out
    }

    const HEADER: &str =
        "2023-10-08 13:14:26.366 GMT [47] LOG:  duration: 1009.444 ms  statement: SELECT\n";

    #[test]
    fn multi_line_statement_is_flushed_on_next_header() {
        let mut asm = assembler();
        assert!(push(&mut asm, HEADER).is_empty());
        assert!(asm.has_pending());
        assert!(push(&mut asm, "\tpg_sleep(1)\n").is_empty());

        let out = push(
            &mut asm,
            "2023-10-08 13:18:58.636 GMT [28] LOG:  checkpoint starting: time\n",
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].statement, "SELECT\npg_sleep(1)");
        assert_eq!(out[0].duration.as_nanos(), 1_009_444_000);
        assert_eq!(out[0].bytes_read, (HEADER.len() + "\tpg_sleep(1)\n".len()) as u64);
        assert!(!asm.has_pending());
    }

    #[test]
    fn only_one_leading_tab_is_stripped() {
        let mut asm = assembler();
        push(&mut asm, HEADER);
        push(&mut asm, "\t\tFROM t\tx\n");
        let log = asm.finish().unwrap();
        assert_eq!(log.statement, "SELECT\n\tFROM t\tx");
    }

    #[test]
    fn trailing_blank_continuations_are_trimmed_on_finish() {
        let mut asm = assembler();
        push(&mut asm, HEADER);
        push(&mut asm, "\n");
        push(&mut asm, "\n");
        let log = asm.finish().unwrap();
        assert_eq!(log.statement, "SELECT");
        assert_eq!(log.bytes_read, HEADER.len() as u64 + 2);
        assert!(asm.finish().is_none());
    }

    #[test]
    fn continuation_without_record_is_discarded() {
        let mut asm = assembler();
        assert!(push(&mut asm, "some preamble\n").is_empty());
        assert!(!asm.has_pending());
        assert!(asm.finish().is_none());
    }

    #[test]
    fn crlf_terminators_are_not_part_of_statement() {
        let mut asm = assembler();
        let header = HEADER.replace('\n', "\r\n");
        push(&mut asm, &header);
        push(&mut asm, "\tFROM t\r\n");
        let log = asm.finish().unwrap();
        assert_eq!(log.statement, "SELECT\nFROM t");
        assert_eq!(log.bytes_read, (header.len() + "\tFROM t\r\n".len()) as u64);
    }

    #[test]
    fn bad_duration_emits_previous_record_then_fails() {
        let mut asm = assembler();
        push(&mut asm, HEADER);

        let mut out = Vec::new();
        let err = asm
            .push_line(
                b"2023-10-08 13:16:41.488 GMT [59] LOG:  duration: 1.2.3 ms  statement: SELECT 2\n",
                |log| out.push(log),
            )
            .unwrap_err();

        assert!(matches!(err, ParseError::InvalidDuration { ref value } if value == "1.2.3"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].statement, "SELECT");
        assert!(!asm.has_pending());
    }

    #[test]
    fn invalid_utf8_counts_raw_bytes() {
        let mut asm = assembler();
        let mut header = HEADER.trim_end().as_bytes().to_vec();
        header.extend_from_slice(&[b' ', 0xff, 0xfe, b'\n']);
        let continuation = b"\tFROM t\xc3\n";

        let mut out = Vec::new();
        asm.push_line(&header, |log| out.push(log)).unwrap();
        asm.push_line(continuation, |log| out.push(log)).unwrap();
        let log = asm.finish().unwrap();

        assert!(out.is_empty());
        assert_eq!(log.bytes_read, (header.len() + continuation.len()) as u64);
        assert_eq!(log.statement, "SELECT \u{fffd}\u{fffd}\nFROM t\u{fffd}");
    }
}
