//! SlowLogParser - 从 Reader 流式读取并组装 SlowLog
//!
//! 提供了一个迭代器，可以从任何实现了 `Read` trait 的源中逐条读取慢查询记录，
//! 同时统计已读取的字节数，并响应停止信号。

use crate::error::ParseError;
use crate::parser::assembler::SlowLogAssembler;
use crate::parser::prefix::PrefixPattern;
use crate::slowlog::SlowLog;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// 已读取字节数的共享计数器
///
/// 只由扫描方写入，可以在扫描进行中从其他线程读取。数值单调不减。
#[derive(Debug, Clone, Default)]
pub struct BytesCounter(Arc<AtomicU64>);

impl BytesCounter {
    /// 当前累计读取的字节数
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn add(&self, bytes: u64) {
        self.0.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// 停止信号
///
/// 停止是建议性的：扫描方在每次读取一行之前检查一次，
/// 检查到后仍会先交出进行中的记录再结束。
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// 请求停止，不会阻塞
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// 是否已经请求停止
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// 按行读取日志并组装为 SlowLog 的迭代器
///
/// 行以 `\n` 分隔，最后一行可以没有换行符。遇到致命错误时迭代器先交出
/// 已经完整的记录，再返回一次错误，然后结束。
///
/// # 示例
///
/// ```
/// use pg_slowlog_parser::SlowLogParser;
///
/// let log = "2023-10-08 13:14:26.366 GMT [47] LOG:  duration: 1009.444 ms  statement: SELECT\n\tpg_sleep(1)\n";
/// let parser = SlowLogParser::open(log.as_bytes(), "%m [%p] ")?;
///
/// let logs: Vec<_> = parser.collect::<Result<_, _>>()?;
/// assert_eq!(logs.len(), 1);
/// assert_eq!(logs[0].statement, "SELECT\npg_sleep(1)");
/// # Ok::<(), pg_slowlog_parser::ParseError>(())
/// ```
pub struct SlowLogParser<R: Read> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
    assembler: SlowLogAssembler,
    ready: Option<SlowLog>,
    error: Option<ParseError>,
    bytes: BytesCounter,
    stop: StopHandle,
    finished: bool,
}

impl<R: Read> SlowLogParser<R> {
    /// 使用已编译的行首模式创建解析器
    pub fn new(reader: R, pattern: PrefixPattern) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::with_capacity(4096),
            assembler: SlowLogAssembler::new(pattern),
            ready: None,
            error: None,
            bytes: BytesCounter::default(),
            stop: StopHandle::default(),
            finished: false,
        }
    }

    /// 编译 `log_line_prefix` 并创建解析器
    ///
    /// # 错误
    ///
    /// 模板无法编译时立即返回 [`ParseError::InvalidPrefix`]，不会开始读取。
    pub fn open(reader: R, log_line_prefix: &str) -> Result<Self, ParseError> {
        Ok(Self::new(reader, PrefixPattern::compile(log_line_prefix)?))
    }

    /// 累计读取的字节数（包括不属于任何记录的行）
    pub fn bytes_read(&self) -> u64 {
        self.bytes.get()
    }

    /// 字节计数器的共享句柄
    pub fn bytes_counter(&self) -> BytesCounter {
        self.bytes.clone()
    }

    /// 停止信号的共享句柄
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// 请求停止
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// 读取下一行（保留行结束符），返回读取的字节数
    fn read_line(&mut self) -> io::Result<usize> {
        self.buffer.clear();
        let n = self.reader.read_until(b'\n', &mut self.buffer)?;
        self.bytes.add(n as u64);
        Ok(n)
    }

    fn close(&mut self) {
        self.finished = true;
        self.ready = self.assembler.finish();
    }
}

impl<R: Read> Iterator for SlowLogParser<R> {
    type Item = Result<SlowLog, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(log) = self.ready.take() {
                return Some(Ok(log));
            }
            if let Some(err) = self.error.take() {
                self.finished = true;
                return Some(Err(err));
            }
            if self.finished {
                return None;
            }

            if self.stop.is_stopped() {
                debug!(bytes = self.bytes.get(), "stop requested, flushing in-progress record");
                self.close();
                continue;
            }

            match self.read_line() {
                Ok(0) => self.close(),
                Ok(_) => {
                    let ready = &mut self.ready;
                    if let Err(err) = self
                        .assembler
                        .push_line(&self.buffer, |log| *ready = Some(log))
                    {
                        self.error = Some(err);
                    }
                }
                Err(err) => self.error = Some(ParseError::IoError(err)),
            }
        }
    }
}
