//! SlowLogScanner - 在独立线程中扫描日志流
//!
//! 扫描线程与调用方通过容量为 0 的同步通道交接记录：扫描线程在交出一条记录后
//! 阻塞，直到调用方取走它，因此任意时刻最多只有一条记录在途，顺序与日志流一致。
//! 扫描结束（流结束、停止或致命错误）后通道关闭，且只关闭一次。

use crate::error::ParseError;
use crate::parser::prefix::PrefixPattern;
use crate::parser::slowlog_parser::{BytesCounter, SlowLogParser, StopHandle};
use crate::slowlog::SlowLog;
use std::io::Read;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// 尚未启动的扫描器
///
/// # 示例
///
/// ```
/// use pg_slowlog_parser::SlowLogScanner;
///
/// let log = "2023-10-08 13:16:41.488 GMT [59] LOG:  duration: 1002.257 ms  statement: SELECT * FROM users;\n";
/// let scanner = SlowLogScanner::open(log.as_bytes(), "%m [%p]")?;
/// let mut session = scanner.start()?;
///
/// let logs: Vec<_> = session.by_ref().collect();
/// assert_eq!(logs[0].statement, "SELECT * FROM users;");
/// assert_eq!(session.bytes_read(), log.len() as u64);
/// session.join()?;
/// # Ok::<(), pg_slowlog_parser::ParseError>(())
/// ```
pub struct SlowLogScanner<R: Read> {
    parser: SlowLogParser<R>,
}

impl<R> SlowLogScanner<R>
where
    R: Read + Send + 'static,
{
    /// 编译 `log_line_prefix` 并绑定数据流
    ///
    /// # 错误
    ///
    /// 模板无法编译时返回 [`ParseError::InvalidPrefix`]，扫描不会开始。
    pub fn open(reader: R, log_line_prefix: &str) -> Result<Self, ParseError> {
        Ok(Self::with_pattern(reader, PrefixPattern::compile(log_line_prefix)?))
    }

    /// 使用已编译的行首模式
    pub fn with_pattern(reader: R, pattern: PrefixPattern) -> Self {
        Self {
            parser: SlowLogParser::new(reader, pattern),
        }
    }

    /// 停止信号句柄，可以在启动前取出并交给其他线程
    pub fn stop_handle(&self) -> StopHandle {
        self.parser.stop_handle()
    }

    /// 字节计数器句柄
    pub fn bytes_counter(&self) -> BytesCounter {
        self.parser.bytes_counter()
    }

    /// 启动扫描线程
    ///
    /// # 错误
    ///
    /// 线程创建失败时返回 [`ParseError::IoError`]。
    pub fn start(self) -> Result<ScanSession, ParseError> {
        let stop = self.parser.stop_handle();
        let bytes = self.parser.bytes_counter();
        let (tx, rx) = mpsc::sync_channel::<SlowLog>(0);
        let parser = self.parser;

        let handle = thread::Builder::new()
            .name("pg-slowlog-scanner".to_string())
            .spawn(move || -> Result<(), ParseError> {
                // tx 在闭包结束时被释放，通道随之关闭
                for result in parser {
                    let log = result.inspect_err(|err| error!(%err, "slow log scan aborted"))?;
                    if tx.send(log).is_err() {
                        debug!("receiver dropped, stop scanning");
                        break;
                    }
                }
                Ok(())
            })?;

        Ok(ScanSession {
            receiver: rx,
            handle,
            stop,
            bytes,
        })
    }
}

/// 正在运行的扫描
///
/// 作为迭代器按日志顺序产出 [`SlowLog`]，通道关闭后结束。通道关闭可能是正常结束，
/// 也可能是因为致命错误而中止，需要通过 [`ScanSession::join`] 区分。
pub struct ScanSession {
    receiver: Receiver<SlowLog>,
    handle: JoinHandle<Result<(), ParseError>>,
    stop: StopHandle,
    bytes: BytesCounter,
}

impl ScanSession {
    /// 请求停止扫描
    ///
    /// 扫描线程在下一次读取前检查到信号，交出进行中的记录后结束。
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// 停止信号句柄
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// 扫描线程累计读取的字节数
    pub fn bytes_read(&self) -> u64 {
        self.bytes.get()
    }

    /// 等待扫描线程结束并返回其结果
    ///
    /// 未取走的记录会被丢弃：接收端先关闭，阻塞中的扫描线程随即退出。
    pub fn join(self) -> Result<(), ParseError> {
        let Self {
            receiver, handle, ..
        } = self;
        drop(receiver);
        handle.join().map_err(|_| ParseError::ScannerPanicked)?
    }
}

impl Iterator for ScanSession {
    type Item = SlowLog;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}
