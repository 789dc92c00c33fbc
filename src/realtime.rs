//! 实时慢查询日志解析模块
//!
//! 提供跟踪持续增长的 PostgreSQL 日志文件的功能，支持：
//! - 文件内容变化监控
//! - 从文件末尾、开头或指定字节偏移开始读取
//! - 跨多次读取保持进行中的多行语句
//! - 回调处理每条慢查询
//!
//! 只处理完整的行：文件末尾尚未写完的半行会留到下一次读取。
//!
//! # 示例
//!
//! ```no_run
//! use pg_slowlog_parser::realtime::RealtimeSlowLogParser;
//! use std::time::Duration;
//!
//! let parser = RealtimeSlowLogParser::new("postgresql.log", "%m [%p] ")?;
//!
//! parser.watch_for(Duration::from_secs(60), |log| {
//!     println!("{:?} {}", log.duration, log.statement);
//! })?;
//! # Ok::<(), pg_slowlog_parser::ParseError>(())
//! ```

use crate::error::ParseError;
use crate::parser::assembler::SlowLogAssembler;
use crate::parser::prefix::PrefixPattern;
use crate::parser::slowlog_parser::StopHandle;
use crate::slowlog::SlowLog;
use memchr::{memchr_iter, memrchr};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 每次从文件读取的块大小
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// 等待文件事件的超时，超时后也会检查一次文件长度
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 实时慢查询日志解析器
///
/// 监控指定文件的变化，增量解析新增的日志行
pub struct RealtimeSlowLogParser {
    /// 日志文件路径
    file_path: PathBuf,
    /// 已处理的字节偏移（总是位于行边界）
    position: u64,
    /// 跨读取保持状态的组装器
    assembler: SlowLogAssembler,
}

impl RealtimeSlowLogParser {
    /// 创建新的实时解析器，从文件末尾开始
    ///
    /// # 错误
    ///
    /// 文件不存在返回 [`ParseError::FileNotFound`]，模板无法编译返回
    /// [`ParseError::InvalidPrefix`]。
    pub fn new<P: AsRef<Path>>(path: P, log_line_prefix: &str) -> Result<Self, ParseError> {
        let pattern = PrefixPattern::compile(log_line_prefix)?;
        let file_path = path.as_ref().to_path_buf();
        let position = open(&file_path)?.metadata()?.len();

        Ok(Self {
            file_path,
            position,
            assembler: SlowLogAssembler::new(pattern),
        })
    }

    /// 从文件开头开始解析
    pub fn from_beginning(self) -> Self {
        self.from_offset(0)
    }

    /// 从指定字节偏移开始解析
    ///
    /// 偏移应当位于行边界，即上一次运行结束时的 [`position`](Self::position)
    /// 或 [`BytesCounter::get`](crate::BytesCounter::get) 的值。记录的 `bytes_read`
    /// 之和不含前导噪声与非慢查询行，不能作为续读位置。
    pub fn from_offset(mut self, offset: u64) -> Self {
        self.position = offset;
        self
    }

    /// 当前已处理到的字节偏移
    pub fn position(&self) -> u64 {
        self.position
    }

    /// 是否有尚未结束的记录
    pub fn has_pending(&self) -> bool {
        self.assembler.has_pending()
    }

    /// 结束并返回进行中的记录
    pub fn flush(&mut self) -> Option<SlowLog> {
        self.assembler.finish()
    }

    /// 读取并处理上次位置之后新增的完整行
    ///
    /// 返回本次交给回调的记录数。最后一条记录在下一个起始行出现（或调用
    /// [`flush`](Self::flush)）之前不会交出。文件被截断时先交出进行中的记录，
    /// 再从头开始读取。
    pub fn parse_new_records<F>(&mut self, mut callback: F) -> Result<usize, ParseError>
    where
        F: FnMut(SlowLog),
    {
        let mut file = open(&self.file_path)?;
        let len = file.metadata()?.len();
        let mut emitted = 0;

        if len < self.position {
            warn!(
                path = %self.file_path.display(),
                position = self.position,
                len,
                "log file truncated, restart from beginning"
            );
            if let Some(log) = self.assembler.finish() {
                emitted += 1;
                callback(log);
            }
            self.position = 0;
        }
        if len == self.position {
            return Ok(emitted);
        }

        file.seek(SeekFrom::Start(self.position))?;

        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        let mut carry: Vec<u8> = Vec::new();
        loop {
            let n = match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            carry.extend_from_slice(&chunk[..n]);

            let Some(last) = memrchr(b'\n', &carry) else {
                continue;
            };
            let complete: Vec<u8> = carry.drain(..=last).collect();

            let mut start = 0;
            for end in memchr_iter(b'\n', &complete) {
                self.assembler.push_line(&complete[start..=end], |log| {
                    emitted += 1;
                    callback(log);
                })?;
                self.position += (end + 1 - start) as u64;
                start = end + 1;
            }
        }

        if !carry.is_empty() {
            debug!(bytes = carry.len(), "partial line left for next read");
        }
        Ok(emitted)
    }

    /// 监控文件直到收到停止信号
    ///
    /// 结束前交出进行中的记录。
    pub fn watch<F>(self, stop: &StopHandle, callback: F) -> Result<(), ParseError>
    where
        F: FnMut(SlowLog),
    {
        self.run(|| !stop.is_stopped(), callback)
    }

    /// 监控一段时间后停止
    ///
    /// 结束前交出进行中的记录。
    pub fn watch_for<F>(self, duration: Duration, callback: F) -> Result<(), ParseError>
    where
        F: FnMut(SlowLog),
    {
        let start_time = Instant::now();
        self.run(|| start_time.elapsed() < duration, callback)
    }

    fn run<C, F>(mut self, keep_going: C, mut callback: F) -> Result<(), ParseError>
    where
        C: Fn() -> bool,
        F: FnMut(SlowLog),
    {
        let (tx, rx) = channel();

        // 创建文件监控器
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            Config::default(),
        )
        .map_err(io::Error::other)?;

        watcher
            .watch(&self.file_path, RecursiveMode::NonRecursive)
            .map_err(io::Error::other)?;

        info!(path = %self.file_path.display(), position = self.position, "start watching log file");

        self.parse_new_records(&mut callback)?;

        while keep_going() {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        self.parse_new_records(&mut callback)?;
                    }
                }
                // 超时：部分文件系统不产生事件，主动检查一次
                Err(_) => {
                    self.parse_new_records(&mut callback)?;
                }
            }
        }

        if let Some(log) = self.flush() {
            callback(log);
        }
        info!(path = %self.file_path.display(), position = self.position, "stop watching log file");
        Ok(())
    }
}

fn open(path: &Path) -> Result<File, ParseError> {
    File::open(path).map_err(|e| ParseError::FileNotFound {
        path: format!("{}: {}", path.display(), e),
    })
}
