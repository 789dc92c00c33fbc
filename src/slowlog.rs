use std::time::Duration;

/// 毫秒到纳秒的换算系数
pub(crate) const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// 慢查询日志记录
///
/// 表示一条完整的慢查询记录：执行耗时、SQL 语句（可能跨多行）以及
/// 该记录在原始日志流中占用的字节数。
///
/// 记录一旦产出即不可变。`statement` 末尾不包含换行符。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlowLog {
    /// 查询耗时（纳秒精度）
    pub duration: Duration,

    /// SQL 语句文本，多行语句以 `\n` 连接
    pub statement: String,

    /// 起始行与所有继续行的原始字节数之和（包含行结束符）
    pub bytes_read: u64,
}

impl SlowLog {
    /// 以毫秒为单位返回耗时
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1_000.0
    }

    /// 语句的行数
    pub fn line_count(&self) -> usize {
        self.statement.lines().count().max(1)
    }

    /// 判断语句是否跨多行
    pub fn is_multiline(&self) -> bool {
        self.statement.contains('\n')
    }
}

/// 将毫秒数转换为 `Duration`，四舍五入到纳秒
///
/// 负数或非有限值返回 `None`。超出纳秒计数范围的值按秒换算，
/// 仍超出 `Duration` 范围时饱和为 [`Duration::MAX`]。
pub(crate) fn millis_to_duration(ms: f64) -> Option<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return None;
    }
    let nanos = (ms * NANOS_PER_MILLI).round();
    if nanos < u64::MAX as f64 {
        return Some(Duration::from_nanos(nanos as u64));
    }
    Some(Duration::try_from_secs_f64(ms / 1_000.0).unwrap_or(Duration::MAX))
}
