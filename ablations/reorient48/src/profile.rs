//! 算法运行统计.

use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间综合 (以微秒为单位).
    #[inline]
    fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

/// ablation/benchmark 数据统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 无法确定方向等原因跳过的体数据个数.
    skipped: u64,

    /// 处理的体数据个数.
    volumes: u64,

    /// 计时的操作次数 (一次往返重排, 或一次聚类).
    ops: u64,

    /// 结果不满足不变量的操作次数.
    mismatched: u64,

    /// 计时操作花费的总时间.
    op_time: AccTimer,

    /// 整个任务花费的总时间.
    real_time: AccTimer,

    /// 最耗时的一次操作. `None` 表示尚无操作.
    most: Option<Duration>,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            skipped: 0,
            volumes: 0,
            ops: 0,
            mismatched: 0,
            op_time: AccTimer::new(),
            real_time: AccTimer::new(),
            most: None,
        }
    }

    /// 记录一个被跳过的体数据.
    #[inline]
    pub fn count_skipped(&mut self) {
        self.skipped += 1;
    }

    /// 记录一个被处理的体数据.
    #[inline]
    pub fn count_volume(&mut self) {
        self.volumes += 1;
    }

    /// 开始一次操作计时.
    #[inline]
    pub fn op_start(&mut self) {
        self.op_time.start();
    }

    /// 结束一次操作计时. `ok` 表明结果是否满足不变量.
    #[inline]
    pub fn op_elapsed(&mut self, ok: bool) {
        let d = self.op_time.elapsed();
        self.ops += 1;
        if !ok {
            self.mismatched += 1;
        }
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 获得跳过的体数据个数.
    #[inline]
    pub fn get_skipped(&self) -> u64 {
        self.skipped
    }

    /// 获得处理的体数据个数.
    #[inline]
    pub fn get_volumes(&self) -> u64 {
        self.volumes
    }

    /// 获得操作次数.
    #[inline]
    pub fn get_ops(&self) -> u64 {
        self.ops
    }

    /// 获得不满足不变量的操作次数.
    #[inline]
    pub fn get_mismatched(&self) -> u64 {
        self.mismatched
    }

    /// 以微秒为单位获得操作的总花费自然时间.
    #[inline]
    pub fn get_op_time_us(&self) -> u64 {
        self.op_time.get_total_us()
    }

    /// 以微秒为单位获得任务的总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 以微秒为单位获得操作的平均时间.
    #[inline]
    pub fn get_avg_op_time_us(&self) -> Option<f64> {
        match self.ops {
            0 => None,
            ops => Some(self.get_op_time_us() as f64 / ops as f64),
        }
    }

    /// 获取最耗时的一次操作所消耗的时间. 如果不存在操作, 则返回 `None`.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
