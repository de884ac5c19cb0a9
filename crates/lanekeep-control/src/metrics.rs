//! 控制循环运行指标
//!
//! 原子计数器，运行中可在任意线程读取，不会引入锁竞争。

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// 控制循环实时指标
#[derive(Debug, Default)]
pub struct LoopMetrics {
    /// 视觉管线处理过的帧数
    pub frames_processed: AtomicU64,
    /// 跳过的空帧数
    pub empty_frames: AtomicU64,
    /// 检测到车道的帧数
    pub lanes_detected: AtomicU64,
    /// 未检测到车道的帧数（转向保持不变）
    pub lanes_missed: AtomicU64,
    /// 执行任务完成的周期数
    pub ticks: AtomicU64,
    /// 错过的执行周期数
    ///
    /// 持续增长说明执行任务（通常是 PWM 写入）跟不上周期。
    pub tick_overruns: AtomicU64,
    /// 已发布的调试帧
    pub debug_frames_published: AtomicU64,
    /// 因发布线程忙而丢弃的调试帧
    pub debug_frames_dropped: AtomicU64,
}

impl LoopMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取指标快照
    ///
    /// 各计数器分别读取，彼此之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            empty_frames: self.empty_frames.load(Ordering::Relaxed),
            lanes_detected: self.lanes_detected.load(Ordering::Relaxed),
            lanes_missed: self.lanes_missed.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            tick_overruns: self.tick_overruns.load(Ordering::Relaxed),
            debug_frames_published: self.debug_frames_published.load(Ordering::Relaxed),
            debug_frames_dropped: self.debug_frames_dropped.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub frames_processed: u64,
    pub empty_frames: u64,
    pub lanes_detected: u64,
    pub lanes_missed: u64,
    pub ticks: u64,
    pub tick_overruns: u64,
    pub debug_frames_published: u64,
    pub debug_frames_dropped: u64,
}

impl MetricsSnapshot {
    /// 车道检出率（百分比），未处理任何帧时返回 0.0
    pub fn detection_rate(&self) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        (self.lanes_detected as f64 / self.frames_processed as f64) * 100.0
    }
}
