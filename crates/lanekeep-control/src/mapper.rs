//! 归一化指令 → 设备脉宽

use crate::command::{PulseWidth, SteeringCommand, ThrottleCommand};
use crate::config::{SteeringCalibration, ThrottleCalibration};

/// 把 `value` 从 `[in_lo, in_hi]` 线性映射到 `[out_lo, out_hi]`
#[inline]
fn rescale(value: f64, in_lo: f64, in_hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    out_lo + (value - in_lo) * (out_hi - out_lo) / (in_hi - in_lo)
}

/// 执行器映射
///
/// - 转向：[-1, 1] → [min, max]，单调递增
/// - 油门：前进 (0, 1] → [neutral, forward_max]，倒车/中立 [-1, 0] → [reverse_max, neutral]
///
/// 两段油门公式在 0 处都得到 `neutral`。输出总是钳位在标定范围内。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorMapper {
    steering: SteeringCalibration,
    throttle: ThrottleCalibration,
}

impl Default for ActuatorMapper {
    fn default() -> Self {
        Self::new(SteeringCalibration::default(), ThrottleCalibration::default())
    }
}

impl ActuatorMapper {
    pub fn new(steering: SteeringCalibration, throttle: ThrottleCalibration) -> Self {
        Self { steering, throttle }
    }

    pub fn steering_pulse(&self, command: SteeringCommand) -> PulseWidth {
        let (lo, hi) = (self.steering.min, self.steering.max);
        let raw = rescale(command.value(), -1.0, 1.0, lo as f64, hi as f64);
        Self::clamp_pulse(raw, lo.min(hi), lo.max(hi))
    }

    pub fn throttle_pulse(&self, command: ThrottleCommand) -> PulseWidth {
        let t = &self.throttle;
        let v = command.value();
        let raw = if v > 0.0 {
            self.forward_branch(v)
        } else {
            self.reverse_branch(v)
        };
        let lo = t.forward_max.min(t.neutral).min(t.reverse_max);
        let hi = t.forward_max.max(t.neutral).max(t.reverse_max);
        Self::clamp_pulse(raw, lo, hi)
    }

    /// 油门中立脉宽（启动与停止时写入）
    pub fn throttle_neutral(&self) -> PulseWidth {
        PulseWidth(self.throttle.neutral)
    }

    fn forward_branch(&self, v: f64) -> f64 {
        let t = &self.throttle;
        rescale(v, 0.0, 1.0, t.neutral as f64, t.forward_max as f64)
    }

    fn reverse_branch(&self, v: f64) -> f64 {
        let t = &self.throttle;
        rescale(v, -1.0, 0.0, t.reverse_max as f64, t.neutral as f64)
    }

    fn clamp_pulse(raw: f64, lo: u16, hi: u16) -> PulseWidth {
        PulseWidth(raw.round().clamp(lo as f64, hi as f64) as u16)
    }
}
