//! 偏移 → 转向指令

use crate::command::SteeringCommand;

/// 默认转向增益
pub const DEFAULT_STEERING_GAIN: f64 = 7.0;

/// 转向整形器
///
/// `shape(offset) = clamp(offset * -gain, -1, 1)`。
/// 标线在中线右侧（正偏移）时向反方向打方向。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringShaper {
    gain: f64,
}

impl Default for SteeringShaper {
    fn default() -> Self {
        Self::new(DEFAULT_STEERING_GAIN)
    }
}

impl SteeringShaper {
    pub fn new(gain: f64) -> Self {
        Self { gain }
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    #[inline]
    pub fn shape(&self, offset: f64) -> SteeringCommand {
        SteeringCommand::saturating(offset * -self.gain)
    }
}
