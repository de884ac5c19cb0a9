//! 强类型控制指令
//!
//! 转向和油门都是 [-1.0, 1.0] 的归一化值。构造时保证范围不变式，
//! 之后的任何代码都不需要再检查。
//!
//! ```rust
//! use lanekeep_control::{SteeringCommand, ThrottleCommand};
//!
//! assert_eq!(SteeringCommand::saturating(3.0).value(), 1.0);
//! assert!(ThrottleCommand::try_new(-1.5).is_err());
//! ```

use crate::error::ControlError;
use std::fmt;
use tracing::warn;

macro_rules! normalized_command {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
        pub struct $name(f64);

        impl $name {
            /// 中立值（0.0）
            pub const NEUTRAL: Self = Self(0.0);
            pub const MIN: Self = Self(-1.0);
            pub const MAX: Self = Self(1.0);

            /// 严格构造：非有限值或超出 [-1, 1] 返回 `InvalidCommand`
            pub fn try_new(value: f64) -> Result<Self, ControlError> {
                if value.is_finite() && (-1.0..=1.0).contains(&value) {
                    Ok(Self(value))
                } else {
                    Err(ControlError::InvalidCommand { kind: $kind, value })
                }
            }

            /// 静默钳位（NaN 视为中立）
            pub fn saturating(value: f64) -> Self {
                if value.is_nan() {
                    Self::NEUTRAL
                } else {
                    Self(value.clamp(-1.0, 1.0))
                }
            }

            /// 钳位并记录警告
            ///
            /// 用于外部输入：越界值不会原样下发，但需要留下痕迹。
            pub fn clamped_with_warning(value: f64) -> Self {
                match Self::try_new(value) {
                    Ok(cmd) => cmd,
                    Err(e) => {
                        let clamped = Self::saturating(value);
                        warn!("{}, clamped to {}", e, clamped.0);
                        clamped
                    },
                }
            }

            #[inline]
            pub fn value(self) -> f64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:+.3}", self.0)
            }
        }
    };
}

normalized_command!(
    /// 转向指令，正值表示向右打方向
    SteeringCommand,
    "steering"
);

normalized_command!(
    /// 油门指令，正值前进、负值倒车
    ThrottleCommand,
    "throttle"
);

/// 设备脉宽（PWM 计数单位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PulseWidth(pub u16);

impl PulseWidth {
    #[inline]
    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for PulseWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_new_bounds() {
        assert!(SteeringCommand::try_new(-1.0).is_ok());
        assert!(SteeringCommand::try_new(1.0).is_ok());
        assert!(SteeringCommand::try_new(1.0001).is_err());
        assert!(ThrottleCommand::try_new(f64::NAN).is_err());
        assert!(ThrottleCommand::try_new(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_invalid_command_error_kind() {
        match ThrottleCommand::try_new(2.0) {
            Err(ControlError::InvalidCommand { kind, value }) => {
                assert_eq!(kind, "throttle");
                assert_eq!(value, 2.0);
            },
            other => panic!("Expected InvalidCommand, got {other:?}"),
        }
    }

    #[test]
    fn test_saturating() {
        assert_eq!(SteeringCommand::saturating(-7.0), SteeringCommand::MIN);
        assert_eq!(SteeringCommand::saturating(0.25).value(), 0.25);
        assert_eq!(SteeringCommand::saturating(f64::NAN), SteeringCommand::NEUTRAL);
        assert_eq!(ThrottleCommand::saturating(f64::INFINITY), ThrottleCommand::MAX);
    }

    #[test]
    fn test_clamped_with_warning() {
        assert_eq!(ThrottleCommand::clamped_with_warning(0.5).value(), 0.5);
        assert_eq!(ThrottleCommand::clamped_with_warning(1.5), ThrottleCommand::MAX);
        assert_eq!(ThrottleCommand::clamped_with_warning(-3.0), ThrottleCommand::MIN);
    }

    #[test]
    fn test_default_is_neutral() {
        assert_eq!(SteeringCommand::default(), SteeringCommand::NEUTRAL);
        assert_eq!(ThrottleCommand::default(), ThrottleCommand::NEUTRAL);
    }
}
