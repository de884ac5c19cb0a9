//! 控制循环配置
//!
//! 配置由调用方构造后传入 [`crate::ControlLoop::new`]，库本身不读取文件或环境变量。
//!
//! TOML 示例（所有字段都可省略，省略时使用默认值）：
//!
//! ```toml
//! camera = "0"
//! steering_gain = 7.0
//! tick_period_ms = 100
//! cruise_throttle = 0.2
//!
//! [steering]
//! min = 290
//! max = 490
//!
//! [throttle]
//! forward_max = 300
//! neutral = 350
//! reverse_max = 490
//!
//! [vision]
//! threshold = 100
//! ```

use crate::error::ControlError;
use lanekeep_vision::VisionConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 转向舵机标定：指令 -1 → `min`，+1 → `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringCalibration {
    pub min: u16,
    pub max: u16,
}

impl Default for SteeringCalibration {
    fn default() -> Self {
        Self { min: 290, max: 490 }
    }
}

/// 电调（ESC）油门标定
///
/// 前进方向脉宽减小：+1 → `forward_max`，0 → `neutral`，-1 → `reverse_max`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleCalibration {
    pub forward_max: u16,
    pub neutral: u16,
    pub reverse_max: u16,
}

impl Default for ThrottleCalibration {
    fn default() -> Self {
        Self {
            forward_max: 300,
            neutral: 350,
            reverse_max: 490,
        }
    }
}

/// 控制循环配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// 摄像头标识（设备号或路径，由帧源解释）
    pub camera: String,
    /// 转向增益 K
    pub steering_gain: f64,
    /// 执行周期（毫秒）
    pub tick_period_ms: u64,
    /// 写入油门中立后的等待时间（毫秒），让电调识别中立点
    pub settle_delay_ms: u64,
    /// PWM 频率（Hz）
    pub pwm_frequency_hz: f64,
    pub steering_channel: u8,
    pub throttle_channel: u8,
    /// 启动后的巡航油门
    pub cruise_throttle: f64,
    pub steering: SteeringCalibration,
    pub throttle: ThrottleCalibration,
    pub vision: VisionConfig,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            camera: "0".to_string(),
            steering_gain: crate::shaper::DEFAULT_STEERING_GAIN,
            tick_period_ms: 100,
            settle_delay_ms: 300,
            pwm_frequency_hz: 60.0,
            steering_channel: 1,
            throttle_channel: 0,
            cruise_throttle: 0.0,
            steering: SteeringCalibration::default(),
            throttle: ThrottleCalibration::default(),
            vision: VisionConfig::default(),
        }
    }
}

impl ControlConfig {
    /// 从 TOML 字符串解析（不做校验）
    pub fn from_toml_str(s: &str) -> Result<Self, ControlError> {
        toml::from_str(s).map_err(|e| ControlError::Config(e.to_string()))
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ControlError> {
        toml::to_string_pretty(self).map_err(|e| ControlError::Config(e.to_string()))
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.tick_period_ms == 0 {
            return Err(ControlError::Config(
                "tick_period_ms must be > 0".to_string(),
            ));
        }
        if !self.steering_gain.is_finite() || self.steering_gain < 0.0 {
            return Err(ControlError::Config(format!(
                "steering_gain must be finite and >= 0, got {}",
                self.steering_gain
            )));
        }
        if !self.pwm_frequency_hz.is_finite() || self.pwm_frequency_hz <= 0.0 {
            return Err(ControlError::Config(format!(
                "pwm_frequency_hz must be > 0, got {}",
                self.pwm_frequency_hz
            )));
        }
        if self.steering_channel == self.throttle_channel {
            return Err(ControlError::Config(format!(
                "steering and throttle share channel {}",
                self.steering_channel
            )));
        }
        if !self.cruise_throttle.is_finite() || !(-1.0..=1.0).contains(&self.cruise_throttle) {
            return Err(ControlError::Config(format!(
                "cruise_throttle must be within [-1, 1], got {}",
                self.cruise_throttle
            )));
        }
        if self.steering.min >= self.steering.max {
            return Err(ControlError::Config(format!(
                "steering calibration inverted: min {} >= max {}",
                self.steering.min, self.steering.max
            )));
        }
        let t = &self.throttle;
        let between = (t.forward_max < t.neutral && t.neutral < t.reverse_max)
            || (t.reverse_max < t.neutral && t.neutral < t.forward_max);
        if !between {
            return Err(ControlError::Config(format!(
                "throttle neutral {} must lie strictly between forward_max {} and reverse_max {}",
                t.neutral, t.forward_max, t.reverse_max
            )));
        }
        self.vision.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = ControlConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.tick_period(), Duration::from_millis(100));
        assert_eq!(cfg.settle_delay(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg = ControlConfig::from_toml_str(
            r#"
            cruise_throttle = 0.25
            tick_period_ms = 50

            [throttle]
            neutral = 360

            [vision]
            threshold = 120
            "#,
        )
        .unwrap();
        assert_eq!(cfg.cruise_throttle, 0.25);
        assert_eq!(cfg.tick_period_ms, 50);
        assert_eq!(cfg.throttle.neutral, 360);
        assert_eq!(cfg.throttle.forward_max, 300);
        assert_eq!(cfg.vision.threshold, 120);
        assert_eq!(cfg.vision.blur_kernel, 5);
        assert_eq!(cfg.steering_gain, 7.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let cfg = ControlConfig::default();
        let text = cfg.to_toml_string().unwrap();
        assert!(text.contains("tick_period_ms = 100"));
        assert_eq!(ControlConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn test_malformed_toml() {
        let err = ControlConfig::from_toml_str("tick_period_ms = \"fast\"").unwrap_err();
        assert!(matches!(err, ControlError::Config(_)));
    }

    #[test]
    fn test_validation_failures() {
        let cases: Vec<(&str, ControlConfig)> = vec![
            (
                "zero period",
                ControlConfig {
                    tick_period_ms: 0,
                    ..Default::default()
                },
            ),
            (
                "nan gain",
                ControlConfig {
                    steering_gain: f64::NAN,
                    ..Default::default()
                },
            ),
            (
                "shared channel",
                ControlConfig {
                    throttle_channel: 1,
                    ..Default::default()
                },
            ),
            (
                "cruise out of range",
                ControlConfig {
                    cruise_throttle: 1.2,
                    ..Default::default()
                },
            ),
            (
                "inverted steering",
                ControlConfig {
                    steering: SteeringCalibration { min: 490, max: 290 },
                    ..Default::default()
                },
            ),
            (
                "neutral outside range",
                ControlConfig {
                    throttle: ThrottleCalibration {
                        forward_max: 300,
                        neutral: 500,
                        reverse_max: 490,
                    },
                    ..Default::default()
                },
            ),
        ];

        for (name, cfg) in cases {
            assert!(cfg.validate().is_err(), "case '{name}' should fail");
        }
    }

    #[test]
    fn test_invalid_vision_config_propagates() {
        let mut cfg = ControlConfig::default();
        cfg.vision.blur_kernel = 4;
        assert!(matches!(cfg.validate(), Err(ControlError::Vision(_))));
    }
}
