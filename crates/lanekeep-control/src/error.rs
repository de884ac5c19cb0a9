//! 控制模块错误类型定义

use lanekeep_vision::VisionError;
use thiserror::Error;

/// PWM 驱动错误
#[derive(Error, Debug)]
pub enum PwmError {
    /// 总线 I/O 错误（I2C 等）
    #[error("PWM I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 设备返回的错误
    #[error("PWM device error: {0}")]
    Device(String),

    /// 设备已断开
    #[error("PWM device disconnected")]
    Disconnected,
}

/// 控制模块错误类型
///
/// `NoLaneDetected` 和帧源结束都不是错误：前者在视觉任务内部处理，
/// 后者作为 [`crate::StopReason::StreamEnded`] 上报。
#[derive(Error, Debug)]
pub enum ControlError {
    /// 执行器写入失败（致命：已尝试一次油门回中后中止）
    #[error("Actuator write failed on channel {channel}: {source}")]
    ActuatorWriteFailed {
        channel: u8,
        #[source]
        source: PwmError,
    },

    /// PWM 初始化失败（设置频率等）
    #[error("PWM setup failed: {0}")]
    PwmSetup(#[source] PwmError),

    /// 指令超出 [-1, 1]（会被钳位，不会原样下发）
    #[error("Invalid {kind} command: {value} (must be within [-1, 1])")]
    InvalidCommand { kind: &'static str, value: f64 },

    /// 配置错误
    #[error("Invalid control config: {0}")]
    Config(String),

    /// 视觉管线错误
    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    /// 任务线程 panic
    #[error("Task '{0}' panicked")]
    TaskPanicked(String),

    /// 线程创建失败
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[source] std::io::Error),
}
