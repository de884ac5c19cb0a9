//! 外部设备接口
//!
//! 控制循环通过这三个 trait 与外界交互，具体实现（摄像头、PCA9685 等）由调用方注入。

use crate::command::PulseWidth;
use crate::error::PwmError;
use lanekeep_vision::Frame;

/// 帧源
///
/// `read()` 阻塞直到下一帧可用；返回 `None` 表示流已永久结束。
/// 视觉任务只在两次 `read()` 之间检查停止信号，因此实现应在有限时间内返回
/// （摄像头按帧率返回即可满足）。
pub trait FrameSource: Send {
    fn read(&mut self) -> Option<Frame>;
}

/// PWM 驱动
///
/// 只有执行任务（以及启动阶段的 [`crate::ControlLoop::arm`]）会调用。
pub trait PwmDriver: Send {
    fn set_frequency(&mut self, hz: f64) -> Result<(), PwmError>;

    fn set_pulse(&mut self, channel: u8, width: PulseWidth) -> Result<(), PwmError>;
}

/// 调试帧接收端（可选）
///
/// 在独立线程上调用，接收 JPEG 编码后的叠加图。
pub trait DebugSink: Send {
    fn publish(&mut self, jpeg: &[u8]);
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read(&mut self) -> Option<Frame> {
        (**self).read()
    }
}

impl<T: PwmDriver + ?Sized> PwmDriver for Box<T> {
    fn set_frequency(&mut self, hz: f64) -> Result<(), PwmError> {
        (**self).set_frequency(hz)
    }

    fn set_pulse(&mut self, channel: u8, width: PulseWidth) -> Result<(), PwmError> {
        (**self).set_pulse(channel, width)
    }
}

impl<T: DebugSink + ?Sized> DebugSink for Box<T> {
    fn publish(&mut self, jpeg: &[u8]) {
        (**self).publish(jpeg)
    }
}
