//! 车道保持控制循环
//!
//! 把视觉管线的车道偏移转换为转向指令，并以固定周期驱动 PWM 执行器：
//!
//! ```text
//! FrameSource → VisionPipeline → SteeringShaper → SharedControlState → ActuatorMapper → PwmDriver
//! ```
//!
//! - [`SteeringShaper`]: 偏移 → 归一化转向指令（增益 + 钳位）
//! - [`ActuatorMapper`]: 归一化指令 → 设备脉宽
//! - [`SharedControlState`]: 单槽最新值邮箱，任务间唯一的共享可变状态
//! - [`PeriodicScheduler`]: 带协作式取消的周期任务调度
//! - [`ControlLoop`]: `Idle → Armed → Running → Stopped` 类型状态机
//!
//! 硬件通过 [`FrameSource`]、[`PwmDriver`]、[`DebugSink`] 注入。

mod command;
mod config;
mod control_loop;
mod debug;
mod device;
mod error;
mod mailbox;
mod mapper;
mod metrics;
mod phase;
pub mod scheduler;
mod shaper;
mod stop;

pub use command::{PulseWidth, SteeringCommand, ThrottleCommand};
pub use config::{ControlConfig, SteeringCalibration, ThrottleCalibration};
pub use control_loop::{
    Armed, ControlHandle, ControlLoop, Idle, LoopReport, RunningLoop, StopReason,
};
pub use debug::DEBUG_JPEG_QUALITY;
pub use device::{DebugSink, FrameSource, PwmDriver};
pub use error::{ControlError, PwmError};
pub use mailbox::{ControlSnapshot, Mailbox, SharedControlState};
pub use mapper::ActuatorMapper;
pub use metrics::{LoopMetrics, MetricsSnapshot};
pub use phase::{AtomicLoopPhase, LoopPhase};
pub use scheduler::{PeriodicScheduler, PeriodicTask, TaskStats};
pub use shaper::{DEFAULT_STEERING_GAIN, SteeringShaper};
pub use stop::{StopGuard, StopSource, StopToken};

/// 重新导出视觉模块，调用方只需依赖本 crate
pub use lanekeep_vision as vision;
