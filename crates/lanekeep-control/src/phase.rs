//! 控制循环阶段
//!
//! 类型状态（[`crate::ControlLoop`] 的 `Idle`/`Armed` 标记）在编译期约束转换顺序，
//! 这里的原子阶段值用于在任意线程观察当前所处阶段。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 控制循环阶段：`Idle → Armed → Running → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LoopPhase {
    /// 已构造，尚未触碰硬件
    #[default]
    Idle = 0,
    /// PWM 已初始化，油门中立已写入并等待完毕
    Armed = 1,
    /// 视觉任务与执行任务正在运行
    Running = 2,
    /// 两个任务都已退出，不会再有任何写入
    Stopped = 3,
}

impl LoopPhase {
    /// 从 u8 转换
    ///
    /// 无效值视为 Stopped。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Armed,
            2 => Self::Running,
            _ => Self::Stopped,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// 阶段（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicLoopPhase {
    inner: AtomicU8,
}

impl AtomicLoopPhase {
    pub fn new(phase: LoopPhase) -> Self {
        Self {
            inner: AtomicU8::new(phase.as_u8()),
        }
    }

    pub fn get(&self) -> LoopPhase {
        LoopPhase::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, phase: LoopPhase) {
        self.inner.store(phase.as_u8(), Ordering::Release);
    }
}
