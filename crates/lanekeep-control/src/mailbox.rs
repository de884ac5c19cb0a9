//! 最新值邮箱与共享控制状态
//!
//! 视觉任务（转向）和输入处理（油门）写入，执行任务读取。
//! 每个指令一个单槽寄存器：
//!
//! - 写入是原子替换（last-write-wins，不排队）
//! - 读取无锁（`ArcSwap::load`），可能读到旧值，但不会读到撕裂值
//! - 任何一方都不会在持锁状态下阻塞

use crate::command::{SteeringCommand, ThrottleCommand};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// 单槽最新值邮箱
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: ArcSwap<T>,
}

impl<T> Mailbox<T> {
    pub fn new(initial: T) -> Self {
        Self {
            slot: ArcSwap::from_pointee(initial),
        }
    }

    /// 原子替换为新值
    pub fn publish(&self, value: T) {
        self.slot.store(Arc::new(value));
    }
}

impl<T: Copy> Mailbox<T> {
    /// 读取当前值的副本
    #[inline]
    pub fn latest(&self) -> T {
        **self.slot.load()
    }
}

/// 某一时刻的指令快照
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlSnapshot {
    pub steering: SteeringCommand,
    pub throttle: ThrottleCommand,
}

/// 共享控制状态
///
/// 在任何任务启动之前以中立值初始化。
#[derive(Debug)]
pub struct SharedControlState {
    pub steering: Mailbox<SteeringCommand>,
    pub throttle: Mailbox<ThrottleCommand>,
}

impl Default for SharedControlState {
    fn default() -> Self {
        Self::neutral()
    }
}

impl SharedControlState {
    /// 中立状态（转向 0，油门 0）
    pub fn neutral() -> Self {
        Self {
            steering: Mailbox::new(SteeringCommand::NEUTRAL),
            throttle: Mailbox::new(ThrottleCommand::NEUTRAL),
        }
    }

    /// 读取两个指令
    ///
    /// 两个寄存器分别读取，彼此之间不保证同一时刻，这对控制来说足够。
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            steering: self.steering.latest(),
            throttle: self.throttle.latest(),
        }
    }
}
