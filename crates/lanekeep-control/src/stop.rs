//! 协作式取消
//!
//! 一个 [`StopSource`] 可派生任意多个 [`StopToken`]。`stop()` 之后：
//!
//! - `is_stopped()` 立即返回 true
//! - 所有阻塞在 `wait_deadline()` 的线程立即被唤醒
//!
//! 唤醒机制是丢弃一个从不发送数据的 `Sender`：接收端随即变为 Disconnected，
//! 所以等待是阻塞的，不需要轮询。

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct StopInner {
    stopped: AtomicBool,
    wake_tx: Mutex<Option<Sender<()>>>,
    wake_rx: Receiver<()>,
}

/// 停止信号的发起端（可克隆）
#[derive(Debug, Clone)]
pub struct StopSource {
    inner: Arc<StopInner>,
}

impl Default for StopSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSource {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(StopInner {
                stopped: AtomicBool::new(false),
                wake_tx: Mutex::new(Some(tx)),
                wake_rx: rx,
            }),
        }
    }

    pub fn token(&self) -> StopToken {
        StopToken {
            inner: self.inner.clone(),
        }
    }

    /// 请求停止（幂等）
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        if self.inner.wake_tx.lock().take().is_some() {
            debug!("stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// 返回一个 guard，离开作用域（包括 panic 展开）时请求停止
    pub fn stop_on_drop(&self) -> StopGuard {
        StopGuard {
            source: self.clone(),
        }
    }
}

/// 见 [`StopSource::stop_on_drop`]
#[derive(Debug)]
pub struct StopGuard {
    source: StopSource,
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.source.stop();
    }
}

/// 停止信号的观察端
#[derive(Debug, Clone)]
pub struct StopToken {
    inner: Arc<StopInner>,
}

impl StopToken {
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// 阻塞直到 `deadline` 或收到停止信号
    ///
    /// 返回 true 表示已请求停止。
    pub fn wait_deadline(&self, deadline: Instant) -> bool {
        if self.is_stopped() {
            return true;
        }
        match self.inner.wake_rx.recv_deadline(deadline) {
            Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) | Ok(()) => self.is_stopped(),
        }
    }
}
