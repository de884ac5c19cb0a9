//! 调试帧发布线程
//!
//! 视觉任务通过单槽通道 `try_send` 叠加图，发布线程负责 JPEG 编码并交给
//! [`DebugSink`]。通道满时直接丢弃，视觉任务永远不会被调试流阻塞。

use crate::device::DebugSink;
use crate::error::ControlError;
use crate::metrics::LoopMetrics;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use lanekeep_vision::{RgbImage, encode_jpeg};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{trace, warn};

/// 调试帧 JPEG 质量
pub const DEBUG_JPEG_QUALITY: u8 = 75;

/// 视觉任务持有的发布端
///
/// Drop 后发布线程处理完手头的帧即退出。
pub(crate) struct DebugPublisher {
    tx: Sender<RgbImage>,
    metrics: Arc<LoopMetrics>,
}

impl DebugPublisher {
    pub(crate) fn spawn(
        sink: Box<dyn DebugSink>,
        metrics: Arc<LoopMetrics>,
    ) -> Result<(Self, JoinHandle<()>), ControlError> {
        let (tx, rx) = bounded(1);
        let thread_metrics = metrics.clone();
        let handle = thread::Builder::new()
            .name("lanekeep-debug".to_string())
            .spawn(move || publish_loop(rx, sink, thread_metrics))
            .map_err(ControlError::Spawn)?;
        Ok((Self { tx, metrics }, handle))
    }

    /// 提交一帧（不阻塞）
    pub(crate) fn offer(&self, image: RgbImage) {
        match self.tx.try_send(image) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                LoopMetrics::incr(&self.metrics.debug_frames_dropped);
                trace!("debug publisher busy, frame dropped");
            },
            Err(TrySendError::Disconnected(_)) => {
                LoopMetrics::incr(&self.metrics.debug_frames_dropped);
            },
        }
    }
}

fn publish_loop(rx: Receiver<RgbImage>, mut sink: Box<dyn DebugSink>, metrics: Arc<LoopMetrics>) {
    for image in rx.iter() {
        match encode_jpeg(&image, DEBUG_JPEG_QUALITY) {
            Ok(jpeg) => {
                sink.publish(&jpeg);
                LoopMetrics::incr(&metrics.debug_frames_published);
            },
            Err(e) => warn!("failed to encode debug frame: {}", e),
        }
    }
}
