//! 控制循环
//!
//! 使用类型状态在编译期约束启动顺序：
//!
//! ```text
//! ControlLoop<Idle> --arm()--> ControlLoop<Armed> --start()--> RunningLoop --join()--> LoopReport
//! ```
//!
//! 运行期间有两个任务线程：
//!
//! - **视觉任务**：阻塞读帧 → 视觉管线 → 检测到车道时发布转向指令，
//!   未检测到时保持原指令；帧源结束时请求停止
//! - **执行任务**：每个周期读取最新的转向/油门，映射为脉宽写入 PWM；
//!   停止时写入一次油门中立，之后不再写入
//!
//! 两个任务只通过 [`SharedControlState`] 通信，PWM 只被执行任务访问。
//!
//! # 示例
//!
//! ```rust,ignore
//! use lanekeep_control::{ControlConfig, ControlLoop};
//!
//! let running = ControlLoop::new(camera, pwm, ControlConfig::default())?
//!     .arm()?
//!     .start()?;
//!
//! let handle = running.handle();
//! handle.set_throttle(0.2);
//!
//! let report = running.join()?;
//! println!("stopped: {}", report.reason);
//! ```

use crate::command::{PulseWidth, ThrottleCommand};
use crate::config::ControlConfig;
use crate::debug::DebugPublisher;
use crate::device::{DebugSink, FrameSource, PwmDriver};
use crate::error::ControlError;
use crate::mailbox::{ControlSnapshot, SharedControlState};
use crate::mapper::ActuatorMapper;
use crate::metrics::{LoopMetrics, MetricsSnapshot};
use crate::phase::{AtomicLoopPhase, LoopPhase};
use crate::scheduler::{PeriodicScheduler, PeriodicTask, TaskExit};
use crate::shaper::SteeringShaper;
use crate::stop::StopSource;
use crossbeam_channel::bounded;
use lanekeep_vision::{LaneEstimate, VisionPipeline};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 等待任务线程退出的上限
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

// ==================== 状态类型（零大小类型）====================

/// 已构造，尚未触碰硬件
pub struct Idle;

/// PWM 已初始化，油门中立已生效
pub struct Armed;

// ==================== 停止原因与报告 ====================

/// 正常停止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 帧源结束
    StreamEnded,
    /// 外部请求停止
    StopRequested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::StreamEnded => f.write_str("frame stream ended"),
            StopReason::StopRequested => f.write_str("stop requested"),
        }
    }
}

/// 控制循环退出报告
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopReport {
    pub reason: StopReason,
    pub metrics: MetricsSnapshot,
}

// ==================== ControlLoop ====================

/// 控制循环
pub struct ControlLoop<S, P, State = Idle> {
    source: S,
    pwm: P,
    config: ControlConfig,
    pipeline: VisionPipeline,
    shaper: SteeringShaper,
    mapper: ActuatorMapper,
    state: Arc<SharedControlState>,
    metrics: Arc<LoopMetrics>,
    phase: Arc<AtomicLoopPhase>,
    debug_sink: Option<Box<dyn DebugSink>>,
    _state: State,
}

impl<S, P, State> ControlLoop<S, P, State> {
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase.get()
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        self.state.snapshot()
    }

    fn transition<Next>(self, next: Next) -> ControlLoop<S, P, Next> {
        ControlLoop {
            source: self.source,
            pwm: self.pwm,
            config: self.config,
            pipeline: self.pipeline,
            shaper: self.shaper,
            mapper: self.mapper,
            state: self.state,
            metrics: self.metrics,
            phase: self.phase,
            debug_sink: self.debug_sink,
            _state: next,
        }
    }
}

impl<S, P> ControlLoop<S, P, Idle>
where
    S: FrameSource + 'static,
    P: PwmDriver + 'static,
{
    /// 创建控制循环（不触碰硬件）
    ///
    /// # 错误
    /// - `ControlError::Config`: 配置校验失败
    /// - `ControlError::Vision`: 视觉参数无效
    pub fn new(source: S, pwm: P, config: ControlConfig) -> Result<Self, ControlError> {
        config.validate()?;
        let pipeline = VisionPipeline::new(config.vision.clone())?;
        let shaper = SteeringShaper::new(config.steering_gain);
        let mapper = ActuatorMapper::new(config.steering, config.throttle);

        Ok(Self {
            source,
            pwm,
            config,
            pipeline,
            shaper,
            mapper,
            state: Arc::new(SharedControlState::neutral()),
            metrics: Arc::new(LoopMetrics::new()),
            phase: Arc::new(AtomicLoopPhase::new(LoopPhase::Idle)),
            debug_sink: None,
            _state: Idle,
        })
    }

    /// 附加调试帧接收端
    pub fn with_debug_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.debug_sink = Some(Box::new(sink));
        self
    }

    /// 初始化执行器
    ///
    /// 设置 PWM 频率 → 写入油门中立 → 等待 settle 时间 → 发布巡航油门。
    pub fn arm(mut self) -> Result<ControlLoop<S, P, Armed>, ControlError> {
        info!(
            "Arming: PWM {} Hz, settle {:?}",
            self.config.pwm_frequency_hz,
            self.config.settle_delay()
        );
        self.pwm
            .set_frequency(self.config.pwm_frequency_hz)
            .map_err(ControlError::PwmSetup)?;

        let channel = self.config.throttle_channel;
        let neutral = self.mapper.throttle_neutral();
        self.pwm
            .set_pulse(channel, neutral)
            .map_err(|source| ControlError::ActuatorWriteFailed { channel, source })?;

        spin_sleep::sleep(self.config.settle_delay());

        let cruise = ThrottleCommand::clamped_with_warning(self.config.cruise_throttle);
        self.state.throttle.publish(cruise);

        self.phase.set(LoopPhase::Armed);
        info!("Armed (cruise throttle {})", cruise);
        Ok(self.transition(Armed))
    }
}

impl<S, P> ControlLoop<S, P, Armed>
where
    S: FrameSource + 'static,
    P: PwmDriver + 'static,
{
    /// 启动视觉任务与执行任务
    pub fn start(self) -> Result<RunningLoop, ControlError> {
        let stop = StopSource::new();

        let (debug_publisher, debug_thread) = match self.debug_sink {
            Some(sink) => {
                let (publisher, handle) = DebugPublisher::spawn(sink, self.metrics.clone())?;
                (Some(publisher), Some(handle))
            },
            None => (None, None),
        };

        // 没有调试接收端时不渲染叠加图
        let pipeline = if debug_publisher.is_some() {
            self.pipeline
        } else {
            self.pipeline.with_overlay(false)
        };

        let vision = VisionTask {
            source: self.source,
            pipeline,
            shaper: self.shaper,
            state: self.state.clone(),
            metrics: self.metrics.clone(),
            debug: debug_publisher,
            stop: stop.clone(),
        };
        let vision_thread = thread::Builder::new()
            .name("lanekeep-vision".to_string())
            .spawn(move || vision.run())
            .map_err(ControlError::Spawn)?;

        let actuation = ActuationTask {
            pwm: self.pwm,
            mapper: self.mapper,
            state: self.state.clone(),
            metrics: self.metrics.clone(),
            steering_channel: self.config.steering_channel,
            throttle_channel: self.config.throttle_channel,
        };
        let mut scheduler = PeriodicScheduler::new(stop.clone());
        if let Err(e) = scheduler.spawn("lanekeep-actuation", self.config.tick_period(), actuation)
        {
            stop.stop();
            return Err(ControlError::Spawn(e));
        }

        self.phase.set(LoopPhase::Running);
        info!(
            "Control loop running (tick period {:?})",
            self.config.tick_period()
        );

        Ok(RunningLoop {
            handle: ControlHandle {
                state: self.state,
                stop,
                metrics: self.metrics,
                phase: self.phase,
            },
            scheduler: Some(scheduler),
            vision_thread: Some(vision_thread),
            debug_thread,
        })
    }
}

// ==================== 运行期 ====================

/// 运行中控制循环的轻量句柄（可克隆，可跨线程）
#[derive(Debug, Clone)]
pub struct ControlHandle {
    state: Arc<SharedControlState>,
    stop: StopSource,
    metrics: Arc<LoopMetrics>,
    phase: Arc<AtomicLoopPhase>,
}

impl ControlHandle {
    /// 发布油门指令（越界值钳位并告警），返回实际发布的值
    pub fn set_throttle(&self, value: f64) -> ThrottleCommand {
        let command = ThrottleCommand::clamped_with_warning(value);
        self.state.throttle.publish(command);
        command
    }

    /// 请求停止（幂等）
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        self.state.snapshot()
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase.get()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// 运行中的控制循环
///
/// Drop 时会请求停止并等待任务退出（执行任务仍会写入油门中立）。
pub struct RunningLoop {
    handle: ControlHandle,
    scheduler: Option<PeriodicScheduler<ControlError>>,
    vision_thread: Option<JoinHandle<StopReason>>,
    debug_thread: Option<JoinHandle<()>>,
}

impl RunningLoop {
    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    pub fn phase(&self) -> LoopPhase {
        self.handle.phase()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.handle.metrics()
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    /// 阻塞直到循环停止（帧源结束、外部停止或执行器故障）
    ///
    /// # 错误
    /// - `ControlError::ActuatorWriteFailed`: PWM 写入失败（已尝试写入油门中立）
    /// - `ControlError::TaskPanicked`: 任务线程 panic
    pub fn join(mut self) -> Result<LoopReport, ControlError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<LoopReport, ControlError> {
        let mut failure: Option<ControlError> = None;

        if let Some(scheduler) = self.scheduler.take() {
            for report in scheduler.join() {
                match report.outcome {
                    Ok(stats) => debug!(
                        "Task '{}' exited: {} ticks, {} overruns",
                        report.name, stats.ticks, stats.overruns
                    ),
                    Err(TaskExit::Failed(e)) => {
                        failure.get_or_insert(e);
                    },
                    Err(TaskExit::Panicked) => {
                        failure.get_or_insert(ControlError::TaskPanicked(report.name));
                    },
                }
            }
        }

        // 执行任务退出后视觉任务也必须退出
        self.handle.stop();

        let mut reason = StopReason::StopRequested;
        if let Some(handle) = self.vision_thread.take() {
            match join_timeout(handle, SHUTDOWN_TIMEOUT) {
                Some(Ok(r)) => reason = r,
                Some(Err(_)) => {
                    error!("Vision task panicked");
                    failure.get_or_insert(ControlError::TaskPanicked(
                        "lanekeep-vision".to_string(),
                    ));
                },
                None => error!(
                    "Vision task did not exit within {:?} (frame source blocked?), detaching",
                    SHUTDOWN_TIMEOUT
                ),
            }
        }

        if let Some(handle) = self.debug_thread.take()
            && !matches!(join_timeout(handle, SHUTDOWN_TIMEOUT), Some(Ok(())))
        {
            warn!("Debug publisher did not shut down cleanly");
        }

        self.handle.phase.set(LoopPhase::Stopped);
        let metrics = self.handle.metrics();

        match failure {
            Some(e) => {
                error!("Control loop aborted: {}", e);
                Err(e)
            },
            None => {
                info!(
                    "Control loop stopped: {} ({} frames, {} ticks)",
                    reason, metrics.frames_processed, metrics.ticks
                );
                Ok(LoopReport { reason, metrics })
            },
        }
    }
}

impl Drop for RunningLoop {
    fn drop(&mut self) {
        if self.scheduler.is_none() && self.vision_thread.is_none() {
            return;
        }
        self.handle.stop();
        if let Err(e) = self.shutdown() {
            error!("Control loop dropped with error: {}", e);
        }
    }
}

/// 带超时的线程 join
///
/// 由看门狗线程执行真正的 join；超时后看门狗继续运行，线程被分离。
fn join_timeout<T: Send + 'static>(
    handle: JoinHandle<T>,
    timeout: Duration,
) -> Option<thread::Result<T>> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(handle.join());
    });
    rx.recv_timeout(timeout).ok()
}

// ==================== 任务 ====================

/// 视觉任务：持续读帧并更新转向
struct VisionTask<S> {
    source: S,
    pipeline: VisionPipeline,
    shaper: SteeringShaper,
    state: Arc<SharedControlState>,
    metrics: Arc<LoopMetrics>,
    debug: Option<DebugPublisher>,
    stop: StopSource,
}

impl<S: FrameSource> VisionTask<S> {
    fn run(mut self) -> StopReason {
        // 无论如何退出（包括 panic），执行任务都要随之停止
        let _guard = self.stop.stop_on_drop();
        let token = self.stop.token();

        loop {
            if token.is_stopped() {
                return StopReason::StopRequested;
            }

            let Some(frame) = self.source.read() else {
                info!("Frame source ended, stopping control loop");
                return StopReason::StreamEnded;
            };

            if token.is_stopped() {
                return StopReason::StopRequested;
            }

            self.process(&frame);
        }
    }

    fn process(&mut self, frame: &lanekeep_vision::Frame) {
        if frame.is_empty() {
            LoopMetrics::incr(&self.metrics.empty_frames);
            trace!("Skipping empty frame");
            return;
        }

        let output = self.pipeline.process(frame);
        LoopMetrics::incr(&self.metrics.frames_processed);

        match output.estimate {
            LaneEstimate::Offset(offset) => {
                let command = self.shaper.shape(offset);
                self.state.steering.publish(command);
                LoopMetrics::incr(&self.metrics.lanes_detected);
                trace!(offset, steering = %command, "Lane detected");
            },
            LaneEstimate::NoLaneDetected => {
                LoopMetrics::incr(&self.metrics.lanes_missed);
                trace!("No lane detected, holding steering");
            },
        }

        if let (Some(debug), Some(overlay)) = (&self.debug, output.overlay) {
            debug.offer(overlay);
        }
    }
}

/// 执行任务：周期性写入脉宽，唯一的 PWM 写入方
struct ActuationTask<P> {
    pwm: P,
    mapper: ActuatorMapper,
    state: Arc<SharedControlState>,
    metrics: Arc<LoopMetrics>,
    steering_channel: u8,
    throttle_channel: u8,
}

impl<P: PwmDriver> ActuationTask<P> {
    fn write(&mut self, channel: u8, width: PulseWidth) -> Result<(), ControlError> {
        self.pwm
            .set_pulse(channel, width)
            .map_err(|source| ControlError::ActuatorWriteFailed { channel, source })
    }
}

impl<P: PwmDriver + 'static> PeriodicTask for ActuationTask<P> {
    type Error = ControlError;

    fn tick(&mut self) -> Result<(), ControlError> {
        let snapshot = self.state.snapshot();
        let steering = self.mapper.steering_pulse(snapshot.steering);
        let throttle = self.mapper.throttle_pulse(snapshot.throttle);

        self.write(self.steering_channel, steering)?;
        self.write(self.throttle_channel, throttle)?;

        LoopMetrics::incr(&self.metrics.ticks);
        trace!(%steering, %throttle, "Actuation tick");
        Ok(())
    }

    fn on_stop(&mut self) -> Result<(), ControlError> {
        let neutral = self.mapper.throttle_neutral();
        info!("Writing neutral throttle ({}) before shutdown", neutral);
        self.write(self.throttle_channel, neutral)
    }

    fn on_fault(&mut self, error: &ControlError) {
        let neutral = self.mapper.throttle_neutral();
        match self.pwm.set_pulse(self.throttle_channel, neutral) {
            Ok(()) => warn!("Neutral throttle written after fault: {}", error),
            Err(e) => error!("Best-effort neutral throttle write failed: {}", e),
        }
    }

    fn on_overrun(&mut self, missed: u64) {
        self.metrics
            .tick_overruns
            .fetch_add(missed, Ordering::Relaxed);
    }
}
