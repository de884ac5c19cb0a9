//! 控制循环集成测试的模拟硬件
//!
//! - `ScriptedSource`: 按固定节奏返回预设帧的帧源
//! - `RecordingPwm`: 记录所有写入（含写入时刻）的 PWM 驱动，可注入故障

#![allow(dead_code)]

use lanekeep_control::vision::{Frame, Rgb, RgbImage};
use lanekeep_control::{ControlConfig, FrameSource, PulseWidth, PwmDriver, PwmError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const FRAME_WIDTH: u32 = 80;
pub const FRAME_HEIGHT: u32 = 60;

/// PWM 写入事件
#[derive(Debug, Clone, PartialEq)]
pub enum PwmEvent {
    Frequency(f64),
    Pulse { channel: u8, width: u16 },
}

#[derive(Debug, Default)]
struct PwmLog {
    events: Vec<PwmEvent>,
    /// 与 `events` 一一对应的写入时刻
    times: Vec<Instant>,
    fail_frequency: bool,
    fail_channel: Option<u8>,
}

/// 记录写入的 PWM 驱动（克隆共享同一份记录）
#[derive(Debug, Clone, Default)]
pub struct RecordingPwm {
    log: Arc<Mutex<PwmLog>>,
}

impl RecordingPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PwmEvent> {
        self.log.lock().unwrap().events.clone()
    }

    pub fn timed_events(&self) -> Vec<(Instant, PwmEvent)> {
        let log = self.log.lock().unwrap();
        log.times.iter().copied().zip(log.events.iter().cloned()).collect()
    }

    pub fn pulses_on(&self, channel: u8) -> Vec<u16> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PwmEvent::Pulse { channel: c, width } if c == channel => Some(width),
                _ => None,
            })
            .collect()
    }

    pub fn fail_frequency(&self) {
        self.log.lock().unwrap().fail_frequency = true;
    }

    pub fn fail_writes_on(&self, channel: u8) {
        self.log.lock().unwrap().fail_channel = Some(channel);
    }
}

impl PwmDriver for RecordingPwm {
    fn set_frequency(&mut self, hz: f64) -> Result<(), PwmError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_frequency {
            return Err(PwmError::Device("PCA9685 not responding".to_string()));
        }
        log.events.push(PwmEvent::Frequency(hz));
        log.times.push(Instant::now());
        Ok(())
    }

    fn set_pulse(&mut self, channel: u8, width: PulseWidth) -> Result<(), PwmError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_channel == Some(channel) {
            return Err(PwmError::Disconnected);
        }
        log.events.push(PwmEvent::Pulse {
            channel,
            width: width.get(),
        });
        log.times.push(Instant::now());
        Ok(())
    }
}

/// 按节奏返回预设帧的帧源
pub struct ScriptedSource {
    frames: VecDeque<Frame>,
    pace: Duration,
    repeat_last: Option<Frame>,
}

impl ScriptedSource {
    /// 返回完 `frames` 后结束
    pub fn new(frames: Vec<Frame>, pace: Duration) -> Self {
        Self {
            frames: frames.into(),
            pace,
            repeat_last: None,
        }
    }

    /// 无限重复同一帧
    pub fn repeating(frame: Frame, pace: Duration) -> Self {
        Self {
            frames: VecDeque::new(),
            pace,
            repeat_last: Some(frame),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn read(&mut self) -> Option<Frame> {
        std::thread::sleep(self.pace);
        match self.frames.pop_front() {
            Some(frame) => Some(frame),
            None => self.repeat_last.clone(),
        }
    }
}

/// 深色赛道上 `[x0, x1)` 列为白色标线
pub fn lane_frame(x0: u32, x1: u32) -> Frame {
    let img = RgbImage::from_fn(FRAME_WIDTH, FRAME_HEIGHT, |x, _| {
        if x >= x0 && x < x1 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    });
    Frame::new(img, 0)
}

pub fn centred_lane_frame() -> Frame {
    lane_frame(FRAME_WIDTH / 2 - 4, FRAME_WIDTH / 2 + 4)
}

pub fn left_edge_lane_frame() -> Frame {
    lane_frame(0, 8)
}

pub fn blank_frame() -> Frame {
    Frame::new(RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT), 0)
}

/// 测试配置：10ms 周期，无 settle 等待，巡航油门 0.5（脉宽 325，与中立 350 区分）
pub fn test_config() -> ControlConfig {
    ControlConfig {
        tick_period_ms: 10,
        settle_delay_ms: 0,
        cruise_throttle: 0.5,
        ..Default::default()
    }
}

/// 轮询等待条件成立
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
