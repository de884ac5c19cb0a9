//! 驾驶命令
//!
//! 用图像序列代替摄像头、空跑 PWM 代替 PCA9685，完整运行控制循环：
//! 启动 → 视觉/执行线程 → 流结束或 Ctrl-C → 油门回中立。

use anyhow::{Context, Result};
use clap::Args;
use lanekeep_control::{ControlLoop, FrameSource, LoopReport};
use std::path::PathBuf;
use tracing::info;

use super::config::load_config;
use crate::pwm::DryRunPwm;
use crate::sink::LatestFrameFile;
use crate::source::{ImageSequenceSource, SnapshotFirst};

/// 驾驶命令参数
#[derive(Args, Debug)]
pub struct DriveCommand {
    /// 帧目录（按文件名顺序回放）
    #[arg(short, long)]
    pub frames: PathBuf,

    /// 配置文件（TOML）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 回放帧率，0 表示不限速
    #[arg(long, default_value_t = 30.0)]
    pub fps: f64,

    /// 巡航油门 [-1, 1]（覆盖配置）
    #[arg(short, long, allow_hyphen_values = true)]
    pub throttle: Option<f64>,

    /// 转向增益（覆盖配置）
    #[arg(short, long)]
    pub gain: Option<f64>,

    /// 保存第一帧
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// 持续写入最新的调试叠加图（JPEG）
    #[arg(long)]
    pub debug_output: Option<PathBuf>,

    /// 记录所有 PWM 写入（JSON Lines）
    #[arg(long)]
    pub pulse_log: Option<PathBuf>,

    /// 以 JSON 输出运行报告
    #[arg(long)]
    pub json: bool,
}

impl DriveCommand {
    pub fn execute(&self) -> Result<()> {
        let report = self.drive(true)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report.metrics)?);
            return Ok(());
        }

        let m = &report.metrics;
        println!("✅ Control loop stopped: {}", report.reason);
        println!("  Frames:          {} ({} empty)", m.frames_processed, m.empty_frames);
        println!(
            "  Lane detected:   {} / {} ({:.1}%)",
            m.lanes_detected,
            m.frames_processed,
            m.detection_rate()
        );
        println!("  Actuation ticks: {} ({} overruns)", m.ticks, m.tick_overruns);
        if self.debug_output.is_some() {
            println!(
                "  Debug frames:    {} published, {} dropped",
                m.debug_frames_published, m.debug_frames_dropped
            );
        }
        Ok(())
    }

    /// 运行控制循环直到结束
    ///
    /// `install_ctrlc` 为 false 时不注册信号处理（进程内只能注册一次）。
    fn drive(&self, install_ctrlc: bool) -> Result<LoopReport> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(throttle) = self.throttle {
            config.cruise_throttle = throttle;
        }
        if let Some(gain) = self.gain {
            config.steering_gain = gain;
        }
        config.camera = self.frames.display().to_string();

        let frames = ImageSequenceSource::open(&self.frames, self.fps)?;
        let source: Box<dyn FrameSource> = match &self.snapshot {
            Some(path) => Box::new(SnapshotFirst::new(frames, path.clone())),
            None => Box::new(frames),
        };
        let pwm = DryRunPwm::new(self.pulse_log.as_deref()).context("failed to open pulse log")?;

        let mut control = ControlLoop::new(source, pwm, config)?;
        if let Some(path) = &self.debug_output {
            control = control.with_debug_sink(LatestFrameFile::new(path));
        }

        let running = control
            .arm()
            .context("failed to arm actuators")?
            .start()
            .context("failed to start control loop")?;

        if install_ctrlc {
            let handle = running.handle();
            ctrlc::set_handler(move || {
                info!("Ctrl-C received, stopping");
                handle.stop();
            })
            .context("failed to install Ctrl-C handler")?;
        }

        info!("Driving (Ctrl-C to stop)");
        running.join().context("control loop aborted")
    }
}
