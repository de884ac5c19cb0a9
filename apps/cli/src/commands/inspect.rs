//! 单帧检查命令
//!
//! 对一张图片运行视觉管线，输出车道偏移、转向指令和对应脉宽，
//! 用于现场标定阈值和增益。

use anyhow::{Context, Result};
use clap::Args;
use lanekeep_control::vision::{Frame, LaneEstimate, VisionPipeline};
use lanekeep_control::{ActuatorMapper, SteeringShaper};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::config::load_config;

/// 检查命令参数
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// 输入图片
    pub image: PathBuf,

    /// 配置文件（TOML）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 保存叠加图
    #[arg(short, long)]
    pub overlay: Option<PathBuf>,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

/// 单帧检查结果
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub lane_detected: bool,
    pub offset: Option<f64>,
    /// 未检测到车道时为 None（控制循环保持上一指令）
    pub steering: Option<f64>,
    pub steering_pulse: Option<u16>,
}

impl InspectCommand {
    pub fn execute(&self) -> Result<()> {
        let report = self.inspect()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("Image:    {} ({}x{})", report.image, report.width, report.height);
        match (report.offset, report.steering, report.steering_pulse) {
            (Some(offset), Some(steering), Some(pulse)) => {
                println!("Offset:   {offset:+.4}");
                println!("Steering: {steering:+.4} (pulse {pulse})");
            },
            _ => println!("⚠️  No lane detected"),
        }
        if let Some(path) = &self.overlay {
            println!("Overlay:  {}", path.display());
        }
        Ok(())
    }

    fn inspect(&self) -> Result<InspectReport> {
        let config = load_config(self.config.as_deref())?;
        let pipeline =
            VisionPipeline::new(config.vision.clone())?.with_overlay(self.overlay.is_some());
        let shaper = SteeringShaper::new(config.steering_gain);
        let mapper = ActuatorMapper::new(config.steering, config.throttle);

        let frame = load_frame(&self.image)?;
        let output = pipeline.process(&frame);

        if let (Some(path), Some(overlay)) = (&self.overlay, &output.overlay) {
            overlay
                .save(path)
                .with_context(|| format!("failed to save overlay {}", path.display()))?;
        }

        let (offset, steering, steering_pulse) = match output.estimate {
            LaneEstimate::Offset(offset) => {
                let command = shaper.shape(offset);
                (
                    Some(offset),
                    Some(command.value()),
                    Some(mapper.steering_pulse(command).get()),
                )
            },
            LaneEstimate::NoLaneDetected => (None, None, None),
        };

        Ok(InspectReport {
            image: self.image.display().to_string(),
            width: frame.width(),
            height: frame.height(),
            lane_detected: offset.is_some(),
            offset,
            steering,
            steering_pulse,
        })
    }
}

fn load_frame(path: &Path) -> Result<Frame> {
    let image =
        image::open(path).with_context(|| format!("failed to open image {}", path.display()))?;
    Ok(Frame::new(image.to_rgb8(), 0))
}
