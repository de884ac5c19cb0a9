//! 空跑 PWM 驱动
//!
//! 不接触任何硬件：把每次写入记录到日志，并可选地以 JSON Lines 格式写入文件，
//! 便于离线检查转向/油门输出。

use lanekeep_control::{PulseWidth, PwmDriver, PwmError};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// 脉宽日志中的一条记录
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum PwmRecord {
    Frequency { t_ms: f64, hz: f64 },
    Pulse { t_ms: f64, channel: u8, width: u16 },
}

pub struct DryRunPwm {
    log: Option<BufWriter<File>>,
    started: Instant,
    writes: u64,
}

impl DryRunPwm {
    /// 创建驱动；`pulse_log` 为 `Some` 时写入 JSON Lines 文件
    pub fn new(pulse_log: Option<&Path>) -> std::io::Result<Self> {
        let log = match pulse_log {
            Some(path) => {
                info!("Recording PWM writes to {}", path.display());
                Some(BufWriter::new(File::create(path)?))
            },
            None => None,
        };
        Ok(Self {
            log,
            started: Instant::now(),
            writes: 0,
        })
    }

    fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn record(&mut self, record: &PwmRecord) -> Result<(), PwmError> {
        self.writes += 1;
        if let Some(log) = self.log.as_mut() {
            serde_json::to_writer(&mut *log, record).map_err(std::io::Error::from)?;
            log.write_all(b"\n")?;
            // 控制循环停止时可能被直接丢弃，逐行刷新保证日志完整
            log.flush()?;
        }
        Ok(())
    }
}

impl PwmDriver for DryRunPwm {
    fn set_frequency(&mut self, hz: f64) -> Result<(), PwmError> {
        info!("PWM frequency set to {} Hz (dry run)", hz);
        let t_ms = self.elapsed_ms();
        self.record(&PwmRecord::Frequency { t_ms, hz })
    }

    fn set_pulse(&mut self, channel: u8, width: PulseWidth) -> Result<(), PwmError> {
        debug!("channel {} <- {}", channel, width);
        let t_ms = self.elapsed_ms();
        self.record(&PwmRecord::Pulse {
            t_ms,
            channel,
            width: width.get(),
        })
    }
}

impl Drop for DryRunPwm {
    fn drop(&mut self) {
        debug!("Dry-run PWM released after {} writes", self.writes);
    }
}
