//! 配置管理命令
//!
//! 生成默认配置文件、校验已有配置

use anyhow::{Context, Result};
use clap::Subcommand;
use lanekeep_control::ControlConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 加载控制配置
///
/// 未指定路径时使用默认配置；文件中缺省的字段取默认值。
pub fn load_config(path: Option<&Path>) -> Result<ControlConfig> {
    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            ControlConfig::from_toml_str(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        },
        None => ControlConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 输出默认配置（TOML）
    Default {
        /// 写入文件而不是标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 校验配置文件
    Check {
        /// 配置文件路径
        file: PathBuf,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Default { output } => Self::default_(output),
            ConfigCommand::Check { file } => Self::check_(&file),
        }
    }

    fn default_(output: Option<PathBuf>) -> Result<()> {
        let text = ControlConfig::default().to_toml_string()?;
        match output {
            Some(path) => {
                fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("✅ Default configuration written to {}", path.display());
            },
            None => print!("{text}"),
        }
        Ok(())
    }

    fn check_(file: &Path) -> Result<()> {
        let config = load_config(Some(file))?;
        println!("✅ {} is valid", file.display());
        println!("  Tick period:   {:?}", config.tick_period());
        println!("  Steering gain: {}", config.steering_gain);
        println!(
            "  Channels:      steering={} throttle={}",
            config.steering_channel, config.throttle_channel
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), ControlConfig::default());
    }

    #[test]
    fn test_default_output_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanekeep.toml");

        ConfigCommand::Default {
            output: Some(path.clone()),
        }
        .execute()
        .unwrap();

        assert_eq!(load_config(Some(&path)).unwrap(), ControlConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanekeep.toml");
        fs::write(&path, "steering_gain = 2.5\n[vision]\nthreshold = 90\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.steering_gain, 2.5);
        assert_eq!(config.vision.threshold, 90);
        assert_eq!(config.tick_period_ms, ControlConfig::default().tick_period_ms);
    }

    #[test]
    fn test_check_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "steering_channel = 0\nthrottle_channel = 0\n").unwrap();

        assert!(ConfigCommand::Check { file: path.clone() }.execute().is_err());
        assert!(ConfigCommand::Check {
            file: dir.path().join("missing.toml")
        }
        .execute()
        .is_err());
    }
}
