//! # lanekeep
//!
//! 车道保持控制循环的命令行工具。
//!
//! ```bash
//! # 生成默认配置
//! lanekeep config default --output lanekeep.toml
//!
//! # 检查单帧的检测结果
//! lanekeep inspect frame.png --overlay overlay.png
//!
//! # 回放图像序列，空跑执行器
//! lanekeep drive --frames ./recording --config lanekeep.toml --pulse-log pulses.jsonl
//! ```
//!
//! 日志级别通过 `RUST_LOG` 调整，例如 `RUST_LOG=lanekeep_control=debug`。

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod pwm;
mod sink;
mod source;

use commands::{ConfigCommand, DriveCommand, InspectCommand};

/// lanekeep - 车道保持命令行工具
#[derive(Parser, Debug)]
#[command(name = "lanekeep")]
#[command(about = "Lane-keeping control loop for small autonomous cars", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 运行控制循环
    Drive {
        #[command(flatten)]
        args: DriveCommand,
    },

    /// 检查单帧图片
    Inspect {
        #[command(flatten)]
        args: InspectCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lanekeep=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Drive { args } => args.execute(),
        Commands::Inspect { args } => args.execute(),
        Commands::Config(cmd) => cmd.execute(),
    }
}
