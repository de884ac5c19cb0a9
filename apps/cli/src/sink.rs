//! 文件调试输出
//!
//! 每次把最新的叠加图写入同一个文件（先写临时文件再 rename），
//! 读取方（图片查看器、HTTP 静态服务等）不会看到写了一半的 JPEG。

use lanekeep_control::DebugSink;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct LatestFrameFile {
    path: PathBuf,
    tmp_path: PathBuf,
    failures: u64,
}

impl LatestFrameFile {
    pub fn new(path: &Path) -> Self {
        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        Self {
            path: path.to_path_buf(),
            tmp_path: path.with_file_name(tmp_name),
            failures: 0,
        }
    }

    fn write(&self, jpeg: &[u8]) -> std::io::Result<()> {
        fs::write(&self.tmp_path, jpeg)?;
        fs::rename(&self.tmp_path, &self.path)
    }
}

impl DebugSink for LatestFrameFile {
    fn publish(&mut self, jpeg: &[u8]) {
        if let Err(e) = self.write(jpeg) {
            self.failures += 1;
            // 只报告第一次，避免每帧刷屏
            if self.failures == 1 {
                warn!("Failed to write debug frame to {}: {}", self.path.display(), e);
            }
        }
    }
}
