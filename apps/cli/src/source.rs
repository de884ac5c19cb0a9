//! 图像序列帧源
//!
//! 按文件名顺序读取目录中的图片，以固定帧率回放，用于离线调试控制循环。

use anyhow::{Context, Result, bail};
use lanekeep_control::FrameSource;
use lanekeep_control::vision::{Frame, RgbImage};
use spin_sleep::SpinSleeper;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// 从目录回放图片序列
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    frame_interval: Duration,
    /// 下一帧的释放时间
    due: Option<Instant>,
    started: Instant,
    sleeper: SpinSleeper,
}

impl ImageSequenceSource {
    /// 打开目录
    ///
    /// `fps <= 0` 表示不限速。
    pub fn open(dir: &Path, fps: f64) -> Result<Self> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("failed to read frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            bail!("no image files found in {}", dir.display());
        }
        info!("Replaying {} frames from {}", paths.len(), dir.display());

        let frame_interval = if fps > 0.0 && fps.is_finite() {
            Duration::from_secs_f64(1.0 / fps)
        } else {
            Duration::ZERO
        };

        Ok(Self {
            paths,
            next: 0,
            frame_interval,
            due: None,
            started: Instant::now(),
            sleeper: SpinSleeper::default(),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.paths.len()
    }

    fn pace(&mut self) {
        if self.frame_interval.is_zero() {
            return;
        }
        let now = Instant::now();
        let due = self.due.unwrap_or(now);
        if due > now {
            self.sleeper.sleep(due - now);
        }
        // 落后时从当前时刻重新计时，不追赶
        self.due = Some(due.max(now) + self.frame_interval);
    }
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Option<Frame> {
        let path = self.paths.get(self.next)?.clone();
        self.next += 1;
        self.pace();

        let timestamp_us = self.started.elapsed().as_micros() as u64;
        match image::open(&path) {
            Ok(img) => Some(Frame::new(img.to_rgb8(), timestamp_us)),
            Err(e) => {
                // 损坏的帧按空帧处理，控制循环会跳过
                warn!("Failed to decode {}: {}", path.display(), e);
                Some(Frame::new(RgbImage::new(0, 0), timestamp_us))
            },
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// 把第一帧非空图像保存到文件，然后透传
pub struct SnapshotFirst<S> {
    inner: S,
    path: Option<PathBuf>,
}

impl<S> SnapshotFirst<S> {
    pub fn new(inner: S, path: PathBuf) -> Self {
        Self {
            inner,
            path: Some(path),
        }
    }
}

impl<S: FrameSource> FrameSource for SnapshotFirst<S> {
    fn read(&mut self) -> Option<Frame> {
        let frame = self.inner.read()?;
        if !frame.is_empty()
            && let Some(path) = self.path.take()
        {
            match frame.image().save(&path) {
                Ok(()) => info!("Saved first frame to {}", path.display()),
                Err(e) => warn!("Failed to save snapshot {}: {}", path.display(), e),
            }
        }
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_frames(dir: &Path, names: &[&str]) {
        for (i, name) in names.iter().enumerate() {
            let img = RgbImage::from_pixel(16, 12, Rgb([i as u8 * 10, 0, 0]));
            img.save(dir.join(name)).unwrap();
        }
    }

    #[test]
    fn test_reads_frames_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), &["b.png", "a.png", "c.png"]);
        fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), 0.0).unwrap();
        assert_eq!(source.frame_count(), 3);

        // a.png 是第二个写入的（红色 10）
        let first = source.read().unwrap();
        assert_eq!(first.image().get_pixel(0, 0)[0], 10);
        assert_eq!(source.read().unwrap().image().get_pixel(0, 0)[0], 0);
        assert_eq!(source.read().unwrap().image().get_pixel(0, 0)[0], 20);
        assert!(source.read().is_none());
        assert!(source.read().is_none());
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequenceSource::open(dir.path(), 30.0).is_err());
    }

    #[test]
    fn test_corrupt_image_becomes_empty_frame() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.png"), b"definitely not png").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), 0.0).unwrap();
        let frame = source.read().unwrap();
        assert!(frame.is_empty());
        assert!(source.read().is_none());
    }

    #[test]
    fn test_fps_paces_reads() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), &["0.png", "1.png", "2.png"]);

        let mut source = ImageSequenceSource::open(dir.path(), 50.0).unwrap();
        let start = Instant::now();
        while source.read().is_some() {}
        // 3 帧 @ 50fps：第一帧立即释放，之后间隔 20ms
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_snapshot_saves_first_non_empty_frame_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0.png"), b"junk").unwrap();
        write_frames(dir.path(), &["1.png", "2.png"]);
        let snapshot = dir.path().join("snapshot.jpg");

        let inner = ImageSequenceSource::open(dir.path(), 0.0).unwrap();
        let mut source = SnapshotFirst::new(inner, snapshot.clone());

        assert!(source.read().unwrap().is_empty());
        assert!(!snapshot.exists());
        source.read().unwrap();
        assert!(snapshot.exists());

        let saved = image::open(&snapshot).unwrap();
        assert_eq!((saved.width(), saved.height()), (16, 12));
    }
}
