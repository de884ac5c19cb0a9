//! 帧数据结构

use crate::error::VisionError;
use image::RgbImage;

/// 一帧彩色图像
///
/// 由帧源产生，视觉管线在一次处理过程中借用，不跨 tick 保留。
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    /// 采集时间戳（微秒，帧源自定义的单调时间基准）
    pub timestamp_us: u64,
}

impl Frame {
    /// 由 RGB 图像构造
    pub fn new(image: RgbImage, timestamp_us: u64) -> Self {
        Self {
            image,
            timestamp_us,
        }
    }

    /// 由 BGR 字节序列构造（多数摄像头驱动的原生排列）
    ///
    /// # 错误
    /// - `VisionError::InvalidFrameBuffer`: 缓冲区长度不等于 `width * height * 3`
    pub fn from_bgr(
        width: u32,
        height: u32,
        mut data: Vec<u8>,
        timestamp_us: u64,
    ) -> Result<Self, VisionError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(VisionError::InvalidFrameBuffer {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }

        let image = RgbImage::from_raw(width, height, data).ok_or(
            VisionError::InvalidFrameBuffer {
                width,
                height,
                expected,
                actual: expected,
            },
        )?;
        Ok(Self::new(image, timestamp_us))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// 空帧（宽或高为 0），控制循环会直接跳过
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
