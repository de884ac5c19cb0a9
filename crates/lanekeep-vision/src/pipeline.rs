//! 车道检测管线

use crate::contour::{Contour, find_external_contours};
use crate::error::VisionError;
use crate::frame::Frame;
use crate::moments::Moments;
use crate::{ops, overlay};
use image::{GrayImage, RgbImage, imageops};
use tracing::trace;

/// 视觉管线参数
///
/// 默认值对应原车赛道的标定结果。`threshold` 取决于赛道与标线的对比度，
/// 是需要现场调整的标定常量，而不是推导值。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VisionConfig {
    /// 裁剪比例：丢弃画面顶部的这一部分（0.4 → 保留下方 60%）
    pub roi_top_fraction: f64,
    /// 高斯核尺寸（正奇数）
    pub blur_kernel: u32,
    /// 高斯核标准差（两个方向相同）
    pub blur_sigma: f64,
    /// 二值化阈值（`>=` 置为前景）
    pub threshold: u8,
    /// 开运算矩形结构元边长（1 到 255）
    pub morph_kernel: u32,
    /// 是否渲染调试叠加图
    pub render_overlay: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            roi_top_fraction: 0.4,
            blur_kernel: 5,
            blur_sigma: 5.0,
            threshold: 100,
            morph_kernel: 6,
            render_overlay: true,
        }
    }
}

impl VisionConfig {
    /// 校验参数
    pub fn validate(&self) -> Result<(), VisionError> {
        if !(0.0..1.0).contains(&self.roi_top_fraction) {
            return Err(VisionError::InvalidConfig(format!(
                "roi_top_fraction must be in [0, 1), got {}",
                self.roi_top_fraction
            )));
        }
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(VisionError::InvalidConfig(format!(
                "blur_kernel must be a positive odd number, got {}",
                self.blur_kernel
            )));
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma <= 0.0 {
            return Err(VisionError::InvalidConfig(format!(
                "blur_sigma must be > 0, got {}",
                self.blur_sigma
            )));
        }
        if self.morph_kernel == 0 || self.morph_kernel > ops::MAX_MORPH_KERNEL {
            return Err(VisionError::InvalidConfig(format!(
                "morph_kernel must be in [1, {}], got {}",
                ops::MAX_MORPH_KERNEL,
                self.morph_kernel
            )));
        }
        Ok(())
    }
}

/// 单帧车道估计
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaneEstimate {
    /// 标线质心相对画面中线的归一化偏移
    ///
    /// 0 表示正中，-0.5 表示最左边缘，+0.5 表示最右边缘；正值表示标线在中线右侧。
    /// 按 `cx / (width / 2) - 0.5` 计算时居中标线会得到 +0.5，因此这里用
    /// `cx / width - 0.5`。
    Offset(f64),
    /// 本帧没有检测到标线（正常情况，调用方保持上一次的指令）
    NoLaneDetected,
}

impl LaneEstimate {
    pub fn offset(&self) -> Option<f64> {
        match self {
            LaneEstimate::Offset(v) => Some(*v),
            LaneEstimate::NoLaneDetected => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, LaneEstimate::Offset(_))
    }
}

/// 检测结果细节（用于叠加图和诊断）
#[derive(Debug, Clone, PartialEq)]
pub struct LaneDetection {
    /// 被选中的（面积最大的）轮廓
    pub contour: Contour,
    /// 质心（区域坐标系）
    pub centroid: (f64, f64),
    /// 归一化偏移
    pub offset: f64,
}

/// 一次处理的输出
#[derive(Debug, Clone)]
pub struct VisionOutput {
    pub estimate: LaneEstimate,
    /// 调试叠加图（仅 `render_overlay` 开启时生成），只用于观察，不参与控制
    pub overlay: Option<RgbImage>,
}

/// 车道检测管线
///
/// 无内部可变状态，`process` 只借用帧，可以在任意线程调用。
#[derive(Debug, Clone)]
pub struct VisionPipeline {
    config: VisionConfig,
    kernel: Vec<f32>,
}

impl VisionPipeline {
    /// 创建管线
    ///
    /// # 错误
    /// - `VisionError::InvalidConfig`: 参数校验失败
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        config.validate()?;
        let kernel = ops::gaussian_kernel(config.blur_kernel, config.blur_sigma);
        Ok(Self { config, kernel })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// 开启或关闭叠加图渲染
    pub fn with_overlay(mut self, enabled: bool) -> Self {
        self.config.render_overlay = enabled;
        self
    }

    /// 处理一帧
    pub fn process(&self, frame: &Frame) -> VisionOutput {
        if frame.is_empty() {
            return VisionOutput {
                estimate: LaneEstimate::NoLaneDetected,
                overlay: None,
            };
        }

        let region = self.region_of_interest(frame.image());
        if region.height() == 0 {
            return VisionOutput {
                estimate: LaneEstimate::NoLaneDetected,
                overlay: None,
            };
        }

        let mask = self.lane_mask(&region);
        let detection = Self::detect(&mask);
        let estimate = match &detection {
            Some(d) => LaneEstimate::Offset(d.offset),
            None => LaneEstimate::NoLaneDetected,
        };
        trace!(
            timestamp_us = frame.timestamp_us,
            ?estimate,
            "frame processed"
        );

        let overlay = if self.config.render_overlay {
            Some(overlay::render(region, detection.as_ref()))
        } else {
            None
        };

        VisionOutput { estimate, overlay }
    }

    /// 裁剪感兴趣区域（丢弃顶部 `roi_top_fraction`）
    pub fn region_of_interest(&self, image: &RgbImage) -> RgbImage {
        let (w, h) = image.dimensions();
        let top = ((h as f64 * self.config.roi_top_fraction) as u32).min(h);
        imageops::crop_imm(image, 0, top, w, h - top).to_image()
    }

    /// 区域 → 二值掩码（灰度、模糊、阈值、开运算）
    pub fn lane_mask(&self, region: &RgbImage) -> GrayImage {
        let gray = ops::to_gray(region);
        let blurred = ops::gaussian_blur(&gray, &self.kernel);
        let binary = ops::threshold(&blurred, self.config.threshold);
        ops::open(&binary, &ops::rect_kernel(self.config.morph_kernel))
    }

    /// 由二值掩码估计车道偏移
    pub fn estimate_from_mask(mask: &GrayImage) -> LaneEstimate {
        match Self::detect(mask) {
            Some(d) => LaneEstimate::Offset(d.offset),
            None => LaneEstimate::NoLaneDetected,
        }
    }

    /// 轮廓选择 + 矩计算
    ///
    /// 选择面积严格最大的轮廓，面积相同保留先出现者。
    pub fn detect(mask: &GrayImage) -> Option<LaneDetection> {
        let contours = find_external_contours(mask);

        let mut best: Option<(usize, f64)> = None;
        for (idx, contour) in contours.iter().enumerate() {
            let area = contour.area();
            match best {
                Some((_, best_area)) if area <= best_area => {},
                _ => best = Some((idx, area)),
            }
        }
        let (idx, _) = best?;
        let contour = contours.into_iter().nth(idx)?;

        let filled = contour.rasterize(mask.width(), mask.height());
        let centroid = Moments::from_mask(&filled).centroid()?;
        let offset = centroid.0 / mask.width() as f64 - 0.5;

        Some(LaneDetection {
            contour,
            centroid,
            offset,
        })
    }
}
