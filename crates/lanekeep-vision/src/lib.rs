//! 车道视觉模块
//!
//! 将摄像头的一帧彩色图像转换为车道标线质心相对画面中线的水平偏移：
//!
//! 1. 裁剪感兴趣区域（画面下方 60%，去除天空/地平线噪声）
//! 2. 灰度化 → 5×5 高斯模糊 → 二值化
//! 3. 形态学开运算（先腐蚀后膨胀）去除小噪点
//! 4. 提取外轮廓，选取面积最大的轮廓
//! 5. 对该轮廓栅格化后计算矩，得到质心与偏移
//!
//! 检测不到车道（[`LaneEstimate::NoLaneDetected`]）是正常情况，不是错误。
//!
//! # 快速开始
//!
//! ```rust
//! use lanekeep_vision::{Frame, LaneEstimate, VisionConfig, VisionPipeline};
//! use image::RgbImage;
//!
//! let pipeline = VisionPipeline::new(VisionConfig::default()).unwrap();
//! let frame = Frame::new(RgbImage::new(64, 48), 0);
//! let output = pipeline.process(&frame);
//! assert_eq!(output.estimate, LaneEstimate::NoLaneDetected);
//! ```

pub mod contour;
mod error;
mod frame;
pub mod moments;
pub mod ops;
pub mod overlay;
mod pipeline;

pub use contour::{Contour, Point, find_external_contours};
pub use error::VisionError;
pub use frame::Frame;
pub use moments::Moments;
pub use overlay::encode_jpeg;
pub use pipeline::{LaneDetection, LaneEstimate, VisionConfig, VisionOutput, VisionPipeline};

/// 重新导出图像缓冲区类型，调用方无需直接依赖 `image`
pub use image::{GrayImage, Luma, Rgb, RgbImage};
