//! 视觉模块错误类型定义

use thiserror::Error;

/// 视觉模块错误类型
///
/// 注意：检测不到车道不属于错误，见 [`crate::LaneEstimate::NoLaneDetected`]。
#[derive(Error, Debug)]
pub enum VisionError {
    /// 像素缓冲区长度与宽高不匹配
    #[error("Invalid frame buffer: expected {expected} bytes for {width}x{height}, got {actual}")]
    InvalidFrameBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// 无效的管线参数
    #[error("Invalid vision config: {0}")]
    InvalidConfig(String),

    /// 图像编码失败
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
