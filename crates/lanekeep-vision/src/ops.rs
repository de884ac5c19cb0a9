//! 图像基础运算
//!
//! 对 `imageproc` 的薄封装，参数形式与 [`VisionConfig`](crate::VisionConfig) 一致：
//! 高斯核尺寸 + 标准差、二值化阈值、矩形结构元边长。
//!
//! - 高斯模糊边界像素按最近边缘复制
//! - 二值化包含阈值本身（`>= threshold` 为前景）
//! - 矩形结构元锚点位于 `(ksize / 2, ksize / 2)`，越界像素不参与计算

use image::{GrayImage, Luma, RgbImage, imageops};
use imageproc::contrast::{self, ThresholdType};
use imageproc::filter::separable_filter_equal;
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

/// 结构元边长上限（`Mask` 的锚点是 `u8`）
pub const MAX_MORPH_KERNEL: u32 = 255;

/// RGB 转灰度
pub fn to_gray(image: &RgbImage) -> GrayImage {
    imageops::grayscale(image)
}

/// 一维归一化高斯核
///
/// 与 `imageproc::filter::gaussian_blur_f32` 不同，核尺寸由调用方指定而不是由 sigma 推出。
pub fn gaussian_kernel(ksize: u32, sigma: f64) -> Vec<f32> {
    let center = (ksize / 2) as f64;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (0..ksize)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / two_sigma_sq).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

/// 可分离高斯模糊（水平、垂直使用同一个核）
pub fn gaussian_blur(image: &GrayImage, kernel: &[f32]) -> GrayImage {
    separable_filter_equal(image, kernel)
}

/// 二值化：`>= threshold` 为 255，否则为 0
pub fn threshold(image: &GrayImage, threshold: u8) -> GrayImage {
    match threshold.checked_sub(1) {
        Some(strict) => contrast::threshold(image, strict, ThresholdType::Binary),
        None => GrayImage::from_pixel(image.width(), image.height(), Luma([255])),
    }
}

/// `ksize × ksize` 矩形结构元
pub fn rect_kernel(ksize: u32) -> Mask {
    let side = ksize.clamp(1, MAX_MORPH_KERNEL);
    let anchor = (side / 2) as u8;
    Mask::from_image(&GrayImage::from_pixel(side, side, Luma([255])), anchor, anchor)
}

/// 腐蚀
pub fn erode(image: &GrayImage, kernel: &Mask) -> GrayImage {
    grayscale_erode(image, kernel)
}

/// 膨胀
pub fn dilate(image: &GrayImage, kernel: &Mask) -> GrayImage {
    grayscale_dilate(image, kernel)
}

/// 开运算（先腐蚀后膨胀），去除小于结构元的噪点
pub fn open(image: &GrayImage, kernel: &Mask) -> GrayImage {
    dilate(&erode(image, kernel), kernel)
}
