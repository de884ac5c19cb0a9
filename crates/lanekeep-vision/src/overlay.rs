//! 调试叠加图
//!
//! 在裁剪后的区域上绘制：
//!
//! - 红色：选中的轮廓（3 像素笔刷）
//! - 蓝色：画面中线
//! - 绿色：质心（画在区域半高处）
//!
//! 叠加图只用于观察，不参与控制计算。

use crate::error::VisionError;
use crate::pipeline::LaneDetection;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

const CONTOUR_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const CENTERLINE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const CENTROID_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const CONTOUR_BRUSH_RADIUS: i32 = 1;
const CENTROID_RADIUS: i32 = 2;

/// 在区域图像上绘制检测结果
pub fn render(mut region: RgbImage, detection: Option<&LaneDetection>) -> RgbImage {
    let (w, h) = (region.width() as i32, region.height() as i32);

    if let Some(d) = detection {
        let points = d.contour.points();
        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            // 方形笔刷：同一条边平移铺满 3×3 邻域
            for oy in -CONTOUR_BRUSH_RADIUS..=CONTOUR_BRUSH_RADIUS {
                for ox in -CONTOUR_BRUSH_RADIUS..=CONTOUR_BRUSH_RADIUS {
                    draw_line_segment_mut(
                        &mut region,
                        ((a.x + ox) as f32, (a.y + oy) as f32),
                        ((b.x + ox) as f32, (b.y + oy) as f32),
                        CONTOUR_COLOR,
                    );
                }
            }
        }
    }

    let center_x = (w / 2) as f32;
    draw_line_segment_mut(
        &mut region,
        (center_x, 0.0),
        (center_x, (h - 1) as f32),
        CENTERLINE_COLOR,
    );

    if let Some(d) = detection {
        draw_filled_circle_mut(
            &mut region,
            (d.centroid.0 as i32, h / 2),
            CENTROID_RADIUS,
            CENTROID_COLOR,
        );
    }

    region
}

/// 编码为 JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, VisionError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(image)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::VisionPipeline;
    use image::{GrayImage, Luma};

    #[test]
    fn test_centerline_without_detection() {
        let out = render(RgbImage::new(20, 10), None);
        for y in 0..10 {
            assert_eq!(*out.get_pixel(10, y), CENTERLINE_COLOR);
        }
        assert_eq!(*out.get_pixel(3, 3), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_detection_draws_contour_and_centroid() {
        let mask = GrayImage::from_fn(40, 20, |x, y| {
            if (4..10).contains(&x) && (4..16).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let detection = VisionPipeline::detect(&mask).unwrap();
        let out = render(RgbImage::new(40, 20), Some(&detection));

        // 轮廓左上角及其笔刷范围
        assert_eq!(*out.get_pixel(4, 4), CONTOUR_COLOR);
        assert_eq!(*out.get_pixel(3, 3), CONTOUR_COLOR);
        // 质心 x = 6.5 → 6，画在半高 y = 10
        assert_eq!(*out.get_pixel(6, 10), CENTROID_COLOR);
        assert_eq!(*out.get_pixel(20, 0), CENTERLINE_COLOR);
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_header() {
        let img = RgbImage::from_pixel(16, 16, Rgb([120, 40, 200]));
        let bytes = encode_jpeg(&img, 80).unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
