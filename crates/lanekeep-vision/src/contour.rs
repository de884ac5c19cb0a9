//! 外轮廓提取
//!
//! 边界跟踪由 `imageproc::contours::find_contours`（Suzuki–Abe）完成，这里只保留
//! 最外层边界：孔洞边界和嵌套在孔洞里的分量都被丢弃，栅格化时孔洞会被填满。
//!
//! 轮廓顺序即跟踪的发现顺序（按分量左上角像素的光栅序）。面积相同时，
//! 选择逻辑保留序号最小者，因此这也是平局时的确定性规则。

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometry::contour_area;

pub use imageproc::point::Point;

/// 一个连通区域的外边界
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// 边界点（像素中心，按跟踪顺序）
    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 多边形面积，顶点在像素中心
    ///
    /// 单像素和单像素宽的线段面积为 0。
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        contour_area(&self.points).abs()
    }

    /// 将轮廓填充为 `width × height` 的掩码（边界像素也置为 255）
    pub fn rasterize(&self, width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);

        // draw_polygon_mut 要求首尾不重合
        let mut polygon = self.points.as_slice();
        if polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon = &polygon[..polygon.len() - 1];
        }

        if polygon.len() < 3 {
            for p in polygon {
                if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
                    mask.put_pixel(p.x as u32, p.y as u32, Luma([255]));
                }
            }
        } else {
            draw_polygon_mut(&mut mask, polygon, Luma([255]));
        }
        mask
    }
}

/// 提取二值掩码（非 0 为前景，8 连通）的全部外轮廓
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}
