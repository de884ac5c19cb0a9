//! 二值图像矩

use image::GrayImage;

/// 二值图像的零阶和一阶矩
///
/// 非零像素按 1 计入。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    pub fn from_mask(mask: &GrayImage) -> Self {
        let mut m = Moments::default();
        for (x, y, p) in mask.enumerate_pixels() {
            if p.0[0] != 0 {
                m.m00 += 1.0;
                m.m10 += x as f64;
                m.m01 += y as f64;
            }
        }
        m
    }

    /// 质心 `(m10/m00, m01/m00)`，零面积时返回 `None`
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 == 0.0 {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_empty_mask_has_no_centroid() {
        let m = Moments::from_mask(&GrayImage::new(8, 8));
        assert_eq!(m.m00, 0.0);
        assert!(m.centroid().is_none());
    }

    #[test]
    fn test_centroid_of_block() {
        let mask = GrayImage::from_fn(10, 10, |x, y| {
            if (2..6).contains(&x) && (4..8).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let m = Moments::from_mask(&mask);
        assert_eq!(m.m00, 16.0);
        assert_eq!(m.centroid(), Some((3.5, 5.5)));
    }
}
