//! # 几何模型
//!
//! 源图像素坐标系下的裁剪矩形，以及画布坐标系下的摆放矩形。

use serde::Serialize;

use super::FrameError;

/// 源图像素坐标系下的正方形裁剪区域。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CropRectangle {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRectangle {
    /// 以左上角与边长构造正方形。
    pub fn square(x: u32, y: u32, side: u32) -> Self {
        Self {
            x,
            y,
            width: side,
            height: side,
        }
    }

    /// 校验正方形约束与源图边界约束。
    pub fn validate_within(&self, natural_width: u32, natural_height: u32) -> Result<(), FrameError> {
        if self.width != self.height {
            return Err(FrameError::OutOfBounds(format!(
                "裁剪区域不是正方形：{}x{}",
                self.width, self.height
            )));
        }
        if self.width == 0 {
            return Err(FrameError::OutOfBounds("裁剪区域边长为 0".to_string()));
        }

        let right = u64::from(self.x) + u64::from(self.width);
        let bottom = u64::from(self.y) + u64::from(self.height);
        if right > u64::from(natural_width) || bottom > u64::from(natural_height) {
            return Err(FrameError::OutOfBounds(format!(
                "裁剪区域 ({}, {}, {}x{}) 超出源图 {}x{}",
                self.x, self.y, self.width, self.height, natural_width, natural_height
            )));
        }

        Ok(())
    }
}

/// 画布坐标系下的摆放矩形，允许负坐标与越界（绘制时裁切）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PlacementRect {
    /// 与 `[0, canvas)²` 求交，返回画布内可见部分 `(x0, y0, x1, y1)`（右下为开区间）。
    pub fn clip_to_canvas(&self, canvas: u32) -> Option<(u32, u32, u32, u32)> {
        let canvas = i64::from(canvas);
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + i64::from(self.width)).min(canvas);
        let y1 = (self.y + i64::from(self.height)).min(canvas);

        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}
