//! # 合成模块
//!
//! ## 设计思路
//!
//! 绘制顺序固定：先铺裁剪图，再叠模板。模板不透明处覆盖照片，透明处照片透出。
//! 模板摆放矩形来自常量，超出画布的部分直接裁掉。
//!
//! ## 实现思路
//!
//! 使用非预乘 RGBA 的 source-over 混合，全部为整数运算，同一输入逐字节一致。
//! alpha 为 0 的模板像素完全不触碰底图。

use image::Rgba;
use std::time::Instant;

use super::config::CANVAS_SIZE;
use super::{CompositedImage, CroppedRaster, FrameError, FrameHandler, TemplateOverlay};

impl FrameHandler {
    /// 在裁剪图之上叠加模板，输出 `CANVAS_SIZE × CANVAS_SIZE` 的合成图。
    pub fn composite(base: &CroppedRaster, overlay: &TemplateOverlay) -> Result<CompositedImage, FrameError> {
        let (width, height) = base.pixels().dimensions();
        if (width, height) != (CANVAS_SIZE, CANVAS_SIZE) {
            return Err(FrameError::InvalidRaster(format!(
                "底图尺寸应为 {}x{}，实际为 {}x{}",
                CANVAS_SIZE, CANVAS_SIZE, width, height
            )));
        }

        let start = Instant::now();
        let mut canvas = base.pixels().clone();
        let placement = overlay.placement();
        let template = overlay.pixels();

        if let Some((x0, y0, x1, y1)) = placement.clip_to_canvas(CANVAS_SIZE) {
            for cy in y0..y1 {
                let ty = (i64::from(cy) - placement.y) as u32;
                for cx in x0..x1 {
                    let tx = (i64::from(cx) - placement.x) as u32;
                    let src = template.get_pixel(tx, ty);
                    if src[3] == 0 {
                        continue;
                    }
                    let dst = canvas.get_pixel_mut(cx, cy);
                    *dst = source_over(*dst, *src);
                }
            }
        }

        log::info!(
            "🎨 合成完成 - 画布: {}x{} 模板: ({}, {}) {}x{} 耗时: {}ms",
            CANVAS_SIZE,
            CANVAS_SIZE,
            placement.x,
            placement.y,
            placement.width,
            placement.height,
            start.elapsed().as_millis()
        );

        Ok(CompositedImage { pixels: canvas })
    }
}

/// 非预乘 RGBA 的 source-over。
fn source_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let da = u32::from(dst[3]);
    let inv = 255 - sa;
    // 放大 255 倍的输出 alpha
    let out_a_scaled = sa * 255 + da * inv;
    if out_a_scaled == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let sc = u32::from(src[i]);
        let dc = u32::from(dst[i]);
        let numerator = sc * sa * 255 + dc * da * inv;
        out[i] = ((numerator + out_a_scaled / 2) / out_a_scaled).min(255) as u8;
    }
    out[3] = ((out_a_scaled + 127) / 255).min(255) as u8;

    Rgba(out)
}
