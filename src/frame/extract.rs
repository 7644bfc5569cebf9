//! # 区域提取模块
//!
//! ## 设计思路
//!
//! 将源图中确认后的正方形区域重采样为固定 `CANVAS_SIZE` 边长的画布。
//! 提取器不信任调用方：矩形先按源图尺寸重新校验，越界直接返回 `OutOfBounds`。
//!
//! ## 实现思路
//!
//! - 首选 `fast_image_resize`：借用源图像素（不复制），用裁剪框直接在源图上采样。
//! - 若 `fast_image_resize` 出错，记录警告并回退到 `image::imageops` 的裁剪 + 缩放。
//! - 同一输入与滤镜下结果确定。

use fast_image_resize as fr;
use image::RgbaImage;
use image::imageops::FilterType;
use std::time::Instant;

use super::config::CANVAS_SIZE;
use super::{CropRectangle, CroppedRaster, FrameError, FrameHandler, ImageAsset};

impl FrameHandler {
    /// 将源图中的 `rect` 区域缩放为 `CANVAS_SIZE × CANVAS_SIZE` 的裁剪图。
    pub fn extract_region(
        asset: &ImageAsset,
        rect: CropRectangle,
        filter: FilterType,
    ) -> Result<CroppedRaster, FrameError> {
        rect.validate_within(asset.natural_width(), asset.natural_height())?;

        let start = Instant::now();
        let pixels = match Self::resize_region_with_fast_image_resize(asset, rect, filter) {
            Ok(pixels) => pixels,
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 重采样失败，回退 image::imageops：{}", err);
                Self::resize_region_with_imageops(asset, rect, filter)
            }
        };

        if pixels.dimensions() != (CANVAS_SIZE, CANVAS_SIZE) {
            return Err(FrameError::InvalidRaster(format!(
                "裁剪输出尺寸异常：{}x{}",
                pixels.width(),
                pixels.height()
            )));
        }

        log::info!(
            "✂️ 区域提取完成 - ({}, {}, {}x{}) -> {}x{} filter={:?} 耗时: {}ms",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            CANVAS_SIZE,
            CANVAS_SIZE,
            filter,
            start.elapsed().as_millis()
        );

        Ok(CroppedRaster { pixels })
    }

    fn resize_region_with_fast_image_resize(
        asset: &ImageAsset,
        rect: CropRectangle,
        filter: FilterType,
    ) -> Result<RgbaImage, FrameError> {
        let src = asset.pixels();
        let src_image = fr::images::ImageRef::new(src.width(), src.height(), src.as_raw(), fr::PixelType::U8x4)
            .map_err(|e| FrameError::Decode(format!("构建源图像视图失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(CANVAS_SIZE, CANVAS_SIZE, fr::PixelType::U8x4);

        let options = fr::ResizeOptions::new()
            .resize_alg(Self::to_resize_alg(filter))
            .crop(
                f64::from(rect.x),
                f64::from(rect.y),
                f64::from(rect.width),
                f64::from(rect.height),
            );

        let mut resizer = fr::Resizer::new();
        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| FrameError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

        RgbaImage::from_raw(CANVAS_SIZE, CANVAS_SIZE, dst_image.into_vec())
            .ok_or_else(|| FrameError::InvalidRaster("fast_image_resize 输出缓冲长度异常".to_string()))
    }

    fn resize_region_with_imageops(asset: &ImageAsset, rect: CropRectangle, filter: FilterType) -> RgbaImage {
        let region = image::imageops::crop_imm(asset.pixels(), rect.x, rect.y, rect.width, rect.height).to_image();
        image::imageops::resize(&region, CANVAS_SIZE, CANVAS_SIZE, filter)
    }

    fn to_resize_alg(filter: FilterType) -> fr::ResizeAlg {
        match filter {
            FilterType::Nearest => fr::ResizeAlg::Nearest,
            FilterType::Triangle => fr::ResizeAlg::Convolution(fr::FilterType::Bilinear),
            FilterType::CatmullRom => fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom),
            FilterType::Gaussian => fr::ResizeAlg::Convolution(fr::FilterType::Mitchell),
            FilterType::Lanczos3 => fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_support::{quadrant_asset, solid_asset};
    use image::Rgba;
    use proptest::prelude::*;

    #[test]
    fn output_is_always_canvas_sized() {
        let asset = solid_asset(2000, 1500);
        let cropped = FrameHandler::extract_region(&asset, CropRectangle::square(250, 0, 1500), FilterType::Triangle)
            .expect("extract should succeed");

        assert_eq!(cropped.pixels().dimensions(), (CANVAS_SIZE, CANVAS_SIZE));
    }

    #[test]
    fn out_of_bounds_rectangle_is_rejected() {
        let asset = solid_asset(100, 100);

        let result = FrameHandler::extract_region(&asset, CropRectangle::square(50, 50, 60), FilterType::Triangle);
        assert!(matches!(result, Err(FrameError::OutOfBounds(_))));

        let not_square = CropRectangle {
            x: 0,
            y: 0,
            width: 10,
            height: 20,
        };
        let result = FrameHandler::extract_region(&asset, not_square, FilterType::Triangle);
        assert!(matches!(result, Err(FrameError::OutOfBounds(_))));
    }

    #[test]
    fn samples_only_inside_the_rectangle() {
        // 左上象限为红色，裁剪该象限后输出应整体为红色
        let asset = quadrant_asset(200);
        let cropped = FrameHandler::extract_region(&asset, CropRectangle::square(0, 0, 100), FilterType::Nearest)
            .expect("extract should succeed");

        assert_eq!(*cropped.pixels().get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*cropped.pixels().get_pixel(1079, 1079), Rgba([255, 0, 0, 255]));
        assert_eq!(*cropped.pixels().get_pixel(540, 540), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn extraction_is_deterministic() {
        let asset = quadrant_asset(300);
        let rect = CropRectangle::square(50, 60, 200);

        let a = FrameHandler::extract_region(&asset, rect, FilterType::Triangle).expect("extract should succeed");
        let b = FrameHandler::extract_region(&asset, rect, FilterType::Triangle).expect("extract should succeed");

        assert_eq!(a.pixels().as_raw(), b.pixels().as_raw());
    }

    #[test]
    fn imageops_fallback_matches_canvas_size() {
        let asset = quadrant_asset(64);
        let pixels = FrameHandler::resize_region_with_imageops(&asset, CropRectangle::square(10, 10, 20), FilterType::Triangle);

        assert_eq!(pixels.dimensions(), (CANVAS_SIZE, CANVAS_SIZE));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn any_valid_rectangle_extracts_to_canvas(
            width in 1u32..300,
            height in 1u32..300,
            side_seed in 0u32..1000,
            x_seed in 0u32..1000,
            y_seed in 0u32..1000,
        ) {
            let asset = solid_asset(width, height);
            let short = width.min(height);
            let side = 1 + side_seed % short;
            let x = x_seed % (width - side + 1);
            let y = y_seed % (height - side + 1);

            let cropped = FrameHandler::extract_region(&asset, CropRectangle::square(x, y, side), FilterType::Nearest)
                .expect("valid rectangle should extract");

            prop_assert_eq!(cropped.pixels().dimensions(), (CANVAS_SIZE, CANVAS_SIZE));
        }
    }
}
