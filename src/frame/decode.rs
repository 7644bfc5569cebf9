//! # 解码模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → RGBA”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低超大输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素/内存上限快速拒绝
//! 3. 完整解码并应用 EXIF 方向（与浏览器展示保持一致）
//! 4. 转换 RGBA，并再次校验尺寸

use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::time::Instant;

use super::source::RawImageData;
use super::{FrameConfig, FrameError, FrameHandler, ImageAsset, ImageSource};

impl FrameHandler {
    /// 完整加载链路：读取 → 校验 → 解码。
    ///
    /// 不依赖处理器状态，可直接放到阻塞线程执行。
    pub fn load_asset(source: ImageSource, config: &FrameConfig) -> Result<ImageAsset, FrameError> {
        let start = Instant::now();
        let raw = Self::read_source(source, config)?;
        let asset = Self::decode_asset(raw, config)?;

        log::info!(
            "✅ 图片加载完成 - 来源: {} 尺寸: {}x{} 耗时: {}ms",
            asset.source_hint(),
            asset.natural_width(),
            asset.natural_height(),
            start.elapsed().as_millis()
        );

        Ok(asset)
    }

    /// 将原始字节解码为不可变 RGBA 图片。
    pub(crate) fn decode_asset(raw: RawImageData, config: &FrameConfig) -> Result<ImageAsset, FrameError> {
        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;
        Self::validate_decoded_memory_limits(config, header_width, header_height)?;

        let reader = ImageReader::new(Cursor::new(&raw.bytes))
            .with_guessed_format()
            .map_err(|e| FrameError::Decode(format!("无法识别图片格式：{}", e)))?;
        let mut decoder = reader
            .into_decoder()
            .map_err(|e| FrameError::Decode(format!("图片解码失败：{}", e)))?;
        let orientation = decoder
            .orientation()
            .map_err(|e| FrameError::Decode(format!("读取图片方向失败：{}", e)))?;
        let mut decoded = DynamicImage::from_decoder(decoder)
            .map_err(|e| FrameError::Decode(format!("图片解码失败：{}", e)))?;
        decoded.apply_orientation(orientation);

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(FrameError::Decode(format!("图片尺寸无效：{}x{}", width, height)));
        }
        Self::validate_pixel_limits(config, width, height)?;

        log::debug!(
            "🧩 解码成功 - 来源: {} header: {}x{} 输出: {}x{}",
            raw.source_hint,
            header_width,
            header_height,
            width,
            height
        );

        Ok(ImageAsset::new(rgba, raw.source_hint))
    }

    /// 仅通过内存中的图片头信息读取宽高。
    ///
    /// 用于在完整解码前做像素限制检查。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), FrameError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| FrameError::Decode(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| FrameError::Decode(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(config: &FrameConfig, width: u32, height: u32) -> Result<(), FrameError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| FrameError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(FrameError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn validate_decoded_memory_limits(config: &FrameConfig, width: u32, height: u32) -> Result<(), FrameError> {
        let estimated = (width as u64)
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| FrameError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > config.max_decoded_bytes {
            return Err(FrameError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                config.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }
}
