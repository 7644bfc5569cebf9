//! # 模板叠加层
//!
//! ## 设计思路
//!
//! 活动模板是全进程共享的只读资源：首次使用时解码并缩放到摆放尺寸，之后不再改动。
//! 摆放位置是常量，与用户上传的图片无关，保证模板始终落在同一视觉位置。
//!
//! ## 实现思路
//!
//! - `once_cell::sync::OnceCell` 保存全局实例，初始化失败不会写入，下次调用可重试。
//! - 模板在构造时一次性缩放到 `OVERLAY_PLACEMENT` 的宽高，合成时只做逐像素混合。

use image::RgbaImage;
use image::imageops::FilterType;
use once_cell::sync::OnceCell;
use std::sync::Arc;

use super::config::OVERLAY_PLACEMENT;
use super::geometry::PlacementRect;
use super::{FrameConfig, FrameError, FrameHandler, ImageAsset, ImageSource};

static SHARED_TEMPLATE: OnceCell<Arc<TemplateOverlay>> = OnceCell::new();

/// 活动模板：缩放后的像素 + 固定摆放位置。
#[derive(Debug)]
pub struct TemplateOverlay {
    pixels: RgbaImage,
    placement: PlacementRect,
}

impl TemplateOverlay {
    /// 由已解码的模板构造，按固定摆放位置缩放。
    pub fn from_asset(asset: &ImageAsset) -> Self {
        Self::with_placement(asset, OVERLAY_PLACEMENT)
    }

    pub(crate) fn with_placement(asset: &ImageAsset, placement: PlacementRect) -> Self {
        let pixels = if asset.pixels().dimensions() == (placement.width, placement.height) {
            asset.pixels().clone()
        } else {
            image::imageops::resize(asset.pixels(), placement.width, placement.height, FilterType::Triangle)
        };

        Self { pixels, placement }
    }

    /// 获取全局共享模板；首次调用时从 `bytes` 解码。
    ///
    /// 之后的调用直接返回同一实例，`bytes` 被忽略。
    pub fn shared(bytes: &'static [u8]) -> Result<Arc<TemplateOverlay>, FrameError> {
        SHARED_TEMPLATE
            .get_or_try_init(|| {
                let asset = FrameHandler::load_asset(ImageSource::Static(bytes), &FrameConfig::default())?;
                log::info!(
                    "🖼️ 活动模板已加载 - 原始尺寸: {}x{} 摆放: ({}, {}) {}x{}",
                    asset.natural_width(),
                    asset.natural_height(),
                    OVERLAY_PLACEMENT.x,
                    OVERLAY_PLACEMENT.y,
                    OVERLAY_PLACEMENT.width,
                    OVERLAY_PLACEMENT.height
                );
                Ok(Arc::new(Self::from_asset(&asset)))
            })
            .cloned()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn placement(&self) -> PlacementRect {
        self.placement
    }
}
