//! # 头像帧模块（frame）
//!
//! ## 设计思路
//!
//! 该模块将“照片读取 → 交互裁剪 → 区域提取 → 模板合成 → PNG 导出”
//! 按职责拆分为多个子模块，每一步的产物都是不可变值，下一步只读取上一步的结果。
//!
//! - `service`：承载可注入状态（`FrameServiceState`），异步门面 + 事件推送
//! - `handler`：状态机编排（Idle → Loaded → Cropped → Composited → Exported）
//! - `loader`：负责字节/Base64/文件读取与安全校验
//! - `decode`：负责解码、EXIF 方向校正、像素与内存限制
//! - `session`：把拖动/缩放翻译为源图坐标下的正方形裁剪矩形
//! - `extract`：把裁剪矩形重采样为 1080×1080 画布
//! - `overlay` / `composite`：活动模板的加载与叠加
//! - `export`：PNG 编码与宿主下载交付
//! - `config/error/geometry/source/events`：配置、错误、几何、中间数据模型与事件
//!
//! ## 实现思路
//!
//! 对外仅暴露必要类型，内部子模块保持 `mod` 私有。
//! 宿主通过 `FrameServiceState` 持有状态，测试可直接构造独立的 `FrameHandler`。
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! 展示层（上传 / 拖动 / 缩放 / 确认 / 下载）
//!    ↓
//! service.rs（锁管理、阻塞任务、手势合并、事件推送）
//!    ↓
//! handler.rs（阶段状态机 + 解码票据）
//!    ├─ loader.rs + decode.rs（读取 + 校验 + 解码）
//!    ├─ session.rs（裁剪矩形推导）
//!    ├─ extract.rs（区域重采样）
//!    ├─ composite.rs + overlay.rs（模板叠加）
//!    └─ export.rs（PNG 编码 + 交付）
//!    ↓
//! FrameEvent / FrameError 返回展示层
//! ```
//!
//! ## 分层职责建议
//!
//! - 画布尺寸、模板位置、缩放范围变更优先改 `config.rs` 中的常量
//! - 业务流程顺序变更优先改 `handler.rs`
//! - 拖动/缩放手感问题优先看 `session.rs`
//! - 输出画质问题优先看 `extract.rs` 与重采样档位

mod composite;
mod config;
mod decode;
mod error;
mod events;
mod export;
mod extract;
mod geometry;
mod handler;
mod loader;
mod overlay;
mod service;
mod session;
mod source;

pub use config::{
    ADVISORY_UPLOAD_LIMIT, CANVAS_SIZE, EXPORT_FILENAME, EXPORT_MIME, FrameConfig, MAX_ZOOM, MIN_ZOOM,
    OVERLAY_PLACEMENT, ResampleProfile,
};
pub use error::FrameError;
pub use events::{FrameEvent, FrameEventPayload, FrameEvents, SubscriptionId};
pub use export::{DirectorySink, DownloadSink, ExportedFile};
pub use geometry::{CropRectangle, PlacementRect};
pub use handler::{DecodeTicket, FrameHandler, FrameStage};
pub use overlay::TemplateOverlay;
pub use service::FrameServiceState;
pub use session::CropSession;
pub use source::{CompositedImage, CroppedRaster, ImageAsset, ImageSource};

/// 单元测试共用的图片构造工具。
#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;
    use std::sync::Arc;

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::{CroppedRaster, ImageAsset, TemplateOverlay, CANVAS_SIZE};

    /// 渐变 PNG（完全不透明）。
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png).expect("png encode failed");
        cursor.into_inner()
    }

    pub(crate) fn solid_asset(width: u32, height: u32) -> ImageAsset {
        ImageAsset::new(RgbaImage::from_pixel(width, height, Rgba([90, 140, 200, 255])), "test")
    }

    /// 四象限着色：左上红、右上绿、左下蓝、右下白。
    pub(crate) fn quadrant_asset(size: u32) -> ImageAsset {
        let half = size / 2;
        let img = RgbaImage::from_fn(size, size, |x, y| match (x < half, y < half) {
            (true, true) => Rgba([255, 0, 0, 255]),
            (false, true) => Rgba([0, 255, 0, 255]),
            (true, false) => Rgba([0, 0, 255, 255]),
            (false, false) => Rgba([255, 255, 255, 255]),
        });
        ImageAsset::new(img, "test")
    }

    pub(crate) fn solid_raster(color: Rgba<u8>) -> CroppedRaster {
        CroppedRaster {
            pixels: RgbaImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, color),
        }
    }

    /// 1200×400 模板：上半透明，下半不透明白色。
    pub(crate) fn band_template_asset() -> ImageAsset {
        let img = RgbaImage::from_fn(1200, 400, |_, y| {
            if y < 200 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        ImageAsset::new(img, "test")
    }

    pub(crate) fn test_overlay() -> Arc<TemplateOverlay> {
        Arc::new(TemplateOverlay::from_asset(&band_template_asset()))
    }
}
