//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `FrameConfig`，保证运行时行为可观测、可调整、可测试。
//! 画布尺寸、模板摆放位置、缩放范围属于产品契约，以常量形式固定，不进入运行时配置。
//! 重采样档位（quality / balanced / speed）作为高层语义，映射到底层滤镜。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置。
//! - `ResampleProfile` 负责档位字符串解析与反向输出。
//! - `apply_resample_profile` 将档位转换为具体滤镜。
//! - `infer_resample_profile` 用于从当前配置反推档位（给前端展示状态）。

use image::imageops::FilterType;

use super::FrameError;
use super::geometry::PlacementRect;

/// 输出画布边长（像素），裁剪图与合成图均为该尺寸的正方形。
pub const CANVAS_SIZE: u32 = 1080;

/// 模板在画布坐标系中的固定摆放位置。
///
/// 左右各超出画布 50 像素，由画布边界裁切。
pub const OVERLAY_PLACEMENT: PlacementRect = PlacementRect {
    x: -50,
    y: 692,
    width: 1200,
    height: 400,
};

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 3.0;

/// 导出文件名。
pub const EXPORT_FILENAME: &str = "facebook-profile.png";
/// 导出 MIME 类型。
pub const EXPORT_MIME: &str = "image/png";

/// 建议上传体积上限（字节），仅供 UI 层提示，核心不强制。
pub const ADVISORY_UPLOAD_LIMIT: u64 = 10 * 1024 * 1024;

/// 图片帧处理配置。
///
/// 字段覆盖了读取、解码与重采样三个阶段。
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 裁剪区域缩放到画布时使用的滤镜。
    pub resize_filter: FilterType,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            resize_filter: FilterType::Triangle,
        }
    }
}

/// 重采样档位（面向产品/用户语义）。
///
/// - `Quality`：尽量保真
/// - `Balanced`：质量与性能平衡
/// - `Speed`：优先出图速度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleProfile {
    Quality,
    Balanced,
    Speed,
}

impl ResampleProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use profile_frame::frame::ResampleProfile;
    ///
    /// let p = ResampleProfile::parse("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), profile_frame::frame::FrameError>(())
    /// ```
    pub fn parse(profile: &str) -> Result<Self, FrameError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(FrameError::InvalidFormat(format!(
                "未知重采样档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    /// 将档位输出为稳定字符串，供前端展示与持久化。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl FrameConfig {
    /// 基于当前滤镜反推档位。
    pub(crate) fn infer_resample_profile(&self) -> ResampleProfile {
        match self.resize_filter {
            FilterType::CatmullRom | FilterType::Lanczos3 | FilterType::Gaussian => {
                ResampleProfile::Quality
            }
            FilterType::Nearest => ResampleProfile::Speed,
            FilterType::Triangle => ResampleProfile::Balanced,
        }
    }

    /// 应用指定档位到实际参数。
    pub(crate) fn apply_resample_profile(&mut self, profile: ResampleProfile) {
        self.resize_filter = match profile {
            ResampleProfile::Quality => FilterType::CatmullRom,
            ResampleProfile::Balanced => FilterType::Triangle,
            ResampleProfile::Speed => FilterType::Nearest,
        };
    }
}
