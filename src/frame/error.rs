//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载裁剪/合成链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 错误分三类：
//! - 用户输入问题（`Decode` / `ResourceLimit`）：读不到、认不出或过大，提示用户换一张图
//! - 调用方问题（`InvalidFormat` 非法文件名/档位/参数，`NoActiveImage` / `IncompleteGeometry` /
//!   `NothingToExport` 时序错误）：UI 应禁用对应按钮或修正入参
//! - 交付问题（`Encode` / `FileSystem`）：导出失败，由用户决定是否重试
//! - 内部不变量被破坏（`OutOfBounds` / `InvalidRaster`）：视为缺陷上报，绝不静默修正

/// 图片帧处理统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("尚未加载图片")]
    NoActiveImage,

    #[error("裁剪区域尚未计算完成")]
    IncompleteGeometry,

    #[error("裁剪区域越界：{0}")]
    OutOfBounds(String),

    #[error("画布尺寸异常：{0}")]
    InvalidRaster(String),

    #[error("尚无可导出的合成图")]
    NothingToExport,

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("已取消：{0}")]
    Cancelled(String),
}

impl FrameError {
    /// 稳定错误码，供前端做分支展示。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "E_DECODE",
            Self::InvalidFormat(_) => "E_INVALID_FORMAT",
            Self::FileSystem(_) => "E_FILE_SYSTEM",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::NoActiveImage => "E_NO_ACTIVE_IMAGE",
            Self::IncompleteGeometry => "E_INCOMPLETE_GEOMETRY",
            Self::OutOfBounds(_) => "E_OUT_OF_BOUNDS",
            Self::InvalidRaster(_) => "E_INVALID_RASTER",
            Self::NothingToExport => "E_NOTHING_TO_EXPORT",
            Self::Encode(_) => "E_ENCODE",
            Self::Cancelled(_) => "E_CANCELLED",
        }
    }

    /// 出错阶段，便于日志聚合与前端提示。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Decode(_) | Self::ResourceLimit(_) | Self::Cancelled(_) => "load",
            Self::InvalidFormat(_) => "config",
            Self::NoActiveImage | Self::IncompleteGeometry => "crop",
            Self::OutOfBounds(_) => "extract",
            Self::InvalidRaster(_) => "composite",
            Self::NothingToExport | Self::Encode(_) | Self::FileSystem(_) => "export",
        }
    }

    /// 是否属于内部不变量被破坏（需要作为缺陷上报）。
    pub fn is_internal_bug(&self) -> bool {
        matches!(self, Self::OutOfBounds(_) | Self::InvalidRaster(_))
    }
}
