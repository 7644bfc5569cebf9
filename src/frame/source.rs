//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已读取但未解码的字节
//! - `ImageAsset` 表示已解码、不可变的 RGBA 像素
//! - `CroppedRaster` / `CompositedImage` 表示固定尺寸的画布产物

use std::path::PathBuf;

use image::RgbaImage;

use super::FrameError;

/// 图片输入来源。
pub enum ImageSource {
    /// 内存字节（例如宿主已读取的上传文件）。
    Bytes(Vec<u8>),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 本地文件路径来源。
    FilePath(PathBuf),
    /// 随程序打包的静态资源。
    Static(&'static [u8]),
}

impl ImageSource {
    pub(crate) fn hint(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Base64(_) => "base64",
            Self::FilePath(_) => "file",
            Self::Static(_) => "static",
        }
    }
}

/// 读取阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 解码后的不可变图片。
///
/// 由请求解码的一方持有（通常以 `Arc` 共享），被新上传替换时随之释放。
#[derive(Debug)]
pub struct ImageAsset {
    pixels: RgbaImage,
    source_hint: &'static str,
}

impl ImageAsset {
    pub(crate) fn new(pixels: RgbaImage, source_hint: &'static str) -> Self {
        Self { pixels, source_hint }
    }

    /// 直接由宿主已解码的 RGBA 像素构造（宽高必须为正）。
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self, FrameError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(FrameError::Decode(format!(
                "图片尺寸无效：{}x{}",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self::new(pixels, "rgba"))
    }

    pub fn natural_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn source_hint(&self) -> &'static str {
        self.source_hint
    }
}

/// 裁剪输出：固定 `CANVAS_SIZE` 边长的正方形。
#[derive(Debug, Clone)]
pub struct CroppedRaster {
    pub(crate) pixels: RgbaImage,
}

impl CroppedRaster {
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// 合成输出：裁剪图叠加模板后的最终画布。
#[derive(Debug, Clone, PartialEq)]
pub struct CompositedImage {
    pub(crate) pixels: RgbaImage,
}

impl CompositedImage {
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}
