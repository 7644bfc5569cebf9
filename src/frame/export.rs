//! # 导出模块
//!
//! ## 设计思路
//!
//! 合成图已经是成品，导出只允许无损编码（PNG），保留完整的颜色与透明度。
//! 编码产物交给宿主的下载机制（`DownloadSink`），核心本身不保留导出文件。
//!
//! ## 实现思路
//!
//! - `encode_png` 为纯函数，可放到阻塞线程执行。
//! - `DownloadSink` 是宿主接入点；`DirectorySink` 提供“写入下载目录”的默认实现。
//! - 额外提供 Data URL 形式，便于 WebView 宿主直接触发下载。

use base64::{Engine as _, engine::general_purpose};
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::config::EXPORT_MIME;
use super::{CompositedImage, FrameError, FrameHandler};
use crate::storage;

/// 编码完成、等待交付的导出文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// `data:image/png;base64,...` 形式。
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, general_purpose::STANDARD.encode(&self.bytes))
    }
}

/// 宿主文件交付机制。
pub trait DownloadSink: Send + Sync {
    fn deliver(&self, file: &ExportedFile) -> Result<(), FrameError>;
}

/// 将导出文件写入指定目录（不存在时自动创建）。
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, file: &ExportedFile) -> Result<(), FrameError> {
        let dir = storage::ensure_output_dir(&self.dir).map_err(|e| FrameError::FileSystem(e.to_string()))?;
        let path = dir.join(&file.filename);

        std::fs::write(&path, &file.bytes)
            .map_err(|e| FrameError::FileSystem(format!("写入导出文件失败：{}", e)))?;

        log::info!("💾 导出文件已写入 - 路径: {} 体积: {}KB", path.display(), file.bytes.len() / 1024);
        Ok(())
    }
}

impl FrameHandler {
    /// 将合成图无损编码为 PNG。
    pub fn encode_png(image: &CompositedImage, filename: &str) -> Result<ExportedFile, FrameError> {
        Self::validate_filename(filename)?;

        let start = Instant::now();
        let mut cursor = Cursor::new(Vec::new());
        image
            .pixels()
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| FrameError::Encode(format!("PNG 编码失败：{}", e)))?;
        let bytes = cursor.into_inner();

        if bytes.is_empty() {
            return Err(FrameError::Encode("PNG 编码输出为空".to_string()));
        }

        log::info!(
            "📦 PNG 编码完成 - 文件名: {} 尺寸: {}x{} 体积: {}KB 耗时: {}ms",
            filename,
            image.width(),
            image.height(),
            bytes.len() / 1024,
            start.elapsed().as_millis()
        );

        Ok(ExportedFile {
            filename: filename.to_string(),
            mime_type: EXPORT_MIME,
            bytes,
        })
    }

    fn validate_filename(filename: &str) -> Result<(), FrameError> {
        let trimmed = filename.trim();
        if trimmed.is_empty() {
            return Err(FrameError::InvalidFormat("导出文件名不能为空".to_string()));
        }
        if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
            return Err(FrameError::InvalidFormat(format!("导出文件名不合法：{}", filename)));
        }
        Ok(())
    }
}
