//! # 读取与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（内存字节 / Base64 / 本地文件 / 静态资源）的原始字节读取，
//! 并在“尽可能早”的阶段执行输入校验。目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - 字节：体积限制。
//! - Base64：格式解析 + 解码前体积估算 + 解码后体积限制。
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - 所有来源最后统一做文件签名（magic bytes）校验。
//! - 读不到或认不出的输入一律归为 `Decode`，展示层据此提示用户换一张图。

use base64::{Engine as _, engine::general_purpose};
use std::path::Path;

use super::source::RawImageData;
use super::{FrameConfig, FrameError, FrameHandler, ImageSource};

impl FrameHandler {
    /// 按来源读取原始字节并完成签名校验。
    pub(crate) fn read_source(source: ImageSource, config: &FrameConfig) -> Result<RawImageData, FrameError> {
        let source_hint = source.hint();
        let bytes = match source {
            ImageSource::Bytes(bytes) => {
                Self::validate_file_size(bytes.len() as u64, config)?;
                bytes
            }
            ImageSource::Static(bytes) => bytes.to_vec(),
            ImageSource::Base64(data) => Self::load_from_base64(&data, config)?,
            ImageSource::FilePath(path) => Self::load_from_file(&path, config)?,
        };

        Self::validate_image_signature(&bytes)?;

        log::debug!("📥 原始字节读取完成 - 来源: {} 体积: {}KB", source_hint, bytes.len() / 1024);

        Ok(RawImageData { bytes, source_hint })
    }

    fn load_from_base64(data: &str, config: &FrameConfig) -> Result<Vec<u8>, FrameError> {
        log::info!("📝 开始处理 base64 图片");

        let bytes = Self::parse_base64_with_limit(data, config.max_file_size)?;
        Self::validate_file_size(bytes.len() as u64, config)?;
        Ok(bytes)
    }

    fn load_from_file(path: &Path, config: &FrameConfig) -> Result<Vec<u8>, FrameError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        if !path.exists() {
            return Err(FrameError::Decode(format!("文件不存在：{}", path.display())));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| FrameError::Decode(format!("无法读取文件信息：{}", e)))?;
        Self::validate_file_size(metadata.len(), config)?;

        std::fs::read(path).map_err(|e| FrameError::Decode(format!("无法读取图片文件：{}", e)))
    }

    fn validate_file_size(len: u64, config: &FrameConfig) -> Result<(), FrameError> {
        if len > config.max_file_size {
            return Err(FrameError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                len as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, FrameError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| FrameError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| FrameError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    /// 解析 Base64 输入（支持 Data URL / 纯 Base64），解码前按估算体积拒绝超限输入。
    fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, FrameError> {
        let normalized = data.trim();

        let payload = if normalized.starts_with("data:") {
            let base64_start = normalized
                .find(";base64,")
                .ok_or_else(|| FrameError::Decode("缺少 base64 标记".to_string()))?;
            &normalized[base64_start + 8..]
        } else {
            normalized
        };

        if payload.is_empty() {
            return Err(FrameError::Decode("Base64 内容为空".to_string()));
        }

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(payload)?;
        if estimated_len > max_file_size {
            return Err(FrameError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| FrameError::Decode(format!("Base64 解码失败：{}", e)))
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), FrameError> {
        if bytes.is_empty() {
            return Err(FrameError::Decode("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| FrameError::Decode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(FrameError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }
}
