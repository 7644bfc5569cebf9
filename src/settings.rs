//! 设置持久化模块
//!
//! 将重采样档位与资源上限以 JSON 形式保存，启动时读取并应用到处理器。
//! 文件不存在视为“使用默认值”，不是错误。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::frame::{FrameConfig, FrameHandler, ResampleProfile};

/// 可持久化的处理设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    pub resample_profile: String,
    pub max_file_size: u64,
    pub max_decoded_pixels: u64,
    pub max_decoded_bytes: u64,
}

impl Default for FrameSettings {
    fn default() -> Self {
        let config = FrameConfig::default();
        Self {
            resample_profile: config.infer_resample_profile().as_str().to_string(),
            max_file_size: config.max_file_size,
            max_decoded_pixels: config.max_decoded_pixels,
            max_decoded_bytes: config.max_decoded_bytes,
        }
    }
}

impl FrameSettings {
    /// 读取设置文件；文件不存在时返回 `Ok(None)`。
    pub fn load(path: &Path) -> Result<Option<Self>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)?;
        let parsed = serde_json::from_str::<Self>(&content)
            .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;

        Ok(Some(parsed))
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("创建设置目录失败: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

        fs::write(path, content)?;
        Ok(())
    }

    /// 读取处理器当前生效的设置。
    pub fn from_handler(handler: &FrameHandler) -> Result<Self, AppError> {
        let profile = handler.get_resample_profile()?;
        let config = handler.config_snapshot()?;

        Ok(Self {
            resample_profile: profile.as_str().to_string(),
            max_file_size: config.max_file_size,
            max_decoded_pixels: config.max_decoded_pixels,
            max_decoded_bytes: config.max_decoded_bytes,
        })
    }

    /// 校验并应用到处理器；任一字段非法时不修改处理器。
    pub fn apply_to(&self, handler: &FrameHandler) -> Result<(), AppError> {
        let profile = ResampleProfile::parse(&self.resample_profile)?;
        handler.set_limits(self.max_file_size, self.max_decoded_pixels, self.max_decoded_bytes)?;
        handler.set_resample_profile(profile)?;

        log::info!(
            "⚙️ 已应用设置 - 档位: {} 文件上限: {}MB 像素上限: {}",
            profile.as_str(),
            self.max_file_size / 1024 / 1024,
            self.max_decoded_pixels
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{TemplateOverlay, ImageAsset};
    use image::RgbaImage;
    use std::sync::Arc;

    fn handler() -> FrameHandler {
        let asset = ImageAsset::from_rgba(RgbaImage::new(1200, 400)).expect("asset should build");
        FrameHandler::new(FrameConfig::default(), Arc::new(TemplateOverlay::from_asset(&asset)))
    }

    #[test]
    fn missing_file_is_none() {
        let root = tempfile::tempdir().expect("tempdir failed");
        let loaded = FrameSettings::load(&root.path().join("settings.json")).expect("load failed");
        assert!(loaded.is_none());
    }

    #[test]
    fn save_then_load_and_apply() {
        let root = tempfile::tempdir().expect("tempdir failed");
        let path = root.path().join("nested").join("settings.json");
        let settings = FrameSettings {
            resample_profile: "quality".to_string(),
            max_file_size: 20 * 1024 * 1024,
            max_decoded_pixels: 30_000_000,
            max_decoded_bytes: 120 * 1024 * 1024,
        };

        settings.save(&path).expect("save failed");
        let loaded = FrameSettings::load(&path).expect("load failed").expect("settings should exist");
        assert_eq!(loaded, settings);

        let h = handler();
        loaded.apply_to(&h).expect("apply failed");
        assert_eq!(FrameSettings::from_handler(&h).expect("read back failed"), settings);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let root = tempfile::tempdir().expect("tempdir failed");
        let path = root.path().join("settings.json");
        fs::write(&path, r#"{"resample_profile":"speed"}"#).expect("write failed");

        let loaded = FrameSettings::load(&path).expect("load failed").expect("settings should exist");

        assert_eq!(loaded.resample_profile, "speed");
        assert_eq!(loaded.max_file_size, FrameConfig::default().max_file_size);
    }

    #[test]
    fn invalid_values_leave_handler_untouched() {
        let h = handler();
        let before = FrameSettings::from_handler(&h).expect("read failed");

        let bad_profile = FrameSettings {
            resample_profile: "ultra".to_string(),
            ..FrameSettings::default()
        };
        assert!(matches!(bad_profile.apply_to(&h), Err(AppError::Frame(_))));

        let bad_limits = FrameSettings {
            resample_profile: "speed".to_string(),
            max_file_size: 1,
            ..FrameSettings::default()
        };
        assert!(bad_limits.apply_to(&h).is_err());

        assert_eq!(FrameSettings::from_handler(&h).expect("read failed"), before);
    }

    #[test]
    fn malformed_json_is_settings_error() {
        let root = tempfile::tempdir().expect("tempdir failed");
        let path = root.path().join("settings.json");
        fs::write(&path, "{not json").expect("write failed");

        assert!(matches!(FrameSettings::load(&path), Err(AppError::Settings(_))));
    }
}
