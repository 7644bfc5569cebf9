//! 导出目录管理模块
//!
//! # 设计思路
//!
//! 统一管理导出文件的落盘目录，目录不存在时自动创建，
//! 上层（`DirectorySink`）无需关心目录状态。
//!
//! # 实现思路
//!
//! - 目录不存在时自动 `create_dir_all`，避免上层判断。
//! - 路径存在但不是目录时直接报错，不尝试覆盖。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// 确保导出目录可用
///
/// # 返回
/// - `Ok(PathBuf)`：可用的导出目录
/// - `Err(AppError::Storage)`：无法创建目录，或路径被普通文件占用
pub fn ensure_output_dir(dir: &Path) -> Result<PathBuf, AppError> {
    if dir.as_os_str().is_empty() {
        return Err(AppError::Storage("导出目录不能为空".to_string()));
    }

    if dir.exists() {
        if !dir.is_dir() {
            return Err(AppError::Storage(format!("'{}' 不是目录", dir.display())));
        }
        return Ok(dir.to_path_buf());
    }

    fs::create_dir_all(dir)
        .map_err(|e| AppError::Storage(format!("创建导出目录 '{}' 失败: {}", dir.display(), e)))?;
    log::debug!("📁 已创建导出目录: {}", dir.display());

    Ok(dir.to_path_buf())
}
