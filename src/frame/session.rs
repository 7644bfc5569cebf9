//! # 裁剪会话模块
//!
//! ## 设计思路
//!
//! 把用户在预览上的连续拖动/缩放翻译成源图像素坐标下的正方形裁剪区域。
//! 正方形约束在推导矩形时就强制执行，下游永远拿不到非正方形矩形。
//!
//! ## 实现思路
//!
//! - 视图以“源图坐标下的中心点 + 缩放倍数”描述，矩形由二者推导。
//! - 边长 = `floor(min(W, H) / zoom)`，中心点夹紧到 `[side/2, W - side/2]`。
//! - 每次更新都整体替换 `CropState`，不存在字段级的中间态。
//! - 首次交互之前不计算矩形，此时确认会返回 `IncompleteGeometry`。

use std::sync::Arc;

use super::config::{MAX_ZOOM, MIN_ZOOM};
use super::{CropRectangle, FrameError, ImageAsset};

/// 会话的完整视图状态，整体替换。
#[derive(Debug, Clone, Copy, PartialEq)]
struct CropState {
    zoom: f64,
    center_x: f64,
    center_y: f64,
    rect: Option<CropRectangle>,
}

/// 交互式裁剪会话。
#[derive(Debug, Default)]
pub struct CropSession {
    asset: Option<Arc<ImageAsset>>,
    state: Option<CropState>,
    /// 预览框在屏幕上的边长（显示像素）。
    viewport_side: Option<f64>,
}

impl CropSession {
    /// 空会话（未加载图片）。
    pub fn idle() -> Self {
        Self::default()
    }

    /// 基于新图片开始会话：居中、缩放 1.0，矩形待首次交互后计算。
    pub fn begin(asset: Arc<ImageAsset>) -> Self {
        let state = CropState {
            zoom: MIN_ZOOM,
            center_x: f64::from(asset.natural_width()) / 2.0,
            center_y: f64::from(asset.natural_height()) / 2.0,
            rect: None,
        };

        Self {
            asset: Some(asset),
            state: Some(state),
            viewport_side: None,
        }
    }

    pub fn asset(&self) -> Option<&Arc<ImageAsset>> {
        self.asset.as_ref()
    }

    pub fn zoom(&self) -> Option<f64> {
        self.state.map(|state| state.zoom)
    }

    /// 当前裁剪矩形；首次交互前为 `None`。
    pub fn current_rectangle(&self) -> Option<CropRectangle> {
        self.state.and_then(|state| state.rect)
    }

    /// 设置缩放倍数（夹紧到 `[1, 3]`），保持视图中心。
    pub fn set_zoom(&mut self, zoom: f64) -> Result<CropRectangle, FrameError> {
        let current = self.active_state()?;
        let zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            MIN_ZOOM
        };

        self.apply(CropState { zoom, ..current })
    }

    /// 按源图像素平移视图。
    pub fn set_pan(&mut self, dx: f64, dy: f64) -> Result<CropRectangle, FrameError> {
        let current = self.active_state()?;
        let dx = if dx.is_finite() { dx } else { 0.0 };
        let dy = if dy.is_finite() { dy } else { 0.0 };

        self.apply(CropState {
            center_x: current.center_x + dx,
            center_y: current.center_y + dy,
            ..current
        })
    }

    /// 记录预览框的显示边长，用于显示坐标与源图坐标之间的换算。
    pub fn set_viewport(&mut self, side_px: f64) -> Result<CropRectangle, FrameError> {
        if !side_px.is_finite() || side_px <= 0.0 {
            return Err(FrameError::InvalidFormat(format!("预览框边长无效：{}", side_px)));
        }
        let current = self.active_state()?;
        self.viewport_side = Some(side_px);
        self.apply(current)
    }

    /// 按显示像素拖动图片：图片右移意味着裁剪窗口在源图中左移。
    pub fn pan_by_display(&mut self, dx: f64, dy: f64) -> Result<CropRectangle, FrameError> {
        let scale = self.display_scale()?;
        self.set_pan(-dx * scale, -dy * scale)
    }

    /// 将预览框内的显示坐标换算为源图像素坐标。
    pub fn display_to_source(&self, px: f64, py: f64) -> Result<(f64, f64), FrameError> {
        let scale = self.display_scale()?;
        let rect = self.current_rectangle().ok_or(FrameError::IncompleteGeometry)?;
        Ok((f64::from(rect.x) + px * scale, f64::from(rect.y) + py * scale))
    }

    /// 冻结当前矩形。未交互前调用会失败；重复调用结果一致。
    pub fn confirm(&self) -> Result<CropRectangle, FrameError> {
        let state = self.active_state()?;
        let rect = state.rect.ok_or(FrameError::IncompleteGeometry)?;

        log::debug!(
            "✂️ 确认裁剪区域 - ({}, {}, {}x{}) zoom={:.2}",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            state.zoom
        );

        Ok(rect)
    }

    fn active_state(&self) -> Result<CropState, FrameError> {
        self.state.ok_or(FrameError::NoActiveImage)
    }

    fn display_scale(&self) -> Result<f64, FrameError> {
        let viewport = self.viewport_side.ok_or(FrameError::IncompleteGeometry)?;
        let state = self.active_state()?;
        let asset = self.asset.as_ref().ok_or(FrameError::NoActiveImage)?;
        let side = Self::side_for(asset, state.zoom);
        Ok(f64::from(side) / viewport)
    }

    fn side_for(asset: &ImageAsset, zoom: f64) -> u32 {
        let short = asset.natural_width().min(asset.natural_height());
        ((f64::from(short) / zoom).floor() as u32).clamp(1, short)
    }

    /// 由候选视图推导合法状态并整体替换。
    fn apply(&mut self, candidate: CropState) -> Result<CropRectangle, FrameError> {
        let asset = self.asset.as_ref().ok_or(FrameError::NoActiveImage)?;
        let width = asset.natural_width();
        let height = asset.natural_height();

        let side = Self::side_for(asset, candidate.zoom);
        let half = f64::from(side) / 2.0;
        let center_x = candidate.center_x.clamp(half, f64::from(width) - half);
        let center_y = candidate.center_y.clamp(half, f64::from(height) - half);

        let x = ((center_x - half).round() as i64).clamp(0, i64::from(width - side)) as u32;
        let y = ((center_y - half).round() as i64).clamp(0, i64::from(height - side)) as u32;
        let rect = CropRectangle::square(x, y, side);

        self.state = Some(CropState {
            zoom: candidate.zoom,
            center_x,
            center_y,
            rect: Some(rect),
        });

        log::trace!("🔍 裁剪区域更新 - ({}, {}, {}x{})", rect.x, rect.y, side, side);

        Ok(rect)
    }
}
