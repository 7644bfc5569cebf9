//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `FrameHandler` 只负责流程编排、状态机与配置管理，不绑定任何 UI 或运行时。
//! 状态流转固定为：
//!
//! ```text
//! Idle → Loaded → (拖动/缩放)* → Cropped → Composited → Exported
//!          ↑                                              │
//!          └──────────────── 更换照片 ─────────────────────┘
//! ```
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<FrameConfig>>` 支持运行时动态切档，单次请求内使用同一配置快照。
//! - 解码请求携带单调递增的 `DecodeTicket`，只有最新票据的结果会被采纳。
//! - 任一步出错都不修改已有状态，会话停留在最后一个合法状态。

use std::sync::{Arc, RwLock};

use super::export::DownloadSink;
use super::{
    CompositedImage, CropRectangle, CropSession, CroppedRaster, ExportedFile, FrameConfig, FrameError,
    ImageAsset, ImageSource, ResampleProfile, TemplateOverlay,
};

/// 流程所处阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    Idle,
    Loaded,
    Cropped,
    Composited,
    Exported,
}

impl FrameStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Cropped => "cropped",
            Self::Composited => "composited",
            Self::Exported => "exported",
        }
    }
}

/// 解码请求票据；只有与处理器当前代数一致时结果才会被采纳。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTicket(u64);

/// 图片帧处理器。
pub struct FrameHandler {
    pub(super) config: Arc<RwLock<FrameConfig>>,
    overlay: Arc<TemplateOverlay>,
    session: CropSession,
    stage: FrameStage,
    confirmed: Option<CropRectangle>,
    cropped: Option<CroppedRaster>,
    composited: Option<Arc<CompositedImage>>,
    decode_generation: u64,
}

impl FrameHandler {
    /// 根据初始配置与共享模板创建处理器。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use profile_frame::frame::{FrameConfig, FrameHandler, TemplateOverlay};
    ///
    /// let overlay = TemplateOverlay::shared(include_bytes!("../assets/template.png"))?;
    /// let handler = FrameHandler::new(FrameConfig::default(), overlay);
    /// # Ok::<(), profile_frame::frame::FrameError>(())
    /// ```
    pub fn new(config: FrameConfig, overlay: Arc<TemplateOverlay>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            overlay,
            session: CropSession::idle(),
            stage: FrameStage::Idle,
            confirmed: None,
            cropped: None,
            composited: None,
            decode_generation: 0,
        }
    }

    /// 获取配置快照。
    pub(crate) fn config_snapshot(&self) -> Result<FrameConfig, FrameError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| FrameError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 设置重采样档位。
    pub fn set_resample_profile(&self, profile: ResampleProfile) -> Result<(), FrameError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| FrameError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_resample_profile(profile);

        log::info!("⚙️ 已切换重采样档位：{:?}（filter={:?}）", profile, config.resize_filter);

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn get_resample_profile(&self) -> Result<ResampleProfile, FrameError> {
        let config = self
            .config
            .read()
            .map_err(|_| FrameError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_resample_profile())
    }

    /// 设置读取/解码资源上限。
    pub fn set_limits(
        &self,
        max_file_size: u64,
        max_decoded_pixels: u64,
        max_decoded_bytes: u64,
    ) -> Result<(), FrameError> {
        if !(1024 * 1024..=200 * 1024 * 1024).contains(&max_file_size) {
            return Err(FrameError::InvalidFormat("max_file_size 必须在 1MB~200MB 之间".to_string()));
        }
        if !(1_000_000..=200_000_000).contains(&max_decoded_pixels) {
            return Err(FrameError::InvalidFormat(
                "max_decoded_pixels 必须在 1000000~200000000 之间".to_string(),
            ));
        }
        if max_decoded_bytes < 8 * 1024 * 1024 {
            return Err(FrameError::InvalidFormat("max_decoded_bytes 不能小于 8MB".to_string()));
        }

        let mut config = self
            .config
            .write()
            .map_err(|_| FrameError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.max_file_size = max_file_size;
        config.max_decoded_pixels = max_decoded_pixels;
        config.max_decoded_bytes = max_decoded_bytes;

        Ok(())
    }

    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    pub fn session(&self) -> &CropSession {
        &self.session
    }

    pub fn overlay(&self) -> &Arc<TemplateOverlay> {
        &self.overlay
    }

    pub fn current_rectangle(&self) -> Option<CropRectangle> {
        self.session.current_rectangle()
    }

    pub fn confirmed_rectangle(&self) -> Option<CropRectangle> {
        self.confirmed
    }

    pub fn cropped(&self) -> Option<&CroppedRaster> {
        self.cropped.as_ref()
    }

    pub fn composited(&self) -> Option<Arc<CompositedImage>> {
        self.composited.clone()
    }

    /// 发起一次解码请求，之前未完成的请求随之作废。
    pub fn begin_decode(&mut self) -> DecodeTicket {
        self.decode_generation += 1;
        DecodeTicket(self.decode_generation)
    }

    /// 作废所有进行中的解码请求。
    pub fn cancel_pending_decode(&mut self) {
        self.decode_generation += 1;
        log::debug!("🛑 已作废进行中的解码请求 - generation={}", self.decode_generation);
    }

    pub fn is_current(&self, ticket: DecodeTicket) -> bool {
        ticket.0 == self.decode_generation
    }

    /// 提交解码结果；票据过期时丢弃结果并返回 `Cancelled`。
    pub fn finish_decode(&mut self, ticket: DecodeTicket, asset: ImageAsset) -> Result<(), FrameError> {
        if !self.is_current(ticket) {
            log::warn!(
                "⚠️ 丢弃过期解码结果 - ticket={} current={}",
                ticket.0,
                self.decode_generation
            );
            return Err(FrameError::Cancelled("图片已被更换，旧的解码结果已丢弃".to_string()));
        }

        self.replace_photo(Arc::new(asset));
        Ok(())
    }

    /// 同步加载：读取 → 解码 → 开始新会话。
    pub fn load(&mut self, source: ImageSource) -> Result<(), FrameError> {
        let ticket = self.begin_decode();
        let config = self.config_snapshot()?;
        let asset = Self::load_asset(source, &config)?;
        self.finish_decode(ticket, asset)
    }

    /// 更换照片：开始新会话并丢弃所有下游产物。
    pub fn replace_photo(&mut self, asset: Arc<ImageAsset>) {
        let previous = self.stage;
        self.decode_generation += 1;
        self.session = CropSession::begin(asset);
        self.confirmed = None;
        self.cropped = None;
        self.composited = None;
        self.stage = FrameStage::Loaded;

        log::info!("🔄 进入新会话 - 上一阶段: {}", previous.as_str());
    }

    pub fn set_zoom(&mut self, zoom: f64) -> Result<CropRectangle, FrameError> {
        let rect = self.session.set_zoom(zoom)?;
        self.reopen_crop(rect);
        Ok(rect)
    }

    pub fn set_pan(&mut self, dx: f64, dy: f64) -> Result<CropRectangle, FrameError> {
        let rect = self.session.set_pan(dx, dy)?;
        self.reopen_crop(rect);
        Ok(rect)
    }

    pub fn set_viewport(&mut self, side_px: f64) -> Result<CropRectangle, FrameError> {
        let rect = self.session.set_viewport(side_px)?;
        self.reopen_crop(rect);
        Ok(rect)
    }

    pub fn pan_by_display(&mut self, dx: f64, dy: f64) -> Result<CropRectangle, FrameError> {
        let rect = self.session.pan_by_display(dx, dy)?;
        self.reopen_crop(rect);
        Ok(rect)
    }

    /// 确认后矩形发生变化：旧的裁剪图与合成图整体作废，回到 `Loaded`。
    ///
    /// 矩形未变（例如只改了预览框尺寸，或平移被夹紧）时保留下游产物。
    fn reopen_crop(&mut self, rect: CropRectangle) {
        if self.confirmed == Some(rect) {
            return;
        }
        if matches!(self.stage, FrameStage::Cropped | FrameStage::Composited | FrameStage::Exported) {
            self.confirmed = None;
            self.cropped = None;
            self.composited = None;
            self.stage = FrameStage::Loaded;
            log::debug!("🔁 裁剪区域已调整，丢弃旧的合成结果");
        }
    }

    /// 确认裁剪并自动合成。
    pub fn confirm(&mut self) -> Result<Arc<CompositedImage>, FrameError> {
        let rect = self.session.confirm()?;
        let asset = Arc::clone(self.session.asset().ok_or(FrameError::NoActiveImage)?);
        let config = self.config_snapshot()?;

        let cropped = Self::extract_region(&asset, rect, config.resize_filter)?;
        self.confirmed = Some(rect);
        self.cropped = Some(cropped);
        self.composited = None;
        self.stage = FrameStage::Cropped;

        self.composite_current()
    }

    /// 用当前裁剪图重新合成。
    pub fn composite_current(&mut self) -> Result<Arc<CompositedImage>, FrameError> {
        let cropped = self.cropped.as_ref().ok_or(FrameError::IncompleteGeometry)?;
        let composited = Arc::new(Self::composite(cropped, &self.overlay)?);

        self.composited = Some(Arc::clone(&composited));
        self.stage = FrameStage::Composited;

        Ok(composited)
    }

    /// 只编码当前合成图，不交付，阶段保持不变。
    pub fn encode_current(&self, filename: &str) -> Result<ExportedFile, FrameError> {
        let image = self.composited.as_ref().ok_or(FrameError::NothingToExport)?;
        Self::encode_png(image, filename)
    }

    /// 编码并交付给宿主下载机制。
    pub fn export_to(&mut self, filename: &str, sink: &dyn DownloadSink) -> Result<ExportedFile, FrameError> {
        let image = self.composited.clone().ok_or(FrameError::NothingToExport)?;
        let file = Self::encode_png(&image, filename)?;
        sink.deliver(&file)?;
        self.mark_exported(&image);
        Ok(file)
    }

    /// 仅当导出的仍是当前合成图时才推进到 `Exported`。
    pub(crate) fn mark_exported(&mut self, image: &Arc<CompositedImage>) -> bool {
        let is_current = self
            .composited
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, image));
        if is_current {
            self.stage = FrameStage::Exported;
        }
        is_current
    }
}
