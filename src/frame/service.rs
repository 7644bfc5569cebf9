//! # 服务层（宿主持有的异步门面）
//!
//! ## 设计思路
//!
//! 使用 `FrameServiceState` 作为宿主注入状态，替代全局单例函数。
//! 好处：
//! 1. 生命周期清晰（由宿主统一管理）
//! 2. 测试可创建独立实例，减少共享状态副作用
//! 3. 展示层只需订阅事件，不需要了解内部状态机
//!
//! ## 实现思路
//!
//! - 解码与编码放到阻塞线程执行，其余操作同步完成。
//! - 解码前领取票据，完成后只在票据仍为最新时提交，过期结果直接丢弃。
//! - 高频拖动/缩放可先排队，`settle` 时按到达顺序一次性重放，只推送一次矩形更新；
//!   `confirm` 总是先 `settle`，不会读到过期的矩形。
//! - 锁从不跨越 `.await` 持有。

use std::sync::{Arc, Mutex, MutexGuard};

use super::config::EXPORT_FILENAME;
use super::events::{FrameEvent, FrameEvents, SubscriptionId};
use super::export::DownloadSink;
use super::{
    CompositedImage, CropRectangle, ExportedFile, FrameConfig, FrameError, FrameHandler, FrameStage,
    ImageSource, ResampleProfile, TemplateOverlay,
};

/// 排队中的手势，`settle` 时按到达顺序重放。
///
/// 夹紧与顺序相关（先平移后缩放与先缩放后平移结果不同），不能做数值合并。
#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingGesture {
    Zoom(f64),
    Pan(f64, f64),
}

/// 图片帧服务状态。
pub struct FrameServiceState {
    handler: Mutex<FrameHandler>,
    pending: Mutex<Vec<PendingGesture>>,
    events: FrameEvents,
}

impl FrameServiceState {
    /// 使用默认配置与全局共享模板创建服务状态。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use profile_frame::frame::FrameServiceState;
    ///
    /// let service = FrameServiceState::new(include_bytes!("../assets/template.png"))?;
    /// # Ok::<(), profile_frame::frame::FrameError>(())
    /// ```
    pub fn new(template: &'static [u8]) -> Result<Self, FrameError> {
        let overlay = TemplateOverlay::shared(template)?;
        Ok(Self::with_overlay(FrameConfig::default(), overlay))
    }

    /// 使用自定义配置与模板创建服务状态。
    ///
    /// 主要用于测试或按场景注入不同策略。
    pub fn with_overlay(config: FrameConfig, overlay: Arc<TemplateOverlay>) -> Self {
        Self {
            handler: Mutex::new(FrameHandler::new(config, overlay)),
            pending: Mutex::new(Vec::new()),
            events: FrameEvents::default(),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Result<SubscriptionId, FrameError>
    where
        F: Fn(&FrameEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, FrameError> {
        self.events.unsubscribe(id)
    }

    fn lock_handler(&self) -> Result<MutexGuard<'_, FrameHandler>, FrameError> {
        self.handler
            .lock()
            .map_err(|_| FrameError::ResourceLimit("处理器状态锁已中毒".to_string()))
    }

    fn lock_pending(&self) -> Result<MutexGuard<'_, Vec<PendingGesture>>, FrameError> {
        self.pending
            .lock()
            .map_err(|_| FrameError::ResourceLimit("手势队列锁已中毒".to_string()))
    }

    /// 错误统一通知展示层后原样返回。
    fn report<T>(&self, result: Result<T, FrameError>) -> Result<T, FrameError> {
        if let Err(err) = &result {
            if err.is_internal_bug() {
                log::error!("❌ 内部不变量被破坏 - code={} stage={} {}", err.code(), err.stage(), err);
            } else {
                log::warn!("⚠️ 操作失败 - code={} stage={} {}", err.code(), err.stage(), err);
            }
            self.events.emit(&FrameEvent::failed(err));
        }
        result
    }

    pub fn stage(&self) -> Result<FrameStage, FrameError> {
        Ok(self.lock_handler()?.stage())
    }

    pub fn current_rectangle(&self) -> Result<Option<CropRectangle>, FrameError> {
        Ok(self.lock_handler()?.current_rectangle())
    }

    pub fn composited(&self) -> Result<Option<Arc<CompositedImage>>, FrameError> {
        Ok(self.lock_handler()?.composited())
    }

    /// 加载（或更换）照片。
    ///
    /// 加载期间若再次调用 `load` 或 `cancel_pending_load`，本次结果会被丢弃并返回 `Cancelled`。
    pub async fn load(&self, source: ImageSource) -> Result<(), FrameError> {
        let (ticket, config) = {
            let mut handler = self.lock_handler()?;
            (handler.begin_decode(), handler.config_snapshot()?)
        };

        let decoded = tokio::task::spawn_blocking(move || FrameHandler::load_asset(source, &config))
            .await
            .map_err(|e| FrameError::Decode(format!("解码任务异常终止：{}", e)));

        let asset = match decoded.and_then(|result| result) {
            Ok(asset) => asset,
            Err(err) => {
                if !self.lock_handler()?.is_current(ticket) {
                    log::debug!("🗑️ 过期解码请求失败，忽略：{}", err);
                    return Err(FrameError::Cancelled("图片已被更换".to_string()));
                }
                return self.report(Err(err));
            }
        };
        let (width, height) = (asset.natural_width(), asset.natural_height());

        let previous = {
            let mut handler = self.lock_handler()?;
            let previous = handler.stage();
            handler.finish_decode(ticket, asset)?;
            previous
        };
        self.lock_pending()?.clear();

        if previous != FrameStage::Idle {
            self.events.emit(&FrameEvent::Reset);
        }
        self.events.emit(&FrameEvent::ImageLoaded { width, height });

        Ok(())
    }

    /// 作废进行中的加载。
    pub fn cancel_pending_load(&self) -> Result<(), FrameError> {
        self.lock_handler()?.cancel_pending_decode();
        Ok(())
    }

    fn apply_gesture<F>(&self, gesture: F) -> Result<CropRectangle, FrameError>
    where
        F: FnOnce(&mut FrameHandler) -> Result<CropRectangle, FrameError>,
    {
        let (result, reopened) = {
            let mut handler = self.lock_handler()?;
            let before = handler.stage();
            let result = gesture(&mut handler);
            (result, before != handler.stage())
        };
        let rect = self.report(result)?;

        if reopened {
            self.events.emit(&FrameEvent::Reset);
        }
        self.events.emit(&FrameEvent::RectangleChanged(rect));
        Ok(rect)
    }

    pub fn set_zoom(&self, zoom: f64) -> Result<CropRectangle, FrameError> {
        self.apply_gesture(|h| h.set_zoom(zoom))
    }

    pub fn set_pan(&self, dx: f64, dy: f64) -> Result<CropRectangle, FrameError> {
        self.apply_gesture(|h| h.set_pan(dx, dy))
    }

    pub fn set_viewport(&self, side_px: f64) -> Result<CropRectangle, FrameError> {
        self.apply_gesture(|h| h.set_viewport(side_px))
    }

    pub fn pan_by_display(&self, dx: f64, dy: f64) -> Result<CropRectangle, FrameError> {
        self.apply_gesture(|h| h.pan_by_display(dx, dy))
    }

    /// 排队缩放，不立即计算矩形。
    pub fn queue_zoom(&self, zoom: f64) -> Result<(), FrameError> {
        self.lock_pending()?.push(PendingGesture::Zoom(zoom));
        Ok(())
    }

    /// 排队平移（源图像素），不立即计算矩形。
    pub fn queue_pan(&self, dx: f64, dy: f64) -> Result<(), FrameError> {
        self.lock_pending()?.push(PendingGesture::Pan(dx, dy));
        Ok(())
    }

    /// 按到达顺序应用排队中的手势，只发出一次矩形更新。
    ///
    /// 结果与逐个调用 `set_zoom` / `set_pan` 完全一致，只是省掉了中间态的事件。
    pub fn settle(&self) -> Result<Option<CropRectangle>, FrameError> {
        let pending = std::mem::take(&mut *self.lock_pending()?);
        if pending.is_empty() {
            return self.current_rectangle();
        }

        log::trace!("🧮 合并排队手势 - 数量: {}", pending.len());

        let rect = self.apply_gesture(|h| {
            let mut last = None;
            for gesture in pending {
                last = Some(match gesture {
                    PendingGesture::Zoom(zoom) => h.set_zoom(zoom)?,
                    PendingGesture::Pan(dx, dy) => h.set_pan(dx, dy)?,
                });
            }
            last.ok_or(FrameError::IncompleteGeometry)
        })?;

        Ok(Some(rect))
    }

    /// 确认裁剪并合成；合成结果通过 `Composited` 事件推送给展示层。
    pub fn confirm(&self) -> Result<Arc<CompositedImage>, FrameError> {
        self.settle()?;

        let result = self.lock_handler()?.confirm();
        let composited = self.report(result)?;

        self.events.emit(&FrameEvent::Composited(Arc::clone(&composited)));
        Ok(composited)
    }

    /// 以默认文件名导出并交付。
    pub async fn export(&self, sink: &dyn DownloadSink) -> Result<ExportedFile, FrameError> {
        self.export_as(EXPORT_FILENAME, sink).await
    }

    /// 编码当前合成图并交付给宿主下载机制。
    pub async fn export_as(&self, filename: &str, sink: &dyn DownloadSink) -> Result<ExportedFile, FrameError> {
        let composited = self.lock_handler()?.composited();
        let image = self.report(composited.ok_or(FrameError::NothingToExport))?;

        let encode_image = Arc::clone(&image);
        let encode_name = filename.to_string();
        let encoded = tokio::task::spawn_blocking(move || FrameHandler::encode_png(&encode_image, &encode_name))
            .await
            .map_err(|e| FrameError::Encode(format!("编码任务异常终止：{}", e)))
            .and_then(|result| result);
        let file = self.report(encoded)?;

        self.report(sink.deliver(&file))?;

        if !self.lock_handler()?.mark_exported(&image) {
            log::debug!("📭 导出期间合成图已被替换，阶段不推进");
        }
        self.events.emit(&FrameEvent::Exported {
            filename: file.filename.clone(),
            size_bytes: file.bytes.len(),
        });

        Ok(file)
    }

    /// 设置重采样档位。
    pub fn set_resample_profile(&self, profile: &str) -> Result<(), FrameError> {
        let profile = ResampleProfile::parse(profile)?;
        self.lock_handler()?.set_resample_profile(profile)
    }

    /// 获取当前生效重采样档位（字符串）。
    pub fn get_resample_profile(&self) -> Result<String, FrameError> {
        let profile = self.lock_handler()?.get_resample_profile()?;
        Ok(profile.as_str().to_string())
    }

    /// 在持有处理器的情况下执行只读/配置操作（例如应用设置文件）。
    pub fn with_handler<T>(&self, f: impl FnOnce(&FrameHandler) -> T) -> Result<T, FrameError> {
        Ok(f(&*self.lock_handler()?))
    }
}
