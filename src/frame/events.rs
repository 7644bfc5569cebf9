//! # 事件订阅模块
//!
//! ## 设计思路
//!
//! 核心不假设任何渲染或派发机制，只暴露订阅点：
//! 裁剪矩形变化、合成完成、导出完成、重置与错误都会以 `FrameEvent` 通知订阅者。
//! 需要跨 IPC 的宿主可用 `to_payload` 得到可序列化的结构。

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::{CompositedImage, CropRectangle, FrameError};

/// 事件订阅句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// 推送给展示层的事件。
#[derive(Debug, Clone)]
pub enum FrameEvent {
    ImageLoaded { width: u32, height: u32 },
    RectangleChanged(CropRectangle),
    Composited(Arc<CompositedImage>),
    Exported { filename: String, size_bytes: usize },
    Reset,
    Failed {
        code: &'static str,
        stage: &'static str,
        message: String,
    },
}

impl FrameEvent {
    pub(crate) fn failed(error: &FrameError) -> Self {
        Self::Failed {
            code: error.code(),
            stage: error.stage(),
            message: error.to_string(),
        }
    }

    /// 转为可序列化载荷（合成图只携带尺寸，不携带像素）。
    pub fn to_payload(&self) -> FrameEventPayload {
        match self {
            Self::ImageLoaded { width, height } => FrameEventPayload {
                kind: "image-loaded",
                width: Some(*width),
                height: Some(*height),
                ..FrameEventPayload::default()
            },
            Self::RectangleChanged(rect) => FrameEventPayload {
                kind: "rectangle-changed",
                rectangle: Some(*rect),
                ..FrameEventPayload::default()
            },
            Self::Composited(image) => FrameEventPayload {
                kind: "composited",
                width: Some(image.width()),
                height: Some(image.height()),
                ..FrameEventPayload::default()
            },
            Self::Exported { filename, size_bytes } => FrameEventPayload {
                kind: "exported",
                filename: Some(filename.clone()),
                size_bytes: Some(*size_bytes),
                ..FrameEventPayload::default()
            },
            Self::Reset => FrameEventPayload {
                kind: "reset",
                ..FrameEventPayload::default()
            },
            Self::Failed { code, stage, message } => FrameEventPayload {
                kind: "failed",
                error_code: Some(*code),
                stage: Some(*stage),
                error_message: Some(message.clone()),
                ..FrameEventPayload::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameEventPayload {
    pub kind: &'static str,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rectangle: Option<CropRectangle>,
    pub filename: Option<String>,
    pub size_bytes: Option<usize>,
    pub stage: Option<&'static str>,
    pub error_code: Option<&'static str>,
    pub error_message: Option<String>,
}

type Listener = Arc<dyn Fn(&FrameEvent) + Send + Sync>;

/// 订阅者注册表。
#[derive(Default)]
pub struct FrameEvents {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
}

impl FrameEvents {
    pub fn subscribe<F>(&self, listener: F) -> Result<SubscriptionId, FrameError>
    where
        F: Fn(&FrameEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut guard = self
            .listeners
            .lock()
            .map_err(|_| FrameError::ResourceLimit("事件订阅锁已中毒".to_string()))?;
        guard.push((id, Arc::new(listener)));
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, FrameError> {
        let mut guard = self
            .listeners
            .lock()
            .map_err(|_| FrameError::ResourceLimit("事件订阅锁已中毒".to_string()))?;
        let before = guard.len();
        guard.retain(|(existing, _)| *existing != id);
        Ok(guard.len() != before)
    }

    /// 通知所有订阅者。回调在锁外执行，允许回调内再订阅/退订。
    pub(crate) fn emit(&self, event: &FrameEvent) {
        let listeners: Vec<Listener> = match self.listeners.lock() {
            Ok(guard) => guard.iter().map(|(_, listener)| Arc::clone(listener)).collect(),
            Err(_) => {
                log::warn!("⚠️ 事件订阅锁已中毒，丢弃事件");
                return;
            }
        };

        for listener in listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for FrameEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.listeners.lock().map(|guard| guard.len()).unwrap_or(0);
        f.debug_struct("FrameEvents").field("listeners", &count).finish()
    }
}
