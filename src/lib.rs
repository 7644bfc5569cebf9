//! # 头像帧生成工具：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              展示层（宿主：WebView / 桌面 / CLI）           │
//! │                                                          │
//! │  上传 ── 预览拖动/缩放 ── 确认 ── 下载                      │
//! │    │          │             │       │                    │
//! │    └──── FrameServiceState（订阅 FrameEvent）─────┘        │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<T, FrameError> / FrameEventPayload (JSON)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                            │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ frame ────── 读取·裁剪·提取·合成·导出                  │
//! │  │   ├─ session        交互裁剪矩形                       │
//! │  │   ├─ extract        区域重采样到 1080×1080             │
//! │  │   ├─ composite      活动模板叠加                       │
//! │  │   └─ export         PNG 编码 + 下载交付                │
//! │  │                                                       │
//! │  ├─ settings           重采样档位与资源上限持久化          │
//! │  └─ storage            导出目录 (返回 Result)             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，宿主侧 IPC 的返回类型 |
//! | [`frame`] | 照片读取、交互裁剪、模板合成、PNG 导出的完整流水线 |
//! | [`settings`] | `FrameSettings` JSON 读写并应用到处理器 |
//! | [`storage`] | 导出目录的获取与自动创建 |

pub mod error;
pub mod frame;
pub mod settings;
pub mod storage;
