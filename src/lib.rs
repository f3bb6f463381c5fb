//! # 恋爱日记站点 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                页面 / CMS 表单 (外部)                      │
//! │   首页 ── 个人页 ── 动态流 ── 故事 ── 精选 ── 后台         │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕              库 (Rust)                           │
//! │                                                          │
//! │  ┌─ auth ─────── Session (登录态)                        │
//! │  ├─ journal ──── 内容层: 动态/故事/精选/首页/恋爱进度     │
//! │  │     │                                                 │
//! │  │     ├── db ──────────── DocumentStore (内存 / SQLite) │
//! │  │     └── image_handler ─ 自适应 JPEG 编码 → data URI   │
//! │  ├─ settings ─── SiteConfig (不可变站点配置)              │
//! │  ├─ format ───── 相对时间 / 日期展示                      │
//! │  └─ error ────── AppError (统一错误类型)                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`auth`] | 会话登录态与写操作把关 |
//! | [`db`] | 通用文档存储接口及内存、SQLite 实现 |
//! | [`image_handler`] | 图片加载、解码、缩放与按体积预算自适应编码 |
//! | [`journal`] | 站点内容的读写操作 |
//! | [`settings`] | 用户资料、标签、图标、渐变与里程碑配置 |
//! | [`format`] | 时间展示格式化 |

pub mod auth;
pub mod db;
pub mod error;
pub mod format;
pub mod image_handler;
pub mod journal;
pub mod settings;
