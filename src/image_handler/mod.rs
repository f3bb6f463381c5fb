//! # 图片编码模块（image_handler）
//!
//! ## 设计思路
//!
//! 把用户选择的任意图片转换成体积受限的 JPEG data URI，直接内嵌进文档记录，
//! 不再单独存放二进制资源。按职责拆分为多个子模块：
//!
//! - `service`：异步入口，阻塞线程池中执行编码
//! - `handler`：编排整条编码流程（尺寸归一化 → 质量退避 → 尺寸兜底）
//! - `loader`：负责 字节/Base64/文件 加载与签名校验
//! - `pipeline`：`ImageCodec` 抽象与生产实现 `JpegCodec`
//! - `config/error/source`：配置、错误、数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! 内容层 Journal::attach_image
//!    ↓
//! service.rs（spawn_blocking）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + 体积/签名校验）
//!    └─ pipeline.rs（解码 + 缩放 + JPEG 编码）
//!    ↓
//! EncodedArtifact（text() 即 data URI）
//! ```
//!
//! ## 分层职责建议
//!
//! - 预算、质量、档位变更优先改 `config.rs`
//! - 退避策略变更优先改 `handler.rs`
//! - 编解码实现替换只需实现 `ImageCodec`

mod config;
mod error;
mod handler;
mod loader;
mod pipeline;
mod service;
mod source;

pub use config::{
    DEFAULT_MAX_WIDTH, DEFAULT_QUALITY_PERCENT, DEFAULT_SIZE_BUDGET_BYTES, EncodeOptions,
    EncodeProfile, ImageConfig, Quality,
};
pub use error::ImageError;
pub use handler::{ImageHandler, fallback_dimensions, normalized_dimensions};
pub use loader::parse_base64;
pub use pipeline::{ImageCodec, JpegCodec};
pub use service::ImageServiceState;
pub use source::{ArtifactSummary, Dimensions, EncodedArtifact, ImageInput, JPEG_MIME};
