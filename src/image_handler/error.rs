//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载编码链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 注意：体积预算未达标不是错误，产物照常返回（见 `handler.rs`）。

/// 图片编码统一错误类型。
///
/// 该类型会在内容层被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// 输入字节无法识别或解码为图片，不重试。
    #[error("解码错误：{0}")]
    Decode(String),

    /// 已解码的像素重新编码失败，不重试。
    #[error("编码错误：{0}")]
    Encode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}
