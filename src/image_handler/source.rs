//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线结果”解耦：
//! - `ImageInput` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节
//! - `EncodedArtifact` 表示可直接写入文档字段的编码产物

use base64::{Engine as _, engine::general_purpose};
use serde::Serialize;

use super::Quality;

/// 编码产物的 MIME 类型。
pub const JPEG_MIME: &str = "image/jpeg";

/// 图片输入来源。
pub enum ImageInput {
    /// 内存中的原始字节（例如表单上传的文件内容）。
    Bytes(Vec<u8>),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 本地文件路径来源。
    FilePath(String),
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 像素尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// 编码产物。
///
/// `text()` 是调用方真正持久化的 data URI；体积预算也按它的长度计算。
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedArtifact {
    mime: &'static str,
    bytes: Vec<u8>,
    text: String,
    dimensions: Dimensions,
    quality: Quality,
    fallback_applied: bool,
}

impl EncodedArtifact {
    /// 由编码后的字节构建产物，同时生成 data URI。
    pub fn new(mime: &'static str, bytes: Vec<u8>, dimensions: Dimensions, quality: Quality) -> Self {
        let text = format!(
            "data:{};base64,{}",
            mime,
            general_purpose::STANDARD.encode(&bytes)
        );
        Self {
            mime,
            bytes,
            text,
            dimensions,
            quality,
            fallback_applied: false,
        }
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 编码字节长度。
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// data URI 文本表示。
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// 是否经过了尺寸兜底缩放。
    pub fn fallback_applied(&self) -> bool {
        self.fallback_applied
    }

    pub(crate) fn mark_fallback(mut self) -> Self {
        self.fallback_applied = true;
        self
    }

    /// 产物摘要，用于日志与命令行输出。
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            mime: self.mime,
            width: self.dimensions.width,
            height: self.dimensions.height,
            quality: self.quality.as_fraction(),
            size_bytes: self.size_bytes(),
            text_len: self.text_len(),
            fallback_applied: self.fallback_applied,
        }
    }
}

/// 产物摘要（不含图片内容）。
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
    pub quality: f32,
    pub size_bytes: usize,
    pub text_len: usize,
    pub fallback_applied: bool,
}
