//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（字节 / Base64 / 本地文件）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - Base64：格式解析 + 解码前体积估算 + 解码后体积限制。
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - 所有来源最后都经过 `infer` 签名校验，非图片内容视为解码失败。

use base64::{Engine as _, engine::general_purpose};
use std::path::Path;

use super::pipeline::ImageCodec;
use super::source::{ImageInput, RawImageData};
use super::{ImageError, ImageHandler};

impl<C: ImageCodec> ImageHandler<C> {
    /// 按来源加载原始字节。
    pub(super) fn load(&self, input: ImageInput) -> Result<RawImageData, ImageError> {
        match input {
            ImageInput::Bytes(bytes) => self.load_from_bytes(bytes),
            ImageInput::Base64(data) => self.load_from_base64(&data),
            ImageInput::FilePath(path) => self.load_from_file(&path),
        }
    }

    fn load_from_bytes(&self, bytes: Vec<u8>) -> Result<RawImageData, ImageError> {
        if bytes.len() as u64 > self.config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "图片体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "bytes",
        })
    }

    /// 从 Base64 字符串加载图片原始字节。
    fn load_from_base64(&self, data: &str) -> Result<RawImageData, ImageError> {
        log::info!("📝 开始处理 base64 图片");

        let bytes = parse_base64_with_limit(data, self.config.max_file_size)?;

        if bytes.len() as u64 > self.config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "base64",
        })
    }

    /// 从本地路径加载图片原始字节。
    fn load_from_file(&self, path: &str) -> Result<RawImageData, ImageError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path);

        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(ImageError::FileSystem(format!("文件不存在：{}", path)));
        }

        let metadata = std::fs::metadata(file_path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > self.config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(file_path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取图片文件：{}", e)))?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "file",
        })
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Decode("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ImageError::Decode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }
}

/// 解析 Base64 输入（支持 Data URL / 纯 Base64）。
pub fn parse_base64(data: &str) -> Result<Vec<u8>, ImageError> {
    parse_base64_with_limit(data, u64::MAX)
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
    let len = base64_data.trim().len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
}

fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, ImageError> {
    let normalized = data.trim();

    let payload = if normalized.starts_with("data:") {
        if !normalized.starts_with("data:image/") {
            return Err(ImageError::InvalidFormat("Data URL 不是图片类型".to_string()));
        }
        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| ImageError::InvalidFormat("缺少 base64 标记".to_string()))?;
        &normalized[base64_start + 8..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(payload)?;
    if estimated_len > max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ImageError::InvalidFormat(format!("Base64 解码失败：{}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::ImageConfig;

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn load_from_base64_rejects_non_image_payload() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");

        let result = handler.load(ImageInput::Base64("SGVsbG8=".to_string()));

        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn parse_base64_with_limit_rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = parse_base64_with_limit(&huge, 32);

        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn parse_base64_accepts_data_url_and_plain_forms() {
        let plain = general_purpose::STANDARD.encode(PNG_SIGNATURE);
        let data_url = format!("data:image/png;base64,{}", plain);

        assert_eq!(parse_base64(&plain).expect("plain"), PNG_SIGNATURE.to_vec());
        assert_eq!(parse_base64(&data_url).expect("data url"), PNG_SIGNATURE.to_vec());
    }

    #[test]
    fn parse_base64_rejects_non_image_data_url() {
        let result = parse_base64("data:text/plain;base64,SGVsbG8=");
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));

        let result = parse_base64("data:image/png,raw");
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn load_from_file_reports_missing_path() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let result = handler.load(ImageInput::FilePath("/definitely/missing/photo.png".to_string()));
        assert!(matches!(result, Err(ImageError::FileSystem(_))));
    }

    #[test]
    fn load_from_bytes_enforces_size_limit() {
        let handler = ImageHandler::new(ImageConfig {
            max_file_size: 4,
            ..ImageConfig::default()
        })
        .expect("handler init failed");

        let result = handler.load(ImageInput::Bytes(PNG_SIGNATURE.to_vec()));
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }
}
