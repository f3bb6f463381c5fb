//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排，具体编解码交给 `ImageCodec`。
//! 处理链路固定为：
//! 1. 解码一次，得到原始光栅
//! 2. 尺寸归一化（只执行一次，从不放大）
//! 3. 质量退避：每次 -0.1，直到 data URI 长度落入预算或质量降到 0.3
//! 4. 尺寸兜底：仍超预算时按 `sqrt(预算 / 当前长度)` 一次性缩小，固定质量 0.6 编码并直接返回
//!
//! ## 实现思路
//!
//! - 质量与尺寸都是局部变量，单次调用之间不共享任何可变状态。
//! - 兜底步骤只执行一次，即使结果仍然超出预算也照常返回（预算是尽力而为）。
//! - 记录 `decode/resize/encode/total` 阶段耗时，便于性能诊断。

use std::time::Instant;

use super::config::{FALLBACK_QUALITY_PERCENT, QUALITY_FLOOR_PERCENT, QUALITY_STEP_PERCENT};
use super::pipeline::{ImageCodec, JpegCodec};
use super::source::{Dimensions, EncodedArtifact, ImageInput, RawImageData};
use super::{EncodeOptions, ImageConfig, ImageError, Quality};

/// 图片编码器。
///
/// 持有编解码器与输入上限配置，本身无可变状态，可在多个任务间共享。
pub struct ImageHandler<C = JpegCodec> {
    pub(super) config: ImageConfig,
    codec: C,
}

impl ImageHandler<JpegCodec> {
    /// 使用生产编解码器创建处理器。
    ///
    /// # 示例
    /// ```rust
    /// use love_journal::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// # Ok::<(), love_journal::image_handler::ImageError>(())
    /// ```
    pub fn new(config: ImageConfig) -> Result<Self, ImageError> {
        if config.max_file_size == 0 || config.max_decoded_pixels == 0 {
            return Err(ImageError::InvalidFormat("图片配置上限必须大于 0".to_string()));
        }
        let codec = JpegCodec::new(config.clone());
        Ok(Self { config, codec })
    }
}

impl<C: ImageCodec> ImageHandler<C> {
    /// 注入自定义编解码器。
    pub fn with_codec(config: ImageConfig, codec: C) -> Self {
        Self { config, codec }
    }

    /// 按来源加载后编码。
    pub fn encode_input(
        &self,
        input: ImageInput,
        options: &EncodeOptions,
    ) -> Result<EncodedArtifact, ImageError> {
        let raw = self.load(input)?;
        self.encode_raw(raw, options)
    }

    /// 对任意图片字节执行自适应编码。
    ///
    /// 与 `encode_input` 使用同一套准入规则：体积上限 + `infer` 图片签名，
    /// 签名无法识别的格式（例如 PNM）统一视为解码失败。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use love_journal::image_handler::{EncodeOptions, ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// let bytes = std::fs::read("photo.png").unwrap();
    /// let artifact = handler.encode(&bytes, &EncodeOptions::default())?;
    /// assert!(artifact.text().starts_with("data:image/jpeg;base64,"));
    /// # Ok::<(), love_journal::image_handler::ImageError>(())
    /// ```
    pub fn encode(&self, bytes: &[u8], options: &EncodeOptions) -> Result<EncodedArtifact, ImageError> {
        self.encode_input(ImageInput::Bytes(bytes.to_vec()), options)
    }

    fn encode_raw(&self, raw: RawImageData, options: &EncodeOptions) -> Result<EncodedArtifact, ImageError> {
        options.validate()?;
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let raster = self.codec.decode(&raw.bytes)?;
        drop(raw.bytes);
        let source = self.codec.dimensions(&raster);
        let decode_ms = decode_start.elapsed().as_millis();

        let resize_start = Instant::now();
        let target = normalized_dimensions(source, options);
        let resized;
        let working = if target != source {
            resized = self.codec.resize(&raster, target)?;
            &resized
        } else {
            &raster
        };
        let resize_ms = resize_start.elapsed().as_millis();

        let encode_start = Instant::now();
        let mut quality = options.quality;
        let mut artifact = self.codec.encode(working, quality)?;
        let mut attempts = 1u32;

        if options.adaptive {
            let floor = Quality::new_unchecked(QUALITY_FLOOR_PERCENT);
            while artifact.text_len() > options.size_budget_bytes && quality > floor {
                quality = quality.step_down(QUALITY_STEP_PERCENT, floor);
                artifact = self.codec.encode(working, quality)?;
                attempts += 1;
                log::debug!(
                    "🔁 质量退避 - quality: {:.1} 长度: {} 预算: {}",
                    quality.as_fraction(),
                    artifact.text_len(),
                    options.size_budget_bytes
                );
            }

            if artifact.text_len() > options.size_budget_bytes {
                let fallback = fallback_dimensions(target, options.size_budget_bytes, artifact.text_len());
                log::info!(
                    "📉 质量已达下限仍超预算，尺寸兜底：{} -> {}（长度: {}）",
                    target,
                    fallback,
                    artifact.text_len()
                );
                let shrunk = self.codec.resize(&raster, fallback)?;
                artifact = self
                    .codec
                    .encode(&shrunk, Quality::new_unchecked(FALLBACK_QUALITY_PERCENT))?
                    .mark_fallback();
                attempts += 1;

                if artifact.text_len() > options.size_budget_bytes {
                    log::warn!(
                        "⚠️ 兜底后仍超出预算，按尽力而为返回 - 长度: {} 预算: {}",
                        artifact.text_len(),
                        options.size_budget_bytes
                    );
                }
            }
        }
        let encode_ms = encode_start.elapsed().as_millis();

        log::info!(
            "✅ 图片编码完成 - 来源: {} 原始尺寸: {} 输出尺寸: {} 质量: {:.1} 长度: {} 次数: {} 耗时(ms): decode={} resize={} encode={} total={}",
            raw.source_hint,
            source,
            artifact.dimensions(),
            artifact.quality().as_fraction(),
            artifact.text_len(),
            attempts,
            decode_ms,
            resize_ms,
            encode_ms,
            total_start.elapsed().as_millis()
        );

        Ok(artifact)
    }
}

/// 计算归一化尺寸：超过上限时按比例缩小，保持宽高比，从不放大。
///
/// 只限制宽度时，新宽度严格等于 `max_width`，高度四舍五入到最近的像素。
pub fn normalized_dimensions(source: Dimensions, options: &EncodeOptions) -> Dimensions {
    let Dimensions { width, height } = source;
    let width_scale = f64::from(options.max_width) / f64::from(width);
    let height_scale = options
        .max_height
        .map(|max_height| f64::from(max_height) / f64::from(height))
        .unwrap_or(f64::INFINITY);

    if width_scale >= 1.0 && height_scale >= 1.0 {
        return source;
    }

    if width_scale <= height_scale {
        let new_height = (f64::from(height) * f64::from(options.max_width) / f64::from(width)).round();
        Dimensions::new(options.max_width, (new_height as u32).max(1))
    } else {
        let max_height = options.max_height.unwrap_or(height);
        let new_width = (f64::from(width) * f64::from(max_height) / f64::from(height)).round();
        Dimensions::new((new_width as u32).max(1), max_height)
    }
}

/// 计算兜底尺寸：编码体积近似与像素面积成正比，因此线性缩放系数取平方根。
pub fn fallback_dimensions(current: Dimensions, budget: usize, text_len: usize) -> Dimensions {
    if text_len == 0 {
        return current;
    }
    let scale = (budget as f64 / text_len as f64).sqrt().min(1.0);
    let width = ((f64::from(current.width) * scale).floor() as u32).max(1);
    let height = ((f64::from(current.height) * scale).floor() as u32).max(1);
    Dimensions::new(width, height)
}
