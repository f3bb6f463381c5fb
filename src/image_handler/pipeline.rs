//! # 解码与编码流水线模块
//!
//! ## 设计思路
//!
//! 自适应编码流程只依赖 `ImageCodec` 抽象的四个能力：解码、读尺寸、缩放、按质量编码。
//! 生产实现 `JpegCodec` 基于 `image` 解码/编码 JPEG，基于 `fast_image_resize` 缩放；
//! 测试可以注入脚本化的编解码器，精确控制每次编码的体积。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素/内存上限快速拒绝
//! 3. 完整解码并转换为 RGB（JPEG 不携带 alpha）
//! 4. 缩放优先走 `fast_image_resize`，失败回退 `image::imageops::resize`
//! 5. 以给定质量编码为 JPEG

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GenericImageView, ImageReader, RgbImage};
use std::io::Cursor;

use super::source::{Dimensions, EncodedArtifact, JPEG_MIME};
use super::{ImageConfig, ImageError, Quality};

/// 编解码器能力抽象。
///
/// 同一光栅 + 同一参数必须产出相同（或近似相同）长度的结果，
/// 质量退避循环依赖这一点收敛。
pub trait ImageCodec {
    /// 解码后的像素光栅。
    type Raster;

    /// 将任意字节解码为光栅，无法识别时返回 `ImageError::Decode`。
    fn decode(&self, bytes: &[u8]) -> Result<Self::Raster, ImageError>;

    fn dimensions(&self, raster: &Self::Raster) -> Dimensions;

    /// 缩放到目标尺寸，返回新的光栅。
    fn resize(&self, raster: &Self::Raster, target: Dimensions) -> Result<Self::Raster, ImageError>;

    /// 以给定质量重新编码，失败返回 `ImageError::Encode`。
    fn encode(&self, raster: &Self::Raster, quality: Quality) -> Result<EncodedArtifact, ImageError>;
}

/// 基于 `image` + `fast_image_resize` 的 JPEG 编解码器。
#[derive(Debug, Clone, Default)]
pub struct JpegCodec {
    config: ImageConfig,
}

impl JpegCodec {
    pub fn new(config: ImageConfig) -> Self {
        Self { config }
    }

    /// 仅通过内存中的图片头信息读取宽高。
    ///
    /// 用于在完整解码前做像素限制检查。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(&self, size: Dimensions) -> Result<(), ImageError> {
        let pixels = size.pixels();

        if pixels == 0 {
            return Err(ImageError::Decode("图片尺寸为 0".to_string()));
        }

        if pixels > self.config.max_decoded_pixels {
            return Err(ImageError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, self.config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn validate_decoded_memory_limits(&self, size: Dimensions) -> Result<(), ImageError> {
        let estimated = size
            .pixels()
            .checked_mul(4)
            .ok_or_else(|| ImageError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > self.config.max_decoded_bytes {
            return Err(ImageError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                self.config.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }

    fn resize_with_fast_image_resize(
        raster: &RgbImage,
        target: Dimensions,
        filter: FilterType,
    ) -> Result<RgbImage, ImageError> {
        let (src_width, src_height) = raster.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            raster.as_raw().clone(),
            fr::PixelType::U8x3,
        )
        .map_err(|e| ImageError::Encode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target.width, target.height, fr::PixelType::U8x3);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(Self::to_fast_filter(filter)));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ImageError::Encode(format!("fast_image_resize 执行失败：{}", e)))?;

        RgbImage::from_raw(target.width, target.height, dst_image.into_vec())
            .ok_or_else(|| ImageError::Encode("fast_image_resize 输出缓冲长度异常".to_string()))
    }

    fn to_fast_filter(filter: FilterType) -> fr::FilterType {
        match filter {
            FilterType::Nearest => fr::FilterType::Box,
            FilterType::Triangle => fr::FilterType::Bilinear,
            FilterType::CatmullRom => fr::FilterType::CatmullRom,
            FilterType::Gaussian => fr::FilterType::Mitchell,
            FilterType::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}

impl ImageCodec for JpegCodec {
    type Raster = RgbImage;

    fn decode(&self, bytes: &[u8]) -> Result<RgbImage, ImageError> {
        image::guess_format(bytes)
            .map_err(|e| ImageError::Decode(format!("不支持的图片格式：{}", e)))?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(bytes)?;
        let header = Dimensions::new(header_width, header_height);
        self.validate_pixel_limits(header)?;
        self.validate_decoded_memory_limits(header)?;

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        self.validate_pixel_limits(Dimensions::new(width, height))?;

        Ok(decoded.to_rgb8())
    }

    fn dimensions(&self, raster: &RgbImage) -> Dimensions {
        let (width, height) = raster.dimensions();
        Dimensions::new(width, height)
    }

    fn resize(&self, raster: &RgbImage, target: Dimensions) -> Result<RgbImage, ImageError> {
        if target.width == 0 || target.height == 0 {
            return Err(ImageError::Encode(format!("目标尺寸非法：{}", target)));
        }

        match Self::resize_with_fast_image_resize(raster, target, self.config.resize_filter) {
            Ok(resized) => Ok(resized),
            Err(err) => {
                log::warn!(
                    "⚠️ fast_image_resize 缩放失败，回退 image::imageops::resize：{}",
                    err
                );
                Ok(image::imageops::resize(
                    raster,
                    target.width,
                    target.height,
                    self.config.resize_filter,
                ))
            }
        }
    }

    fn encode(&self, raster: &RgbImage, quality: Quality) -> Result<EncodedArtifact, ImageError> {
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality.percent())
            .encode_image(raster)
            .map_err(|e| ImageError::Encode(format!("JPEG 编码失败：{}", e)))?;

        Ok(EncodedArtifact::new(
            JPEG_MIME,
            buffer,
            self.dimensions(raster),
            quality,
        ))
    }
}
