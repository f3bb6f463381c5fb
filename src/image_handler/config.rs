//! # 配置模块
//!
//! ## 设计思路
//!
//! 分两层：
//! - `ImageConfig`：编解码器的资源上限与缩放滤镜，进程启动时构建一次。
//! - `EncodeOptions`：单次编码请求的参数（宽度上限、初始质量、体积预算）。
//!
//! `EncodeProfile`（feed / cms）作为高层语义，映射到具体的 `EncodeOptions` 组合。
//!
//! ## 实现思路
//!
//! 质量在内部用整数百分比表示（`Quality`），0.7 → 0.6 → … 的退避不会产生浮点漂移。

use image::imageops::FilterType;

use super::ImageError;

/// 默认最大宽度（像素）。
pub const DEFAULT_MAX_WIDTH: u32 = 800;
/// 默认初始质量（百分比）。
pub const DEFAULT_QUALITY_PERCENT: u8 = 70;
/// 默认文本体积预算：500 KiB（按 data URI 字符串长度计）。
pub const DEFAULT_SIZE_BUDGET_BYTES: usize = 500 * 1024;
/// 质量退避步长（百分比）。
pub const QUALITY_STEP_PERCENT: u8 = 10;
/// 质量退避下限（百分比）。
pub const QUALITY_FLOOR_PERCENT: u8 = 30;
/// 尺寸兜底阶段使用的固定质量（百分比）。
pub const FALLBACK_QUALITY_PERCENT: u8 = 60;

/// 编解码器配置。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// 读取原始字节时允许的最大输入体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 25 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            resize_filter: FilterType::Triangle,
        }
    }
}

/// 有损压缩质量，取值 (0, 1]，内部以百分比存储。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    /// 从百分比构建，范围 1..=100。
    pub fn from_percent(percent: u8) -> Result<Self, ImageError> {
        if percent == 0 || percent > 100 {
            return Err(ImageError::InvalidFormat(format!(
                "质量超出范围：{}%（可选：1 ~ 100）",
                percent
            )));
        }
        Ok(Self(percent))
    }

    /// 从 (0, 1] 区间的小数构建，四舍五入到百分位。
    ///
    /// # 示例
    /// ```rust
    /// use love_journal::image_handler::Quality;
    ///
    /// let q = Quality::from_fraction(0.7)?;
    /// assert_eq!(q.percent(), 70);
    /// # Ok::<(), love_journal::image_handler::ImageError>(())
    /// ```
    pub fn from_fraction(value: f32) -> Result<Self, ImageError> {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            return Err(ImageError::InvalidFormat(format!(
                "质量超出范围：{}（可选：(0, 1]）",
                value
            )));
        }
        let percent = (value * 100.0).round().clamp(1.0, 100.0) as u8;
        Ok(Self(percent))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    pub fn as_fraction(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// 退避一步，不低于 `floor`。
    pub(crate) fn step_down(self, step: u8, floor: Quality) -> Quality {
        Quality(self.0.saturating_sub(step).max(floor.0))
    }

    pub(crate) const fn new_unchecked(percent: u8) -> Quality {
        Quality(percent)
    }
}

/// 单次编码请求参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {
    /// 宽度上限；宽度超过时按比例缩小。
    pub max_width: u32,
    /// 高度上限；`None` 表示只限制宽度。
    pub max_height: Option<u32>,
    /// 初始质量。
    pub quality: Quality,
    /// data URI 字符串长度预算（字节）。
    pub size_budget_bytes: usize,
    /// 是否启用“质量退避 + 尺寸兜底”。关闭时只编码一次。
    pub adaptive: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeProfile::Feed.options()
    }
}

impl EncodeOptions {
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_size_budget(mut self, size_budget_bytes: usize) -> Self {
        self.size_budget_bytes = size_budget_bytes;
        self
    }

    /// 校验参数合法性。
    pub(crate) fn validate(&self) -> Result<(), ImageError> {
        if self.max_width == 0 {
            return Err(ImageError::InvalidFormat("最大宽度必须为正整数".to_string()));
        }
        if self.max_height == Some(0) {
            return Err(ImageError::InvalidFormat("最大高度必须为正整数".to_string()));
        }
        if self.size_budget_bytes == 0 {
            return Err(ImageError::InvalidFormat("体积预算必须大于 0".to_string()));
        }
        Ok(())
    }
}

/// 编码档位（面向产品语义）。
///
/// - `Feed`：动态/故事配图，宽度 800、质量 0.7、500 KiB 预算，自适应退避
/// - `Cms`：后台内容配图，最长边 800、固定质量 0.6，只编码一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeProfile {
    #[default]
    Feed,
    Cms,
}

impl EncodeProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use love_journal::image_handler::EncodeProfile;
    ///
    /// let p = EncodeProfile::from_str("cms")?;
    /// assert_eq!(p.as_str(), "cms");
    /// # Ok::<(), love_journal::image_handler::ImageError>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(profile: &str) -> Result<Self, ImageError> {
        match profile.trim().to_lowercase().as_str() {
            "feed" => Ok(Self::Feed),
            "cms" => Ok(Self::Cms),
            other => Err(ImageError::InvalidFormat(format!(
                "未知编码档位：{}（可选：feed / cms）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Cms => "cms",
        }
    }

    /// 将档位转换为具体参数。
    pub fn options(self) -> EncodeOptions {
        match self {
            Self::Feed => EncodeOptions {
                max_width: DEFAULT_MAX_WIDTH,
                max_height: None,
                quality: Quality::new_unchecked(DEFAULT_QUALITY_PERCENT),
                size_budget_bytes: DEFAULT_SIZE_BUDGET_BYTES,
                adaptive: true,
            },
            Self::Cms => EncodeOptions {
                max_width: 800,
                max_height: Some(800),
                quality: Quality::new_unchecked(FALLBACK_QUALITY_PERCENT),
                size_budget_bytes: DEFAULT_SIZE_BUDGET_BYTES,
                adaptive: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_rejects_out_of_range_values() {
        assert!(Quality::from_fraction(0.0).is_err());
        assert!(Quality::from_fraction(1.01).is_err());
        assert!(Quality::from_fraction(f32::NAN).is_err());
        assert!(Quality::from_percent(0).is_err());
        assert_eq!(Quality::from_fraction(1.0).map(Quality::percent).ok(), Some(100));
    }

    #[test]
    fn quality_step_down_clamps_at_floor() {
        let floor = Quality::new_unchecked(QUALITY_FLOOR_PERCENT);
        let q = Quality::new_unchecked(35);
        assert_eq!(q.step_down(QUALITY_STEP_PERCENT, floor).percent(), 30);
        assert_eq!(Quality::new_unchecked(70).step_down(10, floor).percent(), 60);
    }

    #[test]
    fn profile_parsing_is_case_insensitive() {
        assert_eq!(EncodeProfile::from_str(" FEED ").ok(), Some(EncodeProfile::Feed));
        assert!(EncodeProfile::from_str("thumbnail").is_err());
    }

    #[test]
    fn default_options_match_feed_profile() {
        let options = EncodeOptions::default();
        assert_eq!(options.max_width, 800);
        assert_eq!(options.quality.percent(), 70);
        assert_eq!(options.size_budget_bytes, 500 * 1024);
        assert!(options.adaptive);
        assert!(options.validate().is_ok());
        assert!(options.with_max_width(0).validate().is_err());
    }
}
