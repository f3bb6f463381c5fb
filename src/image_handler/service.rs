//! # 服务层（异步入口）
//!
//! ## 设计思路
//!
//! 编码本身是同步 CPU 计算；`ImageServiceState` 把它放到 tokio 的阻塞线程池里执行，
//! 调用方 `await` 结果即可，不会阻塞其他异步任务。
//!
//! ## 实现思路
//!
//! - 每次调用各自解码、各自持有质量/尺寸变量，无需加锁。
//! - 不支持取消，也不内置超时；需要限时的调用方自行包一层 `tokio::time::timeout`。

use std::sync::Arc;

use super::pipeline::{ImageCodec, JpegCodec};
use super::source::{EncodedArtifact, ImageInput};
use super::{EncodeOptions, EncodeProfile, ImageConfig, ImageError, ImageHandler};

/// 图片编码服务状态，可在多个任务间共享（内部为 `Arc`）。
pub struct ImageServiceState<C = JpegCodec> {
    handler: Arc<ImageHandler<C>>,
}

impl<C> Clone for ImageServiceState<C> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl ImageServiceState<JpegCodec> {
    /// 使用默认配置创建服务状态。
    ///
    /// # 示例
    /// ```rust
    /// use love_journal::image_handler::ImageServiceState;
    ///
    /// let service = ImageServiceState::new()?;
    /// # Ok::<(), love_journal::image_handler::ImageError>(())
    /// ```
    pub fn new() -> Result<Self, ImageError> {
        Self::with_config(ImageConfig::default())
    }

    pub fn with_config(config: ImageConfig) -> Result<Self, ImageError> {
        Ok(Self {
            handler: Arc::new(ImageHandler::new(config)?),
        })
    }
}

impl<C> ImageServiceState<C>
where
    C: ImageCodec + Send + Sync + 'static,
{
    pub fn from_handler(handler: ImageHandler<C>) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub fn handler(&self) -> &ImageHandler<C> {
        &self.handler
    }

    /// 异步编码任意图片字节。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use love_journal::image_handler::{EncodeOptions, ImageServiceState};
    ///
    /// # async fn demo(bytes: Vec<u8>) -> Result<(), love_journal::image_handler::ImageError> {
    /// let service = ImageServiceState::new()?;
    /// let artifact = service.encode_bytes(bytes, EncodeOptions::default()).await?;
    /// println!("{}", artifact.text_len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn encode_bytes(
        &self,
        bytes: Vec<u8>,
        options: EncodeOptions,
    ) -> Result<EncodedArtifact, ImageError> {
        let handler = Arc::clone(&self.handler);
        tokio::task::spawn_blocking(move || handler.encode(&bytes, &options))
            .await
            .map_err(|e| ImageError::Encode(format!("编码任务异常退出：{}", e)))?
    }

    /// 异步加载并编码任意来源。
    pub async fn encode_input(
        &self,
        input: ImageInput,
        options: EncodeOptions,
    ) -> Result<EncodedArtifact, ImageError> {
        let handler = Arc::clone(&self.handler);
        tokio::task::spawn_blocking(move || handler.encode_input(input, &options))
            .await
            .map_err(|e| ImageError::Encode(format!("编码任务异常退出：{}", e)))?
    }

    /// 按档位编码。
    pub async fn encode_with_profile(
        &self,
        input: ImageInput,
        profile: EncodeProfile,
    ) -> Result<EncodedArtifact, ImageError> {
        self.encode_input(input, profile.options()).await
    }
}
