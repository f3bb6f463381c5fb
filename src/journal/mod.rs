//! # 内容层（journal）
//!
//! ## 设计思路
//!
//! 站点的所有内容读写都经过 `Journal`：它持有文档存储、站点配置、图片编码服务和时钟，
//! 每个子模块负责一类内容：
//!
//! | 子模块 | 集合 / 文档 | 职责 |
//! |--------|-------------|------|
//! | `posts` | `posts` | 动态与后台“回忆”发布、按作者/标签查询、点赞、删除 |
//! | `stories` | `stories` | 24 小时限时故事、归档、按月分组 |
//! | `highlights` | `highlights` | 精选集合的增删改与故事关联 |
//! | `landing` | `content/home`、`content/her`、`content/him` | 首页与个人页文案、配图 |
//! | `love` | `landing/loveProgress` | 恋爱进度、历史记录、访客计数 |
//!
//! ## 实现思路
//!
//! - 记录以 `serde` 结构体定义，字段名保持 camelCase，存储为 JSON 文档。
//! - 时间统一为 UTC 毫秒时间戳，由注入的时钟产生，测试可固定时间。
//! - 写操作都要求登录会话。

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::db::{Document, DocumentStore, Fields};
use crate::error::AppError;
use crate::image_handler::{EncodeProfile, ImageInput, ImageServiceState};
use crate::settings::SiteConfig;

mod highlights;
mod landing;
mod love;
mod posts;
mod stories;

pub use highlights::{Highlight, HighlightUpdate, NewHighlight};
pub use landing::{HomeContent, ProfileContent, ProfileSide};
pub use love::{LoveProgress, MilestoneMessage, ProgressEntry, milestone_message};
pub use posts::{NewPost, Post, PostKind};
pub use stories::{NewStory, Story, group_by_month};

/// 时钟函数。
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// 内容操作入口。
pub struct Journal<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    config: &'a SiteConfig,
    images: ImageServiceState,
    clock: Clock,
}

impl<'a, S: DocumentStore + ?Sized> Journal<'a, S> {
    pub fn new(store: &'a S, config: &'a SiteConfig, images: ImageServiceState) -> Self {
        Self {
            store,
            config,
            images,
            clock: Arc::new(Utc::now),
        }
    }

    /// 替换时钟（测试用）。
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &SiteConfig {
        self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub(crate) fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// 把用户选择的图片编码为可内嵌的 data URI。
    ///
    /// 编码失败时不返回任何部分结果，调用方应提示“图片处理失败”。
    pub async fn attach_image(&self, input: ImageInput, profile: EncodeProfile) -> Result<String, AppError> {
        let artifact = self.images.encode_with_profile(input, profile).await?;
        Ok(artifact.into_text())
    }

    fn read_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<(String, T)>, AppError> {
        self.store
            .list(collection)?
            .into_iter()
            .map(|Document { id, fields }| Ok((id, from_fields(fields)?)))
            .collect()
    }

    fn read_one<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError> {
        self.store
            .get(collection, id)?
            .map(from_fields)
            .transpose()
    }
}

pub(crate) fn to_fields<T: Serialize>(value: &T) -> Result<Fields, AppError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(AppError::Serialization(format!("文档必须是 JSON 对象: {}", other))),
    }
}

pub(crate) fn from_fields<T: DeserializeOwned>(fields: Fields) -> Result<T, AppError> {
    Ok(serde_json::from_value(serde_json::Value::Object(fields))?)
}

/// 毫秒时间戳转 UTC 时间，越界时回退到纪元起点。
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
