//! 动态（posts）子模块
//!
//! ## 职责
//! - 发布图片/文字动态，记录作者资料快照
//! - 后台“回忆”发布（说明 + 日期必填，配图可选）
//! - 按作者、标签查询，新到旧排序
//! - 点赞计数与删除

use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::db::DocumentStore;
use crate::error::AppError;

use super::{Journal, to_fields};

const COLLECTION: &str = "posts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    #[default]
    Photo,
    Note,
}

/// 动态记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: PostKind,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author_id: String,
    pub author_name: String,
    pub author_display_name: String,
    pub author_avatar: String,
    #[serde(default)]
    pub likes: u64,
    /// 后台“回忆”填写的日期（原样保存）。
    #[serde(default)]
    pub memory_date: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// 发布动态的输入。
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub kind: PostKind,
    pub caption: String,
    pub image_base64: Option<String>,
    pub location: String,
    pub tags: Vec<String>,
    /// 指定作者；为空时取当前会话的作者。
    pub author_id: Option<String>,
}

impl<S: DocumentStore + ?Sized> Journal<'_, S> {
    /// 发布动态，返回文档 ID。
    pub fn create_post(&self, session: &Session, new_post: NewPost) -> Result<String, AppError> {
        self.insert_post(session, new_post, None)
    }

    /// 校验并以一次 `add` 写入动态。
    fn insert_post(
        &self,
        session: &Session,
        new_post: NewPost,
        memory_date: Option<String>,
    ) -> Result<String, AppError> {
        session.require_signed_in()?;

        if let Some(unknown) = new_post.tags.iter().find(|t| !self.config.is_known_tag(t)) {
            return Err(AppError::Validation(format!("未知标签: {}", unknown)));
        }
        if new_post.kind == PostKind::Photo
            && new_post.image_base64.as_deref().is_none_or(str::is_empty)
        {
            return Err(AppError::Validation("图片动态缺少图片".to_string()));
        }

        let author_id = new_post
            .author_id
            .as_deref()
            .filter(|id| self.config.profile(id).is_some())
            .unwrap_or_else(|| session.author(self.config));
        let author = self
            .config
            .profile(author_id)
            .ok_or_else(|| AppError::NotFound(format!("作者资料: {}", author_id)))?;

        let now = self.now_millis();
        let post = Post {
            id: String::new(),
            kind: new_post.kind,
            caption: new_post.caption,
            image_base64: new_post.image_base64,
            location: new_post.location,
            tags: new_post.tags,
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            author_display_name: author.display_name.clone(),
            author_avatar: author.avatar_url.clone(),
            likes: 0,
            memory_date,
            created_at: now,
            updated_at: now,
        };

        let id = self.store.add(COLLECTION, to_fields(&post)?)?;
        log::info!("📝 新动态已发布 - id: {} 作者: {}", id, post.author_id);
        Ok(id)
    }

    /// 后台发布“回忆”：说明与日期必填。
    pub fn add_memory(
        &self,
        session: &Session,
        caption: &str,
        date: &str,
        image_base64: Option<String>,
    ) -> Result<String, AppError> {
        if caption.trim().is_empty() || date.trim().is_empty() {
            return Err(AppError::Validation("请填写说明和日期".to_string()));
        }
        session.require_signed_in()?;

        let kind = if image_base64.is_some() { PostKind::Photo } else { PostKind::Note };
        self.insert_post(
            session,
            NewPost {
                kind,
                caption: caption.to_string(),
                image_base64,
                ..NewPost::default()
            },
            Some(date.trim().to_string()),
        )
    }

    /// 最新的动态，可按作者过滤。
    pub fn posts(&self, limit: usize, author_id: Option<&str>) -> Result<Vec<Post>, AppError> {
        self.query_posts(limit, |post| author_id.is_none_or(|a| post.author_id == a))
    }

    /// 含指定标签的最新动态。
    pub fn posts_by_tag(&self, tag: &str, limit: usize) -> Result<Vec<Post>, AppError> {
        self.query_posts(limit, |post| post.tags.iter().any(|t| t == tag))
    }

    fn query_posts(&self, limit: usize, keep: impl Fn(&Post) -> bool) -> Result<Vec<Post>, AppError> {
        let mut posts: Vec<Post> = self
            .read_all::<Post>(COLLECTION)?
            .into_iter()
            .map(|(id, post)| Post { id, ..post })
            .filter(|post| keep(post))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        posts.truncate(limit);
        Ok(posts)
    }

    pub fn delete_post(&self, session: &Session, post_id: &str) -> Result<(), AppError> {
        session.require_signed_in()?;
        self.store.delete(COLLECTION, post_id)?;
        log::info!("🗑️ 动态已删除 - id: {}", post_id);
        Ok(())
    }

    /// 点赞 +1，返回新的点赞数。
    pub fn like_post(&self, post_id: &str) -> Result<u64, AppError> {
        let post: Post = self
            .read_one(COLLECTION, post_id)?
            .ok_or_else(|| AppError::NotFound(format!("{}/{}", COLLECTION, post_id)))?;
        let likes = post.likes.saturating_add(1);

        let mut patch = crate::db::Fields::new();
        patch.insert("likes".to_string(), serde_json::Value::from(likes));
        self.store.update(COLLECTION, post_id, patch)?;
        Ok(likes)
    }
}
