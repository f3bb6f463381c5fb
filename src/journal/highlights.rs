//! 精选（highlights）子模块
//!
//! ## 职责
//! - 创建/更新/删除精选，图标与渐变必须来自站点配置
//! - 关联故事：去重追加、移除，`storyCount` 始终等于 `storyIds` 长度
//! - 首个带图故事自动成为封面（已有封面时不覆盖）

use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::db::DocumentStore;
use crate::error::AppError;

use super::stories::{Story, sort_newest_first};
use super::{Journal, to_fields};

const COLLECTION: &str = "highlights";
const DEFAULT_ICON: &str = "star";
const DEFAULT_GRADIENT: &str = "pink";

/// 精选记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub icon: String,
    pub gradient: String,
    pub author_id: String,
    #[serde(default)]
    pub cover_image_base64: Option<String>,
    #[serde(default)]
    pub story_ids: Vec<String>,
    #[serde(default)]
    pub story_count: usize,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewHighlight {
    pub name: String,
    pub icon: Option<String>,
    pub gradient: Option<String>,
    pub author_id: Option<String>,
    pub cover_image_base64: Option<String>,
}

/// 精选的可更新字段，`None` 表示不修改。
#[derive(Debug, Clone, Default)]
pub struct HighlightUpdate {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub gradient: Option<String>,
    pub cover_image_base64: Option<String>,
}

impl<S: DocumentStore + ?Sized> Journal<'_, S> {
    fn validate_name(name: &str) -> Result<String, AppError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("精选名称不能为空".to_string()));
        }
        Ok(trimmed.to_string())
    }

    fn validate_icon(&self, icon: &str) -> Result<(), AppError> {
        if !self.config.is_known_icon(icon) {
            return Err(AppError::Validation(format!("未知图标: {}", icon)));
        }
        Ok(())
    }

    fn validate_gradient(&self, gradient: &str) -> Result<(), AppError> {
        if self.config.gradient(gradient).is_none() {
            return Err(AppError::Validation(format!("未知渐变: {}", gradient)));
        }
        Ok(())
    }

    pub fn create_highlight(&self, session: &Session, new_highlight: NewHighlight) -> Result<String, AppError> {
        session.require_signed_in()?;

        let name = Self::validate_name(&new_highlight.name)?;
        let icon = new_highlight.icon.unwrap_or_else(|| DEFAULT_ICON.to_string());
        let gradient = new_highlight.gradient.unwrap_or_else(|| DEFAULT_GRADIENT.to_string());
        self.validate_icon(&icon)?;
        self.validate_gradient(&gradient)?;

        let author_id = new_highlight
            .author_id
            .filter(|id| self.config.profile(id).is_some())
            .unwrap_or_else(|| session.author(self.config).to_string());

        let now = self.now_millis();
        let highlight = Highlight {
            id: String::new(),
            name,
            icon,
            gradient,
            author_id,
            cover_image_base64: new_highlight.cover_image_base64,
            story_ids: Vec::new(),
            story_count: 0,
            created_at: now,
            updated_at: now,
        };

        let id = self.store.add(COLLECTION, to_fields(&highlight)?)?;
        log::info!("✨ 新精选已创建 - id: {} 名称: {}", id, highlight.name);
        Ok(id)
    }

    /// 指定作者的精选，新到旧。
    pub fn highlights(&self, author_id: &str) -> Result<Vec<Highlight>, AppError> {
        let mut highlights: Vec<Highlight> = self
            .read_all::<Highlight>(COLLECTION)?
            .into_iter()
            .map(|(id, highlight)| Highlight { id, ..highlight })
            .filter(|h| h.author_id == author_id)
            .collect();
        highlights.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(highlights)
    }

    pub fn highlight(&self, highlight_id: &str) -> Result<Option<Highlight>, AppError> {
        Ok(self
            .read_one::<Highlight>(COLLECTION, highlight_id)?
            .map(|h| Highlight {
                id: highlight_id.to_string(),
                ..h
            }))
    }

    fn require_highlight(&self, highlight_id: &str) -> Result<Highlight, AppError> {
        self.highlight(highlight_id)?
            .ok_or_else(|| AppError::NotFound(format!("精选不存在: {}", highlight_id)))
    }

    fn save_highlight(&self, highlight: &Highlight) -> Result<(), AppError> {
        self.store.set(COLLECTION, &highlight.id, to_fields(highlight)?)
    }

    /// 追加故事；已存在时不重复追加并返回 `false`。
    pub fn add_story_to_highlight(
        &self,
        session: &Session,
        highlight_id: &str,
        story_id: &str,
        story_image_base64: Option<String>,
    ) -> Result<bool, AppError> {
        session.require_signed_in()?;
        let mut highlight = self.require_highlight(highlight_id)?;

        if highlight.story_ids.iter().any(|id| id == story_id) {
            return Ok(false);
        }

        highlight.story_ids.push(story_id.to_string());
        highlight.story_count = highlight.story_ids.len();
        highlight.updated_at = self.now_millis();
        if highlight.cover_image_base64.is_none() {
            highlight.cover_image_base64 = story_image_base64;
        }

        self.save_highlight(&highlight)?;
        Ok(true)
    }

    pub fn remove_story_from_highlight(
        &self,
        session: &Session,
        highlight_id: &str,
        story_id: &str,
    ) -> Result<(), AppError> {
        session.require_signed_in()?;
        let mut highlight = self.require_highlight(highlight_id)?;

        highlight.story_ids.retain(|id| id != story_id);
        highlight.story_count = highlight.story_ids.len();
        highlight.updated_at = self.now_millis();

        self.save_highlight(&highlight)
    }

    pub fn update_highlight(
        &self,
        session: &Session,
        highlight_id: &str,
        update: HighlightUpdate,
    ) -> Result<Highlight, AppError> {
        session.require_signed_in()?;
        let mut highlight = self.require_highlight(highlight_id)?;

        if let Some(name) = update.name {
            highlight.name = Self::validate_name(&name)?;
        }
        if let Some(icon) = update.icon {
            self.validate_icon(&icon)?;
            highlight.icon = icon;
        }
        if let Some(gradient) = update.gradient {
            self.validate_gradient(&gradient)?;
            highlight.gradient = gradient;
        }
        if update.cover_image_base64.is_some() {
            highlight.cover_image_base64 = update.cover_image_base64;
        }
        highlight.updated_at = self.now_millis();

        self.save_highlight(&highlight)?;
        Ok(highlight)
    }

    pub fn delete_highlight(&self, session: &Session, highlight_id: &str) -> Result<(), AppError> {
        session.require_signed_in()?;
        self.store.delete(COLLECTION, highlight_id)
    }

    /// 精选内的故事，新到旧；已删除的故事跳过，精选不存在时返回空。
    pub fn highlight_stories(&self, highlight_id: &str) -> Result<Vec<Story>, AppError> {
        let Some(highlight) = self.highlight(highlight_id)? else {
            return Ok(Vec::new());
        };

        let mut stories = Vec::with_capacity(highlight.story_ids.len());
        for story_id in &highlight.story_ids {
            if let Some(story) = self.story(story_id)? {
                stories.push(story);
            }
        }
        sort_newest_first(&mut stories);
        Ok(stories)
    }
}
