//! 恋爱进度（love progress）子模块
//!
//! ## 设计思路
//!
//! 进度保存在单个文档 `landing/loveProgress`：当前百分比、最近一次更新、更新历史和访客计数。
//! 只有配置中的 `progress_editor` 可以修改进度；访客计数任何人都可以累加。
//!
//! 两套文案：
//! - `milestone`：按配置里的阈值表取“不超过当前进度的最高阈值”
//! - `milestone_message`：固定的六档区间文案，用于首页大字展示

use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::db::{DocumentStore, Fields};
use crate::error::AppError;
use crate::settings::Milestone;

use super::{Journal, to_fields};

const COLLECTION: &str = "landing";
const PROGRESS_DOC: &str = "loveProgress";
const MAX_PROGRESS: u8 = 100;
const SYSTEM_AUTHOR: &str = "system";

/// 一次进度更新记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// UTC 毫秒时间戳。
    pub date: i64,
    pub value: u8,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoveProgress {
    pub current_progress: u8,
    pub last_update: Option<i64>,
    pub last_updated_by: String,
    pub history: Vec<ProgressEntry>,
    pub visitor_count: u64,
}

impl LoveProgress {
    fn initial(editor: &str) -> Self {
        Self {
            last_updated_by: editor.to_string(),
            ..Self::default()
        }
    }
}

/// 区间文案。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MilestoneMessage {
    pub emoji: &'static str,
    pub message: &'static str,
    pub color: &'static str,
}

const fn band(emoji: &'static str, message: &'static str, color: &'static str) -> MilestoneMessage {
    MilestoneMessage { emoji, message, color }
}

pub fn milestone_message(progress: u8) -> MilestoneMessage {
    match progress {
        0 => band("🖤", "Belum mulai...", "slate"),
        1..=19 => band("🌱", "Baru mulai tumbuh kembali...", "emerald"),
        20..=39 => band("🌸", "Ada sesuatu yang mulai kembali...", "pink"),
        40..=59 => band("💛", "Setengah jalan pulang...", "yellow"),
        60..=79 => band("🧡", "Semakin dekat...", "orange"),
        80..=99 => band("💗", "Hampir sampai...", "rose"),
        _ => band("💕", "I'm home. Welcome back, my love.", "pink"),
    }
}

impl<S: DocumentStore + ?Sized> Journal<'_, S> {
    /// 阈值表中不超过 `progress` 的最高里程碑；阈值表为空时返回 `None`。
    pub fn milestone(&self, progress: u8) -> Option<&Milestone> {
        let milestones = &self.config.love_milestones;
        milestones
            .iter()
            .filter(|m| m.threshold <= progress)
            .max_by_key(|m| m.threshold)
            .or_else(|| milestones.iter().min_by_key(|m| m.threshold))
    }

    /// 读取进度；文档不存在时返回初始值。
    pub fn love_progress(&self) -> Result<LoveProgress, AppError> {
        let progress = self
            .read_one::<LoveProgress>(COLLECTION, PROGRESS_DOC)?
            .map(|mut p| {
                if p.last_updated_by.is_empty() {
                    p.last_updated_by = self.config.progress_editor.clone();
                }
                p
            })
            .unwrap_or_else(|| LoveProgress::initial(&self.config.progress_editor));
        Ok(progress)
    }

    /// 更新进度并追加历史。`note` 为空时使用里程碑文案。
    pub fn update_love_progress(
        &self,
        session: &Session,
        value: u8,
        note: Option<&str>,
    ) -> Result<LoveProgress, AppError> {
        session.require_signed_in()?;
        let author = session.author(self.config);
        if author != self.config.progress_editor {
            return Err(AppError::Unauthorized(format!(
                "只有 {} 可以更新进度",
                self.config.progress_editor
            )));
        }
        if value > MAX_PROGRESS {
            return Err(AppError::Validation(format!("进度必须在 0-{} 之间: {}", MAX_PROGRESS, value)));
        }

        let note = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| self.milestone(value).map(|m| m.message.clone()))
            .unwrap_or_else(|| milestone_message(value).message.to_string());

        let now = self.now_millis();
        let mut progress = self.love_progress()?;
        progress.history.push(ProgressEntry { date: now, value, note });
        progress.current_progress = value;
        progress.last_update = Some(now);
        progress.last_updated_by = author.to_string();

        let mut patch = to_fields(&progress)?;
        // 访客计数可能被并发累加，不随进度一起回写
        patch.remove("visitorCount");
        self.store.merge(COLLECTION, PROGRESS_DOC, patch)?;

        log::info!("💞 恋爱进度已更新 - {}% (第 {} 条记录)", value, progress.history.len());
        Ok(progress)
    }

    /// 访客计数 +1，返回新计数；文档不存在时初始化为 1。
    pub fn increment_visitor_count(&self) -> Result<u64, AppError> {
        match self.read_one::<LoveProgress>(COLLECTION, PROGRESS_DOC)? {
            Some(progress) => {
                let count = progress.visitor_count.saturating_add(1);
                let mut patch = Fields::new();
                patch.insert("visitorCount".to_string(), serde_json::Value::from(count));
                self.store.merge(COLLECTION, PROGRESS_DOC, patch)?;
                Ok(count)
            }
            None => {
                let initial = LoveProgress {
                    last_update: Some(self.now_millis()),
                    visitor_count: 1,
                    ..LoveProgress::initial(SYSTEM_AUTHOR)
                };
                self.store.set(COLLECTION, PROGRESS_DOC, to_fields(&initial)?)?;
                log::info!("👀 访客计数已初始化");
                Ok(1)
            }
        }
    }
}
