//! 限时故事（stories）子模块
//!
//! 故事创建后 24 小时内视为“进行中”，之后进入归档；文档本身不会被删除。

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::db::DocumentStore;
use crate::error::AppError;
use crate::format::month_key;

use super::{Journal, millis_to_datetime, to_fields};

const COLLECTION: &str = "stories";

fn story_lifetime() -> Duration {
    Duration::hours(24)
}

/// 故事记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(skip)]
    pub id: String,
    pub image_base64: String,
    #[serde(default)]
    pub caption: String,
    pub author_id: String,
    pub author_name: String,
    pub author_display_name: String,
    pub author_avatar: String,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewStory {
    pub image_base64: String,
    pub caption: String,
    pub author_id: Option<String>,
}

impl<S: DocumentStore + ?Sized> Journal<'_, S> {
    pub fn create_story(&self, session: &Session, new_story: NewStory) -> Result<String, AppError> {
        session.require_signed_in()?;
        if new_story.image_base64.trim().is_empty() {
            return Err(AppError::Validation("故事必须包含图片".to_string()));
        }

        let author_id = new_story
            .author_id
            .as_deref()
            .filter(|id| self.config.profile(id).is_some())
            .unwrap_or_else(|| session.author(self.config));
        let author = self
            .config
            .profile(author_id)
            .ok_or_else(|| AppError::NotFound(format!("作者资料: {}", author_id)))?;

        let now = self.now();
        let story = Story {
            id: String::new(),
            image_base64: new_story.image_base64,
            caption: new_story.caption,
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            author_display_name: author.display_name.clone(),
            author_avatar: author.avatar_url.clone(),
            created_at: now.timestamp_millis(),
            expires_at: (now + story_lifetime()).timestamp_millis(),
        };

        let id = self.store.add(COLLECTION, to_fields(&story)?)?;
        log::info!("📸 新故事已发布 - id: {} 作者: {}", id, story.author_id);
        Ok(id)
    }

    /// 最近 24 小时内创建的故事，新到旧。
    pub fn active_stories(&self) -> Result<Vec<Story>, AppError> {
        let cutoff = (self.now() - story_lifetime()).timestamp_millis();
        self.query_stories(usize::MAX, |story| story.created_at >= cutoff)
    }

    pub fn all_stories(&self, limit: usize) -> Result<Vec<Story>, AppError> {
        self.query_stories(limit, |_| true)
    }

    /// 指定作者超过 24 小时的故事，新到旧。
    pub fn archived_stories(&self, author_id: &str, limit: usize) -> Result<Vec<Story>, AppError> {
        let cutoff = (self.now() - story_lifetime()).timestamp_millis();
        self.query_stories(limit, |story| story.author_id == author_id && story.created_at < cutoff)
    }

    pub(super) fn story(&self, story_id: &str) -> Result<Option<Story>, AppError> {
        Ok(self
            .read_one::<Story>(COLLECTION, story_id)?
            .map(|story| Story {
                id: story_id.to_string(),
                ..story
            }))
    }

    fn query_stories(&self, limit: usize, keep: impl Fn(&Story) -> bool) -> Result<Vec<Story>, AppError> {
        let mut stories: Vec<Story> = self
            .read_all::<Story>(COLLECTION)?
            .into_iter()
            .map(|(id, story)| Story { id, ..story })
            .filter(|story| keep(story))
            .collect();
        sort_newest_first(&mut stories);
        stories.truncate(limit);
        Ok(stories)
    }
}

pub(super) fn sort_newest_first(stories: &mut [Story]) {
    stories.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

/// 按月份分组（例如 "December 2025"），保持输入顺序与分组首次出现的顺序。
pub fn group_by_month(stories: &[Story]) -> Vec<(String, Vec<Story>)> {
    let mut groups: Vec<(String, Vec<Story>)> = Vec::new();
    for story in stories {
        let key = month_key(millis_to_datetime(story.created_at));
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, bucket)) => bucket.push(story.clone()),
            None => groups.push((key, vec![story.clone()])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::journal::test_support::{ManualClock, journal};
    use crate::settings::SiteConfig;

    fn story(caption: &str) -> NewStory {
        NewStory {
            image_base64: "data:image/jpeg;base64,AAAA".to_string(),
            caption: caption.to_string(),
            author_id: None,
        }
    }

    #[test]
    fn stories_move_from_active_to_archive_after_a_day() {
        let store = MemoryStore::new();
        let config = SiteConfig::default();
        let clock = ManualClock::start();
        let journal = journal(&store, &config, &clock);
        let anya = Session::signed_in("sayang@anya.com");

        journal.create_story(&anya, story("old")).expect("old story");
        clock.advance(Duration::hours(25));
        journal.create_story(&anya, story("fresh")).expect("fresh story");

        let active = journal.active_stories().expect("active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].caption, "fresh");
        assert_eq!(active[0].expires_at - active[0].created_at, 24 * 60 * 60 * 1000);

        let archived = journal.archived_stories("anya", 100).expect("archive");
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].caption, "old");
        assert!(journal.archived_stories("rey", 100).expect("rey archive").is_empty());

        let all = journal.all_stories(50).expect("all");
        let captions: Vec<&str> = all.iter().map(|s| s.caption.as_str()).collect();
        assert_eq!(captions, vec!["fresh", "old"]);
    }

    #[test]
    fn story_requires_image() {
        let store = MemoryStore::new();
        let config = SiteConfig::default();
        let journal = journal(&store, &config, &ManualClock::start());

        let result = journal.create_story(
            &Session::signed_in("sayang@anya.com"),
            NewStory::default(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn group_by_month_keeps_order() {
        let store = MemoryStore::new();
        let config = SiteConfig::default();
        let clock = ManualClock::start();
        let journal = journal(&store, &config, &clock);
        let rey = Session::signed_in("reyvan@ganteng.com");

        journal.create_story(&rey, story("dec-a")).expect("a");
        clock.advance(Duration::hours(1));
        journal.create_story(&rey, story("dec-b")).expect("b");
        clock.advance(Duration::days(20));
        journal.create_story(&rey, story("jan")).expect("c");

        let groups = group_by_month(&journal.all_stories(10).expect("all"));
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["January 2026", "December 2025"]);
        assert_eq!(groups[1].1.len(), 2);
        assert_eq!(groups[1].1[0].caption, "dec-b");
    }
}
