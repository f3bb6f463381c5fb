//! 首页与个人页文案（landing / CMS）子模块
//!
//! 文档位于 `content` 集合：`home` 保存首页 hero 与 about 区块，`her`/`him` 保存个人页引言与头像。
//! 所有写入都是浅合并，只覆盖本次提交的字段。

use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::db::DocumentStore;
use crate::error::AppError;

use super::{Journal, to_fields};

const COLLECTION: &str = "content";
const HOME_DOC: &str = "home";

/// 首页内容；缺失字段由页面保留默认文案。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_subtitle: Option<String>,
    #[serde(default, rename = "aboutText1", skip_serializing_if = "Option::is_none")]
    pub about_text1: Option<String>,
    #[serde(default, rename = "aboutText2", skip_serializing_if = "Option::is_none")]
    pub about_text2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_image: Option<String>,
}

/// 个人页内容。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSide {
    Her,
    Him,
}

impl ProfileSide {
    pub fn doc_id(self) -> &'static str {
        match self {
            ProfileSide::Her => "her",
            ProfileSide::Him => "him",
        }
    }
}

impl<S: DocumentStore + ?Sized> Journal<'_, S> {
    pub fn home(&self) -> Result<HomeContent, AppError> {
        Ok(self.read_one(COLLECTION, HOME_DOC)?.unwrap_or_default())
    }

    pub fn save_hero(&self, session: &Session, title: &str, subtitle: &str) -> Result<(), AppError> {
        session.require_signed_in()?;
        let patch = HomeContent {
            hero_title: Some(title.to_string()),
            hero_subtitle: Some(subtitle.to_string()),
            ..HomeContent::default()
        };
        self.store.merge(COLLECTION, HOME_DOC, to_fields(&patch)?)?;
        log::info!("🏠 首页 hero 已更新");
        Ok(())
    }

    /// 保存 about 区块；`image` 为 `None` 时保留原配图。
    pub fn save_about(
        &self,
        session: &Session,
        text1: &str,
        text2: &str,
        image: Option<String>,
    ) -> Result<(), AppError> {
        session.require_signed_in()?;
        let patch = HomeContent {
            about_text1: Some(text1.to_string()),
            about_text2: Some(text2.to_string()),
            about_image: image,
            ..HomeContent::default()
        };
        self.store.merge(COLLECTION, HOME_DOC, to_fields(&patch)?)?;
        log::info!("🏠 首页 about 已更新");
        Ok(())
    }

    pub fn profile_content(&self, side: ProfileSide) -> Result<ProfileContent, AppError> {
        Ok(self.read_one(COLLECTION, side.doc_id())?.unwrap_or_default())
    }

    /// 保存个人页引言；`image` 为 `None` 时保留原头像。
    pub fn save_profile_content(
        &self,
        session: &Session,
        side: ProfileSide,
        quote: &str,
        image: Option<String>,
    ) -> Result<(), AppError> {
        session.require_signed_in()?;
        let patch = ProfileContent {
            quote: Some(quote.to_string()),
            profile_image: image,
        };
        self.store.merge(COLLECTION, side.doc_id(), to_fields(&patch)?)?;
        log::info!("👤 个人页已更新 - {}", side.doc_id());
        Ok(())
    }
}
