//! 站点配置模块
//!
//! # 设计思路
//!
//! 用户资料、标签、高光图标/渐变、里程碑文案等常量集中为一个不可变的 `SiteConfig`，
//! 进程启动时构建一次，之后以引用方式传给需要它的组件，只有一个权威来源。
//!
//! # 实现思路
//!
//! - `Default` 提供内置配置。
//! - `load_from_path` 读取可选的 JSON 文件；文件缺失或解析失败时回退默认值。
//! - 邮箱 → 作者映射由 `profiles` 的 `email` 字段推导，避免两份数据漂移。
//! - `with_profile_overrides` 读取文档存储中的头像/昵称，返回新的配置而不是原地修改。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::DocumentStore;
use crate::error::AppError;

/// 用户资料。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub avatar_url: String,
    pub accent_color: String,
    /// 资料覆盖文档的 ID（`landing` 集合）。
    #[serde(default)]
    pub landing_doc: Option<String>,
}

/// 高光渐变色。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightGradient {
    pub id: String,
    pub from: String,
    pub to: String,
}

/// 恋爱进度里程碑。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub threshold: u8,
    pub emoji: String,
    pub message: String,
    pub color: String,
}

/// 站点配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteConfig {
    pub profiles: Vec<UserProfile>,
    /// 未登录或邮箱未知时使用的作者。
    pub default_author: String,
    /// 唯一允许修改恋爱进度的作者。
    pub progress_editor: String,
    pub tags: Vec<String>,
    pub highlight_icons: Vec<String>,
    pub highlight_gradients: Vec<HighlightGradient>,
    pub love_milestones: Vec<Milestone>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn milestone(threshold: u8, emoji: &str, message: &str, color: &str) -> Milestone {
    Milestone {
        threshold,
        emoji: emoji.to_string(),
        message: message.to_string(),
        color: color.to_string(),
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            profiles: vec![
                UserProfile {
                    id: "rey".to_string(),
                    name: "M Reyvan Purnama".to_string(),
                    display_name: "Rey".to_string(),
                    email: "reyvan@ganteng.com".to_string(),
                    role: "The Observer".to_string(),
                    avatar_url: "https://images.unsplash.com/photo-1500648767791-00dcc994a43e?ixlib=rb-1.2.1&auto=format&fit=crop&w=400&q=80".to_string(),
                    accent_color: "blue".to_string(),
                    landing_doc: Some("profileRey".to_string()),
                },
                UserProfile {
                    id: "anya".to_string(),
                    name: "Anya".to_string(),
                    display_name: "Anya".to_string(),
                    email: "sayang@anya.com".to_string(),
                    role: "The Main Character".to_string(),
                    avatar_url: "https://images.unsplash.com/photo-1517841905240-472988babdf9?ixlib=rb-1.2.1&auto=format&fit=crop&w=400&q=80".to_string(),
                    accent_color: "pink".to_string(),
                    landing_doc: Some("profileHer".to_string()),
                },
            ],
            default_author: "rey".to_string(),
            progress_editor: "anya".to_string(),
            tags: strings(&["Dates", "Trips", "Food", "Silly", "Random", "Music", "Tech", "Work"]),
            highlight_icons: strings(&[
                "heart", "star", "camera", "music", "plane", "coffee", "smile", "sun",
                "moon", "sparkles", "flame", "zap", "gift", "cake", "crown", "diamond",
                "gamepad-2", "headphones", "briefcase", "book", "palette", "film",
                "utensils", "shopping-bag", "home", "car", "bike", "dumbbell",
            ]),
            highlight_gradients: [
                ("pink", "pink-400", "rose-500"),
                ("purple", "purple-400", "pink-500"),
                ("blue", "blue-400", "cyan-500"),
                ("green", "emerald-400", "teal-500"),
                ("orange", "orange-400", "amber-500"),
                ("red", "red-400", "rose-600"),
                ("slate", "slate-400", "slate-600"),
                ("gold", "yellow-400", "amber-500"),
            ]
            .iter()
            .map(|(id, from, to)| HighlightGradient {
                id: id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            })
            .collect(),
            love_milestones: vec![
                milestone(0, "💔", "Starting from zero...", "slate"),
                milestone(10, "🌱", "A small seed of hope", "slate"),
                milestone(20, "💙", "Dia bilang 20%... dan itu sudah bikin aku senyum seharian.", "blue"),
                milestone(30, "🌸", "Perlahan tapi pasti...", "blue"),
                milestone(40, "💜", "Getting closer each day", "purple"),
                milestone(50, "💗", "Halfway there! Keep going...", "pink"),
                milestone(60, "💕", "More than friends now?", "pink"),
                milestone(70, "💖", "Almost there... I can feel it", "pink"),
                milestone(80, "💝", "So close to home...", "rose"),
                milestone(90, "💘", "Just a little more...", "rose"),
                milestone(100, "❤️", "Welcome back, my love. Aku pulang.", "red"),
            ],
        }
    }
}

impl SiteConfig {
    /// 从 JSON 文件加载配置；缺失或无效时回退内置默认值。
    pub fn load_from_path(path: &Path) -> SiteConfig {
        if !path.exists() {
            return SiteConfig::default();
        }
        match fs::read_to_string(path)
            .map_err(AppError::from)
            .and_then(|content| serde_json::from_str::<SiteConfig>(&content).map_err(AppError::from))
            .and_then(|config| config.validated())
        {
            Ok(config) => config,
            Err(err) => {
                log::warn!("站点配置无效，回退默认配置: {} ({})", path.display(), err);
                SiteConfig::default()
            }
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), AppError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Storage(format!("序列化配置失败: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 校验引用关系：默认作者与进度编辑者必须存在于 `profiles`。
    pub fn validated(self) -> Result<SiteConfig, AppError> {
        for author in [&self.default_author, &self.progress_editor] {
            if self.profile(author).is_none() {
                return Err(AppError::Storage(format!("未知作者: {}", author)));
            }
        }
        Ok(self)
    }

    pub fn profile(&self, author_id: &str) -> Option<&UserProfile> {
        self.profiles.iter().find(|p| p.id == author_id)
    }

    /// 按邮箱解析作者 ID（大小写不敏感），未知或为空时返回默认作者。
    pub fn author_for_email(&self, email: Option<&str>) -> &str {
        email
            .map(|e| e.trim().to_lowercase())
            .and_then(|e| self.profiles.iter().find(|p| p.email.to_lowercase() == e))
            .map(|p| p.id.as_str())
            .unwrap_or(self.default_author.as_str())
    }

    /// 作者头像，未知作者回退默认作者的头像。
    pub fn avatar_for(&self, author_id: &str) -> &str {
        self.profile(author_id)
            .or_else(|| self.profile(&self.default_author))
            .map(|p| p.avatar_url.as_str())
            .unwrap_or_default()
    }

    pub fn is_known_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_known_icon(&self, icon: &str) -> bool {
        self.highlight_icons.iter().any(|i| i == icon)
    }

    pub fn gradient(&self, id: &str) -> Option<&HighlightGradient> {
        self.highlight_gradients.iter().find(|g| g.id == id)
    }

    /// 用文档存储中的资料覆盖（`landing/<landing_doc>` 的 `name`/`photo`）生成新配置。
    ///
    /// 读取失败时记录日志并返回原配置的副本。
    pub fn with_profile_overrides(&self, store: &dyn DocumentStore) -> SiteConfig {
        let mut next = self.clone();
        for profile in &mut next.profiles {
            let Some(doc_id) = profile.landing_doc.clone() else {
                continue;
            };
            match store.get("landing", &doc_id) {
                Ok(Some(fields)) => {
                    let Some(photo) = fields.get("photo").and_then(|v| v.as_str()) else {
                        continue;
                    };
                    if photo.is_empty() {
                        continue;
                    }
                    profile.avatar_url = photo.to_string();
                    if let Some(name) = fields.get("name").and_then(|v| v.as_str()).filter(|n| !n.is_empty()) {
                        profile.name = name.to_string();
                        profile.display_name = name.to_string();
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("读取资料覆盖失败，沿用内置资料: {} ({})", doc_id, err);
                    return self.clone();
                }
            }
        }
        log::info!("用户资料已从文档存储加载");
        next
    }
}
