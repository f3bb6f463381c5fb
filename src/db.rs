//! 文档存储模块
//!
//! # 设计思路
//!
//! 内容层只依赖一个通用的“集合 + 文档 ID → JSON 字段”读写接口 `DocumentStore`，
//! 不关心背后是内存、SQLite 还是远端文档数据库。
//!
//! # 实现
//!
//! - [`MemoryStore`]：进程内存储，测试与临时会话使用
//! - [`SqliteStore`]：`rusqlite` 持久化，每个文档一行 JSON
//!
//! 写入语义：
//! - `set`：整体替换
//! - `merge`：浅合并顶层字段，文档不存在时创建
//! - `update`：浅合并，文档不存在时返回 `NotFound`
//! - `add`：生成新 ID 后写入

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppError;

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// 文档字段（JSON 对象）。
pub type Fields = Map<String, Value>;

/// 带 ID 的文档快照。
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// 通用文档读写接口。
pub trait DocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>, AppError>;

    fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError>;

    fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError>;

    /// 写入新文档并返回生成的 ID；从不覆盖已有文档。
    fn add(&self, collection: &str, fields: Fields) -> Result<String, AppError>;

    /// 删除文档；不存在时静默成功。
    fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;

    /// 列出集合内全部文档（顺序不保证）。
    fn list(&self, collection: &str) -> Result<Vec<Document>, AppError>;

    fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError> {
        if self.get(collection, id)?.is_none() {
            return Err(AppError::NotFound(format!("{}/{}", collection, id)));
        }
        self.merge(collection, id, fields)
    }
}

/// 浅合并：`patch` 的顶层字段覆盖 `base`。
pub(crate) fn merge_fields(base: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        base.insert(key, value);
    }
}

/// `add` 遇到 ID 已存在时的最大重试次数。
pub(crate) const MAX_ADD_ATTEMPTS: usize = 8;

/// 进程内共享的序号，所有存储句柄共用。
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// 生成文档 ID：毫秒时间戳 + 进程内单调序号 + 随机后缀。
///
/// 同一进程内按字典序大致等于创建顺序；随机后缀区分不同进程。
pub(crate) fn new_document_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xF_FFFF;
    let random = (Uuid::new_v4().as_u128() & 0xFF_FFFF) as u32;
    format!("{:011x}{:05x}{:06x}", millis, sequence, random)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn merge_fields_overwrites_top_level_only() {
        let mut base = fields(json!({ "a": 1, "nested": { "x": 1 } }));
        merge_fields(&mut base, fields(json!({ "b": 2, "nested": { "y": 2 } })));

        assert_eq!(Value::Object(base), json!({ "a": 1, "b": 2, "nested": { "y": 2 } }));
    }

    #[test]
    fn document_ids_are_unique_and_ordered_within_process() {
        let ids: Vec<String> = (0..1000).map(|_| new_document_id()).collect();
        let unique: std::collections::HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.iter().all(|id| id.len() == 22));
        assert!(ids.windows(2).all(|w| w[0][..16] < w[1][..16]));
    }

    /// 两种实现共享同一套行为约束。
    pub(crate) fn exercise_store(store: &dyn DocumentStore) {
        let id = store
            .add("posts", fields(json!({ "caption": "first" })))
            .expect("add");
        assert_eq!(
            store.get("posts", &id).expect("get").map(Value::Object),
            Some(json!({ "caption": "first" }))
        );

        store
            .merge("posts", &id, fields(json!({ "likes": 2 })))
            .expect("merge");
        store
            .update("posts", &id, fields(json!({ "caption": "edited" })))
            .expect("update");
        assert_eq!(
            store.get("posts", &id).expect("get").map(Value::Object),
            Some(json!({ "caption": "edited", "likes": 2 }))
        );

        let missing = store.update("posts", "missing", Fields::new());
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        store
            .merge("content", "home", fields(json!({ "heroTitle": "Hi" })))
            .expect("merge creates");
        store
            .set("content", "home", fields(json!({ "heroSubtitle": "there" })))
            .expect("set replaces");
        assert_eq!(
            store.get("content", "home").expect("get").map(Value::Object),
            Some(json!({ "heroSubtitle": "there" }))
        );

        let second = store.add("posts", Fields::new()).expect("add second");
        assert_eq!(store.list("posts").expect("list").len(), 2);
        assert!(store.list("stories").expect("list empty").is_empty());

        store.delete("posts", &second).expect("delete");
        store.delete("posts", &second).expect("delete twice");
        assert_eq!(store.list("posts").expect("list").len(), 1);
    }
}
