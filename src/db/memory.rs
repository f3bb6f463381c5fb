//! 内存文档存储
//!
//! 使用 `Mutex<HashMap<集合, BTreeMap<ID, 字段>>>`，锁中毒统一映射为 `AppError::Database`。

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::error::AppError;

use super::{Document, DocumentStore, Fields, MAX_ADD_ATTEMPTS, merge_fields, new_document_id};

type Collections = HashMap<String, BTreeMap<String, Fields>>;

/// 进程内文档存储。
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collections<T>(&self, op: impl FnOnce(&mut Collections) -> T) -> Result<T, AppError> {
        let mut guard = self
            .collections
            .lock()
            .map_err(|e| AppError::Database(format!("获取存储锁失败: {}", e)))?;
        Ok(op(&mut guard))
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>, AppError> {
        self.with_collections(|collections| {
            collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .cloned()
        })
    }

    fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError> {
        self.with_collections(|collections| {
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), fields);
        })
    }

    fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError> {
        self.with_collections(|collections| {
            let doc = collections
                .entry(collection.to_string())
                .or_default()
                .entry(id.to_string())
                .or_default();
            merge_fields(doc, fields);
        })
    }

    fn add(&self, collection: &str, fields: Fields) -> Result<String, AppError> {
        self.with_collections(|collections| {
            let docs = collections.entry(collection.to_string()).or_default();
            for _ in 0..MAX_ADD_ATTEMPTS {
                let id = new_document_id();
                if let Entry::Vacant(slot) = docs.entry(id.clone()) {
                    slot.insert(fields);
                    return Ok(id);
                }
            }
            Err(AppError::Database(format!("生成文档 ID 失败: {}", collection)))
        })?
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.with_collections(|collections| {
            if let Some(docs) = collections.get_mut(collection) {
                docs.remove(id);
            }
        })
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        self.with_collections(|collections| {
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .map(|(id, fields)| Document {
                            id: id.clone(),
                            fields: fields.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_satisfies_document_contract() {
        let store = MemoryStore::new();
        crate::db::tests::exercise_store(&store);
    }
}
