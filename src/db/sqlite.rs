//! SQLite 文档存储
//!
//! 每个文档一行：`(collection, id)` 为主键，`data` 存 JSON 文本。
//! 连接放在 `Mutex` 中，所有操作经 `with_conn` 统一获取锁与映射错误。

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::error::AppError;

use super::{Document, DocumentStore, Fields, MAX_ADD_ATTEMPTS, merge_fields, new_document_id, schema};

/// 基于 `rusqlite` 的文档存储。
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// 打开（或创建）数据库文件并初始化 Schema。
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    AppError::Database(format!("创建数据库目录失败: {}", e))
                })?;
            }
        }
        log::info!("数据库路径: {}", path.display());

        let conn = Connection::open(path).map_err(|e| {
            AppError::Database(format!("打开数据库失败: {}", e))
        })?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            AppError::Database(format!("打开内存数据库失败: {}", e))
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, AppError> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, op: impl FnOnce(&Connection) -> Result<T, AppError>) -> Result<T, AppError> {
        let conn = self.conn.lock().map_err(|e| {
            AppError::Database(format!("获取数据库锁失败: {}", e))
        })?;
        op(&conn)
    }

    fn read_fields(conn: &Connection, collection: &str, id: &str) -> Result<Option<Fields>, AppError> {
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Database(format!("查询文档失败: {}", e)))?;

        data.map(|json| serde_json::from_str::<Fields>(&json).map_err(AppError::from))
            .transpose()
    }

    fn write_fields(conn: &Connection, collection: &str, id: &str, fields: &Fields) -> Result<(), AppError> {
        let data = serde_json::to_string(fields)?;
        let now = chrono::Utc::now().timestamp_millis();
        conn.execute(
            "INSERT INTO documents (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![collection, id, data, now],
        ).map_err(|e| AppError::Database(format!("写入文档失败: {}", e)))?;
        Ok(())
    }

    /// 仅在 ID 不存在时插入；主键冲突返回 `false`。
    fn insert_new(conn: &Connection, collection: &str, id: &str, fields: &Fields) -> Result<bool, AppError> {
        let data = serde_json::to_string(fields)?;
        let now = chrono::Utc::now().timestamp_millis();
        match conn.execute(
            "INSERT INTO documents (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![collection, id, data, now],
        ) {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => Ok(false),
            Err(e) => Err(AppError::Database(format!("插入文档失败: {}", e))),
        }
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>, AppError> {
        self.with_conn(|conn| Self::read_fields(conn, collection, id))
    }

    fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError> {
        self.with_conn(|conn| Self::write_fields(conn, collection, id, &fields))
    }

    fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().map_err(|e| {
                AppError::Database(format!("开始事务失败: {}", e))
            })?;
            let mut current = Self::read_fields(&tx, collection, id)?.unwrap_or_default();
            merge_fields(&mut current, fields);
            Self::write_fields(&tx, collection, id, &current)?;
            tx.commit().map_err(|e| AppError::Database(format!("提交事务失败: {}", e)))
        })
    }

    fn add(&self, collection: &str, fields: Fields) -> Result<String, AppError> {
        self.with_conn(|conn| {
            for _ in 0..MAX_ADD_ATTEMPTS {
                let id = new_document_id();
                if Self::insert_new(conn, collection, &id, &fields)? {
                    return Ok(id);
                }
                log::warn!("文档 ID 已存在，重新生成: {}/{}", collection, id);
            }
            Err(AppError::Database(format!("生成文档 ID 失败: {}", collection)))
        })
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            ).map_err(|e| AppError::Database(format!("删除文档失败: {}", e)))?;
            Ok(())
        })
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id")
                .map_err(|e| AppError::Database(format!("准备查询失败: {}", e)))?;

            let rows = stmt
                .query_map(params![collection], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|e| AppError::Database(format!("查询文档失败: {}", e)))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Database(format!("读取行失败: {}", e)))?;

            rows.into_iter()
                .map(|(id, data)| {
                    let fields = serde_json::from_str::<Fields>(&data)?;
                    Ok(Document { id, fields })
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use serde_json::json;

    use super::*;

    fn unique_temp_dir() -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        std::env::temp_dir().join(format!("love-journal-db-test-{nanos}"))
    }

    #[test]
    fn sqlite_store_satisfies_document_contract() {
        let store = SqliteStore::open_in_memory().expect("open memory store");
        crate::db::tests::exercise_store(&store);
    }

    #[test]
    fn documents_survive_reopen() {
        let dir = unique_temp_dir();
        let path = dir.join("journal.db");

        {
            let store = SqliteStore::open(&path).expect("open store");
            let fields = json!({ "currentProgress": 40 }).as_object().cloned().expect("object");
            store.set("landing", "loveProgress", fields).expect("write");
        }

        let reopened = SqliteStore::open(&path).expect("reopen store");
        let doc = reopened.get("landing", "loveProgress").expect("read");
        assert_eq!(doc.and_then(|f| f.get("currentProgress").cloned()), Some(json!(40)));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn add_never_replaces_an_existing_document() {
        let store = SqliteStore::open_in_memory().expect("open memory store");
        let taken = json!({ "caption": "keep" }).as_object().cloned().expect("object");
        store.set("posts", "fixed-id", taken.clone()).expect("seed");

        let inserted = store
            .with_conn(|conn| SqliteStore::insert_new(conn, "posts", "fixed-id", &Fields::new()))
            .expect("insert");
        assert!(!inserted);
        assert_eq!(store.get("posts", "fixed-id").expect("get"), Some(taken));
    }

    #[test]
    fn two_handles_on_one_file_keep_every_added_document() {
        let dir = unique_temp_dir();
        let path = dir.join("journal.db");
        let first = SqliteStore::open(&path).expect("open first handle");
        let second = SqliteStore::open(&path).expect("open second handle");

        let mut ids = std::collections::HashSet::new();
        for i in 0..200 {
            let fields = json!({ "n": i }).as_object().cloned().expect("object");
            ids.insert(first.add("posts", fields.clone()).expect("add via first"));
            ids.insert(second.add("posts", fields).expect("add via second"));
        }

        assert_eq!(ids.len(), 400);
        assert_eq!(first.list("posts").expect("list").len(), 400);

        drop(first);
        drop(second);
        let _ = std::fs::remove_dir_all(dir);
    }
}
