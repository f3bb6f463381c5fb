//! Schema 初始化子模块
//!
//! ## 职责
//! - 创建/迁移文档表结构与索引
//! - 设置 SQLite 运行参数（WAL）
//!
//! ## 错误语义
//! - DDL 失败统一映射为 `AppError::Database`

use rusqlite::Connection;

use crate::error::AppError;

const SCHEMA_VERSION: i64 = 2;

fn get_user_version(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| AppError::Database(format!("读取数据库版本失败: {}", e)))
}

fn set_user_version(conn: &Connection, version: i64) -> Result<(), AppError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| AppError::Database(format!("写入数据库版本失败: {}", e)))
}

fn create_documents_table(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        );"
    ).map_err(|e| AppError::Database(format!("创建文档表失败: {}", e)))
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, AppError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(|e| AppError::Database(format!("读取表结构失败: {}", e)))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| AppError::Database(format!("读取表结构失败: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(format!("读取表结构失败: {}", e)))?;
    Ok(names.iter().any(|name| name == column))
}

fn add_updated_at_column(conn: &Connection) -> Result<(), AppError> {
    if !has_column(conn, "documents", "updated_at")? {
        conn.execute("ALTER TABLE documents ADD COLUMN updated_at INTEGER NOT NULL DEFAULT 0", [])
            .map_err(|e| AppError::Database(format!("添加 updated_at 列失败: {}", e)))?;
    }
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_documents_collection_updated ON documents(collection, updated_at DESC);"
    ).map_err(|e| AppError::Database(format!("创建文档索引失败: {}", e)))
}

pub(super) fn initialize_schema(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

    create_documents_table(conn)?;

    let mut version = get_user_version(conn)?;
    if version < 1 {
        set_user_version(conn, 1)?;
        version = 1;
    }

    if version < 2 {
        add_updated_at_column(conn)?;
        set_user_version(conn, 2)?;
        version = 2;
    }

    if version != SCHEMA_VERSION {
        return Err(AppError::Database(format!(
            "数据库版本不匹配: current={}, expected={}",
            version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn initialize_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("create memory db");

        initialize_schema(&conn).expect("first init should succeed");
        initialize_schema(&conn).expect("second init should succeed");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='documents'", [], |row| row.get(0))
            .expect("query table count");

        assert_eq!(count, 1, "documents table should exist exactly once");
        assert_eq!(get_user_version(&conn).expect("version"), SCHEMA_VERSION);
    }

    #[test]
    fn initialize_schema_migrates_v1_tables() {
        let conn = Connection::open_in_memory().expect("create memory db");
        conn.execute_batch(
            "CREATE TABLE documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
            INSERT INTO documents (collection, id, data) VALUES ('posts', 'a', '{}');
            PRAGMA user_version = 1;"
        )
        .expect("prepare legacy v1 schema");

        initialize_schema(&conn).expect("migrate from v1 to v2");

        let mut stmt = conn
            .prepare("PRAGMA table_info(documents)")
            .expect("prepare table_info");
        let columns: HashSet<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query columns")
            .collect::<Result<_, _>>()
            .expect("collect columns");

        assert!(columns.contains("updated_at"), "missing updated_at column");
        let legacy: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents WHERE id = 'a'", [], |row| row.get(0))
            .expect("query legacy row");
        assert_eq!(legacy, 1, "legacy rows must survive migration");
    }

    #[test]
    fn initialize_schema_accepts_v1_table_that_already_has_updated_at() {
        let conn = Connection::open_in_memory().expect("create memory db");
        conn.execute_batch(
            "CREATE TABLE documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (collection, id)
            );
            PRAGMA user_version = 1;"
        )
        .expect("prepare half-migrated schema");

        initialize_schema(&conn).expect("column already present is not an error");
        assert_eq!(get_user_version(&conn).expect("version"), SCHEMA_VERSION);
    }

    #[test]
    fn failed_column_migration_is_reported() {
        let conn = Connection::open_in_memory().expect("create memory db");
        conn.execute_batch(
            "CREATE VIEW documents AS SELECT 'posts' AS collection, 'a' AS id, '{}' AS data;
            PRAGMA user_version = 1;"
        )
        .expect("prepare view named documents");

        let result = initialize_schema(&conn);
        assert!(matches!(result, Err(AppError::Database(_))), "got {:?}", result);
        assert_eq!(get_user_version(&conn).expect("version"), 1);
    }
}
