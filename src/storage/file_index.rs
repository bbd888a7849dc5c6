use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Row, params};
use serde::Serialize;

use super::Database;
use crate::types::{Result, log_filter_error};

/// SQLite `CURRENT_TIMESTAMP` layout, also used for rows written here
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub user_id: String,
    pub filename: String,
    pub file_path: String,
    pub upload_time: Option<DateTime<Utc>>,
    pub message_link: Option<String>,
}

pub struct FileIndex<'a> {
    db: &'a Database,
}

impl<'a> FileIndex<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record an upload and return its row id
    pub fn save_file(
        &self,
        user_id: &str,
        filename: &str,
        file_path: &str,
        message_link: Option<&str>,
    ) -> Result<i64> {
        self.save_file_at(user_id, filename, file_path, message_link, Utc::now())
    }

    pub fn save_file_at(
        &self,
        user_id: &str,
        filename: &str,
        file_path: &str,
        message_link: Option<&str>,
        upload_time: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.db.connection()?;
        conn.execute(
            r#"
            INSERT INTO files (user_id, filename, file_path, upload_time, message_link)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                user_id,
                filename,
                file_path,
                upload_time.format(TIMESTAMP_FORMAT).to_string(),
                message_link
            ],
        )?;

        let id = conn.last_insert_rowid();
        tracing::info!(id, user_id, filename, "Saved file record");
        Ok(id)
    }

    /// Files whose name or uploader id contains `keyword`, newest first.
    /// `%` and `_` in the keyword match literally.
    pub fn search_files(&self, keyword: &str, limit: usize) -> Result<Vec<FileRecord>> {
        let pattern = format!("%{}%", escape_like(keyword));

        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, filename, file_path, upload_time, message_link
            FROM files
            WHERE filename LIKE ?1 ESCAPE '\' OR user_id LIKE ?1 ESCAPE '\'
            ORDER BY upload_time DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let records = stmt
            .query_map(params![pattern, limit as i64], row_to_record)?
            .filter_map(|r| log_filter_error(r, "reading file record"))
            .collect();

        Ok(records)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.db.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let upload_time: Option<String> = row.get(4)?;
    Ok(FileRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        filename: row.get(2)?,
        file_path: row.get(3)?,
        upload_time: upload_time.as_deref().and_then(parse_timestamp),
        message_link: row.get(5)?,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
