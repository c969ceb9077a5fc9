//! SQLite-backed record store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    extension_of, AudioRecord, ConversionStatus, CreateRecordRequest, RecordError, RecordFilter,
    RecordStore,
};
use crate::blob::BlobKey;
use crate::format::FormatRegistry;

const COLUMNS: &str = "id, title, artist, original_name, original_extension, target_extension, original_key, converted_key, status, error_message, uploaded_at, converted_at, version";

/// SQLite-backed record store.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, RecordError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RecordError::Database(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite record store (useful for testing).
    pub fn in_memory() -> Result<Self, RecordError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RecordError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS audio_records (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                artist TEXT,
                original_name TEXT NOT NULL,
                original_extension TEXT NOT NULL,
                target_extension TEXT NOT NULL,
                original_key TEXT,
                converted_key TEXT,
                status TEXT NOT NULL,
                error_message TEXT NOT NULL DEFAULT '',
                uploaded_at TEXT NOT NULL,
                converted_at TEXT,
                version INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_audio_records_status ON audio_records(status);
            CREATE INDEX IF NOT EXISTS idx_audio_records_uploaded_at ON audio_records(uploaded_at DESC);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RecordError> {
        self.conn
            .lock()
            .map_err(|_| RecordError::Database("connection mutex poisoned".to_string()))
    }

    fn format_time(time: &DateTime<Utc>) -> String {
        time.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn build_where_clause(filter: &RecordFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<AudioRecord> {
        let original_key: Option<String> = row.get(6)?;
        let converted_key: Option<String> = row.get(7)?;
        let status_str: String = row.get(8)?;
        let uploaded_at_str: String = row.get(10)?;
        let converted_at_str: Option<String> = row.get(11)?;

        // Rows are only written by this store; fall back rather than fail on bad data.
        let status = status_str.parse().unwrap_or(ConversionStatus::Failed);
        let uploaded_at = Self::parse_time(&uploaded_at_str).unwrap_or_else(Utc::now);

        Ok(AudioRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            original_name: row.get(3)?,
            original_extension: row.get(4)?,
            target_extension: row.get(5)?,
            original_key: original_key.and_then(|k| BlobKey::parse(k).ok()),
            converted_key: converted_key.and_then(|k| BlobKey::parse(k).ok()),
            status,
            error_message: row.get(9)?,
            uploaded_at,
            converted_at: converted_at_str.as_deref().and_then(Self::parse_time),
            version: row.get(12)?,
        })
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Option<AudioRecord>, RecordError> {
        let record = conn
            .query_row(
                &format!("SELECT {} FROM audio_records WHERE id = ?", COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }
}

impl RecordStore for SqliteRecordStore {
    fn create(&self, request: CreateRecordRequest) -> Result<AudioRecord, RecordError> {
        let target = FormatRegistry::lookup(&request.target_extension)?;
        let conn = self.conn()?;

        let record = AudioRecord {
            id: uuid::Uuid::new_v4().to_string(),
            original_extension: extension_of(&request.original_name),
            title: request.title,
            artist: request.artist,
            original_name: request.original_name,
            target_extension: target.format.as_str().to_string(),
            original_key: request.original_key,
            converted_key: None,
            status: ConversionStatus::Pending,
            error_message: String::new(),
            // Stored with microsecond precision.
            uploaded_at: Utc::now().trunc_subsecs(6),
            converted_at: None,
            version: 0,
        };

        conn.execute(
            &format!(
                "INSERT INTO audio_records ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                COLUMNS
            ),
            params![
                record.id,
                record.title,
                record.artist,
                record.original_name,
                record.original_extension,
                record.target_extension,
                record.original_key.as_ref().map(|k| k.as_str()),
                Option::<String>::None,
                record.status.as_str(),
                record.error_message,
                Self::format_time(&record.uploaded_at),
                Option::<String>::None,
                record.version,
            ],
        )?;

        Ok(record)
    }

    fn get(&self, id: &str) -> Result<Option<AudioRecord>, RecordError> {
        let conn = self.conn()?;
        Self::get_locked(&conn, id)
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<AudioRecord>, RecordError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT {} FROM audio_records {} ORDER BY uploaded_at DESC, rowid DESC LIMIT ? OFFSET ?",
            COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql)?;

        let mut all_params = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt.query_map(param_refs.as_slice(), Self::row_to_record)?;

        let mut records = Vec::new();
        for row_result in rows {
            records.push(row_result?);
        }
        Ok(records)
    }

    fn count(&self, filter: &RecordFilter) -> Result<i64, RecordError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM audio_records {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    fn set_target(&self, id: &str, target_extension: &str) -> Result<AudioRecord, RecordError> {
        let target = FormatRegistry::lookup(target_extension)?;
        let conn = self.conn()?;

        let changed = conn.execute(
            "UPDATE audio_records SET target_extension = ?, version = version + 1 WHERE id = ?",
            params![target.format.as_str(), id],
        )?;
        if changed == 0 {
            return Err(RecordError::NotFound(id.to_string()));
        }

        Self::get_locked(&conn, id)?.ok_or_else(|| RecordError::NotFound(id.to_string()))
    }

    fn save_conversion(
        &self,
        record: &AudioRecord,
        expected_version: i64,
    ) -> Result<AudioRecord, RecordError> {
        let conn = self.conn()?;

        let changed = conn.execute(
            "UPDATE audio_records SET status = ?, error_message = ?, converted_key = ?, converted_at = ?, version = version + 1 WHERE id = ? AND version = ?",
            params![
                record.status.as_str(),
                record.error_message,
                record.converted_key.as_ref().map(|k| k.as_str()),
                record.converted_at.as_ref().map(Self::format_time),
                record.id,
                expected_version,
            ],
        )?;

        if changed == 0 {
            let actual: Option<i64> = conn
                .query_row(
                    "SELECT version FROM audio_records WHERE id = ?",
                    params![record.id],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match actual {
                Some(actual) => RecordError::Conflict {
                    id: record.id.clone(),
                    expected: expected_version,
                    actual,
                },
                None => RecordError::NotFound(record.id.clone()),
            });
        }

        Self::get_locked(&conn, &record.id)?.ok_or_else(|| RecordError::NotFound(record.id.clone()))
    }

    fn delete(&self, id: &str) -> Result<AudioRecord, RecordError> {
        let conn = self.conn()?;

        let record =
            Self::get_locked(&conn, id)?.ok_or_else(|| RecordError::NotFound(id.to_string()))?;
        conn.execute("DELETE FROM audio_records WHERE id = ?", params![id])?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteRecordStore {
        SqliteRecordStore::in_memory().unwrap()
    }

    fn create_test_request(title: &str) -> CreateRecordRequest {
        CreateRecordRequest {
            title: title.to_string(),
            artist: Some("Artist".to_string()),
            original_name: "Track One.WAV".to_string(),
            target_extension: "MP3".to_string(),
            original_key: Some(BlobKey::parse("original/abc/Track One.WAV").unwrap()),
        }
    }

    #[test]
    fn test_create_record() {
        let store = create_test_store();
        let record = store.create(create_test_request("Song")).unwrap();

        assert!(!record.id.is_empty());
        assert_eq!(record.original_extension, "wav");
        assert_eq!(record.target_extension, "mp3");
        assert_eq!(record.status, ConversionStatus::Pending);
        assert!(record.error_message.is_empty());
        assert!(record.converted_at.is_none());
        assert_eq!(record.version, 0);
    }

    #[test]
    fn test_create_rejects_unknown_target() {
        let store = create_test_store();
        let mut request = create_test_request("Song");
        request.target_extension = "xyz".to_string();

        let err = store.create(request).unwrap_err();
        assert!(matches!(err, RecordError::UnsupportedFormat(_)));
        assert_eq!(store.count(&RecordFilter::new()).unwrap(), 0);
    }

    #[test]
    fn test_get_round_trips_fields() {
        let store = create_test_store();
        let created = store.create(create_test_request("Song")).unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first_with_pagination() {
        let store = create_test_store();
        let first = store.create(create_test_request("First")).unwrap();
        let second = store.create(create_test_request("Second")).unwrap();
        let third = store.create(create_test_request("Third")).unwrap();

        let all = store.list(&RecordFilter::new()).unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![third.id.as_str(), second.id.as_str(), first.id.as_str()]);

        let page = store
            .list(&RecordFilter::new().with_limit(1).with_offset(1))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, second.id);
    }

    #[test]
    fn test_save_conversion_success() {
        let store = create_test_store();
        let mut record = store.create(create_test_request("Song")).unwrap();

        record.status = ConversionStatus::Success;
        record.converted_key = Some(BlobKey::parse("converted/x/Track One.mp3").unwrap());
        record.converted_at = Some(Utc::now());
        let saved = store.save_conversion(&record, 0).unwrap();

        assert_eq!(saved.version, 1);
        assert_eq!(saved.status, ConversionStatus::Success);
        assert_eq!(saved.converted_key, record.converted_key);
        assert!(saved.converted_at.is_some());

        let filter = RecordFilter::new().with_status(ConversionStatus::Success);
        assert_eq!(store.count(&filter).unwrap(), 1);
        assert_eq!(store.list(&filter).unwrap()[0].id, record.id);
    }

    #[test]
    fn test_save_conversion_conflict() {
        let store = create_test_store();
        let mut record = store.create(create_test_request("Song")).unwrap();
        store.set_target(&record.id, "ogg").unwrap();

        record.status = ConversionStatus::Failed;
        record.error_message = "boom".to_string();
        let err = store.save_conversion(&record, 0).unwrap_err();

        match err {
            RecordError::Conflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        let stored = store.get(&record.id).unwrap().unwrap();
        assert_eq!(stored.status, ConversionStatus::Pending);
    }

    #[test]
    fn test_save_conversion_missing_record() {
        let store = create_test_store();
        let mut record = store.create(create_test_request("Song")).unwrap();
        store.delete(&record.id).unwrap();

        record.status = ConversionStatus::Failed;
        let err = store.save_conversion(&record, 0).unwrap_err();
        assert!(matches!(err, RecordError::NotFound(_)));
    }

    #[test]
    fn test_set_target() {
        let store = create_test_store();
        let record = store.create(create_test_request("Song")).unwrap();

        let updated = store.set_target(&record.id, "FLAC").unwrap();
        assert_eq!(updated.target_extension, "flac");
        assert_eq!(updated.version, 1);

        assert!(matches!(
            store.set_target(&record.id, "xyz"),
            Err(RecordError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            store.set_target("missing", "wav"),
            Err(RecordError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let store = create_test_store();
        let record = store.create(create_test_request("Song")).unwrap();

        let deleted = store.delete(&record.id).unwrap();
        assert_eq!(deleted.id, record.id);
        assert!(store.get(&record.id).unwrap().is_none());
        assert!(matches!(store.delete(&record.id), Err(RecordError::NotFound(_))));
    }

    #[test]
    fn test_new_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("records.db");

        let store = SqliteRecordStore::new(&path).unwrap();
        store.create(create_test_request("Song")).unwrap();
        drop(store);

        let reopened = SqliteRecordStore::new(&path).unwrap();
        assert_eq!(reopened.count(&RecordFilter::new()).unwrap(), 1);
    }
}
