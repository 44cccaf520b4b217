//! Kobo e-reader database access.
//!
//! The device database is never opened in place: [`prepare_working_copy`] copies it
//! first and [`KoboReader`] opens the copy read-only.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use libsql::{Builder, Connection, Database};
use std::path::{Path, PathBuf};

use crate::model::{AnnotationKind, AnnotationRecord, SourceRecord};

#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn books_matching_filter(&self) -> Result<Vec<SourceRecord>>;

    /// Annotations for one book, oldest first.
    async fn annotations_for_title(&self, title: &str) -> Result<Vec<AnnotationRecord>>;
}

pub async fn prepare_working_copy(source: &Path, dest: &Path) -> Result<PathBuf> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    tokio::fs::copy(source, dest).await.with_context(|| {
        format!("failed to copy {} to {}", source.display(), dest.display())
    })?;

    tracing::debug!("copied {} to {}", source.display(), dest.display());
    Ok(dest.to_path_buf())
}

/// Parses the timestamp formats found in `Bookmark.DateCreated`.
pub fn parse_kobo_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim().trim_end_matches('Z');
    if trimmed.is_empty() {
        return None;
    }

    let formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

const BOOKS_QUERY: &str = r#"
    SELECT DISTINCT
        c.Title,
        c.Subtitle,
        c.Attribution,
        c.Publisher,
        c.ISBN,
        c.Series,
        c.SeriesNumber,
        c.___PercentRead,
        c.ImageId
    FROM content AS c
    WHERE
        c.isDownloaded = 'true' AND
        c.Accessibility = 1 AND
        c.EntitlementId IS NOT NULL AND
        c.DownloadUrl IS NOT NULL AND
        c.IsAbridged = 'false'
"#;

const CONTENT_ID_QUERY: &str = r#"
    SELECT c.ContentID
    FROM content AS c
    WHERE c.Title LIKE ?
    ORDER BY (c.Title = ?) DESC
    LIMIT 1
"#;

const BOOKMARKS_QUERY: &str = r#"
    SELECT VolumeID, Text, Annotation, DateCreated, Type
    FROM Bookmark
    WHERE VolumeID = ?
    ORDER BY DateCreated ASC
"#;

pub struct KoboReader {
    _db: Database,
    conn: Connection,
}

impl KoboReader {
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Kobo database not found at {}", path.display());
        }

        let db = Builder::new_local(path)
            .flags(libsql::OpenFlags::SQLITE_OPEN_READ_ONLY)
            .build()
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;

        let conn = db.connect()?;
        conn.query("SELECT 1 FROM content LIMIT 1", ())
            .await
            .context("Kobo database has no readable content table")?;

        Ok(Self { _db: db, conn })
    }

    fn row_to_record(row: &libsql::Row) -> Result<SourceRecord> {
        let percent: i64 = row.get::<Option<i64>>(7)?.unwrap_or(0);
        Ok(SourceRecord {
            title: row.get::<Option<String>>(0)?.unwrap_or_default(),
            subtitle: row.get(1)?,
            author: row.get::<Option<String>>(2)?.unwrap_or_default(),
            publisher: row.get::<Option<String>>(3)?.unwrap_or_default(),
            isbn: row.get::<Option<String>>(4)?.unwrap_or_default(),
            series: row.get(5)?,
            series_number: row.get(6)?,
            read_percent: percent.clamp(0, 100) as u8,
            cover_image_ref: row.get(8)?,
        })
    }

    fn row_to_annotation(row: &libsql::Row) -> Result<AnnotationRecord> {
        let created_at: Option<String> = row.get(3)?;
        let kind: Option<String> = row.get(4)?;
        Ok(AnnotationRecord {
            volume_id: row.get(0)?,
            text: row.get(1)?,
            note: row.get(2)?,
            created_at: created_at.as_deref().and_then(parse_kobo_timestamp),
            kind: AnnotationKind::from_kobo(kind.as_deref().unwrap_or_default()),
        })
    }
}

#[async_trait]
impl SourceReader for KoboReader {
    async fn books_matching_filter(&self) -> Result<Vec<SourceRecord>> {
        let mut rows = self.conn.query(BOOKS_QUERY, ()).await?;
        let mut books = Vec::new();

        while let Some(row) = rows.next().await? {
            let record = Self::row_to_record(&row)?;
            if record.title.trim().is_empty() {
                tracing::warn!("skipping book without a title");
                continue;
            }
            books.push(record);
        }

        tracing::info!("retrieved data for {} books", books.len());
        Ok(books)
    }

    async fn annotations_for_title(&self, title: &str) -> Result<Vec<AnnotationRecord>> {
        let mut rows = self
            .conn
            .query(
                CONTENT_ID_QUERY,
                libsql::params![format!("%{}%", title), title],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            tracing::warn!("no content row found for '{}'", title);
            return Ok(Vec::new());
        };
        let content_id: String = row.get(0)?;

        let mut rows = self
            .conn
            .query(BOOKMARKS_QUERY, libsql::params![content_id])
            .await?;
        let mut annotations = Vec::new();

        while let Some(row) = rows.next().await? {
            annotations.push(Self::row_to_annotation(&row)?);
        }

        Ok(annotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use tempfile::TempDir;

    const SCHEMA: &str = r#"
        CREATE TABLE content (
            ContentID TEXT PRIMARY KEY,
            ContentType INTEGER,
            Title TEXT,
            Subtitle TEXT,
            Attribution TEXT,
            Publisher TEXT,
            ISBN TEXT,
            Series TEXT,
            SeriesNumber TEXT,
            ___PercentRead INTEGER,
            ImageId TEXT,
            isDownloaded TEXT,
            Accessibility INTEGER,
            EntitlementId TEXT,
            DownloadUrl TEXT,
            IsAbridged TEXT
        );
        CREATE TABLE Bookmark (
            BookmarkID TEXT PRIMARY KEY,
            VolumeID TEXT,
            Text TEXT,
            Annotation TEXT,
            DateCreated TEXT,
            Type TEXT
        );
        INSERT INTO content VALUES
            ('file:///dune.epub', 6, 'Dune', NULL, 'Frank Herbert', 'Ace', '9780441013593',
             'Dune', '1', 42, 'img-dune', 'true', 1, 'ent-1', 'https://dl/1', 'false'),
            ('file:///dune.epub#ch1', 9, 'Dune Chapter One', NULL, NULL, NULL, NULL,
             NULL, NULL, 0, NULL, 'true', 1, NULL, NULL, 'false'),
            ('file:///sample.epub', 6, 'Sample', 'A preview', 'Anon', 'Pub', '1',
             NULL, NULL, 150, NULL, 'true', 1, 'ent-2', 'https://dl/2', 'true'),
            ('file:///untitled.epub', 6, NULL, NULL, 'Nobody', NULL, NULL,
             NULL, NULL, 10, NULL, 'true', 1, 'ent-3', 'https://dl/3', 'false');
        INSERT INTO Bookmark VALUES
            ('b2', 'file:///dune.epub', 'Fear is the mind-killer.', NULL,
             '2024-02-01T10:00:00.000', 'highlight'),
            ('b1', 'file:///dune.epub', 'I must not fear.', 'Litany', '2024-01-01T09:30:00Z', 'note'),
            ('b3', 'file:///dune.epub', NULL, NULL, '2024-03-01T08:00:00', 'dogear');
    "#;

    async fn fixture() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("KoboReader.sqlite");
        let db = Builder::new_local(&path).build().await.unwrap();
        let conn = db.connect().unwrap();
        conn.execute_batch(SCHEMA).await.unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_books_matching_filter() {
        let (_dir, path) = fixture().await;
        let reader = KoboReader::open(&path).await.unwrap();

        // The untitled row passes the filter but is skipped.
        let books = reader.books_matching_filter().await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Dune");
        assert_eq!(books[0].author, "Frank Herbert");
        assert_eq!(books[0].read_percent, 42);
        assert_eq!(books[0].series_number.as_deref(), Some("1"));
        assert_eq!(books[0].cover_image_ref.as_deref(), Some("img-dune"));
    }

    #[tokio::test]
    async fn test_annotations_are_ordered_by_creation() {
        let (_dir, path) = fixture().await;
        let reader = KoboReader::open(&path).await.unwrap();

        let annotations = reader.annotations_for_title("Dune").await.unwrap();
        assert_eq!(annotations.len(), 3);
        assert_eq!(annotations[0].kind, AnnotationKind::Note);
        assert_eq!(annotations[0].note.as_deref(), Some("Litany"));
        assert_eq!(annotations[1].kind, AnnotationKind::Highlight);
        assert_eq!(annotations[2].text, None);
        assert!(annotations.iter().all(|a| a.volume_id == "file:///dune.epub"));
    }

    #[tokio::test]
    async fn test_unknown_title_has_no_annotations() {
        let (_dir, path) = fixture().await;
        let reader = KoboReader::open(&path).await.unwrap();
        assert!(reader.annotations_for_title("Missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_missing_database_fails() {
        let dir = TempDir::new().unwrap();
        assert!(KoboReader::open(&dir.path().join("nope.sqlite")).await.is_err());
    }

    #[tokio::test]
    async fn test_prepare_working_copy() {
        let (dir, path) = fixture().await;
        let dest = dir.path().join("work").join("copy.sqlite");
        let copied = prepare_working_copy(&path, &dest).await.unwrap();
        assert!(copied.exists());
        let reader = KoboReader::open(&copied).await.unwrap();
        assert_eq!(reader.books_matching_filter().await.unwrap().len(), 1);
    }

    #[test]
    fn test_parse_kobo_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(parse_kobo_timestamp("2024-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_kobo_timestamp("2024-01-02T03:04:05"), Some(expected));
        assert_eq!(parse_kobo_timestamp("2024-01-02 03:04:05"), Some(expected));
        let fractional = parse_kobo_timestamp("2024-01-02T03:04:05.250").unwrap();
        assert_eq!(fractional.nanosecond(), 250_000_000);
        assert_eq!(parse_kobo_timestamp(""), None);
        assert_eq!(parse_kobo_timestamp("yesterday"), None);
    }
}
