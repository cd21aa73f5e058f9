//! Document model and the upsert protocol.
//!
//! A document is keyed by its normalized URL. Saving either creates the
//! row, rewrites its mutable fields in place, or leaves it alone when
//! nothing changed; the storage engine decides which in one statement.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_rusqlite::rusqlite::{self, OptionalExtension, params};

use super::connection::DocumentStore;
use super::hash::fingerprint;
use super::url::normalize;
use crate::Error;

/// Processing state of a crawled document.
///
/// Unknown tags coming from the crawler are kept verbatim and never count
/// as processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentStatus {
    Processed,
    #[default]
    Pending,
    Other(String),
}

impl DocumentStatus {
    pub const PROCESSED: &'static str = "processed";
    pub const PENDING: &'static str = "pending";

    pub fn as_str(&self) -> &str {
        match self {
            DocumentStatus::Processed => Self::PROCESSED,
            DocumentStatus::Pending => Self::PENDING,
            DocumentStatus::Other(tag) => tag,
        }
    }
}

impl From<String> for DocumentStatus {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            Self::PROCESSED => DocumentStatus::Processed,
            Self::PENDING => DocumentStatus::Pending,
            _ => DocumentStatus::Other(tag),
        }
    }
}

impl From<&str> for DocumentStatus {
    fn from(tag: &str) -> Self {
        DocumentStatus::from(tag.to_string())
    }
}

impl From<DocumentStatus> for String {
    fn from(status: DocumentStatus) -> Self {
        match status {
            DocumentStatus::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crawled document as handed to the store.
///
/// Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Document {
    /// Identity key. Raw URLs are accepted; the store normalizes on save.
    #[serde(alias = "url")]
    pub normalized_url: String,
    #[serde(default)]
    pub raw_html: Option<String>,
    #[serde(default)]
    pub clean_text: Option<String>,
    /// Fingerprint of `clean_text`, computed by the caller when it wants
    /// change detection on content.
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default = "now")]
    pub updated_at: i64,
    #[serde(default)]
    pub crawled_at: Option<i64>,
    #[serde(default)]
    #[schemars(with = "String")]
    pub status: DocumentStatus,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Document {
    /// Start a pending document for `url`, stamped with the current time.
    pub fn new(url: &str) -> Self {
        Self {
            normalized_url: normalize(url).to_string(),
            raw_html: None,
            clean_text: None,
            content_hash: None,
            updated_at: now(),
            crawled_at: None,
            status: DocumentStatus::Pending,
            metadata: Map::new(),
        }
    }

    pub fn with_raw_html(mut self, raw_html: impl Into<String>) -> Self {
        self.raw_html = Some(raw_html.into());
        self
    }

    pub fn with_clean_text(mut self, clean_text: impl Into<String>) -> Self {
        self.clean_text = Some(clean_text.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<DocumentStatus>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_updated_at(mut self, updated_at: i64) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn with_crawled_at(mut self, crawled_at: i64) -> Self {
        self.crawled_at = Some(crawled_at);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set `content_hash` from the current `clean_text`.
    ///
    /// Documents without text get no hash.
    pub fn with_fingerprint(mut self) -> Self {
        self.content_hash = self.clean_text.as_deref().map(fingerprint);
        self
    }
}

/// A document as persisted, with the fields only the store assigns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredDocument {
    /// Row identity, fixed at creation.
    pub id: i64,
    #[serde(flatten)]
    pub document: Document,
    /// When the row was first inserted.
    pub created_at: i64,
    /// 1 on insert, bumped by every save that changed something.
    pub revision: i64,
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// A new row was inserted.
    Created { id: i64 },
    /// An existing row had at least one field rewritten.
    Updated,
    /// An existing row already held identical values.
    Unchanged,
    /// An insert lost to an existing row with the same key; nothing written.
    Duplicate,
}

impl SaveOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, SaveOutcome::Created { .. })
    }

    /// Whether stored data changed.
    pub fn is_modified(&self) -> bool {
        matches!(self, SaveOutcome::Created { .. } | SaveOutcome::Updated)
    }
}

pub(crate) const DOCUMENT_COLUMNS: &str = "id, normalized_url, raw_html, clean_text, content_hash, \
     updated_at, crawled_at, status, metadata, created_at, revision";

pub(crate) fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredDocument> {
    let metadata_json: String = row.get(8)?;
    let metadata = serde_json::from_str(&metadata_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(StoredDocument {
        id: row.get(0)?,
        document: Document {
            normalized_url: row.get(1)?,
            raw_html: row.get(2)?,
            clean_text: row.get(3)?,
            content_hash: row.get(4)?,
            updated_at: row.get(5)?,
            crawled_at: row.get(6)?,
            status: DocumentStatus::from(row.get::<_, String>(7)?),
            metadata,
        },
        created_at: row.get(9)?,
        revision: row.get(10)?,
    })
}

/// Column values of a document, normalized and serialized for binding.
struct Columns {
    key: String,
    raw_html: Option<String>,
    clean_text: Option<String>,
    content_hash: Option<String>,
    updated_at: i64,
    crawled_at: Option<i64>,
    status: String,
    metadata: String,
    created_at: i64,
}

impl Columns {
    fn from_document(document: &Document) -> Result<Self, Error> {
        let key = normalize(&document.normalized_url).to_string();
        let metadata = serde_json::to_string(&document.metadata)
            .map_err(|e| Error::InvalidInput(format!("metadata for {key} is not serializable: {e}")))?;

        Ok(Self {
            key,
            raw_html: document.raw_html.clone(),
            clean_text: document.clean_text.clone(),
            content_hash: document.content_hash.clone(),
            updated_at: document.updated_at,
            crawled_at: document.crawled_at,
            status: document.status.as_str().to_string(),
            metadata,
            created_at: now(),
        })
    }
}

impl DocumentStore {
    /// Check whether a document is stored under exactly this key.
    pub async fn exists(&self, normalized_url: &str) -> Result<bool, Error> {
        let key = normalized_url.to_string();
        self.call("exists", normalized_url, move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM documents WHERE normalized_url = ?1)",
                params![key],
                |row| row.get(0),
            )
        })
        .await
    }

    /// Get the document stored under exactly this key.
    ///
    /// Returns None if there is none.
    pub async fn get(&self, normalized_url: &str) -> Result<Option<StoredDocument>, Error> {
        let key = normalized_url.to_string();
        self.call("get", normalized_url, move |conn| {
            conn.query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE normalized_url = ?1"),
                params![key],
                row_to_document,
            )
            .optional()
        })
        .await
    }

    /// Insert or update a document.
    ///
    /// The key is normalized first. A single conditional upsert decides the
    /// outcome inside the engine, so concurrent saves of one new URL end
    /// with one row: one caller sees `Created`, the rest `Updated` or
    /// `Unchanged`. The last write wins: the caller that sees `Updated`
    /// has replaced the first caller's payload. `save` never reports
    /// `Duplicate`; use [`DocumentStore::insert`] to claim a URL once.
    /// `content_hash` is stored as given.
    pub async fn save(&self, document: &Document) -> Result<SaveOutcome, Error> {
        let row = Columns::from_document(document)?;
        let key = row.key.clone();

        let returned = self
            .call("save", &key, move |conn| {
                conn.query_row(
                    "INSERT INTO documents (
                        normalized_url, raw_html, clean_text, content_hash,
                        updated_at, crawled_at, status, metadata, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(normalized_url) DO UPDATE SET
                        raw_html = excluded.raw_html,
                        clean_text = excluded.clean_text,
                        content_hash = excluded.content_hash,
                        updated_at = excluded.updated_at,
                        crawled_at = excluded.crawled_at,
                        status = excluded.status,
                        metadata = excluded.metadata,
                        revision = documents.revision + 1
                    WHERE documents.raw_html IS NOT excluded.raw_html
                        OR documents.clean_text IS NOT excluded.clean_text
                        OR documents.content_hash IS NOT excluded.content_hash
                        OR documents.updated_at IS NOT excluded.updated_at
                        OR documents.crawled_at IS NOT excluded.crawled_at
                        OR documents.status IS NOT excluded.status
                        OR documents.metadata IS NOT excluded.metadata
                    RETURNING id, revision",
                    params![
                        row.key,
                        row.raw_html,
                        row.clean_text,
                        row.content_hash,
                        row.updated_at,
                        row.crawled_at,
                        row.status,
                        row.metadata,
                        row.created_at,
                    ],
                    |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)),
                )
                .optional()
            })
            .await?;

        let outcome = match returned {
            Some((id, 1)) => SaveOutcome::Created { id },
            Some(_) => SaveOutcome::Updated,
            None => SaveOutcome::Unchanged,
        };

        tracing::debug!(url = %key, ?outcome, "document saved");
        Ok(outcome)
    }

    /// Insert a document only if its key is not stored yet.
    ///
    /// When the unique constraint rejects the row, because it already
    /// existed or another writer got there first, the outcome is
    /// `Duplicate` and the stored row is untouched.
    pub async fn insert(&self, document: &Document) -> Result<SaveOutcome, Error> {
        let row = Columns::from_document(document)?;
        let key = row.key.clone();

        let inserted = self
            .call("insert", &key, move |conn| {
                let result = conn.query_row(
                    "INSERT INTO documents (
                        normalized_url, raw_html, clean_text, content_hash,
                        updated_at, crawled_at, status, metadata, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    RETURNING id",
                    params![
                        row.key,
                        row.raw_html,
                        row.clean_text,
                        row.content_hash,
                        row.updated_at,
                        row.crawled_at,
                        row.status,
                        row.metadata,
                        row.created_at,
                    ],
                    |r| r.get::<_, i64>(0),
                );

                match result {
                    Ok(id) => Ok(Some(id)),
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                    {
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        match inserted {
            Some(id) => {
                tracing::debug!(url = %key, id, "document inserted");
                Ok(SaveOutcome::Created { id })
            }
            None => {
                tracing::warn!(url = %key, "document already exists, insert skipped");
                Ok(SaveOutcome::Duplicate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_test_document(url: &str, text: &str) -> Document {
        Document::new(url)
            .with_raw_html(format!("<html><body><p>{text}</p></body></html>"))
            .with_clean_text(text)
            .with_updated_at(1_700_000_000)
            .with_crawled_at(1_700_000_000)
            .with_status(DocumentStatus::Processed)
            .with_fingerprint()
    }

    async fn row_count(store: &DocumentStore, key: &str) -> i64 {
        let key = key.to_string();
        store
            .call("count", "", move |conn| {
                conn.query_row("SELECT COUNT(*) FROM documents WHERE normalized_url = ?1", params![key], |row| {
                    row.get(0)
                })
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_status_round_trips_unknown_tags() {
        assert_eq!(DocumentStatus::from("processed"), DocumentStatus::Processed);
        assert_eq!(DocumentStatus::from("pending"), DocumentStatus::Pending);
        let failed = DocumentStatus::from("failed");
        assert_eq!(failed, DocumentStatus::Other("failed".to_string()));
        assert_eq!(String::from(failed), "failed");
    }

    #[test]
    fn test_document_deserializes_crawler_payload() {
        let payload = json!({
            "url": "https://example.com/a?session=1",
            "raw_html": "<p>x</p>",
            "clean_text": "x",
            "crawled_at": 1_700_000_100,
            "status": "processed",
        });
        let document: Document = serde_json::from_value(payload).unwrap();
        assert_eq!(document.normalized_url, "https://example.com/a?session=1");
        assert_eq!(document.status, DocumentStatus::Processed);
        assert_eq!(document.crawled_at, Some(1_700_000_100));
        assert!(document.content_hash.is_none());
        assert!(document.metadata.is_empty());
    }

    #[test]
    fn test_with_fingerprint_hashes_clean_text() {
        let document = Document::new("https://example.com").with_clean_text("hello").with_fingerprint();
        assert_eq!(document.content_hash, Some(fingerprint("hello")));

        let empty = Document::new("https://example.com").with_fingerprint();
        assert!(empty.content_hash.is_none());
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let document = make_test_document("https://example.com/page", "Test").with_metadata("title", "Test page");

        let outcome = store.save(&document).await.unwrap();
        assert!(outcome.is_created());

        let stored = store.get("https://example.com/page").await.unwrap().unwrap();
        assert_eq!(stored.document, document);
        assert_eq!(stored.revision, 1);
        assert_eq!(stored.document.metadata["title"], json!("Test page"));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        assert!(store.get("https://nowhere.example/").await.unwrap().is_none());
        assert!(!store.exists("https://nowhere.example/").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_matches_get() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        store.save(&make_test_document("https://example.com/a", "a")).await.unwrap();

        for key in ["https://example.com/a", "https://example.com/a?x=1", "https://example.com/b"] {
            let exists = store.exists(key).await.unwrap();
            let found = store.get(key).await.unwrap().is_some();
            assert_eq!(exists, found, "key {key}");
        }
        assert!(store.exists("https://example.com/a").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_normalizes_key_and_detects_change() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let first = Document {
            normalized_url: "http://a.com/?x=1#frag".to_string(),
            ..make_test_document("http://a.com/", "hello")
        };

        let created = store.save(&first).await.unwrap();
        let SaveOutcome::Created { id } = created else { panic!("expected Created, got {created:?}") };

        let stored = store.get("http://a.com/").await.unwrap().unwrap();
        assert_eq!(stored.document.normalized_url, "http://a.com/");
        assert_eq!(stored.document.content_hash, Some(fingerprint("hello")));

        let second = make_test_document("http://a.com/?x=2", "hello world");
        assert_eq!(store.save(&second).await.unwrap(), SaveOutcome::Updated);

        let updated = store.get("http://a.com/").await.unwrap().unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.created_at, stored.created_at);
        assert_eq!(updated.revision, 2);
        assert_eq!(updated.document.content_hash, Some(fingerprint("hello world")));
        assert_ne!(updated.document.content_hash, stored.document.content_hash);
        assert_eq!(row_count(&store, "http://a.com/").await, 1);
    }

    #[tokio::test]
    async fn test_save_identical_is_unchanged() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let document = make_test_document("https://example.com/same", "same");

        assert!(store.save(&document).await.unwrap().is_created());
        let again = store.save(&document).await.unwrap();
        assert_eq!(again, SaveOutcome::Unchanged);
        assert!(!again.is_modified());

        let stored = store.get("https://example.com/same").await.unwrap().unwrap();
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn test_save_updates_every_mutable_field() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let url = "https://example.com/fields";
        store.save(&make_test_document(url, "v1")).await.unwrap();

        let changes = [
            make_test_document(url, "v1").with_raw_html("<p>other</p>"),
            make_test_document(url, "v1").with_updated_at(1_700_000_500),
            make_test_document(url, "v1").with_crawled_at(1_700_000_900),
            make_test_document(url, "v1").with_status("failed"),
            make_test_document(url, "v1").with_metadata("lang", "en"),
            Document { content_hash: None, ..make_test_document(url, "v1") },
        ];

        for (i, changed) in changes.iter().enumerate() {
            assert_eq!(store.save(changed).await.unwrap(), SaveOutcome::Updated, "change #{i}");
            assert_eq!(store.get(url).await.unwrap().unwrap().document, *changed);
            // Restore the baseline so the next change is compared against it.
            assert_eq!(store.save(&make_test_document(url, "v1")).await.unwrap(), SaveOutcome::Updated);
        }
    }

    #[tokio::test]
    async fn test_save_does_not_hash_on_write() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let document = Document::new("https://example.com/raw").with_clean_text("text");
        store.save(&document).await.unwrap();

        let stored = store.get("https://example.com/raw").await.unwrap().unwrap();
        assert!(stored.document.content_hash.is_none());
    }

    #[tokio::test]
    async fn test_insert_reports_duplicate() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let original = make_test_document("https://example.com/claim", "first");

        assert!(store.insert(&original).await.unwrap().is_created());

        let competitor = make_test_document("https://example.com/claim#again", "second");
        assert_eq!(store.insert(&competitor).await.unwrap(), SaveOutcome::Duplicate);

        let stored = store.get("https://example.com/claim").await.unwrap().unwrap();
        assert_eq!(stored.document.clean_text.as_deref(), Some("first"));
        assert_eq!(row_count(&store, "https://example.com/claim").await, 1);
    }

    #[tokio::test]
    async fn test_joined_saves_on_one_handle_create_one_row() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let a = make_test_document("https://example.com/race?w=1", "payload a");
        let b = make_test_document("https://example.com/race?w=2", "payload b");

        let (ra, rb) = tokio::join!(store.save(&a), store.save(&b));
        let outcomes = [ra.unwrap(), rb.unwrap()];

        assert_eq!(outcomes.iter().filter(|o| o.is_created()).count(), 1);
        assert!(outcomes.iter().any(|o| *o == SaveOutcome::Updated));
        assert_eq!(row_count(&store, "https://example.com/race").await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_saves_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.sqlite");
        let first = DocumentStore::open_path(&path).await.unwrap();
        let second = DocumentStore::open_path(&path).await.unwrap();

        let a = make_test_document("https://example.com/shared?from=first", "from first");
        let b = make_test_document("https://example.com/shared#second", "from second");

        let (ra, rb) = tokio::join!(first.save(&a), second.save(&b));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        let last_write = if ra.is_created() {
            assert_eq!(rb, SaveOutcome::Updated);
            &b
        } else {
            assert!(rb.is_created());
            assert_eq!(ra, SaveOutcome::Updated);
            &a
        };

        let stored = first.get("https://example.com/shared").await.unwrap().unwrap();
        assert_eq!(stored.document.clean_text, last_write.clean_text);
        assert_eq!(stored.revision, 2);
        assert_eq!(row_count(&first, "https://example.com/shared").await, 1);
        assert_eq!(row_count(&second, "https://example.com/shared").await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.sqlite");
        let first = DocumentStore::open_path(&path).await.unwrap();
        let second = DocumentStore::open_path(&path).await.unwrap();

        let a = make_test_document("https://example.com/shared", "from first");
        let b = make_test_document("https://example.com/shared", "from second");

        let (ra, rb) = tokio::join!(first.insert(&a), second.insert(&b));
        let outcomes = [ra.unwrap(), rb.unwrap()];

        assert_eq!(outcomes.iter().filter(|o| o.is_created()).count(), 1);
        assert_eq!(outcomes.iter().filter(|o| **o == SaveOutcome::Duplicate).count(), 1);
        assert_eq!(row_count(&first, "https://example.com/shared").await, 1);
        assert_eq!(row_count(&second, "https://example.com/shared").await, 1);
    }

    #[tokio::test]
    async fn test_uniqueness_over_many_saves() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let urls = ["https://x.org/", "https://x.org/?a", "https://x.org/#b", "https://y.org/p", "https://y.org/p?q#r"];

        for (i, url) in urls.iter().cycle().take(20).enumerate() {
            let document = make_test_document(url, &format!("text {i}"));
            if i % 3 == 0 {
                store.insert(&document).await.unwrap();
            } else {
                store.save(&document).await.unwrap();
            }
        }

        assert_eq!(row_count(&store, "https://x.org/").await, 1);
        assert_eq!(row_count(&store, "https://y.org/p").await, 1);
        let total: i64 = store
            .call("count", "", |conn| conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_operations_after_close_fail() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        store.close().await.unwrap();

        let document = make_test_document("https://example.com/late", "late");
        assert!(matches!(store.save(&document).await, Err(Error::Closed)));
        assert!(matches!(store.insert(&document).await, Err(Error::Closed)));
        assert!(matches!(store.get("https://example.com/late").await, Err(Error::Closed)));
        assert!(matches!(store.exists("https://example.com/late").await, Err(Error::Closed)));
    }
}
