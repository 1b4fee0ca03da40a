use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

const FILE_STATUS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS file_status (
    id BIGSERIAL PRIMARY KEY,
    file_path TEXT UNIQUE NOT NULL,
    sha256 TEXT,
    status TEXT NOT NULL,
    error TEXT,
    cid TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_file_status_file_path ON file_status (file_path);
CREATE INDEX IF NOT EXISTS idx_file_status_sha256 ON file_status (sha256);
CREATE INDEX IF NOT EXISTS idx_file_status_status ON file_status (status);

CREATE TABLE IF NOT EXISTS project_metadata (
    project_id TEXT PRIMARY KEY,
    project_path TEXT UNIQUE NOT NULL,
    author_type TEXT,
    author_name TEXT,
    author_identifier TEXT,
    file_extensions TEXT[] NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS allowed_keys (
    id BIGSERIAL PRIMARY KEY,
    purpose TEXT NOT NULL,
    key TEXT NOT NULL,
    name TEXT NOT NULL,
    UNIQUE (purpose, key)
);
"#;

/// The ingest pipeline's per-path state, matching the Found/Uploading/
/// Success/Error transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Found,
    Uploading,
    Success,
    Error,
}

impl FileStatus {
    fn as_str(self) -> &'static str {
        match self {
            FileStatus::Found => "found",
            FileStatus::Uploading => "uploading",
            FileStatus::Success => "success",
            FileStatus::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "found" => Some(FileStatus::Found),
            "uploading" => Some(FileStatus::Uploading),
            "success" => Some(FileStatus::Success),
            "error" => Some(FileStatus::Error),
            _ => None,
        }
    }
}

/// The persisted state of a file path, as returned by the upsert-and-return
/// step of the ingest algorithm.
#[derive(Debug, Clone)]
pub struct FileRow {
    pub status: FileStatus,
    pub cid: Option<String>,
    pub error: Option<String>,
}

/// Connects to Postgres and ensures the schema exists.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    sqlx::raw_sql(FILE_STATUS_TABLE).execute(&pool).await?;
    Ok(pool)
}

/// Upserts a `Found` row for `file_path` if one doesn't already exist, and
/// returns the row's current state either way. This is the ingest
/// pipeline's serialization point: the unique constraint on `file_path`
/// guarantees single-writer semantics for a given path.
pub async fn upsert_and_return(pool: &PgPool, file_path: &str) -> Result<FileRow> {
    let now: DateTime<Utc> = Utc::now();
    sqlx::query(
        "INSERT INTO file_status (file_path, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $3) ON CONFLICT (file_path) DO NOTHING",
    )
    .bind(file_path)
    .bind(FileStatus::Found.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    let row = sqlx::query("SELECT status, cid, error FROM file_status WHERE file_path = $1")
        .bind(file_path)
        .fetch_one(pool)
        .await?;

    let status_str: String = row.try_get("status")?;
    Ok(FileRow {
        status: FileStatus::parse(&status_str).unwrap_or(FileStatus::Found),
        cid: row.try_get("cid")?,
        error: row.try_get("error")?,
    })
}

pub async fn set_uploading(pool: &PgPool, file_path: &str, sha256: &str) -> Result<()> {
    sqlx::query("UPDATE file_status SET status = $1, sha256 = $2, updated_at = $3 WHERE file_path = $4")
        .bind(FileStatus::Uploading.as_str())
        .bind(sha256)
        .bind(Utc::now())
        .bind(file_path)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_success(pool: &PgPool, file_path: &str, cid: &str) -> Result<()> {
    sqlx::query("UPDATE file_status SET status = $1, cid = $2, updated_at = $3 WHERE file_path = $4")
        .bind(FileStatus::Success.as_str())
        .bind(cid)
        .bind(Utc::now())
        .bind(file_path)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_error(pool: &PgPool, file_path: &str, message: &str) -> Result<()> {
    sqlx::query("UPDATE file_status SET status = $1, error = $2, updated_at = $3 WHERE file_path = $4")
        .bind(FileStatus::Error.as_str())
        .bind(message)
        .bind(Utc::now())
        .bind(file_path)
        .execute(pool)
        .await?;
    Ok(())
}
