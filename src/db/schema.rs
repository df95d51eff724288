//! Database schema and migrations for feedcast.
//!
//! Migrations are applied in order; the schema_version table records which
//! ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Feed sources
    r#"
CREATE TABLE sources (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    feed_url    TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);
"#,
    // v2: Articles ingested from sources
    r#"
CREATE TABLE articles (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id     INTEGER NOT NULL REFERENCES sources(id),
    title         TEXT NOT NULL,
    link          TEXT NOT NULL,
    summary       TEXT NOT NULL DEFAULT '',
    published_at  TEXT NOT NULL,             -- fixed-width RFC 3339, UTC
    posted_at     TEXT,                      -- NULL until published to the channel
    created_at    TEXT NOT NULL,
    UNIQUE (source_id, link)
);

CREATE INDEX idx_articles_unposted ON articles(posted_at, published_at);
"#,
];
