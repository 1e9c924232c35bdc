//! SQL schema for the adboard SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL     -- argon2 PHC string
);

CREATE TABLE IF NOT EXISTS advs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    text        TEXT NOT NULL,
    created_at  TEXT NOT NULL,      -- RFC 3339 UTC; server-assigned
    open        INTEGER NOT NULL DEFAULT 1
);

-- Owner and creation time are fixed once the row exists.
CREATE TRIGGER IF NOT EXISTS advs_immutable_columns
BEFORE UPDATE OF user_id, created_at ON advs
BEGIN
    SELECT RAISE(ABORT, 'advs.user_id and advs.created_at are immutable');
END;

CREATE INDEX IF NOT EXISTS advs_user_idx ON advs(user_id);

PRAGMA user_version = 1;
";
