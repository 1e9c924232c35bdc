//! [`SqliteStore`] — the SQLite implementation of [`AdStore`].

use std::path::Path;

use adboard_core::{
  adv::{Adv, AdvChanges, NewAdv},
  store::AdStore,
  user::{Credentials, User},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{ADV_COLUMNS, RawAdv, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An adboard store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn select_adv(
  conn: &rusqlite::Connection,
  id: i64,
) -> rusqlite::Result<Option<RawAdv>> {
  conn
    .query_row(
      &format!("SELECT {ADV_COLUMNS} WHERE a.id = ?1"),
      rusqlite::params![id],
      RawAdv::from_row,
    )
    .optional()
}

/// A UNIQUE index rejected the write. Other constraint failures (NOT NULL,
/// CHECK, foreign keys) are not matched.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── AdStore impl ────────────────────────────────────────────────────────────

impl AdStore for SqliteStore {
  type Error = Error;

  // ── Principals ────────────────────────────────────────────────────────────

  async fn add_user(&self, username: String, password_hash: String) -> Result<User> {
    let name = username.clone();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
          rusqlite::params![name, password_hash],
        ) {
          Ok(_) => Ok(Some(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match id {
      Some(id) => Ok(User { id, username }),
      None => Err(Error::UsernameTaken(username)),
    }
  }

  async fn find_credentials(&self, username: &str) -> Result<Option<Credentials>> {
    let name = username.to_owned();

    let row: Option<(i64, String, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, username, password_hash FROM users WHERE username = ?1",
            rusqlite::params![name],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
          )
          .optional()?)
      })
      .await?;

    Ok(row.map(|(id, username, password_hash)| Credentials {
      user: User { id, username },
      password_hash,
    }))
  }

  // ── Advertisements ────────────────────────────────────────────────────────

  async fn list_advs(&self) -> Result<Vec<Adv>> {
    let raws: Vec<RawAdv> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {ADV_COLUMNS} ORDER BY a.id"))?;
        let rows = stmt
          .query_map([], RawAdv::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAdv::into_adv).collect()
  }

  async fn get_adv(&self, id: i64) -> Result<Option<Adv>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_adv(conn, id)?))
      .await?;

    raw.map(RawAdv::into_adv).transpose()
  }

  async fn create_adv(&self, input: NewAdv) -> Result<Adv> {
    let owner_id   = input.owner_id;
    let created_at = encode_dt(Utc::now());

    let raw: Option<RawAdv> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let owner_exists = tx
          .query_row(
            "SELECT 1 FROM users WHERE id = ?1",
            rusqlite::params![owner_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !owner_exists {
          return Ok(None);
        }

        tx.execute(
          "INSERT INTO advs (user_id, text, created_at, open) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![owner_id, input.text, created_at, input.open],
        )?;
        let raw = select_adv(&tx, tx.last_insert_rowid())?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.ok_or(Error::UserNotFound(owner_id))?.into_adv()
  }

  async fn update_adv(&self, id: i64, changes: AdvChanges) -> Result<Option<Adv>> {
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !changes.is_empty() {
          tx.execute(
            "UPDATE advs
             SET text = COALESCE(?2, text),
                 open = COALESCE(?3, open)
             WHERE id = ?1",
            rusqlite::params![id, changes.text, changes.open],
          )?;
        }
        let raw = select_adv(&tx, id)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawAdv::into_adv).transpose()
  }

  async fn delete_adv(&self, id: i64) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM advs WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    Ok(deleted > 0)
  }
}
