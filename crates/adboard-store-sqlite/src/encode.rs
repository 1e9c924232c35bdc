//! Conversions between domain types and the plain values stored in SQLite
//! columns.
//!
//! Timestamps are stored as RFC 3339 strings; `open` as 0/1.

use adboard_core::{adv::Adv, user::User};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// Columns selected for every advertisement read, owner joined in.
pub const ADV_COLUMNS: &str = "
  a.id, a.user_id, u.username, a.text, a.created_at, a.open
  FROM advs a
  JOIN users u ON u.id = a.user_id";

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// An advertisement row as read from SQLite, before decoding.
pub struct RawAdv {
  pub id:         i64,
  pub user_id:    i64,
  pub username:   String,
  pub text:       String,
  pub created_at: String,
  pub open:       bool,
}

impl RawAdv {
  /// Read a row selected with [`ADV_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawAdv {
      id:         row.get(0)?,
      user_id:    row.get(1)?,
      username:   row.get(2)?,
      text:       row.get(3)?,
      created_at: row.get(4)?,
      open:       row.get(5)?,
    })
  }

  pub fn into_adv(self) -> Result<Adv> {
    Ok(Adv {
      id:         self.id,
      user:       User {
        id:       self.user_id,
        username: self.username,
      },
      text:       self.text,
      created_at: decode_dt(&self.created_at)?,
      open:       self.open,
    })
  }
}
