//! Advertisement records and the inputs used to create or change them.

use chrono::{DateTime, Utc};

use crate::{mapping::AdvWrite, user::User};

/// A persisted advertisement.
///
/// `user` is the owner. It is fixed at creation, as is `created_at`; only
/// `text` and `open` change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adv {
  pub id:         i64,
  pub user:       User,
  pub text:       String,
  pub created_at: DateTime<Utc>,
  pub open:       bool,
}

/// Input to [`AdStore::create_adv`](crate::store::AdStore::create_adv).
///
/// The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdv {
  pub owner_id: i64,
  pub text:     String,
  pub open:     bool,
}

impl NewAdv {
  /// Value of `open` when the client leaves it out.
  pub const DEFAULT_OPEN: bool = true;
}

/// A set of field changes for an existing advertisement. `None` leaves the
/// stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvChanges {
  pub text: Option<String>,
  pub open: Option<bool>,
}

impl AdvChanges {
  pub fn is_empty(&self) -> bool { self.text.is_none() && self.open.is_none() }
}

impl From<AdvWrite> for AdvChanges {
  fn from(w: AdvWrite) -> Self {
    AdvChanges {
      text: w.text,
      open: w.open,
    }
  }
}
