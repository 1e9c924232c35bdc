//! Principals: the identities that own and read advertisements.

use std::fmt;

/// An authenticated identity.
///
/// Holds only the public identity fields. Password material travels
/// separately in [`Credentials`] and never reaches a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  pub id:       i64,
  pub username: String,
}

/// A stored principal together with its argon2 PHC password hash.
#[derive(Clone)]
pub struct Credentials {
  pub user:          User,
  pub password_hash: String,
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("user", &self.user)
      .field("password_hash", &"<redacted>")
      .finish()
  }
}
