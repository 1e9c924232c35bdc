//! The `AdStore` trait.
//!
//! Implemented by storage backends (e.g. `adboard-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  adv::{Adv, AdvChanges, NewAdv},
  user::{Credentials, User},
};

/// Persistence for principals and advertisements.
///
/// Each method is one atomic unit of work: it either completes fully
/// before returning or leaves the store untouched.
pub trait AdStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Principals ────────────────────────────────────────────────────────

  /// Register a principal. Fails if `username` is already taken.
  fn add_user(
    &self,
    username: String,
    password_hash: String,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Look up a principal and its password hash by username.
  fn find_credentials<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  // ── Advertisements ────────────────────────────────────────────────────

  /// All advertisements, ordered by id.
  fn list_advs(
    &self,
  ) -> impl Future<Output = Result<Vec<Adv>, Self::Error>> + Send + '_;

  /// Retrieve one advertisement. Returns `None` if not found.
  fn get_adv(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Adv>, Self::Error>> + Send + '_;

  /// Persist a new advertisement. The store assigns `id` and `created_at`.
  fn create_adv(
    &self,
    input: NewAdv,
  ) -> impl Future<Output = Result<Adv, Self::Error>> + Send + '_;

  /// Apply `changes` and return the updated record, or `None` if `id` does
  /// not exist. Never touches the owner or `created_at`.
  fn update_adv(
    &self,
    id: i64,
    changes: AdvChanges,
  ) -> impl Future<Output = Result<Option<Adv>, Self::Error>> + Send + '_;

  /// Delete an advertisement. Returns `false` if it did not exist.
  fn delete_adv(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
