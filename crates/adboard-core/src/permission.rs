//! Ownership predicate for advertisement operations.
//!
//! Authentication is checked before this runs; an anonymous caller never
//! reaches [`allow`].

use crate::{adv::Adv, user::User};

/// The operations the advertisement resource exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  List,
  Retrieve,
  Create,
  Update,
  PartialUpdate,
  Destroy,
}

impl Operation {
  /// Read-only operations, open to every authenticated caller.
  pub fn is_safe(self) -> bool {
    matches!(self, Operation::List | Operation::Retrieve)
  }

  pub fn name(self) -> &'static str {
    match self {
      Operation::List => "list",
      Operation::Retrieve => "retrieve",
      Operation::Create => "create",
      Operation::Update => "update",
      Operation::PartialUpdate => "partial_update",
      Operation::Destroy => "destroy",
    }
  }
}

/// Whether `principal` may perform `op` on `record`.
///
/// Safe operations are always allowed. Everything else requires the caller
/// to own the record.
pub fn allow(principal: &User, record: &Adv, op: Operation) -> bool {
  op.is_safe() || record.user.id == principal.id
}
