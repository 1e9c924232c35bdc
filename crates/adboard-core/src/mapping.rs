//! Wire mapping between domain records and JSON.
//!
//! Outbound and inbound field sets are separate, hand-enumerated
//! allow-lists:
//!
//! | Direction | Record | Fields |
//! |-----------|--------|--------|
//! | out | [`User`] | `id`, `username` |
//! | out | [`Adv`]  | `id`, `user`, `text`, `created_at`, `open` |
//! | in  | [`Adv`]  | `text`, `open` |
//!
//! Anything else a client sends (`id`, `user`, `created_at`, unknown keys)
//! is ignored. There is no inbound path for users at all. `text` must be a
//! JSON string and is stored with surrounding whitespace trimmed.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::{Result, adv::Adv, user::User};

pub const USER_READ_FIELDS: &[&str] = &["id", "username"];
pub const ADV_READ_FIELDS: &[&str] =
  &["id", "user", "text", "created_at", "open"];
pub const ADV_WRITE_FIELDS: &[&str] = &["text", "open"];

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_STRING: &str = "Not a valid string.";
const NOT_BOOLEAN: &str = "Must be a valid boolean.";

// ─── Outbound ────────────────────────────────────────────────────────────────

/// Public representation of a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRepr {
  pub id:       i64,
  pub username: String,
}

impl From<&User> for UserRepr {
  fn from(u: &User) -> Self {
    UserRepr {
      id:       u.id,
      username: u.username.clone(),
    }
  }
}

/// Public representation of an advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvRepr {
  pub id:         i64,
  pub user:       UserRepr,
  pub text:       String,
  pub created_at: DateTime<Utc>,
  pub open:       bool,
}

impl From<&Adv> for AdvRepr {
  fn from(a: &Adv) -> Self {
    AdvRepr {
      id:         a.id,
      user:       UserRepr::from(&a.user),
      text:       a.text.clone(),
      created_at: a.created_at,
      open:       a.open,
    }
  }
}

// ─── Inbound ─────────────────────────────────────────────────────────────────

/// Whether every required field must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
  /// Create and full update: `text` is required.
  Full,
  /// Partial update: every field is optional.
  Partial,
}

/// Validated client input for an advertisement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvWrite {
  pub text: Option<String>,
  pub open: Option<bool>,
}

impl AdvWrite {
  /// Decode and validate a raw request body.
  ///
  /// An empty (or all-whitespace) body is treated as `{}` so that a bare
  /// `POST` reports missing fields rather than a syntax error.
  pub fn from_slice(body: &[u8], mode: WriteMode) -> Result<Self> {
    let value = if body.iter().all(u8::is_ascii_whitespace) {
      Value::Object(Default::default())
    } else {
      serde_json::from_slice(body)?
    };
    Ok(Self::parse(&value, mode)?)
  }

  /// Validate an already-decoded JSON value against the inbound allow-list.
  pub fn parse(
    value: &Value,
    mode: WriteMode,
  ) -> std::result::Result<Self, ValidationErrors> {
    let Some(object) = value.as_object() else {
      return Err(ValidationErrors::single(
        NON_FIELD_ERRORS,
        format!(
          "Invalid data. Expected a dictionary, but got {}.",
          json_type_name(value)
        ),
      ));
    };

    let mut errors = ValidationErrors::default();
    let mut write = AdvWrite::default();

    match object.get("text") {
      None if mode == WriteMode::Full => errors.add("text", REQUIRED),
      None => {}
      Some(Value::Null) => errors.add("text", NOT_NULL),
      Some(Value::String(s)) if s.trim().is_empty() => {
        errors.add("text", NOT_BLANK)
      }
      Some(Value::String(s)) => write.text = Some(s.trim().to_owned()),
      Some(_) => errors.add("text", NOT_STRING),
    }

    match object.get("open") {
      None => {}
      Some(Value::Null) => errors.add("open", NOT_NULL),
      Some(Value::Bool(b)) => write.open = Some(*b),
      Some(_) => errors.add("open", NOT_BOOLEAN),
    }

    if errors.is_empty() { Ok(write) } else { Err(errors) }
  }
}

fn json_type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "str",
    Value::Array(_) => "list",
    Value::Object(_) => "dict",
  }
}

// ─── Validation errors ───────────────────────────────────────────────────────

/// Field-level validation failures, keyed by field name.
///
/// Serialises as `{"text": ["This field is required."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
  pub fn single(field: &str, message: impl Into<String>) -> Self {
    let mut errors = Self::default();
    errors.add(field, message);
    errors
  }

  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.0.entry(field.to_owned()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// Messages recorded for `field`, if any.
  pub fn field(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      if !first {
        f.write_str("; ")?;
      }
      first = false;
      write!(f, "{field}: {}", messages.join(" "))?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}
