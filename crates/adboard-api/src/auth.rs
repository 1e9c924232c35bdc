//! HTTP Basic authentication against stored principals.
//!
//! [`identify`] runs once per request: it resolves the caller (or marks the
//! request anonymous), applies the anonymous throttle, and leaves an
//! [`Identity`] in the request extensions. Handlers then take an
//! [`Authenticated`] argument, which rejects anonymous requests with 401.

use adboard_core::{store::AdStore, user::User};
use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::{FromRequestParts, Request, State},
  http::{HeaderMap, header, request::Parts},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;

use crate::{AppState, error::Error};

/// The resolved caller for a request; `None` means anonymous.
#[derive(Debug, Clone)]
pub struct Identity(pub Option<User>);

/// Extractor for handlers that require a known caller.
#[derive(Debug, Clone)]
pub struct Authenticated(pub User);

/// Hash `password` into an argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

/// Split an `Authorization: Basic …` header into username and password.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let encoded = headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Basic ")?;
  let decoded = B64.decode(encoded.trim()).ok()?;
  let creds = String::from_utf8(decoded).ok()?;
  let (username, password) = creds.split_once(':')?;
  Some((username.to_owned(), password.to_owned()))
}

/// Verify Basic credentials in `headers` against `store`.
///
/// Missing, malformed, unknown or wrong credentials all yield
/// [`Error::Unauthenticated`]; only store failures are reported otherwise.
pub async fn verify_basic<S>(headers: &HeaderMap, store: &S) -> Result<User, Error>
where
  S: AdStore,
{
  let (username, password) =
    basic_credentials(headers).ok_or(Error::Unauthenticated)?;

  let creds = store
    .find_credentials(&username)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::Unauthenticated)?;

  let hash = creds.password_hash;
  let verified = tokio::task::spawn_blocking(move || password_matches(&password, &hash))
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  if verified { Ok(creds.user) } else { Err(Error::Unauthenticated) }
}

/// Check `password` against an argon2 PHC string. CPU-bound; run it off the
/// async workers.
fn password_matches(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

/// Middleware: resolve the caller, throttle anonymous traffic, and record
/// the [`Identity`] for downstream extractors.
pub async fn identify<S>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Response
where
  S: AdStore + Clone + 'static,
{
  let principal = match verify_basic(req.headers(), state.store.as_ref()).await {
    Ok(user) => Some(user),
    Err(Error::Unauthenticated) => None,
    Err(e) => return e.into_response(),
  };

  if principal.is_none() {
    let key = state.throttle.client_key(&req);
    if let Err(retry_after) = state.throttle.check(&key) {
      tracing::warn!(client = %key, ?retry_after, "anonymous request throttled");
      return Error::Throttled { retry_after }.into_response();
    }
  }

  req.extensions_mut().insert(Identity(principal));
  next.run(req).await
}

impl<S> FromRequestParts<S> for Authenticated
where
  S: Send + Sync,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    match parts.extensions.get::<Identity>() {
      Some(Identity(Some(user))) => Ok(Authenticated(user.clone())),
      _ => Err(Error::Unauthenticated),
    }
  }
}
