//! Handlers for the `/advs` resource.
//!
//! | Method   | Path         | Operation        | Who |
//! |----------|--------------|------------------|-----|
//! | `GET`    | `/advs`      | list             | any authenticated caller |
//! | `POST`   | `/advs`      | create           | any authenticated caller; becomes owner |
//! | `GET`    | `/advs/{id}` | retrieve         | any authenticated caller |
//! | `PUT`    | `/advs/{id}` | update           | owner |
//! | `PATCH`  | `/advs/{id}` | partial update   | owner |
//! | `DELETE` | `/advs/{id}` | destroy          | owner |
//!
//! Every handler runs authenticate → load → authorize → validate → execute
//! → serialize, so nothing is written unless every check has passed.

use adboard_core::{
  adv::{Adv, AdvChanges, NewAdv},
  mapping::{AdvRepr, AdvWrite, WriteMode},
  permission::{Operation, allow},
  store::AdStore,
  template::render_user_placeholder,
  user::User,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;

use crate::{AppState, auth::Authenticated, error::Error};

/// Ids that are not integers cannot name a record.
fn parse_id(raw: &str) -> Result<i64, Error> {
  raw.parse().map_err(|_| Error::NotFound)
}

/// Load the record behind `raw_id` and check `op` against it.
async fn load_for<S>(
  state: &AppState<S>,
  user: &User,
  raw_id: &str,
  op: Operation,
) -> Result<Adv, Error>
where
  S: AdStore,
{
  let id = parse_id(raw_id)?;
  let adv = state
    .store
    .get_adv(id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::NotFound)?;

  if !allow(user, &adv, op) {
    tracing::info!(
      op = op.name(),
      adv = id,
      user = %user.username,
      owner = %adv.user.username,
      "permission denied"
    );
    return Err(Error::Forbidden);
  }
  Ok(adv)
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /advs`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Authenticated(_user): Authenticated,
) -> Result<Json<Vec<AdvRepr>>, Error>
where
  S: AdStore + Clone,
{
  let advs = state
    .store
    .list_advs()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  Ok(Json(advs.iter().map(AdvRepr::from).collect()))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /advs` — body `{"text": "...", "open": true}`; returns 201.
///
/// `{{ user }}` in `text` becomes the caller's username, and the caller
/// becomes the owner whatever the body says.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  body: Bytes,
) -> Result<impl IntoResponse, Error>
where
  S: AdStore + Clone,
{
  let write = AdvWrite::from_slice(&body, WriteMode::Full)?;

  let input = NewAdv {
    owner_id: user.id,
    text:     render_user_placeholder(
      &write.text.unwrap_or_default(),
      &user.username,
    ),
    open:     write.open.unwrap_or(NewAdv::DEFAULT_OPEN),
  };

  let adv = state
    .store
    .create_adv(input)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(adv = adv.id, user = %user.username, "advertisement created");
  Ok((StatusCode::CREATED, Json(AdvRepr::from(&adv))))
}

// ─── Retrieve ─────────────────────────────────────────────────────────────────

/// `GET /advs/{id}`
pub async fn retrieve<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<String>,
) -> Result<Json<AdvRepr>, Error>
where
  S: AdStore + Clone,
{
  let adv = load_for(&state, &user, &id, Operation::Retrieve).await?;
  Ok(Json(AdvRepr::from(&adv)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

async fn apply_write<S>(
  state: &AppState<S>,
  user: &User,
  raw_id: &str,
  body: &[u8],
  op: Operation,
  mode: WriteMode,
) -> Result<Json<AdvRepr>, Error>
where
  S: AdStore,
{
  let adv = load_for(state, user, raw_id, op).await?;
  let write = AdvWrite::from_slice(body, mode)?;

  let updated = state
    .store
    .update_adv(adv.id, AdvChanges::from(write))
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::NotFound)?;

  tracing::info!(op = op.name(), adv = updated.id, user = %user.username, "advertisement updated");
  Ok(Json(AdvRepr::from(&updated)))
}

/// `PUT /advs/{id}` — `text` required, `open` optional.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<String>,
  body: Bytes,
) -> Result<Json<AdvRepr>, Error>
where
  S: AdStore + Clone,
{
  apply_write(&state, &user, &id, &body, Operation::Update, WriteMode::Full).await
}

/// `PATCH /advs/{id}` — any subset of `text`, `open`.
pub async fn partial_update<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<String>,
  body: Bytes,
) -> Result<Json<AdvRepr>, Error>
where
  S: AdStore + Clone,
{
  apply_write(
    &state,
    &user,
    &id,
    &body,
    Operation::PartialUpdate,
    WriteMode::Partial,
  )
  .await
}

// ─── Destroy ──────────────────────────────────────────────────────────────────

/// `DELETE /advs/{id}` — returns 204.
pub async fn destroy<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<String>,
) -> Result<StatusCode, Error>
where
  S: AdStore + Clone,
{
  let adv = load_for(&state, &user, &id, Operation::Destroy).await?;

  let deleted = state
    .store
    .delete_adv(adv.id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  if !deleted {
    return Err(Error::NotFound);
  }

  tracing::info!(adv = adv.id, user = %user.username, "advertisement deleted");
  Ok(StatusCode::NO_CONTENT)
}
