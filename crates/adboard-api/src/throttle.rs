//! Request-rate cap for anonymous callers.
//!
//! Each client address keeps a sliding window of recent request instants.
//! A request is refused once the window already holds `num_requests`
//! entries younger than `period`. Authenticated callers are never counted.

use std::{
  collections::VecDeque,
  net::SocketAddr,
  str::FromStr,
  time::{Duration, Instant},
};

use axum::{extract::ConnectInfo, http::Request};
use dashmap::DashMap;
use thiserror::Error;

// ─── Rate ────────────────────────────────────────────────────────────────────

/// A rate such as `100/day`: at most `num_requests` per `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleRate {
  pub num_requests: u32,
  pub period:       Duration,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThrottleRateError {
  #[error("expected `<count>/<period>`, got {0:?}")]
  Format(String),
  #[error("invalid request count {0:?}")]
  Count(String),
  #[error("unknown period {0:?}; use s, m, h or d")]
  Period(String),
}

impl FromStr for ThrottleRate {
  type Err = ThrottleRateError;

  /// Parse `<count>/<period>`. Only the first letter of the period matters,
  /// so `10/s`, `10/sec` and `10/second` are the same rate.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (count, period) = s
      .split_once('/')
      .ok_or_else(|| ThrottleRateError::Format(s.to_owned()))?;

    let num_requests = count
      .trim()
      .parse()
      .map_err(|_| ThrottleRateError::Count(count.to_owned()))?;

    let secs = match period.trim().chars().next() {
      Some('s') => 1,
      Some('m') => 60,
      Some('h') => 60 * 60,
      Some('d') => 24 * 60 * 60,
      _ => return Err(ThrottleRateError::Period(period.to_owned())),
    };

    Ok(ThrottleRate {
      num_requests,
      period: Duration::from_secs(secs),
    })
  }
}

// ─── Throttle ────────────────────────────────────────────────────────────────

/// Sliding-window limiter keyed by client address.
///
/// With no rate configured every request is allowed.
pub struct AnonThrottle {
  rate:                Option<ThrottleRate>,
  trust_forwarded_for: bool,
  history:             DashMap<String, VecDeque<Instant>>,
}

impl AnonThrottle {
  pub fn new(rate: Option<ThrottleRate>, trust_forwarded_for: bool) -> Self {
    Self {
      rate,
      trust_forwarded_for,
      history: DashMap::new(),
    }
  }

  /// A throttle that never refuses.
  pub fn disabled() -> Self { Self::new(None, false) }

  pub fn rate(&self) -> Option<ThrottleRate> { self.rate }

  /// Record a request from `key`, or return how long until it would be
  /// allowed.
  pub fn check(&self, key: &str) -> Result<(), Duration> {
    self.check_at(key, Instant::now())
  }

  fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
    let Some(rate) = self.rate else { return Ok(()) };

    let mut history = self.history.entry(key.to_owned()).or_default();
    while let Some(&oldest) = history.front() {
      if now.saturating_duration_since(oldest) >= rate.period {
        history.pop_front();
      } else {
        break;
      }
    }

    if history.len() >= rate.num_requests as usize {
      let wait = match history.front() {
        Some(&oldest) => {
          rate.period.saturating_sub(now.saturating_duration_since(oldest))
        }
        None => rate.period,
      };
      return Err(wait);
    }

    history.push_back(now);
    Ok(())
  }

  /// Drop windows whose newest request has aged out. Returns how many
  /// clients were forgotten.
  pub fn prune_expired(&self) -> usize { self.prune_expired_at(Instant::now()) }

  fn prune_expired_at(&self, now: Instant) -> usize {
    let Some(rate) = self.rate else { return 0 };
    let before = self.history.len();
    self.history.retain(|_, h| {
      h.back()
        .is_some_and(|&t| now.saturating_duration_since(t) < rate.period)
    });
    before - self.history.len()
  }

  /// Identify the client behind `req`.
  ///
  /// Uses the first `X-Forwarded-For` hop when proxies are trusted, then the
  /// socket peer address, then `"unknown"`.
  pub fn client_key<B>(&self, req: &Request<B>) -> String {
    if self.trust_forwarded_for
      && let Some(first) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
      return first.to_owned();
    }

    req
      .extensions()
      .get::<ConnectInfo<SocketAddr>>()
      .map(|ConnectInfo(addr)| addr.ip().to_string())
      .unwrap_or_else(|| "unknown".to_owned())
  }
}
