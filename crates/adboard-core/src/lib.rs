//! Core types and rules for the adboard advertisement service.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! owns the domain records, the wire mapping for them, the ownership
//! predicate, and the [`store::AdStore`] abstraction the other crates build
//! on.

// Store implementations use native `async fn` in place of the trait's
// `impl Future` signatures.
#![allow(async_fn_in_trait)]

pub mod adv;
pub mod error;
pub mod mapping;
pub mod permission;
pub mod store;
pub mod template;
pub mod user;

pub use error::{Error, Result};
