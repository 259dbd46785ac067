//! Core types and trait definitions for rollcall attendance tracking.
//!
//! This crate is free of HTTP and database dependencies. It holds the
//! once-per-day recording policy ([`recorder`]), the client-side recognition
//! debouncer ([`debounce`]), and the storage traits the backends implement.

// Native `async fn` in traits; the futures' `Send` bounds are spelled out on
// the trait methods themselves.
#![allow(async_fn_in_trait)]

pub mod attendance;
pub mod debounce;
pub mod error;
pub mod photo;
pub mod recorder;
pub mod store;
pub mod student;

pub use error::{Error, Result};
