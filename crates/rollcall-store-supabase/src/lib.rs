//! Supabase backend for rollcall.
//!
//! Attendance and students live in Postgres tables reached through PostgREST;
//! photos live in a public Supabase Storage bucket. The expected tables are in
//! `schema.sql` next to this crate's manifest.

mod bucket;
mod client;
mod store;

pub mod error;

pub use bucket::SupabaseBucket;
pub use client::{SupabaseClient, SupabaseConfig};
pub use error::{Error, Result};
pub use store::SupabaseStore;
