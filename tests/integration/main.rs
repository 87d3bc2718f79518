//! End-to-end tests over the public API.
//!
//! - `scenarios`: catalogue, hierarchy and account flows on the in-memory store
//! - `concurrency`: racing writers on coroutines
//! - `postgres_store`: the same flows against PostgreSQL when `TEST_DATABASE_URL` is set

mod common;
mod concurrency;
mod postgres_store;
mod scenarios;
