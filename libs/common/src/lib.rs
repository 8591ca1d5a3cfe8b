//! Common library for the Care.xyz backend
//!
//! This crate provides shared functionality used across the services of the
//! Care.xyz marketplace: PostgreSQL connectivity, schema setup and seeding,
//! Redis caching, and shared error types.

pub mod cache;
pub mod database;
pub mod error;
