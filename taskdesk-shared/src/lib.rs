//! # TaskDesk Shared Library
//!
//! This crate contains the task/user management core used by the TaskDesk
//! shell and any other front end: credential handling, the persisted session,
//! store contracts, and the reactive role-scoped query engines.
//!
//! ## Module Organization
//!
//! - `models`: users, tasks and categories
//! - `auth`: password hashing, authorization checks, sessions, login/logout
//! - `store`: repository traits, live sequences, in-memory stores
//! - `query`: live task and user queries, statistics, mutations
//! - `config`: configuration management
//! - `error`: common error types

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod store;

pub use error::{CoreError, CoreResult};

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
