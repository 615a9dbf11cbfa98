//! # TaskDesk Shell Library
//!
//! This library provides the composition root and the command shell for the
//! TaskDesk binary. It is a thin layer over `taskdesk-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state, default data seeding, background loggers
//! - `commands`: Command parsing and execution
//! - `config`: Configuration management
//! - `error`: Shell error type and core error mapping

pub mod app;
pub mod commands;
pub mod config;
pub mod error;
