//! Operator for the FINOS Legend Studio workload.
//!
//! It collects what the Studio server needs from related applications
//! (MongoDB credentials, a GitLab OAuth client, the SDLC and Engine API
//! URLs), renders the server's two JSON configuration documents, pushes
//! them into the workload container and restarts the service through
//! Pebble. Until every input is present the unit stays blocked with the
//! first missing input as its status.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, render, validate).
//! - [`config`] -- Operator options: model, loading, and validation.
//! - [`driver`] -- Event dispatch, unit status, and reconciliation.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`relations`] -- Typed clients for the database, GitLab, SDLC, Engine,
//!   and ingress relations.
//! - [`render`] -- Assembly of the Studio configuration documents.
//! - [`state`] -- Durable cache of relation data.
//! - [`workload`] -- The [`Supervisor`](workload::Supervisor) trait, the
//!   Pebble client, and the local container-root backend.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `toml` | TOML options file support |
//! | `sentry-integration` | Sentry error tracking |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod relations;
pub mod render;
pub mod state;
pub mod workload;

#[cfg(feature = "sentry-integration")]
pub mod sentry_integration;
