//! meshnode - find-or-create / delete step for mesh virtual nodes.
//!
//! The step converges a single virtual node in the mesh control plane:
//!
//! - **create** (default): describe the node, return it if it exists,
//!   create it if it does not
//! - **delete**: delete the node and poll until the control plane confirms
//!   it is gone
//!
//! # Modules
//!
//! - [`params`] - Action inputs and their validation
//! - [`inputs`] - Per-operation request views
//! - [`client`] - Control-plane client
//! - [`reconciler`] - Find-or-create and delete-then-wait
//! - [`output`] - Output publishing
//! - [`cli`] - Command-line entry point

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod inputs;
pub mod logging;
pub mod output;
pub mod params;
pub mod reconciler;
pub mod types;

pub use error::{Error, Result};
