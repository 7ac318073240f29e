//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! A YANG schema-aware validation and defaults engine for XML-shaped
//! configuration trees.
//!
//! Given an instance tree and a resolved schema, the engine binds XML
//! elements to their YANG nodes, enforces structural constraints
//! (`min-elements`, `max-elements`, list-key uniqueness and `unique`
//! statements), materialises default values - inventing non-presence
//! containers only when a descendant default requires them - and
//! implements the NETCONF with-defaults retrieval modes of RFC 6243.
//! Constraint violations are reported as structured NETCONF `rpc-error`
//! fragments ready for embedding in a reply.
//!
//! ## Design Goals
//! * Schema state lives in a single shared, immutable [`context::Context`];
//!   validation requests own their trees exclusively
//! * The tri-state outcome of the original C engine (ok / invalid /
//!   error) is kept as `Result<Validity>` so callers can tell
//!   user-visible constraint failures from internal faults
//! * Arena-indexed trees instead of intrusive pointer lists
//! * No YANG parsing, no full XPath and no persistence: schemas arrive
//!   compiled, XPath needs are served by a small built-in subset
//!   evaluator, and transports stay with the caller

mod error;

pub mod bind;
pub mod context;
pub mod data;
pub mod defaults;
pub mod iter;
pub mod netconf;
pub mod plugin;
pub mod schema;
pub mod validate;
pub mod xpath;

pub use crate::error::{Error, ErrorKind, Result};
