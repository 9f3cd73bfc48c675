//! # tether-core
//!
//! Wire protocol and descriptor types for the tether extension host.
//!
//! This crate provides the shared vocabulary the host and extension crates
//! depend on:
//!
//! - **Requests / responses**: newline-delimited JSON records exchanged with
//!   the parent process, discriminated by a `type` field
//! - **Descriptors**: the public shapes extensions declare (tools, commands,
//!   flags, shortcuts, message renderers)
//! - **Registration summaries**: the sanitized view of a loaded extension
//!   serialized in `init` responses
//! - **Context payloads**: per-call session state attached to `invoke_tool`
//!   and `emit` requests
//!
//! All wire types use `camelCase` serde renaming for compatibility with the
//! host side of the protocol. This crate performs no I/O.

#![deny(unsafe_code)]

pub mod context;
pub mod descriptors;
pub mod protocol;
