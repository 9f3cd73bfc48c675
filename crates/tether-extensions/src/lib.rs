//! # tether-extensions
//!
//! Extension loading, registry, event dispatch, and tool invocation for the
//! tether host.
//!
//! An extension contributes handlers, tools, commands, flags, shortcuts, and
//! message renderers through a capability surface ([`api::ExtensionApi`])
//! handed to its factory exactly once at load time. The loader freezes the
//! result into an immutable [`registration::Registration`]; the
//! [`registry::ExtensionRegistry`] owns all registrations for the process
//! lifetime and maintains the merged tool-lookup table.
//!
//! ## Execution Model
//!
//! Everything is strictly sequential: one dispatch or tool call at a time,
//! handlers awaited one after another in registration order. This keeps the
//! `cancel`/`block` short-circuit rules deterministic.
//!
//! ## Fail-Open
//!
//! Handler and tool failures never crash the host. They are collected as
//! structured data and reported in the response for the message that caused
//! them.

#![deny(unsafe_code)]

pub mod api;
pub mod context;
pub mod discovery;
pub mod dispatch;
pub mod errors;
pub mod handler;
pub mod invoke;
pub mod loader;
pub mod process;
pub mod registration;
pub mod registry;
pub mod tool;
pub mod types;
