//! # tether-host
//!
//! The host side of the tether extension bridge: a line transport over
//! stdin/stdout and the message router that interprets `init`,
//! `set_flags`, `invoke_tool`, and `emit` requests.
//!
//! ## Processing Model
//!
//! One request at a time: a line is read, fully handled (including any
//! awaited extension work), and its response written before the next line
//! is read. Response order therefore always matches request order.
//!
//! ## Fatality
//!
//! Per-message failures of every kind are answered as data. Only an I/O
//! failure on the underlying streams is fatal; the binary exits non-zero
//! after logging it.

#![deny(unsafe_code)]

pub mod errors;
pub mod router;
pub mod transport;
