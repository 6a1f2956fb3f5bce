//! Multi-conversation chat client: conversation store, durable slots,
//! identity and reply providers, and a terminal front end.

// Forbidden practices
#![deny(warnings)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(dead_code)]
#![deny(non_camel_case_types)]
#![deny(unused_imports)]
#![deny(unused_variables)]
#![deny(unused_must_use)]
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]
// Clippy
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::missing_const_for_fn)]
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::module_inception)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::shadow_unrelated)]
#![deny(clippy::too_many_arguments)]
#![deny(clippy::cognitive_complexity)]
// Robustness
#![deny(overflowing_literals)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Terminal commands, rendering and the interactive loop.
pub mod cli;
/// Identifiers, error taxonomy and configuration.
pub mod core;
/// Conversation data model, store and snapshot codec.
pub mod conversations;
/// Identity and reply backends sharing one session token.
pub mod providers;
/// Session orchestration: login, persistence and message round trips.
pub mod session;
/// Entry helpers to start the terminal client.
pub mod start_galaxy_chat;
/// Durable key/blob slots (in-memory and `SQLite`).
pub mod storage;
