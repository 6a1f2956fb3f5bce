//! Session orchestration on top of the store and providers.

pub mod chat_session;

pub use chat_session::{ChatSession, Exchange, RetryPolicy};
