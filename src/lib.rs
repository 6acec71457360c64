//! Terminal chat client for a streaming chat backend.
//!
//! [`view::ChatView`] owns the conversation state and is driven by user actions
//! and by [`view::ViewEvent`]s coming back from the reply stream.
//! [`services::backend::HttpBackend`] speaks the backend's HTTP/SSE contract.

pub mod config;
pub mod error;
pub mod message;
pub mod services;
pub mod state;
pub mod transcript;
pub mod view;
