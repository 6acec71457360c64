pub mod backend;
pub mod session_store;
