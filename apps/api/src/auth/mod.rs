// Access control: credential store, login/approval flow, sessions.
// Storage goes through the repository traits in store.rs only.

pub mod handlers;
pub mod models;
pub mod service;
pub mod session;
pub mod store;
