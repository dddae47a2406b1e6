//! File-backed persistence — implements the
//! [`SessionStore`](consensus_application::SessionStore) port.

mod json_store;

pub use json_store::JsonFileSessionStore;
