#![forbid(unsafe_code)]

pub mod changes;
pub mod repository;
pub mod session_store;
pub mod sqlite;

pub use changes::{ChangeFeed, StorageChange};
pub use session_store::{FileSessionStore, InMemorySessionStore, SessionStore};
