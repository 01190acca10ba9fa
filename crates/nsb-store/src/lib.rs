//! SQLite implementation of the core's `UserStore` port.

pub mod connection;
pub mod schema;
pub mod users;

pub use connection::{connect, connect_with_settings, DbPool};
pub use schema::ensure_schema;
pub use users::SqlUserStore;
