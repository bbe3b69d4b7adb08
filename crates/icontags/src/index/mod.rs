//! Persistence: the host database and the icon table inside it.

mod database;
mod store;

pub use database::HostDatabase;
pub use store::{DB_FORMAT, IconIndexStore, PLUGIN_NAME, TABLE_NAME};
