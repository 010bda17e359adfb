pub mod db;
pub mod index;
pub mod models;
pub mod outbox;
pub mod quota;
pub mod schema;
pub mod vector;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
