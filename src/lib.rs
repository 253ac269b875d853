mod database {
    pub mod actions;
    pub mod error;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod export {
    pub mod pdf;
}

pub use authentication::*;
pub use constants::*;
pub use database::*;
pub use export::*;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
