pub mod error;
pub mod jobs;
pub mod objects;
mod rows;

pub use error::{Result, StoreError};
pub use jobs::{LanguageChangeOutcome, Store};
pub use objects::ObjectStore;

/// Runs the embedded migrations against `pool`. Binaries call this once at
/// startup (teacher idiom: `crates/storage` treats schema setup as the
/// caller's responsibility, not a hidden side effect of `new`).
pub async fn run_migrations(pool: &sqlx::PgPool) -> sqlx::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        sqlx::Error::Configuration(Box::new(e))
    })
}
