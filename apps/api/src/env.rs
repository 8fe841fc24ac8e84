use std::path::Path;
use std::sync::OnceLock;

pub use confab_config::ApiEnv as Env;

static ENV: OnceLock<Env> = OnceLock::new();

/// Same two-step `.env` lookup as `confab_config::load` (repo root, then
/// crate-local), cached for the process lifetime.
pub fn env() -> &'static Env {
    ENV.get_or_init(|| {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        confab_config::load(manifest_dir).expect("failed to load environment")
    })
}
