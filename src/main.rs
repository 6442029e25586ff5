use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use formreg_core::config::{registry_path_from_env_value, validation_mode_from_env_value};
use formreg_core::constants::{REGISTRY_PATH_ENV, VALIDATION_MODE_ENV};
use formreg_core::{CoreConfig, RegistryService};

/// One-shot seeding of the built-in assessment forms into the registry.
///
/// Forms already present (by `form_id`) are left untouched, so running this repeatedly is safe.
///
/// # Environment Variables
/// - `FORMREG_REGISTRY_PATH`: registry file (default: "src/data/forms/registry.json")
/// - `FORMREG_VALIDATION`: "strict" (default) or "permissive"
/// - `RUST_LOG`: log filter
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("formreg_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CoreConfig::new(
        registry_path_from_env_value(std::env::var(REGISTRY_PATH_ENV).ok()),
        validation_mode_from_env_value(std::env::var(VALIDATION_MODE_ENV).ok())?,
    )?;
    tracing::info!(
        "++ Seeding {} ({} validation)",
        config.registry_path().display(),
        config.validation_mode()
    );

    let report = RegistryService::new(config).seed_builtin()?;
    for outcome in &report.outcomes {
        println!("{}", outcome);
    }
    println!("Total forms: {}", report.total_forms);

    Ok(())
}
