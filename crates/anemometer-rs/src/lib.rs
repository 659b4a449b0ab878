//! Public surface for Anemometer data-source definitions.
//!
//! Re-exports the config crate and provides a logging initializer so hosting
//! applications wire startup the same way.

/// Re-export for convenience.
pub use anemometer_rs_config as config;
pub use anemometer_rs_config::{ConfigError, ConfigLoader, DataSourceConfig};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Hosting binaries are still
/// expected to call this before loading definitions so loader output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}

/// Load the data source `name` from a definition file at startup.
pub fn load_datasource(
    path: impl AsRef<std::path::Path>,
    name: &str,
) -> Result<DataSourceConfig, ConfigError> {
    let config = ConfigLoader::from_path(path).load(name)?;
    log::info!(
        "data source ready (name={}, host={}, port={}, db={})",
        config.name(),
        config.host(),
        config.port(),
        config.database()
    );
    Ok(config)
}
