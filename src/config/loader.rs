//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{Result, StraddleError};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with STRADDLE__)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("STRADDLE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config: AppConfig = builder
        .build()
        .map_err(|e| StraddleError::Configuration(e.to_string()))?
        .try_deserialize()
        .map_err(|e| StraddleError::Configuration(e.to_string()))?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Some("definitely-not-here.toml")).unwrap();
        assert_eq!(config.market.spot_price, dec!(1000));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[market]\nspot_price = \"1250\"\n\n[strategy]\ntrust_policy = \"advisory\""
        )
        .unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.market.spot_price, dec!(1250));
        assert_eq!(
            config.strategy.trust_policy,
            crate::config::types::TrustPolicy::Advisory
        );
        assert_eq!(config.market.strike_prices.len(), 3);
    }
}
