//! Web server configuration. By default, the config is created with opinionated default values,
//! which can then be overwritten by values from `scopeline.json` file under the `web` key.

use config::{Config, File};
use scopeline::config::CONFIG_FILE;
use scopeline_di::instance_provider::ErrorPtr;
use serde::Deserialize;
use std::sync::Arc;

/// Web server configuration.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct WebConfig {
    /// Address on which to listen.
    pub listen_address: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:80".to_string(),
        }
    }
}

impl From<OptionalWebConfig> for WebConfig {
    fn from(value: OptionalWebConfig) -> Self {
        let default = Self::default();
        Self {
            listen_address: value.listen_address.unwrap_or(default.listen_address),
        }
    }
}

impl WebConfig {
    /// Reads the config from the default config file.
    pub fn init_from_config() -> Result<Self, ErrorPtr> {
        Self::init_from_builder(
            Config::builder().add_source(File::with_name(CONFIG_FILE).required(false)),
        )
    }

    fn init_from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ErrorPtr> {
        builder
            .build()
            .and_then(|config| config.try_deserialize::<OptionalWebConfigWrapper>())
            .map(|config| config.web.map(|config| config.into()).unwrap_or_default())
            .map_err(|error| Arc::new(error) as ErrorPtr)
    }
}

#[derive(Deserialize)]
struct OptionalWebConfig {
    listen_address: Option<String>,
}

#[derive(Deserialize)]
struct OptionalWebConfigWrapper {
    web: Option<OptionalWebConfig>,
}
