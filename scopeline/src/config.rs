//! Framework configuration is based on an [ApplicationConfigProvider], which is used to retrieve
//! [ApplicationConfig]. [Application](crate::application::Application) uses this config to configure
//! itself and registers it in the root container under [APPLICATION_CONFIG], so it can be
//! retrieved by any other object.
//!
//! By default, the config is created with opinionated default values, which can then be overwritten
//! by environment variables prefixed with `SCOPELINE_` or `scopeline.json` file. Scopes given in
//! environment variables are separated with commas, e.g. `SCOPELINE_SCOPES=app,request`.

#[cfg(test)]
use mockall::automock;
use config::{Config, ConfigError, Environment, File};
use scopeline_di::instance_provider::ErrorPtr;
use scopeline_di::scope::ScopeList;
use serde::Deserialize;
use std::error::Error;
use std::sync::Arc;

const CONFIG_ENV_PREFIX: &str = "SCOPELINE";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "scopeline.json";

/// Name of the [ApplicationConfig] instance in the root container.
pub const APPLICATION_CONFIG: &str = "application_config";

pub(crate) fn convert_error<E: Error + Send + Sync + 'static>(error: E) -> ErrorPtr {
    Arc::new(error) as ErrorPtr
}

/// Framework configuration which can be provided by an [ApplicationConfigProvider].
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    /// Scopes of the application containers, from the most generic one.
    pub scopes: Vec<String>,
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            scopes: ScopeList::default().as_slice().to_vec(),
            install_tracing_logger: true,
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            scopes: value.scopes.unwrap_or(default.scopes),
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
        }
    }
}

impl ApplicationConfig {
    /// Reads the config from the default config file and environment.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("scopes"),
            )
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }
}

/// Provider for [ApplicationConfig].
#[cfg_attr(test, automock)]
pub trait ApplicationConfigProvider {
    fn config(&self) -> Result<ApplicationConfig, ErrorPtr>;
}

pub type ApplicationConfigProviderPtr = Box<dyn ApplicationConfigProvider + Send + Sync>;

/// Provider reading the config with [ApplicationConfig::init_from_environment] once, on creation.
pub struct DefaultApplicationConfigProvider {
    // cached init result
    config: Result<ApplicationConfig, ErrorPtr>,
}

impl DefaultApplicationConfigProvider {
    pub fn new() -> Self {
        Self {
            config: ApplicationConfig::init_from_environment().map_err(convert_error),
        }
    }
}

impl Default for DefaultApplicationConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationConfigProvider for DefaultApplicationConfigProvider {
    fn config(&self) -> Result<ApplicationConfig, ErrorPtr> {
        self.config.clone()
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    scopes: Option<Vec<String>>,
    install_tracing_logger: Option<bool>,
}
