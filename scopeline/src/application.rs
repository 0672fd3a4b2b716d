//! Core application framework functionality.

use crate::config::{
    ApplicationConfig, ApplicationConfigProvider, ApplicationConfigProviderPtr,
    DefaultApplicationConfigProvider, APPLICATION_CONFIG,
};
use crate::provider::DefinitionProviderPtr;
use crate::runner::ApplicationRunnerPtr;
use derive_more::Constructor;
use itertools::Itertools;
use scopeline_di::builder::Builder;
use scopeline_di::container::Container;
use scopeline_di::instance_provider::ErrorPtr;
use scopeline_di::{ContainerError, DefinitionRegistryError};
use std::cmp::Reverse;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Error, Debug)]
pub enum ApplicationError {
    #[error("Error retrieving application config: {0}")]
    ConfigError(ErrorPtr),
    #[error("Error retrieving definitions from provider '{name}': {source}")]
    ProviderError {
        name: &'static str,
        #[source]
        source: ErrorPtr,
    },
    #[error("Error registering definitions: {0}")]
    RegistryError(#[from] DefinitionRegistryError),
    #[error("Runner error: {0}")]
    RunnerError(ErrorPtr),
    #[error("Error deleting application container: {0}")]
    TeardownError(ContainerError),
}

/// Main entrypoint for the application. Builds the root container from definitions of all
/// [DefinitionProviders](crate::provider::DefinitionProvider) and runs
/// [ApplicationRunners](crate::runner::ApplicationRunner) with it.
#[derive(Constructor)]
pub struct Application {
    config_provider: ApplicationConfigProviderPtr,
    providers: Vec<DefinitionProviderPtr>,
    runners: Vec<ApplicationRunnerPtr>,
}

impl Application {
    /// Builds the root container. The container is owned by the caller, who is responsible for
    /// deleting it.
    pub fn build_container(&self) -> Result<Container, ApplicationError> {
        let config = self.config()?;
        self.build_container_with_config(config)
    }

    /// Runs all runners by priority (higher first) and deletes the root container with all
    /// sub-containers afterwards. The container is deleted even if a runner fails.
    pub fn run(&mut self) -> Result<(), ApplicationError> {
        let config = self.config()?;
        if config.install_tracing_logger {
            install_tracing_logger();
        }

        let container = self.build_container_with_config(config)?;

        self.runners.sort_by_key(|runner| Reverse(runner.priority()));

        info!("Running application runners...");

        let result = self
            .runners
            .iter()
            .try_for_each(|runner| runner.run(&container))
            .map_err(ApplicationError::RunnerError);

        info!("Deleting application container...");

        let teardown = container
            .delete_with_sub_containers()
            .map_err(ApplicationError::TeardownError);

        result.and(teardown)
    }

    fn config(&self) -> Result<ApplicationConfig, ApplicationError> {
        self.config_provider
            .config()
            .map_err(ApplicationError::ConfigError)
    }

    fn build_container_with_config(
        &self,
        config: ApplicationConfig,
    ) -> Result<Container, ApplicationError> {
        info!(
            providers = %self.providers.iter().map(|provider| provider.name()).join(", "),
            "Loading definitions..."
        );

        let mut builder = Builder::new(config.scopes.iter().cloned())?;
        for provider in &self.providers {
            let definitions =
                provider
                    .definitions()
                    .map_err(|source| ApplicationError::ProviderError {
                        name: provider.name(),
                        source,
                    })?;

            debug!(
                provider = provider.name(),
                count = definitions.len(),
                "Adding definitions"
            );
            builder.add(definitions)?;
        }

        builder.set(APPLICATION_CONFIG, config)?;
        Ok(builder.build())
    }
}

/// Creates an [Application] with the config read from the default config file and environment.
pub fn create_default(
    providers: Vec<DefinitionProviderPtr>,
    runners: Vec<ApplicationRunnerPtr>,
) -> Application {
    Application::new(
        Box::<DefaultApplicationConfigProvider>::default(),
        providers,
        runners,
    )
}

fn install_tracing_logger() {
    // another subscriber might have been installed by the user
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        debug!(%error, "Default tracing logger not installed");
    }
}
