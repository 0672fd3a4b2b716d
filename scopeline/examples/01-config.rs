// note: this example assumes you've analyzed the previous one

use scopeline::application::Application;
use scopeline::config::{ApplicationConfig, ApplicationConfigProvider, APPLICATION_CONFIG};
use scopeline::runner::ApplicationRunner;
use scopeline_di::container::Container;
use scopeline_di::instance_provider::{ErrorPtr, TypedInstanceProvider};

// application config is provided by an ApplicationConfigProvider, which by default uses
// environment variables and a configuration file (see module documentation)
// to provide your own, pass it to Application::new()
struct MyApplicationConfigProvider;

impl ApplicationConfigProvider for MyApplicationConfigProvider {
    fn config(&self) -> Result<ApplicationConfig, ErrorPtr> {
        // start with a default config and override what's needed
        let mut config = ApplicationConfig::default();
        config.scopes = vec!["main".to_string(), "job".to_string()];
        config.install_tracing_logger = false;

        Ok(config)
    }
}

// this simple runner will print a part of application config to prove everything works
struct ConfigPrinterRunner;

impl ApplicationRunner for ConfigPrinterRunner {
    fn run(&self, container: &Container) -> Result<(), ErrorPtr> {
        // the config is available in the root container
        let config = container.safe_get::<ApplicationConfig>(APPLICATION_CONFIG)?;
        println!("Using built-in logger: {}", config.install_tracing_logger);
        println!("Root scope: {}", container.scope());
        Ok(())
    }
}

fn main() {
    let mut application = Application::new(
        Box::new(MyApplicationConfigProvider),
        vec![],
        vec![Box::new(ConfigPrinterRunner)],
    );

    // prints "Using built-in logger: false" and "Root scope: main"
    application.run().expect("error running application");
}
