//! Runners executing actual application logic.

#[cfg(test)]
use mockall::automock;
use scopeline_di::container::Container;
pub use scopeline_di::instance_provider::ErrorPtr;

pub type ApplicationRunnerPtr = Box<dyn ApplicationRunner + Send + Sync>;

/// Runs application logic. Runners are run by the [Application](crate::application::Application)
/// with the root container, after all definitions have been loaded.
#[cfg_attr(test, automock)]
pub trait ApplicationRunner {
    /// Runs any application code.
    fn run(&self, container: &Container) -> Result<(), ErrorPtr>;

    /// Returns the priority for this runner. Higher priorities get run first. Default 0.
    fn priority(&self) -> i8 {
        0
    }
}
