use scopeline::application;
use scopeline::provider::StaticDefinitionProvider;
use scopeline::runner::ApplicationRunner;
use scopeline_di::container::Container;
use scopeline_di::definition::Definition;
use scopeline_di::instance_provider::{ErrorPtr, TypedInstanceProvider};
use scopeline_di::scope::{APP, REQUEST};

struct Greeter {
    greeting: String,
}

struct Visitor {
    name: String,
}

// runners contain the actual application logic and get the root container
struct GreetingRunner;

impl ApplicationRunner for GreetingRunner {
    fn run(&self, container: &Container) -> Result<(), ErrorPtr> {
        for name in ["Alice", "Bob"] {
            // every unit of work gets its own sub-container
            let request = container.sub_container()?;
            let visitor = request.safe_get::<Visitor>("visitor")?;
            let greeter = request.safe_get::<Greeter>("greeter")?;

            println!("{}, {}! ({name})", greeter.greeting, visitor.name);
            request.delete()?;
        }

        Ok(())
    }
}

//noinspection DuplicatedCode
fn main() {
    // definitions are provided by application layers
    let business = StaticDefinitionProvider::new(
        "business",
        [
            Definition::new(|_| {
                Ok(Greeter {
                    greeting: "Hello".to_string(),
                })
            })
            .with_name("greeter")
            .with_scope(APP),
            Definition::new(|_| {
                Ok(Visitor {
                    name: "visitor".to_string(),
                })
            })
            .with_name("visitor")
            .with_scope(REQUEST),
        ],
    );

    // create the application with config taken from "scopeline.json" and the environment
    let mut application =
        application::create_default(vec![Box::new(business)], vec![Box::new(GreetingRunner)]);

    // prints "Hello, visitor! (Alice)" and "Hello, visitor! (Bob)"
    application.run().expect("error running application");
}
