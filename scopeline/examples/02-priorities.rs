// note: this example assumes you've analyzed the previous one

use scopeline::application;
use scopeline::runner::ApplicationRunner;
use scopeline_di::container::Container;
use scopeline_di::instance_provider::ErrorPtr;

struct PrintRunner {
    text: &'static str,
    priority: i8,
}

impl ApplicationRunner for PrintRunner {
    fn run(&self, _container: &Container) -> Result<(), ErrorPtr> {
        print!("{}", self.text);
        Ok(())
    }

    // for ordered execution of application runners, priorities can be used
    fn priority(&self) -> i8 {
        self.priority
    }
}

fn main() {
    let mut application = application::create_default(
        vec![],
        vec![
            Box::new(PrintRunner {
                text: "world",
                priority: 2,
            }),
            Box::new(PrintRunner {
                text: "!\n",
                priority: 1,
            }),
            Box::new(PrintRunner {
                text: "Hello ",
                priority: 3,
            }),
        ],
    );

    // prints "Hello world!"
    application.run().expect("error running application");
}
