use scopeline::application;
use scopeline::provider::StaticDefinitionProvider;
use scopeline_di::definition::Definition;
use scopeline_di::instance_provider::TypedInstanceProvider;
use scopeline_di::scope::{APP, REQUEST};
use scopeline_web_axum::axum::routing::get;
use scopeline_web_axum::axum::Router;
use scopeline_web_axum::request_scope::RequestContainer;
use scopeline_web_axum::server::ServerRunner;
use std::sync::atomic::{AtomicUsize, Ordering};

struct VisitCounter(AtomicUsize);

struct Visit {
    number: usize,
}

// every request gets its own container, which is deleted after the response is produced
async fn visit(RequestContainer(container): RequestContainer) -> String {
    // retrieving the same request-scoped object twice returns the same instance
    let first = container.get::<Visit>("visit");
    let second = container.get::<Visit>("visit");

    format!("Visit number {} ({})", first.number, second.number)
}

//noinspection DuplicatedCode
fn main() {
    let definitions = StaticDefinitionProvider::new(
        "api",
        [
            Definition::new(|_| Ok(VisitCounter(AtomicUsize::new(1))))
                .with_name("visit_counter")
                .with_scope(APP),
            Definition::new(|container| {
                let counter = container.safe_get::<VisitCounter>("visit_counter")?;
                Ok(Visit {
                    number: counter.0.fetch_add(1, Ordering::SeqCst),
                })
            })
            .with_name("visit")
            .with_scope(REQUEST)
            .with_close(|visit: &Visit| {
                println!("Visit {} finished", visit.number);
                Ok(())
            }),
        ],
    );

    // listen address can be changed in "scopeline.json" under the "web" key
    let server = ServerRunner::create_default(Router::new().route("/", get(visit)))
        .expect("error reading web config");

    // every request to http://localhost/ prints "Visit N finished" after responding
    let mut application =
        application::create_default(vec![Box::new(definitions)], vec![Box::new(server)]);
    application.run().expect("error running application");
}
