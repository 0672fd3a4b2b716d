//! Request scoping for axum applications based on [scopeline_di] containers.
//!
//! Every request handled by a router wrapped with [request_scope::with_request_scope] gets its own
//! sub-container of the application container. Handlers retrieve it with the
//! [RequestContainer](request_scope::RequestContainer) extractor, and the sub-container (with all
//! instances it owns) is deleted once the response has been produced.
//!
//! ### Simple usage example
//!
//! ```no_run
//! use scopeline::application;
//! use scopeline::provider::StaticDefinitionProvider;
//! use scopeline_di::definition::Definition;
//! use scopeline_di::instance_provider::TypedInstanceProvider;
//! use scopeline_di::scope::REQUEST;
//! use scopeline_web_axum::axum::routing::get;
//! use scopeline_web_axum::axum::Router;
//! use scopeline_web_axum::request_scope::RequestContainer;
//! use scopeline_web_axum::server::ServerRunner;
//!
//! struct Greeting(String);
//!
//! // the handler gets the container of the current request
//! async fn hello_world(RequestContainer(container): RequestContainer) -> String {
//!     container.get::<Greeting>("greeting").0.clone()
//! }
//!
//! // note: for the sake of simplicity, errors are unwrapped, rather than
//! // gracefully handled
//! fn main() {
//!     let definitions = StaticDefinitionProvider::new(
//!         "api",
//!         [Definition::new(|_| Ok(Greeting("Hello world!".to_string())))
//!             .with_name("greeting")
//!             .with_scope(REQUEST)],
//!     );
//!
//!     // the server runner wraps the router with the request scope and serves it until ctrl-c
//!     let server = ServerRunner::create_default(Router::new().route("/", get(hello_world)))
//!         .expect("unable to read web config");
//!
//!     let mut application =
//!         application::create_default(vec![Box::new(definitions)], vec![Box::new(server)]);
//!     application.run().expect("error running application");
//! }
//! ```

pub mod config;
pub mod request_scope;
pub mod server;

pub use axum;
