//! Scoped dependency injection container.
//!
//! Objects are described by named [Definitions](definition::Definition), each bound to one of a
//! linear hierarchy of [scopes](scope) (e.g. application ⊃ request ⊃ sub-request). A
//! [Builder](builder::Builder) validates the definitions and creates a root
//! [Container](container::Container) in the most generic scope, from which containers for more
//! specific scopes can be created.
//!
//! Instances are built lazily, cached in the container owning their scope (unless unshared) and
//! closed when that container gets deleted.
//!
//! ```
//! use scopeline_di::builder::Builder;
//! use scopeline_di::definition::Definition;
//! use scopeline_di::instance_provider::TypedInstanceProvider;
//! use scopeline_di::scope::{APP, REQUEST};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct Transaction {
//!     database: Arc<Database>,
//! }
//!
//! let mut builder = Builder::with_default_scopes();
//! builder
//!     .add([
//!         Definition::new(|_| {
//!             Ok(Database {
//!                 url: "postgres://localhost".to_string(),
//!             })
//!         })
//!         .with_name("database")
//!         .with_scope(APP),
//!         Definition::new(|container| {
//!             Ok(Transaction {
//!                 database: container.safe_get("database")?,
//!             })
//!         })
//!         .with_name("transaction")
//!         .with_scope(REQUEST)
//!         .with_close(|transaction: &Transaction| {
//!             println!("Committing to {}", transaction.database.url);
//!             Ok(())
//!         }),
//!     ])
//!     .expect("invalid definitions");
//!
//! let app = builder.build();
//!
//! // each request gets its own transaction, sharing the database
//! let request = app.sub_container().unwrap();
//! let transaction = request.get::<Transaction>("transaction");
//! assert!(Arc::ptr_eq(&transaction.database, &app.get::<Database>("database")));
//!
//! // prints "Committing to postgres://localhost"
//! request.delete().unwrap();
//! app.delete().unwrap();
//! ```

pub mod builder;
pub mod container;
pub mod definition;
pub mod definition_registry;
mod error;
pub mod instance_provider;
pub mod scope;

pub use error::{CloseFailure, ContainerError, DefinitionRegistryError};
