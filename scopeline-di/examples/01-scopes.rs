// note: this example assumes you've analyzed the previous one

use scopeline_di::builder::Builder;
use scopeline_di::definition::Definition;
use scopeline_di::instance_provider::{ErrorPtr, TypedInstanceProvider};
use scopeline_di::scope::{APP, REQUEST};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

struct RequestCounter {
    count: AtomicUsize,
}

struct Transaction {
    id: usize,
    statements: Mutex<Vec<String>>,
}

//noinspection DuplicatedCode
fn main() -> Result<(), ErrorPtr> {
    let mut builder = Builder::with_default_scopes();

    builder.add([
        // instances are cached in the container bound to the scope of their definition
        Definition::new(|_| {
            Ok(RequestCounter {
                count: AtomicUsize::new(0),
            })
        })
        .with_name("counter")
        .with_scope(APP),
        // a request-scoped transaction is shared within a single request, but every request gets
        // its own
        Definition::new(|container| {
            let counter = container.safe_get::<RequestCounter>("counter")?;
            Ok(Transaction {
                id: counter.count.fetch_add(1, Ordering::SeqCst),
                statements: Default::default(),
            })
        })
        .with_name("transaction")
        .with_scope(REQUEST)
        .with_close(|transaction: &Transaction| {
            let statements = transaction
                .statements
                .lock()
                .map(|statements| statements.len())
                .unwrap_or_default();

            println!("Committing transaction {} with {statements} statement(s)", transaction.id);
            Ok(())
        }),
        // unshared definitions create a new instance on every retrieval
        Definition::new(|_| Ok(String::from("SELECT 1")))
            .with_name("statement")
            .unshared(),
    ])?;

    let app = builder.build();

    for _ in 0..2 {
        // sub-containers live in the next, more specific scope
        let request = app.sub_container()?;

        let transaction = request.safe_get::<Transaction>("transaction")?;
        let statement = request.safe_get::<String>("statement")?;
        if let Ok(mut statements) = transaction.statements.lock() {
            statements.push(statement.to_string());
        }

        // prints "Committing transaction 0 with 1 statement(s)" and then the same for transaction 1
        request.delete()?;
    }

    // retrieving a request-scoped object from the app container is an error
    assert!(app.safe_get::<Transaction>("transaction").is_err());

    app.delete()?;
    Ok(())
}
