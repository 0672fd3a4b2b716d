use scopeline_di::builder::Builder;
use scopeline_di::definition::Definition;
use scopeline_di::instance_provider::{ErrorPtr, TypedInstanceProvider};
use scopeline_di::scope::APP;

struct Config {
    url: String,
}

struct Database {
    url: String,
}

impl Database {
    fn query(&self) {
        println!("querying {}", self.url);
    }
}

//noinspection DuplicatedCode
fn main() -> Result<(), ErrorPtr> {
    // a builder collects definitions for a list of scopes - the default list is "app", "request"
    // and "subrequest"
    let mut builder = Builder::with_default_scopes();

    builder.add([
        // a definition describes how to build a named object
        Definition::new(|_| {
            Ok(Config {
                url: "postgres://localhost".to_string(),
            })
        })
        .with_name("config")
        .with_scope(APP),
        // build functions get the owning container, which can be used to retrieve dependencies
        Definition::new(|container| {
            let config = container.safe_get::<Config>("config")?;

            println!("Database created!");
            Ok(Database {
                url: config.url.clone(),
            })
        })
        .with_name("database")
        .with_scope(APP)
        // close functions are called when the owning container gets deleted
        .with_close(|database: &Database| {
            println!("Closing {}", database.url);
            Ok(())
        }),
    ])?;

    // the root container lives in the most generic scope
    let app = builder.build();

    // prints "Database created!" only once, since the instance is cached in the container
    app.safe_get::<Database>("database")?.query();
    app.safe_get::<Database>("database")?.query();

    // prints "Closing postgres://localhost"
    app.delete()?;

    Ok(())
}
