// note: this example assumes you've analyzed the previous one

use scopeline_di::builder::{new_container, Builder};
use scopeline_di::definition::Definition;
use scopeline_di::instance_provider::{ErrorPtr, TypedInstanceProvider};
use scopeline_di::scope::REQUEST;

//noinspection DuplicatedCode
fn main() -> Result<(), ErrorPtr> {
    let definitions = [Definition::new(|_| {
        println!("Session created!");
        Ok(String::from("session"))
    })
    .with_name("session")
    .with_scope(REQUEST)
    .with_close(|_: &String| {
        println!("Session closed!");
        Ok(())
    })];

    // passing no scopes results in the default ones
    let app = new_container(Vec::<String>::new(), definitions)?;

    // unscoped retrieval allows getting narrower-scoped objects from a wider container, which can
    // be useful in background jobs or tests; the instance lives in a private sub-container
    // prints "Session created!" once
    let session = app.unscoped_safe_get::<String>("session")?;
    let same_session = app.unscoped_safe_get::<String>("session")?;
    assert_eq!(session, same_session);

    // clean deletes the private sub-containers and prints "Session closed!"
    app.clean()?;

    // set replaces definitions with already built values, e.g. to substitute objects in tests
    let mut builder = Builder::with_default_scopes();
    builder.set("session", String::from("fake session"))?;

    let app = builder.build();
    println!("{}", app.safe_get::<String>("session")?);

    app.delete()?;
    Ok(())
}
