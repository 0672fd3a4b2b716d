use scopeline_di::builder::Builder;
use scopeline_di::container::Container;
use scopeline_di::definition::Definition;
use scopeline_di::instance_provider::{ErrorPtr, InstanceProvider, TypedInstanceProvider};
use scopeline_di::scope::{APP, REQUEST, SUBREQUEST};
use scopeline_di::ContainerError;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct TestError;

impl Display for TestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("test error")
    }
}

impl std::error::Error for TestError {}

struct Counted {
    id: usize,
}

fn counting_definition(name: &str, counter: &Arc<AtomicUsize>) -> Definition {
    let counter = counter.clone();
    Definition::new(move |_| {
        Ok(Counted {
            id: counter.fetch_add(1, Ordering::SeqCst),
        })
    })
    .with_name(name)
}

fn build_container(definitions: Vec<Definition>) -> Container {
    let mut builder = Builder::with_default_scopes();
    builder.add(definitions).unwrap();
    builder.build()
}

#[test]
fn should_share_instance_and_build_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let app = build_container(vec![counting_definition("shared", &builds).with_scope(APP)]);

    let first = app.safe_get::<Counted>("shared").unwrap();
    let second = app.safe_get::<Counted>("shared").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn should_build_unshared_instance_on_each_retrieval() {
    let builds = Arc::new(AtomicUsize::new(0));
    let app = build_container(vec![counting_definition("fresh", &builds)
        .with_scope(APP)
        .unshared()]);

    let first = app.safe_get::<Counted>("fresh").unwrap();
    let second = app.safe_get::<Counted>("fresh").unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_ne!(first.id, second.id);
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[test]
fn should_not_close_unshared_instances() {
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();
    let app = build_container(vec![Definition::new(|_| Ok(0u8))
        .with_name("fresh")
        .unshared()
        .with_close(move |_: &u8| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })]);

    app.safe_get::<u8>("fresh").unwrap();
    app.delete().unwrap();

    assert_eq!(closes.load(Ordering::SeqCst), 0);
}

#[test]
fn should_reject_narrower_scope_and_allow_unscoped_retrieval() {
    let builds = Arc::new(AtomicUsize::new(0));
    let app = build_container(vec![counting_definition("per_request", &builds).with_scope(REQUEST)]);

    assert!(matches!(
        app.safe_get::<Counted>("per_request"),
        Err(ContainerError::ScopeMismatch { scope, container_scope, .. })
            if scope == REQUEST && container_scope == APP
    ));

    app.unscoped_safe_get::<Counted>("per_request").unwrap();
    assert!(matches!(app.delete(), Err(ContainerError::HasChildren(1))));

    app.clean().unwrap();
    app.delete().unwrap();
}

#[test]
fn should_build_fresh_instance_after_clean() {
    let builds = Arc::new(AtomicUsize::new(0));
    let app = build_container(vec![counting_definition("per_request", &builds).with_scope(REQUEST)]);

    let first = app.unscoped_get::<Counted>("per_request");
    let again = app.unscoped_get::<Counted>("per_request");
    assert!(Arc::ptr_eq(&first, &again));

    app.clean().unwrap();

    let second = app.unscoped_get::<Counted>("per_request");
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[test]
fn should_close_unscoped_instances_on_clean() {
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();
    let app = build_container(vec![Definition::new(|_| Ok(0u8))
        .with_name("deep")
        .with_scope(SUBREQUEST)
        .with_close(move |_: &u8| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })]);

    let mut destination = None;
    app.unscoped_fill::<u8>("deep", &mut destination).unwrap();
    assert_eq!(destination.as_deref(), Some(&0));

    app.clean().unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(!app.is_closed());
}

#[test]
fn should_gate_delete_on_children() {
    let app = build_container(vec![]);
    let request = app.sub_container().unwrap();

    assert!(matches!(app.delete(), Err(ContainerError::HasChildren(1))));
    assert!(!app.is_closed());

    request.delete().unwrap();
    app.delete().unwrap();
    assert!(app.is_closed());
}

#[test]
fn should_materialize_and_close_dependencies() {
    let closed = Arc::new(Mutex::new(Vec::new()));
    let closed_a = closed.clone();
    let closed_b = closed.clone();
    let builds_a = Arc::new(AtomicUsize::new(0));
    let counter = builds_a.clone();

    let app = build_container(vec![
        Definition::new(move |_| Ok(counter.fetch_add(1, Ordering::SeqCst)))
            .with_name("a")
            .with_scope(APP)
            .with_close(move |_: &usize| {
                closed_a.lock().unwrap().push("a");
                Ok(())
            }),
        Definition::new(|container| {
            let a = container.safe_get::<usize>("a")?;
            Ok(format!("b({a})"))
        })
        .with_name("b")
        .with_scope(APP)
        .with_close(move |_: &String| {
            closed_b.lock().unwrap().push("b");
            Ok(())
        }),
    ]);

    assert_eq!(*app.get::<String>("b"), "b(0)");
    app.get::<usize>("a");
    assert_eq!(builds_a.load(Ordering::SeqCst), 1);

    app.delete().unwrap();
    assert_eq!(*closed.lock().unwrap(), ["b", "a"]);
}

#[test]
fn should_build_once_under_concurrent_retrieval() {
    const CALLERS: usize = 8;

    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let app = build_container(vec![Definition::new(move |_| {
        thread::sleep(Duration::from_millis(50));
        Ok(counter.fetch_add(1, Ordering::SeqCst))
    })
    .with_name("slow")
    .with_scope(APP)]);

    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let app = app.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                app.safe_get::<usize>("slow").unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(results
        .iter()
        .all(|instance| Arc::ptr_eq(instance, &results[0])));
}

#[test]
fn should_keep_sibling_caches_independent() {
    let builds = Arc::new(AtomicUsize::new(0));
    let app = build_container(vec![counting_definition("per_request", &builds).with_scope(REQUEST)]);

    let first = app.sub_container().unwrap();
    let second = app.sub_container().unwrap();

    let from_first = first.get::<Counted>("per_request");
    let from_second = second.get::<Counted>("per_request");
    assert!(!Arc::ptr_eq(&from_first, &from_second));

    first.delete().unwrap();
    assert_eq!(second.get::<Counted>("per_request").id, from_second.id);
    second.delete().unwrap();
}

#[test]
fn should_inherit_cached_counter_from_app_scope() {
    let mut builder = Builder::new([APP, REQUEST]).unwrap();
    let next = Arc::new(AtomicUsize::new(0));
    builder
        .add([Definition::new(move |_| Ok(next.fetch_add(1, Ordering::SeqCst)))
            .with_name("counter")
            .with_scope(APP)])
        .unwrap();

    let app = builder.build();
    assert_eq!(*app.get::<usize>("counter"), 0);
    assert_eq!(*app.get::<usize>("counter"), 0);

    let request = app.sub_container().unwrap();
    assert_eq!(*request.get::<usize>("counter"), 0);
}

#[test]
fn should_wrap_build_error_without_caching() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let app = build_container(vec![Definition::new(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(Arc::new(TestError) as ErrorPtr)
        } else {
            Ok(1u8)
        }
    })
    .with_name("flaky")]);

    assert!(matches!(
        app.safe_get_any("flaky"),
        Err(ContainerError::Construction { name, .. }) if name == "flaky"
    ));
    assert_eq!(*app.get::<u8>("flaky"), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn should_aggregate_close_failures() {
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();
    let app = build_container(vec![
        Definition::new(|_| Ok(1u8))
            .with_name("first")
            .with_close(|_: &u8| Err(Arc::new(TestError) as ErrorPtr)),
        Definition::new(|_| Ok(2u16))
            .with_name("second")
            .with_close(move |_: &u16| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        Definition::new(|_| Ok(3u32))
            .with_name("third")
            .with_close(|_: &u32| Err(Arc::new(TestError) as ErrorPtr)),
    ]);

    app.get::<u8>("first");
    app.get::<u16>("second");
    app.get::<u32>("third");

    match app.delete() {
        Err(ContainerError::Teardown(failures)) => {
            let names: Vec<_> = failures.iter().map(|failure| failure.name.as_str()).collect();
            assert_eq!(names, ["third", "first"]);
        }
        result => panic!("unexpected result: {result:?}"),
    }

    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(app.is_closed());
}

#[test]
fn should_cascade_delete_with_sub_containers() {
    let closes = Arc::new(Mutex::new(Vec::new()));
    let definition = |name: &'static str, scope: &'static str| {
        let closes = closes.clone();
        Definition::new(|_| Ok(()))
            .with_name(name)
            .with_scope(scope)
            .with_close(move |_: &()| {
                closes.lock().unwrap().push(name);
                Ok(())
            })
    };

    let app = build_container(vec![
        definition("app_resource", APP),
        definition("request_resource", REQUEST),
        definition("subrequest_resource", SUBREQUEST),
    ]);

    let request = app.sub_container().unwrap();
    let subrequest = request.sub_container().unwrap();
    subrequest.get::<()>("subrequest_resource");
    subrequest.get::<()>("request_resource");
    subrequest.get::<()>("app_resource");

    app.delete_with_sub_containers().unwrap();

    assert!(request.is_closed());
    assert!(subrequest.is_closed());
    assert_eq!(
        *closes.lock().unwrap(),
        ["subrequest_resource", "request_resource", "app_resource"]
    );
}

#[test]
fn should_close_instance_once_across_deletes() {
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();
    let app = build_container(vec![Definition::new(|_| Ok(()))
        .with_name("resource")
        .with_scope(REQUEST)
        .with_close(move |_: &()| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })]);

    let request = app.sub_container().unwrap();
    request.get::<()>("resource");
    request.delete().unwrap();

    assert!(matches!(
        request.delete(),
        Err(ContainerError::ContainerClosed)
    ));
    app.delete_with_sub_containers().unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn should_join_build_in_progress_before_closing() {
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();
    let started = Arc::new(Barrier::new(2));
    let build_started = started.clone();

    let app = build_container(vec![Definition::new(move |_| {
        build_started.wait();
        thread::sleep(Duration::from_millis(50));
        Ok(0u8)
    })
    .with_name("slow")
    .with_close(move |_: &u8| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })]);

    let retrieval = {
        let app = app.clone();
        thread::spawn(move || app.safe_get::<u8>("slow").map(|_| ()))
    };

    started.wait();
    app.delete().unwrap();

    assert!(retrieval.join().unwrap().is_ok());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn should_detect_mutual_dependency() {
    let app = build_container(vec![
        Definition::new(|container| {
            container.safe_get::<u8>("b")?;
            Ok(0u8)
        })
        .with_name("a"),
        Definition::new(|container| {
            container.safe_get::<u8>("a")?;
            Ok(0u8)
        })
        .with_name("b"),
    ]);

    assert!(matches!(
        app.safe_get::<u8>("a"),
        Err(ContainerError::CyclicDependency(_))
    ));
    assert!(matches!(
        app.safe_get::<u8>("b"),
        Err(ContainerError::CyclicDependency(_))
    ));
}

#[test]
fn should_detect_cycle_across_threads() {
    let both_building = Arc::new(Barrier::new(2));

    let gated = |name: &str, dependency: &'static str| {
        let first_call = AtomicBool::new(true);
        let both_building = both_building.clone();
        Definition::new(move |container| {
            if first_call.swap(false, Ordering::SeqCst) {
                both_building.wait();
            }

            container.safe_get::<u8>(dependency)?;
            Ok(0u8)
        })
        .with_name(name)
    };

    let app = build_container(vec![gated("a", "b"), gated("b", "a")]);

    let (sender, receiver) = mpsc::channel();
    for name in ["a", "b"] {
        let app = app.clone();
        let sender = sender.clone();
        thread::spawn(move || {
            let _ = sender.send((name, app.safe_get::<u8>(name).map(|_| ())));
        });
    }

    for _ in 0..2 {
        let (name, result) = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("retrieval should not hang");
        assert!(
            matches!(result, Err(ContainerError::CyclicDependency(_))),
            "unexpected result for '{name}': {result:?}"
        );
    }
}

#[test]
fn should_report_name_given_after_close_function() {
    let app = build_container(vec![Definition::new(|_| Ok(1u8))
        .with_close(|_: &u16| Ok(()))
        .with_name("renamed")]);

    app.get::<u8>("renamed");

    match app.delete() {
        Err(ContainerError::Teardown(failures)) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].name, "renamed");
            assert!(matches!(
                failures[0].error.downcast_ref::<ContainerError>(),
                Some(ContainerError::TypeMismatch { name, .. }) if name == "renamed"
            ));
        }
        result => panic!("unexpected result: {result:?}"),
    }
}

#[test]
fn should_report_type_mismatch_on_fill() {
    let app = build_container(vec![Definition::new(|_| Ok(1u8)).with_name("byte")]);

    let mut destination: Option<Arc<String>> = None;
    assert!(matches!(
        app.fill("byte", &mut destination),
        Err(ContainerError::TypeMismatch { .. })
    ));
}
