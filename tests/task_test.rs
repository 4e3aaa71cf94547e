use taskflow::actions::FnHandler;
use taskflow::actions::builtin::EchoAction;
use taskflow::{Flow, Retries, Task, TaskflowError, Trigger};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn my_fn() -> Arc<FnHandler> {
    Arc::new(FnHandler::new("my_fn", |input| Ok(json!({ "doubled": input["x"].as_i64().unwrap_or(0) * 2 }))))
}

#[test]
fn test_task_id_is_flow_slash_name() {
    let flow = Flow::new("F");
    let a = Task::builder().name("a").flow(&flow).build().unwrap();
    let b = Task::builder().name("b").flow(&flow).build().unwrap();

    assert_eq!(a.id(), "F/a");
    assert_eq!(b.id(), "F/b");
    assert_eq!(a.id(), format!("{}/{}", a.flow().id(), a.name()));
    assert_eq!(a.to_string(), "Task(F/a)");
}

#[test]
fn test_construction_registers_with_flow() {
    let flow = Flow::new("F");
    let a = Task::builder().name("a").flow(&flow).build().unwrap();

    assert_eq!(flow.len(), 1);
    let registered = flow.task("a").expect("task registered");
    assert!(registered.same_task(&a));
    assert!(flow.contains("F/a"));
}

#[test]
fn test_defaults() {
    let flow = Flow::new("F");
    let task = Task::builder().name("a").flow(&flow).build().unwrap();

    assert_eq!(task.retries(), Retries::Count(0));
    assert_eq!(task.retry_delay(), Duration::from_secs(300));
    assert_eq!(task.trigger(), Trigger::AllSuccess);
    assert!(task.handler().is_none());
    assert!(task.params().is_none());
}

#[test]
fn test_name_defaults_to_handler_name() {
    let flow = Flow::new("F");
    let task = Task::builder().handler(my_fn()).flow(&flow).build().unwrap();

    assert_eq!(task.name(), "my_fn");
    assert_eq!(task.id(), "F/my_fn");
}

#[test]
fn test_missing_name_and_handler_is_type_error() {
    let flow = Flow::new("F");
    let err = Task::builder().flow(&flow).build().unwrap_err();

    assert!(matches!(err, TaskflowError::Type(_)), "got {err:?}");
    assert!(flow.is_empty());
}

#[test]
fn test_no_flow_is_config_error_and_registers_nothing() {
    let bystander = Flow::new("bystander");
    assert!(Flow::active().is_none());

    let err = Task::builder().name("orphan").build().unwrap_err();

    match err {
        TaskflowError::Config(msg) => assert!(msg.contains("Flow context"), "{msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
    assert!(bystander.is_empty());
}

#[test]
fn test_active_flow_context() {
    let flow = Flow::new("ctx");
    let task = flow.scope(|| Task::from_handler(my_fn())).unwrap();

    assert_eq!(task.flow().id(), "ctx");
    assert_eq!(flow.len(), 1);
    assert!(Flow::active().is_none(), "scope must end with the closure");
}

#[test]
fn test_nested_flow_contexts() {
    let outer = Flow::new("outer");
    let inner = Flow::new("inner");

    let _outer_guard = outer.enter();
    {
        let _inner_guard = inner.enter();
        let t = Task::builder().name("x").build().unwrap();
        assert_eq!(t.id(), "inner/x");
    }
    let t = Task::builder().name("y").build().unwrap();
    assert_eq!(t.id(), "outer/y");
    assert_eq!(Flow::active().map(|f| f.id().to_string()), Some("outer".to_string()));
}

#[test]
fn test_leaving_flow_keeps_same_id_flow_active() {
    let first = Flow::new("F");
    let second = Flow::new("F");

    let first_guard = first.enter();
    let _second_guard = second.enter();
    drop(first_guard);

    let active = Flow::active().expect("second flow still active");
    assert!(active.ptr_eq(&second));

    Task::builder().name("x").build().unwrap();
    assert!(first.is_empty());
    assert_eq!(second.len(), 1);
}

#[test]
fn test_explicit_flow_wins_over_active_flow() {
    let active = Flow::new("active");
    let explicit = Flow::new("explicit");

    let _guard = active.enter();
    let t = Task::builder().name("t").flow(&explicit).build().unwrap();

    assert_eq!(t.id(), "explicit/t");
    assert!(active.is_empty());
}

#[test]
fn test_active_flow_is_thread_local() {
    let flow = Flow::new("main-thread");
    let _guard = flow.enter();

    let other = std::thread::spawn(|| Flow::active().is_none()).join().unwrap();
    assert!(other);
}

#[test]
fn test_duplicate_name_rejected() {
    let flow = Flow::new("F");
    Task::builder().name("a").flow(&flow).build().unwrap();

    let err = Task::builder().name("a").flow(&flow).retries(3u32).build().unwrap_err();
    assert!(matches!(err, TaskflowError::Config(_)), "got {err:?}");
    assert_eq!(flow.len(), 1);
    assert_eq!(flow.task("a").unwrap().retries(), Retries::Count(0));
}

#[test]
fn test_re_adding_same_task_is_noop() {
    let flow = Flow::new("F");
    let a = Task::builder().name("a").flow(&flow).build().unwrap();

    flow.add_task(&a).unwrap();
    assert_eq!(flow.len(), 1);
}

#[test]
fn test_add_task_from_other_flow_rejected() {
    let f1 = Flow::new("one");
    let f2 = Flow::new("two");
    let a = Task::builder().name("a").flow(&f1).build().unwrap();

    assert!(matches!(f2.add_task(&a), Err(TaskflowError::Config(_))));
    assert!(f2.is_empty());
}

#[test]
fn test_builder_configuration() {
    let flow = Flow::new("F");
    let task = Task::builder()
        .name("fetch")
        .flow(&flow)
        .retries(Retries::Unlimited)
        .retry_delay(Duration::from_secs(10))
        .trigger(Trigger::AnyFailed)
        .param("url", "https://example.com")
        .build()
        .unwrap();

    assert_eq!(task.retries(), Retries::Unlimited);
    assert_eq!(task.retry_delay(), Duration::from_secs(10));
    assert_eq!(task.trigger(), Trigger::AnyFailed);
    assert_eq!(task.params().unwrap()["url"], json!("https://example.com"));
}

#[tokio::test]
async fn test_run_invokes_handler() {
    let flow = Flow::new("F");
    let task = Task::builder().handler(my_fn()).flow(&flow).build().unwrap();

    let out = task.run(json!({ "x": 21 })).await.unwrap();
    assert_eq!(out, Some(json!({ "doubled": 42 })));
}

#[tokio::test]
async fn test_run_without_handler_is_noop() {
    let flow = Flow::new("F");
    let task = Task::builder().name("noop").flow(&flow).build().unwrap();

    assert_eq!(task.run(json!({ "ignored": true })).await.unwrap(), None);
}

#[tokio::test]
async fn test_run_surfaces_handler_errors() {
    let flow = Flow::new("F");
    let failing = Arc::new(FnHandler::new("boom", |_| Err(anyhow::anyhow!("exploded"))));
    let task = Task::builder().handler(failing).flow(&flow).build().unwrap();

    let err = task.run(json!(null)).await.unwrap_err();
    assert!(matches!(err, TaskflowError::Handler(_)));
    assert!(err.to_string().contains("exploded"));
}

#[tokio::test]
async fn test_builtin_echo() {
    let flow = Flow::new("F");
    let task = Task::builder().handler(Arc::new(EchoAction)).flow(&flow).build().unwrap();

    assert_eq!(task.name(), "echo");
    assert_eq!(task.run(json!([1, 2])).await.unwrap(), Some(json!([1, 2])));
}
