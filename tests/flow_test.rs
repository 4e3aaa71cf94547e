use taskflow::{Edge, Flow, Task, TaskState, TaskflowError, Trigger};
use std::collections::HashMap;

fn task(flow: &Flow, name: &str) -> Task {
    Task::builder().name(name).flow(flow).build().unwrap()
}

fn states(pairs: &[(&str, TaskState)]) -> HashMap<String, TaskState> {
    pairs.iter().map(|(id, s)| (id.to_string(), *s)).collect()
}

#[test]
fn test_run_before_records_edge() {
    let flow = Flow::new("F");
    let a = task(&flow, "a");
    let b = task(&flow, "b");

    a.run_before([&b]);

    assert_eq!(flow.edges(), vec![Edge::new("F/a", "F/b")]);
    assert_eq!(flow.upstream_ids("F/b"), vec!["F/a".to_string()]);
    assert_eq!(flow.downstream_ids("F/a"), vec!["F/b".to_string()]);
}

#[test]
fn test_run_before_and_run_after_are_equivalent() {
    let f1 = Flow::new("F");
    let a1 = task(&f1, "a");
    let b1 = task(&f1, "b");
    a1.run_before([&b1]);

    let f2 = Flow::new("F");
    let a2 = task(&f2, "a");
    let b2 = task(&f2, "b");
    b2.run_after([&a2]);

    assert_eq!(f1.edges(), f2.edges());
}

#[test]
fn test_multiple_targets() {
    let flow = Flow::new("F");
    let a = task(&flow, "a");
    let b = task(&flow, "b");
    let c = task(&flow, "c");
    let d = task(&flow, "d");

    a.run_before([&b, &c]);
    d.run_after(vec![&b, &c]);

    assert_eq!(
        flow.edges(),
        vec![
            Edge::new("F/a", "F/b"),
            Edge::new("F/a", "F/c"),
            Edge::new("F/b", "F/d"),
            Edge::new("F/c", "F/d"),
        ]
    );
}

#[test]
fn test_operator_sugar_matches_named_methods() {
    let flow = Flow::new("F");
    let a = task(&flow, "a");
    let b = task(&flow, "b");
    let c = task(&flow, "c");
    let d = task(&flow, "d");

    let _ = &a >> &b >> &c;
    let _ = &d << &c;

    let named = Flow::new("F");
    let na = task(&named, "a");
    let nb = task(&named, "b");
    let nc = task(&named, "c");
    let nd = task(&named, "d");
    na.run_before([&nb]);
    nb.run_before([&nc]);
    nd.run_after([&nc]);

    assert_eq!(flow.edges(), named.edges());
}

#[test]
fn test_pipe_operator_is_run_before() {
    let flow = Flow::new("F");
    let a = task(&flow, "a");
    let b = task(&flow, "b");

    let _ = &a | &b;

    assert_eq!(flow.edges(), vec![Edge::new("F/a", "F/b")]);
}

#[test]
fn test_duplicate_edges_are_recorded_once() {
    let flow = Flow::new("F");
    let a = task(&flow, "a");
    let b = task(&flow, "b");

    a.run_before([&b]);
    b.run_after([&a]);
    let _ = &a >> &b;

    assert_eq!(flow.edges().len(), 1);
}

#[test]
fn test_self_loop_is_recorded_and_rejected_by_validate() {
    let flow = Flow::new("F");
    let a = task(&flow, "a");

    a.run_before([&a]);
    assert_eq!(flow.edges(), vec![Edge::new("F/a", "F/a")]);

    match flow.validate() {
        Err(TaskflowError::Cycle { flow, task }) => {
            assert_eq!(flow, "F");
            assert_eq!(task, "F/a");
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn test_cycle_is_recorded_and_rejected_by_validate() {
    let flow = Flow::new("F");
    let a = task(&flow, "a");
    let b = task(&flow, "b");
    let c = task(&flow, "c");

    let _ = &a >> &b >> &c;
    c.run_before([&a]);

    assert_eq!(flow.edges().len(), 3);
    assert!(matches!(flow.validate(), Err(TaskflowError::Cycle { .. })));
}

#[test]
fn test_edge_to_foreign_task_fails_validation() {
    let f1 = Flow::new("one");
    let f2 = Flow::new("two");
    let a = task(&f1, "a");
    let x = task(&f2, "x");

    a.run_before([&x]);

    assert_eq!(f1.edges(), vec![Edge::new("one/a", "two/x")]);
    assert!(f2.edges().is_empty());
    assert!(matches!(f1.validate(), Err(TaskflowError::Config(_))));
}

#[test]
fn test_topological_order() {
    let flow = Flow::new("F");
    let extract = task(&flow, "extract");
    let transform = task(&flow, "transform");
    let load = task(&flow, "load");
    let report = task(&flow, "report");

    load.run_after([&transform]);
    transform.run_after([&extract]);
    report.run_after([&load, &extract]);

    flow.validate().unwrap();
    let order: Vec<String> = flow
        .topological_order()
        .unwrap()
        .iter()
        .map(|t| t.name().to_string())
        .collect();

    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert_eq!(order.len(), 4);
    assert!(pos("extract") < pos("transform"));
    assert!(pos("transform") < pos("load"));
    assert!(pos("load") < pos("report"));
}

#[test]
fn test_scenario_active_flow_and_edges() {
    let flow = Flow::new("F");
    let _guard = flow.enter();

    let a = Task::builder().name("a").flow(&flow).build().unwrap();
    let b = Task::builder().name("b").flow(&flow).build().unwrap();
    a.run_before([&b]);

    assert_eq!(flow.edges(), vec![Edge::new("F/a", "F/b")]);
    assert_eq!(a.id(), "F/a");
    assert_eq!(b.id(), "F/b");
}

#[test]
fn test_default_trigger_readiness() {
    let flow = Flow::new("F");
    let up1 = task(&flow, "up1");
    let up2 = task(&flow, "up2");
    let down = task(&flow, "down");
    down.run_after([&up1, &up2]);

    let ok = states(&[("F/up1", TaskState::Success), ("F/up2", TaskState::Success)]);
    assert!(flow.is_ready(&down, &ok));

    let one_failed = states(&[("F/up1", TaskState::Success), ("F/up2", TaskState::Failed)]);
    assert!(!flow.is_ready(&down, &one_failed));

    let missing = states(&[("F/up1", TaskState::Success)]);
    assert!(!flow.is_ready(&down, &missing));

    assert!(flow.is_ready(&up1, &HashMap::new()));
}

#[test]
fn test_custom_trigger_readiness() {
    let flow = Flow::new("F");
    let work = task(&flow, "work");
    let cleanup = Task::builder()
        .name("cleanup")
        .flow(&flow)
        .trigger(Trigger::AllFinished)
        .build()
        .unwrap();
    let alert = Task::builder()
        .name("alert")
        .flow(&flow)
        .trigger(Trigger::AnyFailed)
        .build()
        .unwrap();
    work.run_before([&cleanup, &alert]);

    let failed = states(&[("F/work", TaskState::Failed)]);
    assert!(flow.is_ready(&cleanup, &failed));
    assert!(flow.is_ready(&alert, &failed));

    let running = states(&[("F/work", TaskState::Running)]);
    assert!(!flow.is_ready(&cleanup, &running));
    assert!(!flow.is_ready(&alert, &running));
}

#[test]
fn test_ready_tasks() {
    let flow = Flow::new("F");
    let a = task(&flow, "a");
    let b = task(&flow, "b");
    let c = task(&flow, "c");
    Task::builder()
        .name("manual")
        .flow(&flow)
        .trigger(Trigger::ManualOnly)
        .build()
        .unwrap();
    let _ = &a >> &b >> &c;

    let names = |s: &HashMap<String, TaskState>| -> Vec<String> {
        flow.ready_tasks(s).iter().map(|t| t.name().to_string()).collect()
    };

    assert_eq!(names(&HashMap::new()), vec!["a"]);
    assert_eq!(names(&states(&[("F/a", TaskState::Success)])), vec!["b"]);
    assert_eq!(
        names(&states(&[("F/a", TaskState::Success), ("F/b", TaskState::Skipped)])),
        vec!["c"]
    );
    assert!(names(&states(&[("F/a", TaskState::Failed)])).is_empty());
}

#[test]
fn test_lookup_by_id() {
    let flow = Flow::new("team/etl");
    let a = task(&flow, "a");

    assert_eq!(a.id(), "team/etl/a");
    assert!(flow.task_by_id("team/etl/a").unwrap().same_task(&a));
    assert!(flow.task_by_id("team/etl").is_none());
    assert!(flow.task_by_id("other/a").is_none());
}

#[test]
fn test_generated_flow_ids_are_unique() {
    let f1 = Flow::with_generated_id();
    let f2 = Flow::with_generated_id();

    assert!(f1.id().starts_with("flow-"));
    assert_ne!(f1, f2);
}
