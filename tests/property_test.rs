use std::collections::{HashMap, HashSet};
use std::time::Duration;

use proptest::prelude::*;
use taskflow::{Flow, Retries, Task, TaskCodec, TaskState, Trigger};

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

fn flow_id_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,8}(/[a-z0-9]{1,4})?"
}

fn retries_strategy() -> impl Strategy<Value = Retries> {
    prop_oneof![
        (0u32..100).prop_map(Retries::Count),
        Just(Retries::Unlimited),
    ]
}

// Acyclic by construction: task N only ever runs after tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    let valid: HashSet<usize> = deps
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| d % i.max(1))
                        .collect();
                    valid.into_iter().collect()
                })
                .collect()
        })
    })
}

fn build_dag(deps: &[Vec<usize>]) -> (Flow, Vec<Task>) {
    let flow = Flow::new("dag");
    let tasks: Vec<Task> = (0..deps.len())
        .map(|i| Task::builder().name(format!("task_{i}")).flow(&flow).build().unwrap())
        .collect();
    for (i, upstream) in deps.iter().enumerate() {
        for &u in upstream {
            tasks[i].run_after([&tasks[u]]);
        }
    }
    (flow, tasks)
}

proptest! {
    #[test]
    fn test_task_id_law(flow_id in flow_id_strategy(), name in name_strategy()) {
        let flow = Flow::new(flow_id.clone());
        let task = Task::builder().name(name.clone()).flow(&flow).build().unwrap();

        prop_assert_eq!(task.id(), format!("{flow_id}/{name}"));
        prop_assert!(flow.task_by_id(task.id()).is_some());
    }

    #[test]
    fn test_serialize_round_trip(
        flow_id in flow_id_strategy(),
        name in name_strategy(),
        retries in retries_strategy(),
        delay_secs in 0u64..100_000,
        trigger in proptest::sample::select(Trigger::ALL.to_vec()),
        limit in any::<i64>(),
    ) {
        let flow = Flow::new(flow_id);
        let task = Task::builder()
            .name(name)
            .flow(&flow)
            .retries(retries)
            .retry_delay(Duration::from_secs(delay_secs))
            .trigger(trigger)
            .param("limit", limit)
            .build()
            .unwrap();

        let decoded = Task::from_serialized(&task.serialize().unwrap(), &TaskCodec::default()).unwrap();
        prop_assert_eq!(decoded, task);
    }

    #[test]
    fn test_acyclic_flows_validate_in_order(deps in dag_strategy(12)) {
        let (flow, _) = build_dag(&deps);

        prop_assert!(flow.validate().is_ok());
        let order = flow.topological_order().unwrap();
        prop_assert_eq!(order.len(), deps.len());

        let position: HashMap<String, usize> = order
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id().to_string(), i))
            .collect();
        for edge in flow.edges() {
            prop_assert!(position[&edge.before] < position[&edge.after]);
        }
    }

    #[test]
    fn test_all_success_drains_every_task(deps in dag_strategy(12)) {
        let (flow, tasks) = build_dag(&deps);
        let mut states: HashMap<String, TaskState> = HashMap::new();

        for _ in 0..=tasks.len() {
            let ready = flow.ready_tasks(&states);
            if ready.is_empty() {
                break;
            }
            for task in ready {
                for upstream in flow.upstream_ids(task.id()) {
                    prop_assert_eq!(states.get(&upstream), Some(&TaskState::Success));
                }
                states.insert(task.id().to_string(), TaskState::Success);
            }
        }

        prop_assert_eq!(states.len(), tasks.len());
    }
}
