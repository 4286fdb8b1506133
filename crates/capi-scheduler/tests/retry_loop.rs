//! Retry loop tests against an in-process control plane.
//!
//! The fake control plane serves scripted cluster states and apply
//! outcomes and records every call, so the tests can assert how many
//! fetches a run made and which transitions it submitted.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use capi_core::{ComputingResources, Task};
use capi_scheduler::*;
use capi_state::*;

// ── Fakes ─────────────────────────────────────────────────────────

/// Serves queued responses; the last queued state repeats forever.
#[derive(Default)]
struct FakeControlPlane {
    states: Mutex<VecDeque<Result<ClusterState, ControlPlaneError>>>,
    applies: Mutex<VecDeque<Result<ApplyOutcome, ControlPlaneError>>>,
    submitted: Mutex<Vec<GroupTransition>>,
    fetches: AtomicU32,
}

impl FakeControlPlane {
    fn serving(state: ClusterState) -> Self {
        let fake = Self::default();
        fake.push_state(Ok(state));
        fake
    }

    fn push_state(&self, state: Result<ClusterState, ControlPlaneError>) {
        self.states.lock().unwrap().push_back(state);
    }

    fn push_apply(&self, outcome: Result<ApplyOutcome, ControlPlaneError>) {
        self.applies.lock().unwrap().push_back(outcome);
    }

    fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn submitted(&self) -> Vec<GroupTransition> {
        self.submitted.lock().unwrap().clone()
    }
}

impl ControlPlane for FakeControlPlane {
    fn get_state<'a>(&'a self, _: &'a StateFilter) -> ControlPlaneFuture<'a, ClusterState> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut states = self.states.lock().unwrap();
        let next = if states.len() > 1 {
            states.pop_front().unwrap()
        } else {
            states
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(ClusterState::default()))
        };
        Box::pin(async move { next })
    }

    fn apply<'a>(&'a self, group: &'a GroupTransition) -> ControlPlaneFuture<'a, ApplyOutcome> {
        self.submitted.lock().unwrap().push(group.clone());
        let next = self
            .applies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApplyOutcome::default()));
        Box::pin(async move { next })
    }
}

fn rejected(group_error: &str) -> impl Fn(&GroupTransition) -> ApplyOutcome + '_ {
    move |group| {
        ApplyOutcome::new(vec![GroupResult {
            group_id: group.group_id.clone(),
            error: Some(group_error.to_string()),
        }])
    }
}

/// Rejects every transition it sees.
struct RejectingControlPlane {
    inner: FakeControlPlane,
}

impl ControlPlane for RejectingControlPlane {
    fn get_state<'a>(&'a self, filter: &'a StateFilter) -> ControlPlaneFuture<'a, ClusterState> {
        self.inner.get_state(filter)
    }

    fn apply<'a>(&'a self, group: &'a GroupTransition) -> ControlPlaneFuture<'a, ApplyOutcome> {
        self.inner.submitted.lock().unwrap().push(group.clone());
        let outcome = rejected("etag mismatch")(group);
        Box::pin(async move { Ok(outcome) })
    }
}

/// Hands out a fixed identity except on the listed hosts.
struct FakeAllocator {
    failing: BTreeSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeAllocator {
    fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|h| h.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl NetworkAllocator for FakeAllocator {
    fn allocate<'a>(&'a self, _task: &'a Task, host_id: &'a str) -> AllocationFuture<'a> {
        self.calls.lock().unwrap().push(host_id.to_string());
        let result = if self.failing.contains(host_id) {
            Err(AllocationError::Backend(format!("address pool empty near {host_id}")))
        } else {
            Ok(NetworkIdentity {
                ip: "2a02:6b8::42".to_string(),
                hostname: "api-1.example".to_string(),
            })
        };
        Box::pin(async move { result })
    }
}

// ── Builders ──────────────────────────────────────────────────────

fn resources(cpu: u32, ram: u64) -> ComputingResources {
    ComputingResources {
        cpu_power_percents_core: cpu,
        ram_bytes: ram,
        ..Default::default()
    }
}

fn host(id: &str, etag: i64, health: HostHealth, cpu: u32, ram: u64) -> HostEntry {
    HostEntry {
        metadata: HostMetadata {
            id: id.to_string(),
            etag,
            health: HostHealthInfo { state: health },
            computing_resources: Some(resources(cpu, ram)),
            location: "dc1".to_string(),
        },
        workloads: Vec::new(),
    }
}

fn running(service: &str, cpu: u32, ram: u64) -> Workload {
    Workload {
        id: WorkloadId {
            slot: Slot {
                service: service.to_string(),
                host: "old.example".to_string(),
            },
            configuration: ConfigurationId {
                group_id: "bob_configuration_1".to_string(),
            },
        },
        owner: Owner {
            owner_id: "bob".to_string(),
            priority: 100,
            project_id: String::new(),
        },
        target_state: TARGET_ACTIVE.to_string(),
        entity: Entity::Instance(Instance {
            container: Container {
                id: "bob_1".to_string(),
                constraints: BTreeMap::new(),
                computing_resources: Some(resources(cpu, ram)),
            },
            volumes: Vec::new(),
            resources: BTreeMap::new(),
        }),
    }
}

fn state(hosts: Vec<HostEntry>) -> ClusterState {
    ClusterState { hosts }
}

fn task(cpu: u32, ram: u64) -> Task {
    Task::from_toml(&format!(
        r#"
owner = "alice"
project_id = "P"
service = "api"
version = "v1"

[resources]
cpu = {cpu}
ram = {ram}
"#
    ))
    .unwrap()
}

fn scheduler(
    control_plane: Arc<dyn ControlPlane>,
    allocator: Arc<dyn NetworkAllocator>,
    config: SchedulerConfig,
) -> RetryScheduler {
    RetryScheduler::new(control_plane, allocator, config)
        .unwrap()
        .with_ids(Arc::new(SeededIds::new(11)))
}

// ── Placement ─────────────────────────────────────────────────────

#[tokio::test]
async fn places_on_first_fitting_host() {
    let cp = Arc::new(FakeControlPlane::serving(state(vec![
        host("h1", 3, HostHealth::Up, 10, 10),
        host("h2", 5, HostHealth::Up, 100, 100),
        host("h3", 8, HostHealth::Up, 100, 100),
    ])));
    let alloc = Arc::new(FakeAllocator::new(&[]));
    let placement = scheduler(cp.clone(), alloc.clone(), SchedulerConfig::default())
        .run(&task(50, 50))
        .await
        .unwrap();

    assert_eq!(placement.host_id, "h2");
    assert_eq!(placement.etag, 5);
    assert_eq!(placement.attempts, 1);
    assert_eq!(placement.network.ip, "2a02:6b8::42");
    assert_eq!(cp.fetches(), 1);
    assert_eq!(alloc.calls(), vec!["h2"]);

    let submitted = cp.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].group_id, placement.group_id);
    assert_eq!(submitted[0].transitions[0].host_id, "h2");
    assert_eq!(submitted[0].transitions[0].host_state_etag, 5);
    assert_eq!(submitted[0].owner.priority, 100);
}

#[tokio::test]
async fn overloaded_host_is_not_selected() {
    let mut h1 = host("h1", 1, HostHealth::Up, 100, 100);
    h1.workloads.push(running("bob_db_v1", 40, 20));
    let cp = Arc::new(FakeControlPlane::serving(state(vec![h1])));
    let config = SchedulerConfig::default().with_retry_budget(1);

    let err = scheduler(cp.clone(), Arc::new(FakeAllocator::new(&[])), config)
        .run(&task(70, 10))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::RetryBudgetExhausted);
    assert_eq!(err.last_attempt_kind(), Some(FailureKind::NoMatchingHost));
    assert!(cp.submitted().is_empty());
}

#[tokio::test]
async fn unhealthy_hosts_are_never_chosen() {
    let cp = Arc::new(FakeControlPlane::serving(state(vec![
        host("down", 1, HostHealth::Down, 1000, 1000),
        host("maint", 1, HostHealth::Maintenance, 1000, 1000),
    ])));
    let alloc = Arc::new(FakeAllocator::new(&[]));
    let config = SchedulerConfig::default().with_retry_budget(2);

    let err = scheduler(cp.clone(), alloc.clone(), config)
        .run(&task(1, 1))
        .await
        .unwrap_err();

    assert_eq!(err.last_attempt_kind(), Some(FailureKind::NoMatchingHost));
    assert!(alloc.calls().is_empty());
    assert_eq!(cp.fetches(), 2);
}

// ── Retries ───────────────────────────────────────────────────────

#[tokio::test]
async fn stale_etag_is_retried_against_fresh_state() {
    let cp = Arc::new(FakeControlPlane::default());
    cp.push_state(Ok(state(vec![host("h1", 1, HostHealth::Up, 100, 100)])));
    cp.push_state(Ok(state(vec![host("h1", 2, HostHealth::Up, 100, 100)])));

    // First apply is rejected for whatever group it carries.
    let cp = Arc::new(StaleOnce {
        inner: cp,
        rejected: AtomicU32::new(0),
    });
    let placement = scheduler(cp.clone(), Arc::new(FakeAllocator::new(&[])), SchedulerConfig::default())
        .run(&task(10, 10))
        .await
        .unwrap();

    assert_eq!(placement.host_id, "h1");
    assert_eq!(placement.etag, 2);
    assert_eq!(placement.attempts, 2);
    assert_eq!(cp.inner.fetches(), 2);

    let submitted = cp.inner.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].transitions[0].host_state_etag, 1);
    assert_eq!(submitted[1].transitions[0].host_state_etag, 2);
    assert_ne!(submitted[0].group_id, submitted[1].group_id);
    assert_ne!(submitted[0].group_operation_id, submitted[1].group_operation_id);
}

/// Rejects the first transition with a stale-etag error.
struct StaleOnce {
    inner: Arc<FakeControlPlane>,
    rejected: AtomicU32,
}

impl ControlPlane for StaleOnce {
    fn get_state<'a>(&'a self, filter: &'a StateFilter) -> ControlPlaneFuture<'a, ClusterState> {
        self.inner.get_state(filter)
    }

    fn apply<'a>(&'a self, group: &'a GroupTransition) -> ControlPlaneFuture<'a, ApplyOutcome> {
        if self.rejected.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.submitted.lock().unwrap().push(group.clone());
            let outcome = rejected("host state etag mismatch")(group);
            return Box::pin(async move { Ok(outcome) });
        }
        self.inner.apply(group)
    }
}

#[tokio::test]
async fn allocation_failure_excludes_host() {
    let cp = Arc::new(FakeControlPlane::serving(state(vec![
        host("h1", 1, HostHealth::Up, 100, 100),
        host("h2", 1, HostHealth::Up, 100, 100),
    ])));
    let alloc = Arc::new(FakeAllocator::new(&["h1"]));

    let placement = scheduler(cp.clone(), alloc.clone(), SchedulerConfig::default())
        .run(&task(10, 10))
        .await
        .unwrap();

    assert_eq!(placement.host_id, "h2");
    assert_eq!(placement.attempts, 2);
    assert_eq!(alloc.calls(), vec!["h1", "h2"]);
    assert_eq!(cp.submitted().len(), 1);
}

#[tokio::test]
async fn allocation_failures_everywhere_end_in_no_matching_host() {
    let cp = Arc::new(FakeControlPlane::serving(state(vec![
        host("h1", 1, HostHealth::Up, 100, 100),
        host("h2", 1, HostHealth::Up, 100, 100),
    ])));
    let alloc = Arc::new(FakeAllocator::new(&["h1", "h2"]));
    let config = SchedulerConfig::default().with_retry_budget(5);

    let err = scheduler(cp.clone(), alloc.clone(), config)
        .run(&task(10, 10))
        .await
        .unwrap_err();

    let ScheduleError::RetryBudgetExhausted { attempts, failures } = err else {
        panic!("expected exhausted budget");
    };
    assert_eq!(attempts, 5);
    let kinds: Vec<FailureKind> = failures.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FailureKind::NetworkAllocationFailed,
            FailureKind::NetworkAllocationFailed,
            FailureKind::NoMatchingHost,
            FailureKind::NoMatchingHost,
            FailureKind::NoMatchingHost,
        ]
    );
    assert_eq!(alloc.calls(), vec!["h1", "h2"]);
    assert_eq!(cp.fetches(), 5);
}

#[tokio::test]
async fn apply_rejection_keeps_host_eligible_by_default() {
    let cp = Arc::new(RejectingControlPlane {
        inner: FakeControlPlane::serving(state(vec![
            host("h1", 1, HostHealth::Up, 100, 100),
            host("h2", 1, HostHealth::Up, 100, 100),
        ])),
    });
    let config = SchedulerConfig::default().with_retry_budget(3);

    let err = scheduler(cp.clone(), Arc::new(FakeAllocator::new(&[])), config)
        .run(&task(10, 10))
        .await
        .unwrap_err();

    assert_eq!(err.last_attempt_kind(), Some(FailureKind::StaleVersionToken));
    let hosts: Vec<String> = cp
        .inner
        .submitted()
        .iter()
        .map(|g| g.transitions[0].host_id.clone())
        .collect();
    assert_eq!(hosts, vec!["h1", "h1", "h1"]);
}

#[tokio::test]
async fn apply_rejection_excludes_host_when_configured() {
    let cp = Arc::new(RejectingControlPlane {
        inner: FakeControlPlane::serving(state(vec![
            host("h1", 1, HostHealth::Up, 100, 100),
            host("h2", 1, HostHealth::Up, 100, 100),
        ])),
    });
    let config = SchedulerConfig::default()
        .with_retry_budget(3)
        .with_exclude_on_apply_failure(true);

    let err = scheduler(cp.clone(), Arc::new(FakeAllocator::new(&[])), config)
        .run(&task(10, 10))
        .await
        .unwrap_err();

    assert_eq!(err.last_attempt_kind(), Some(FailureKind::NoMatchingHost));
    let hosts: Vec<String> = cp
        .inner
        .submitted()
        .iter()
        .map(|g| g.transitions[0].host_id.clone())
        .collect();
    assert_eq!(hosts, vec!["h1", "h2"]);
}

#[tokio::test]
async fn transport_failure_consumes_attempt_then_recovers() {
    let cp = Arc::new(FakeControlPlane::default());
    cp.push_state(Err(ControlPlaneError::transport("connection reset")));
    cp.push_state(Ok(state(vec![host("h1", 4, HostHealth::Up, 100, 100)])));

    let placement = scheduler(cp.clone(), Arc::new(FakeAllocator::new(&[])), SchedulerConfig::default())
        .run(&task(10, 10))
        .await
        .unwrap();

    assert_eq!(placement.attempts, 2);
    assert_eq!(cp.fetches(), 2);
}

#[tokio::test]
async fn apply_transport_failure_is_retried() {
    let cp = Arc::new(FakeControlPlane::serving(state(vec![host("h1", 1, HostHealth::Up, 100, 100)])));
    cp.push_apply(Err(ControlPlaneError::Transport {
        status: Some(503),
        message: "unavailable".to_string(),
    }));

    let placement = scheduler(cp.clone(), Arc::new(FakeAllocator::new(&[])), SchedulerConfig::default())
        .run(&task(10, 10))
        .await
        .unwrap();

    assert_eq!(placement.attempts, 2);
    assert_eq!(cp.submitted().len(), 2);
}

#[tokio::test]
async fn fetches_never_exceed_budget() {
    for budget in 1..=4 {
        let cp = Arc::new(FakeControlPlane::default());
        cp.push_state(Err(ControlPlaneError::transport("refused")));
        let config = SchedulerConfig::default().with_retry_budget(budget);

        let err = scheduler(cp.clone(), Arc::new(FakeAllocator::new(&[])), config)
            .run(&task(10, 10))
            .await
            .unwrap_err();

        assert_eq!(cp.fetches(), budget);
        assert_eq!(err.last_attempt_kind(), Some(FailureKind::TransportFailure));
    }
}

// ── Aborts ────────────────────────────────────────────────────────

#[tokio::test]
async fn undecodable_host_aborts_without_retry() {
    let mut broken = host("h1", 1, HostHealth::Up, 100, 100);
    broken.metadata.computing_resources = None;
    let cp = Arc::new(FakeControlPlane::serving(state(vec![broken])));

    let err = scheduler(cp.clone(), Arc::new(FakeAllocator::new(&[])), SchedulerConfig::default())
        .run(&task(10, 10))
        .await
        .unwrap_err();

    assert!(matches!(err, ScheduleError::Decode(_)));
    assert_eq!(cp.fetches(), 1);
}

#[tokio::test]
async fn undecodable_response_aborts_without_retry() {
    let cp = Arc::new(FakeControlPlane::default());
    cp.push_state(Err(ControlPlaneError::Decode("expected value at line 1".to_string())));

    let err = scheduler(cp.clone(), Arc::new(FakeAllocator::new(&[])), SchedulerConfig::default())
        .run(&task(10, 10))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::DecodeFailure);
    assert_eq!(cp.fetches(), 1);
}

// ── Teardown ──────────────────────────────────────────────────────

#[test]
fn locate_finds_task_workloads() {
    let mut h1 = host("h1", 1, HostHealth::Up, 100, 100);
    h1.workloads.push(running("alice_api_v1", 10, 10));
    h1.workloads.push(running("bob_db_v1", 10, 10));
    let mut h2 = host("h2", 2, HostHealth::Down, 100, 100);
    h2.workloads.push(running("alice_api_v1", 10, 10));

    let snapshot = build_snapshot(&state(vec![h1, h2]), Default::default()).unwrap();
    let found = locate_task(&snapshot, &task(10, 10));
    let hosts: Vec<&str> = found.iter().map(|l| l.host_id.as_str()).collect();
    assert_eq!(hosts, vec!["h1", "h2"]);
    assert_eq!(found[1].health, HostHealth::Down);
}

#[tokio::test]
async fn destroy_removes_running_workloads() {
    let mut h1 = host("h1", 6, HostHealth::Up, 100, 100);
    h1.workloads.push(running("alice_api_v1", 10, 10));
    h1.workloads.push(running("bob_db_v1", 10, 10));
    let h2 = host("h2", 2, HostHealth::Up, 100, 100);
    let cp = FakeControlPlane::serving(state(vec![h1, h2]));

    let teardown = destroy_task(&cp, &SeededIds::new(1), &task(1, 1), &StateFilter::all(), 100)
        .await
        .unwrap();

    assert_eq!(teardown.hosts, vec!["h1"]);
    assert_eq!(teardown.workloads, 1);
    let submitted = cp.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(Some(submitted[0].group_id.clone()), teardown.group_id);
    let transition = &submitted[0].transitions[0];
    assert_eq!(transition.host_state_etag, 6);
    assert_eq!(transition.workloads[0].target_state, TARGET_REMOVED);
    assert_eq!(transition.workloads[0].id.slot.service, "alice_api_v1");
}

#[tokio::test]
async fn destroy_with_nothing_running_submits_nothing() {
    let cp = FakeControlPlane::serving(state(vec![host("h1", 1, HostHealth::Up, 100, 100)]));
    let teardown = destroy_task(&cp, &SeededIds::new(1), &task(1, 1), &StateFilter::all(), 100)
        .await
        .unwrap();
    assert_eq!(teardown.group_id, None);
    assert!(cp.submitted().is_empty());
}

#[tokio::test]
async fn destroy_reports_rejection() {
    let mut h1 = host("h1", 1, HostHealth::Up, 100, 100);
    h1.workloads.push(running("alice_api_v1", 10, 10));
    let cp = RejectingControlPlane {
        inner: FakeControlPlane::serving(state(vec![h1])),
    };
    let err = destroy_task(&cp, &SeededIds::new(1), &task(1, 1), &StateFilter::all(), 100)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::StaleVersionToken);
}
