use mesh_core::testing::RecordingConnection;
use mesh_core::{Connection, ConnectionId};
use shared::codec;
use shared::messages::{ErrorPayload, Message};
use shared::types::{PeerId, Task, TaskStatus};
use task_board::engine::TASK_NOT_AVAILABLE;
use task_board::{Notice, ProtocolEngine, Role};

/// A worker engine joined to the admin over a pair of recording connections.
struct Worker {
    engine: ProtocolEngine<RecordingConnection>,
    peer_id: PeerId,
    /// What the admin wrote towards this worker.
    from_admin: RecordingConnection,
    /// What this worker wrote towards the admin.
    to_admin: RecordingConnection,
}

const ADMIN_LINK: ConnectionId = ConnectionId(1);

fn join(admin: &mut ProtocolEngine<RecordingConnection>, link: u64, name: &str) -> Worker {
    let from_admin = RecordingConnection::new(link);
    let to_admin = RecordingConnection::new(ADMIN_LINK.0);
    let peer_id = PeerId::new(name);

    let mut engine = ProtocolEngine::new(Role::Worker);
    engine.on_connect(to_admin.clone(), PeerId::new("admin000"));
    admin.on_connect(from_admin.clone(), peer_id.clone());

    Worker { engine, peer_id, from_admin, to_admin }
}

/// Delivers everything the admin has queued for `worker`.
fn deliver_to_worker(worker: &mut Worker) -> Vec<Notice> {
    let frames = worker.from_admin.frames();
    worker.from_admin.clear();
    frames
        .iter()
        .filter_map(|frame| worker.engine.on_frame(ADMIN_LINK, frame.as_bytes()))
        .collect()
}

/// Delivers everything `worker` has queued for the admin.
fn deliver_to_admin(admin: &mut ProtocolEngine<RecordingConnection>, worker: &Worker) -> Vec<Notice> {
    let frames = worker.to_admin.frames();
    worker.to_admin.clear();
    frames
        .iter()
        .filter_map(|frame| admin.on_frame(worker.from_admin_id(), frame.as_bytes()))
        .collect()
}

impl Worker {
    fn from_admin_id(&self) -> ConnectionId {
        self.from_admin.id()
    }

    fn cached(&self, task: &Task) -> Task {
        self.engine.store().get(&task.id).cloned().expect("task mirrored")
    }
}

fn assert_consistent(engine: &ProtocolEngine<RecordingConnection>) {
    for task in engine.list_tasks() {
        assert!(task.is_consistent(), "inconsistent task: {:?}", task);
    }
}

#[test]
fn claim_conflict_and_completion() {
    let mut admin = ProtocolEngine::new(Role::Admin);
    let mut a = join(&mut admin, 10, "aaaa1111");
    let mut b = join(&mut admin, 11, "bbbb2222");
    deliver_to_worker(&mut a);
    deliver_to_worker(&mut b);

    let task = admin.post_task("Sort crates", "by size").unwrap();
    assert_eq!(task.status, TaskStatus::Open);
    assert_eq!(task.claimed_by, None);
    assert_eq!(deliver_to_worker(&mut a), vec![Notice::Posted(task.clone())]);
    deliver_to_worker(&mut b);

    a.engine.claim_task(task.id.clone()).unwrap();
    assert_eq!(a.cached(&task).status, TaskStatus::Open);
    let notices = deliver_to_admin(&mut admin, &a);
    assert!(matches!(notices.as_slice(), [Notice::Claimed(_)]));

    let claimed = admin.store().get(&task.id).cloned().unwrap();
    assert_eq!(claimed.status, TaskStatus::Claimed);
    assert_eq!(claimed.claimed_by, Some(a.peer_id.clone()));
    assert_consistent(&admin);

    // A confirms its own claim through the same broadcast B sees.
    deliver_to_worker(&mut a);
    deliver_to_worker(&mut b);
    assert_eq!(a.cached(&task), claimed);
    assert_eq!(b.cached(&task), claimed);

    b.engine.claim_task(task.id.clone()).unwrap();
    assert!(deliver_to_admin(&mut admin, &b).is_empty());
    assert_eq!(
        b.from_admin.messages(),
        vec![Message::Error(ErrorPayload { message: TASK_NOT_AVAILABLE.into() })]
    );
    assert!(a.from_admin.frames().is_empty());
    assert_eq!(deliver_to_worker(&mut b), vec![Notice::Rejected(TASK_NOT_AVAILABLE.into())]);

    a.engine.complete_task(task.id.clone()).unwrap();
    let notices = deliver_to_admin(&mut admin, &a);
    assert!(matches!(notices.as_slice(), [Notice::Completed(_)]));

    let done = admin.store().get(&task.id).cloned().unwrap();
    assert_eq!(done.status, TaskStatus::Done);
    assert!(done.completed_at.is_some());
    assert_eq!(a.from_admin.messages(), vec![Message::TaskUpdate(done.clone())]);
    assert_eq!(b.from_admin.messages(), vec![Message::TaskUpdate(done.clone())]);

    deliver_to_worker(&mut a);
    deliver_to_worker(&mut b);
    assert_eq!(a.cached(&task), done);
    assert_eq!(b.cached(&task), done);
    assert_consistent(&a.engine);
    assert_consistent(&b.engine);
}

#[test]
fn racing_claims_have_one_winner() {
    let mut admin = ProtocolEngine::new(Role::Admin);
    let mut w1 = join(&mut admin, 10, "w1w1w1w1");
    let mut w2 = join(&mut admin, 11, "w2w2w2w2");
    let task = admin.post_task("Race", "").unwrap();
    deliver_to_worker(&mut w1);
    deliver_to_worker(&mut w2);

    w1.engine.claim_task(task.id.clone()).unwrap();
    w2.engine.claim_task(task.id.clone()).unwrap();
    deliver_to_admin(&mut admin, &w2);
    deliver_to_admin(&mut admin, &w1);

    let held = admin.store().get(&task.id).unwrap();
    assert_eq!(held.claimed_by, Some(w2.peer_id.clone()));

    let errors: Vec<_> = w1
        .from_admin
        .messages()
        .into_iter()
        .filter(|m| matches!(m, Message::Error(_)))
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(w2.from_admin.messages().iter().all(|m| !matches!(m, Message::Error(_))));
}

#[test]
fn completion_by_another_peer_is_silently_ignored() {
    let mut admin = ProtocolEngine::new(Role::Admin);
    let mut owner = join(&mut admin, 10, "owner000");
    let mut other = join(&mut admin, 11, "other000");
    let task = admin.post_task("Guarded", "").unwrap();
    owner.engine.claim_task(task.id.clone()).unwrap();
    deliver_to_admin(&mut admin, &owner);
    deliver_to_worker(&mut owner);
    deliver_to_worker(&mut other);

    other.engine.complete_task(task.id.clone()).unwrap();
    assert!(deliver_to_admin(&mut admin, &other).is_empty());

    assert_eq!(admin.store().get(&task.id).unwrap().status, TaskStatus::Claimed);
    assert!(other.from_admin.frames().is_empty());
    assert!(owner.from_admin.frames().is_empty());

    // Completing an open task is also a no-op.
    let open = admin.post_task("Untouched", "").unwrap();
    deliver_to_worker(&mut owner);
    owner.engine.complete_task(open.id.clone()).unwrap();
    deliver_to_admin(&mut admin, &owner);
    assert_eq!(admin.store().get(&open.id).unwrap().status, TaskStatus::Open);
}

#[test]
fn late_joiner_gets_one_snapshot_first() {
    let mut admin = ProtocolEngine::new(Role::Admin);
    let early = join(&mut admin, 10, "early000");
    let first = admin.post_task("First", "").unwrap();
    let second = admin.post_task("Second", "").unwrap();
    early.engine.claim_task(first.id.clone()).unwrap();
    deliver_to_admin(&mut admin, &early);

    let mut late = join(&mut admin, 11, "late0000");
    let snapshot = late.from_admin.messages();
    assert_eq!(snapshot.len(), 1);
    match &snapshot[0] {
        Message::TaskList(tasks) => {
            let ids: Vec<_> = tasks.iter().map(|t| t.id.clone()).collect();
            assert_eq!(ids, vec![first.id.clone(), second.id.clone()]);
            assert_eq!(tasks[0].status, TaskStatus::Claimed);
        }
        other => panic!("expected task_list, got {:?}", other),
    }

    early.engine.complete_task(first.id.clone()).unwrap();
    deliver_to_admin(&mut admin, &early);
    let kinds: Vec<_> = late.from_admin.messages().iter().map(|m| m.kind()).collect();
    assert_eq!(kinds, vec!["task_list", "task_update"]);

    let notices = deliver_to_worker(&mut late);
    assert_eq!(notices[0], Notice::Synced(2));
    assert_eq!(late.engine.list_tasks().len(), 2);
    assert_eq!(late.cached(&first).status, TaskStatus::Done);
}

#[test]
fn last_update_wins_on_worker() {
    let mut worker = ProtocolEngine::new(Role::Worker);
    worker.on_connect(RecordingConnection::new(1), PeerId::new("admin000"));

    let mut task = Task::open(shared::types::TaskId::new("task-1-5"), "T".into(), "D".into());
    let posted = codec::encode(&Message::NewTask(task.clone())).unwrap();
    task.status = TaskStatus::Claimed;
    task.claimed_by = Some(PeerId::new("w1w1w1w1"));
    let updated = codec::encode(&Message::TaskUpdate(task.clone())).unwrap();

    worker.on_frame(ConnectionId(1), posted.as_bytes());
    worker.on_frame(ConnectionId(1), updated.as_bytes());

    assert_eq!(worker.store().get(&task.id), Some(&task));
    assert_eq!(worker.list_tasks().len(), 1);
}

#[test]
fn disconnected_worker_stops_receiving_broadcasts() {
    let mut admin = ProtocolEngine::new(Role::Admin);
    let gone = join(&mut admin, 10, "gone0000");
    let stay = join(&mut admin, 11, "stay0000");
    gone.from_admin.clear();
    stay.from_admin.clear();

    assert_eq!(admin.on_disconnect(ConnectionId(10)), Some(Notice::PeerLeft(gone.peer_id.clone())));
    admin.post_task("After", "").unwrap();

    assert!(gone.from_admin.frames().is_empty());
    assert_eq!(stay.from_admin.messages().len(), 1);
}
