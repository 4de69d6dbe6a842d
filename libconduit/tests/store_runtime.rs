//! Store runtime behaviour: publishing, command execution, delivery order
//! and teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use libconduit::runtime::{Cmd, Store};
use libconduit::ConduitError;

#[derive(Debug)]
enum Msg {
    Set(i32),
    SetLater(i32, Duration),
    Log(&'static str),
    Hang,
}

type Log = Arc<Mutex<Vec<String>>>;

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn counter_store(log: Log, dropped: Arc<AtomicBool>) -> Store<i32, Msg> {
    Store::new(0, Cmd::none(), move |msg, model: &i32| match msg {
        Msg::Set(n) => (n, Cmd::none()),
        Msg::SetLater(n, delay) => (
            *model,
            Cmd::perform(async move {
                tokio::time::sleep(delay).await;
                Msg::Set(n)
            }),
        ),
        Msg::Log(entry) => {
            let log = Arc::clone(&log);
            (
                *model + 1,
                Cmd::thunk(move || log.lock().unwrap().push(entry.to_string())),
            )
        }
        Msg::Hang => {
            let dropped = Arc::clone(&dropped);
            (
                *model,
                Cmd::perform(async move {
                    let _flag = DropFlag(dropped);
                    futures::future::pending::<()>().await;
                    Msg::Set(-1)
                }),
            )
        }
    })
    .unwrap()
}

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn test_store_requires_runtime() {
    let result = Store::<i32, Msg>::new(0, Cmd::none(), |_, model: &i32| (*model, Cmd::none()));
    assert!(matches!(result, Err(ConduitError::Runtime(_))));
}

#[tokio::test]
async fn test_observer_sees_current_then_every_publish() {
    let store = counter_store(new_log(), Arc::new(AtomicBool::new(false)));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    store.subscribe(move |model| sink.lock().unwrap().push(*model));

    store.send(Msg::Set(3));
    store.send(Msg::Set(7));

    assert_eq!(*seen.lock().unwrap(), vec![0, 3, 7]);
}

#[tokio::test]
async fn test_unsubscribed_observer_stops_receiving() {
    let store = counter_store(new_log(), Arc::new(AtomicBool::new(false)));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let id = store.subscribe(move |model| sink.lock().unwrap().push(*model));
    store.send(Msg::Set(1));
    assert!(store.unsubscribe(id));
    store.send(Msg::Set(2));

    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
}

#[tokio::test]
async fn test_command_runs_after_publish() {
    let log = new_log();
    let store = counter_store(Arc::clone(&log), Arc::new(AtomicBool::new(false)));

    let observer_log = Arc::clone(&log);
    store.subscribe(move |model| observer_log.lock().unwrap().push(format!("publish {}", model)));

    store.send(Msg::Log("thunk"));

    assert_eq!(*log.lock().unwrap(), vec!["publish 0", "publish 1", "thunk"]);
}

#[tokio::test]
async fn test_batch_runs_children_in_order() {
    let order = new_log();
    let recorder = Arc::clone(&order);

    let store: Store<u8, &'static str> = Store::new(0, Cmd::none(), move |msg, model: &u8| {
        let cmds = (1..=3).map(|i| {
            let recorder = Arc::clone(&recorder);
            Cmd::thunk(move || recorder.lock().unwrap().push(format!("{}-{}", msg, i)))
        });
        (*model, Cmd::batch(cmds))
    })
    .unwrap();

    store.send("go");
    assert_eq!(*order.lock().unwrap(), vec!["go-1", "go-2", "go-3"]);
}

#[tokio::test]
async fn test_reentrant_send_from_thunk() {
    let slot: Arc<Mutex<Option<Store<i32, i32>>>> = Arc::new(Mutex::new(None));
    let handle = Arc::clone(&slot);

    let store = Store::new(0, Cmd::none(), move |msg: i32, _model: &i32| {
        if msg < 3 {
            let handle = Arc::clone(&handle);
            let next = msg + 1;
            (
                msg,
                Cmd::thunk(move || {
                    let store = handle.lock().unwrap().clone();
                    if let Some(store) = store {
                        store.send(next);
                    }
                }),
            )
        } else {
            (msg, Cmd::none())
        }
    })
    .unwrap();
    *slot.lock().unwrap() = Some(store.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.subscribe(move |model| sink.lock().unwrap().push(*model));

    store.send(1);
    assert_eq!(store.model(), 3);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);

    // Break the cycle so the Store can be torn down
    slot.lock().unwrap().take();
}

#[tokio::test]
async fn test_observer_send_is_published_after_current_model() {
    let store: Store<i32, i32> = Store::new(0, Cmd::none(), |msg, _model: &i32| (msg, Cmd::none())).unwrap();

    let sender = store.clone();
    let forwarding = store.subscribe(move |model| {
        if *model == 1 {
            sender.send(2);
        }
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.subscribe(move |model| sink.lock().unwrap().push(*model));

    store.send(1);

    assert_eq!(store.model(), 2);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(*store.watch().borrow(), 2);

    // The forwarding observer holds a clone of the Store
    store.unsubscribe(forwarding);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_publish_in_apply_order() {
    let store: Store<u32, u32> =
        Store::new(0, Cmd::none(), |msg, model: &u32| (model + msg, Cmd::none())).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.subscribe(move |model| sink.lock().unwrap().push(*model));

    let senders: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    store.send(1);
                }
            })
        })
        .collect();
    for sender in senders {
        sender.await.unwrap();
    }

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, (0..=200).collect::<Vec<u32>>());
    assert_eq!(store.model(), 200);
}

#[tokio::test]
async fn test_settled_waits_for_delivered_message() {
    let store = counter_store(new_log(), Arc::new(AtomicBool::new(false)));

    store.send(Msg::SetLater(4, Duration::from_millis(20)));
    assert_eq!(store.pending_tasks(), 1);

    tokio::time::timeout(Duration::from_secs(2), store.settled())
        .await
        .expect("store never settled");
    assert_eq!(store.model(), 4);
    assert_eq!(store.pending_tasks(), 0);
}

#[tokio::test]
async fn test_settled_with_nothing_in_flight() {
    let store = counter_store(new_log(), Arc::new(AtomicBool::new(false)));

    tokio::time::timeout(Duration::from_secs(2), store.settled())
        .await
        .expect("idle store did not settle");
}

#[tokio::test]
async fn test_initial_command_is_executed() {
    let store: Store<i32, i32> = Store::new(
        0,
        Cmd::perform(async { 42 }),
        |msg, _model: &i32| (msg, Cmd::none()),
    )
    .unwrap();

    let mut rx = store.watch();
    let value = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|m| *m == 42))
        .await
        .expect("initial command never delivered")
        .map(|v| *v)
        .unwrap();
    assert_eq!(value, 42);
}

#[tokio::test]
async fn test_async_results_are_delivered() {
    let store = counter_store(new_log(), Arc::new(AtomicBool::new(false)));
    let mut rx = store.watch();

    store.send(Msg::SetLater(9, Duration::from_millis(5)));
    assert_eq!(store.model(), 0);

    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|m| *m == 9))
        .await
        .expect("task result never delivered")
        .unwrap();
    assert_eq!(store.model(), 9);
}

#[tokio::test]
async fn test_dropping_store_aborts_outstanding_tasks() {
    let dropped = Arc::new(AtomicBool::new(false));
    let store = counter_store(new_log(), Arc::clone(&dropped));

    store.send(Msg::Hang);
    assert_eq!(store.pending_tasks(), 1);
    assert!(!dropped.load(Ordering::SeqCst));

    drop(store);

    for _ in 0..100 {
        if dropped.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(dropped.load(Ordering::SeqCst), "hung task was not aborted");
}

#[tokio::test]
async fn test_clones_share_one_model() {
    let store = counter_store(new_log(), Arc::new(AtomicBool::new(false)));
    let other = store.clone();

    other.send(Msg::Set(5));
    assert_eq!(store.model(), 5);
}
