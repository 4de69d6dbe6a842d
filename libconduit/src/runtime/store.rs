//! The Store: owns a model, runs transitions and executes their commands

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::cmd::Cmd;
use crate::error::{ConduitError, Result};

/// Identifies an observer registered with [`Store::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer<Model> = Arc<dyn Fn(&Model) + Send + Sync>;
type Update<Model, Msg> = Box<dyn Fn(Msg, &Model) -> (Model, Cmd<Msg>) + Send + Sync>;

/// Shared handle to a running state machine.
///
/// Clones refer to the same model. When the last clone is dropped every
/// outstanding task is aborted and pending messages are discarded.
pub struct Store<Model, Msg> {
    inner: Arc<Inner<Model, Msg>>,
}

struct Inner<Model, Msg> {
    model: Mutex<Model>,
    update: Update<Model, Msg>,
    observers: Mutex<Vec<(SubscriptionId, Observer<Model>)>>,
    next_subscription: AtomicU64,
    published: watch::Sender<Model>,
    /// Messages waiting for the current dispatch loop
    queue: Mutex<VecDeque<Msg>>,
    /// Held by the thread running the dispatch loop
    turn: Mutex<()>,
    dispatching_on: Mutex<Option<ThreadId>>,
    mailbox: mpsc::UnboundedSender<Msg>,
    /// Spawned tasks whose message has not been applied yet
    in_flight: Arc<watch::Sender<usize>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    handle: Handle,
}

impl<Model, Msg> Clone for Store<Model, Msg> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Model, Msg> Store<Model, Msg>
where
    Model: Clone + Send + Sync + 'static,
    Msg: std::fmt::Debug + Send + 'static,
{
    /// Build a Store on the ambient tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ConduitError::Runtime` when called outside a tokio runtime.
    pub fn new<U>(model: Model, cmd: Cmd<Msg>, update: U) -> Result<Self>
    where
        U: Fn(Msg, &Model) -> (Model, Cmd<Msg>) + Send + Sync + 'static,
    {
        let handle = Handle::try_current()
            .map_err(|e| ConduitError::Runtime(format!("no tokio runtime for Store: {}", e)))?;
        Ok(Self::with_handle(handle, model, cmd, update))
    }

    /// Build a Store whose tasks run on `handle`
    pub fn with_handle<U>(handle: Handle, model: Model, cmd: Cmd<Msg>, update: U) -> Self
    where
        U: Fn(Msg, &Model) -> (Model, Cmd<Msg>) + Send + Sync + 'static,
    {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let (published, _) = watch::channel(model.clone());

        let store = Self {
            inner: Arc::new(Inner {
                model: Mutex::new(model),
                update: Box::new(update),
                observers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                published,
                queue: Mutex::new(VecDeque::new()),
                turn: Mutex::new(()),
                dispatching_on: Mutex::new(None),
                mailbox,
                in_flight: Arc::new(watch::channel(0).0),
                tasks: Mutex::new(Vec::new()),
                handle,
            }),
        };

        let delivery = store
            .inner
            .handle
            .spawn(deliver(Arc::downgrade(&store.inner), inbox));
        lock(&store.inner.tasks).push(delivery);

        store.execute(cmd);
        store
    }

    /// Run one transition, publish the result, then execute its command.
    ///
    /// Transitions are applied one at a time and every observer sees them in
    /// the order they were applied. A `send` made from an observer or a thunk
    /// is queued and runs once the current transition has been published and
    /// its command executed, before the outermost `send` returns.
    pub fn send(&self, msg: Msg) {
        lock(&self.inner.queue).push_back(msg);

        let current = thread::current().id();
        if *lock(&self.inner.dispatching_on) == Some(current) {
            return;
        }

        let _turn = lock(&self.inner.turn);
        let _dispatching = Dispatching::enter(&self.inner.dispatching_on, current);
        self.drain();
    }

    fn drain(&self) {
        loop {
            // The queue lock must be released before `step` runs
            let Some(msg) = lock(&self.inner.queue).pop_front() else {
                break;
            };
            self.step(msg);
        }
    }

    fn step(&self, msg: Msg) {
        tracing::trace!(?msg, "store transition");

        // Observers and commands may call back into `send`, so the model
        // lock is released before either runs.
        let (model, cmd) = {
            let mut current = lock(&self.inner.model);
            let (next, cmd) = (self.inner.update)(msg, &current);
            *current = next.clone();
            self.inner.published.send_replace(next.clone());
            (next, cmd)
        };

        self.notify(&model);
        self.execute(cmd);
    }

    /// Register `observer`. It is called at once with the current model and
    /// again after every transition.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&Model) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        let observer: Observer<Model> = Arc::new(observer);

        let current = thread::current().id();
        if *lock(&self.inner.dispatching_on) == Some(current) {
            lock(&self.inner.observers).push((id, Arc::clone(&observer)));
            observer(&self.model());
            return id;
        }

        // No publish may land between reading the model and registering
        let _turn = lock(&self.inner.turn);
        let _dispatching = Dispatching::enter(&self.inner.dispatching_on, current);
        lock(&self.inner.observers).push((id, Arc::clone(&observer)));
        observer(&self.model());
        self.drain();
        id
    }

    /// Returns false if `id` was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = lock(&self.inner.observers);
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        observers.len() != before
    }

    pub fn model(&self) -> Model {
        lock(&self.inner.model).clone()
    }

    /// Receiver that always holds the latest published model
    pub fn watch(&self) -> watch::Receiver<Model> {
        self.inner.published.subscribe()
    }

    /// Tasks spawned by this Store whose message has not been applied yet
    pub fn pending_tasks(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    /// Resolves once every spawned task has finished and its message, if
    /// any, has gone through `send`
    pub async fn settled(&self) {
        let mut in_flight = self.inner.in_flight.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = in_flight.wait_for(|count| *count == 0).await;
    }

    fn notify(&self, model: &Model) {
        let observers: Vec<Observer<Model>> = lock(&self.inner.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(model);
        }
    }

    fn execute(&self, cmd: Cmd<Msg>) {
        match cmd {
            Cmd::None => {}
            Cmd::Task(future) => {
                let mailbox = self.inner.mailbox.clone();
                let in_flight = Arc::clone(&self.inner.in_flight);
                in_flight.send_modify(|count| *count += 1);
                let task = self.inner.handle.spawn(async move {
                    match future.await {
                        // `deliver` settles the count once the message is applied
                        Some(msg) => {
                            if mailbox.send(msg).is_err() {
                                tracing::trace!("store dropped before task completed");
                            }
                        }
                        None => in_flight.send_modify(|count| *count -= 1),
                    }
                });
                let mut tasks = lock(&self.inner.tasks);
                tasks.retain(|task| !task.is_finished());
                tasks.push(task);
            }
            Cmd::Thunk(thunk) => thunk(),
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    self.execute(cmd);
                }
            }
        }
    }
}

/// Feed completed task output back into the Store, one message at a time
async fn deliver<Model, Msg>(store: Weak<Inner<Model, Msg>>, mut inbox: mpsc::UnboundedReceiver<Msg>)
where
    Model: Clone + Send + Sync + 'static,
    Msg: std::fmt::Debug + Send + 'static,
{
    while let Some(msg) = inbox.recv().await {
        let Some(inner) = store.upgrade() else {
            break;
        };
        let store = Store { inner };
        store.send(msg);
        store.inner.in_flight.send_modify(|count| *count -= 1);
    }
}

/// Marks the current thread as running the dispatch loop until dropped
struct Dispatching<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> Dispatching<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>, thread: ThreadId) -> Self {
        *lock(slot) = Some(thread);
        Self { slot }
    }
}

impl Drop for Dispatching<'_> {
    fn drop(&mut self) {
        *lock(self.slot) = None;
    }
}

impl<Model, Msg> Drop for Inner<Model, Msg> {
    fn drop(&mut self) {
        let tasks = std::mem::take(self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Msg {
        Add(i32),
        AddLater(i32),
    }

    fn update(msg: Msg, model: &i32) -> (i32, Cmd<Msg>) {
        match msg {
            Msg::Add(n) => (model + n, Cmd::none()),
            Msg::AddLater(n) => (*model, Cmd::perform(async move { Msg::Add(n) })),
        }
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        match Store::new(0, Cmd::none(), update) {
            Err(ConduitError::Runtime(_)) => {}
            Err(other) => panic!("expected Runtime error, got {:?}", other),
            Ok(_) => panic!("expected Runtime error, got a Store"),
        }
    }

    #[tokio::test]
    async fn test_send_replaces_model() {
        let store = Store::new(1, Cmd::none(), update).unwrap();
        store.send(Msg::Add(2));
        assert_eq!(store.model(), 3);
        assert_eq!(*store.watch().borrow(), 3);
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_id() {
        let store = Store::new(0, Cmd::none(), update).unwrap();
        let id = store.subscribe(|_| {});
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
    }

    #[tokio::test]
    async fn test_task_result_is_delivered() {
        let store = Store::new(0, Cmd::none(), update).unwrap();
        let mut rx = store.watch();

        store.send(Msg::AddLater(5));
        let value = *rx.wait_for(|model| *model == 5).await.unwrap();
        assert_eq!(value, 5);
    }
}
