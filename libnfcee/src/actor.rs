// libnfcee-rs/libnfcee/src/actor.rs
//! Tokio front-end (feature `async`).
//!
//! The manager runs on its own task and drains an unbounded channel, so
//! application code, transport readers and timers all talk to it through
//! [`ManagerHandle`]. Timers are tokio sleeps that post
//! [`Message::TimerExpired`] back into the same channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, trace};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender, WeakUnboundedSender};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::dispatch::Message;
use crate::manager::Manager;
use crate::timer::{Scheduler, TimerId};
use crate::transport::NciTransport;
use crate::{Error, Result};

/// Generation of the live arm per timer; absent when disarmed.
type Generations = Arc<Mutex<HashMap<TimerId, u64>>>;

/// [`Scheduler`] backed by tokio sleeps.
pub struct TokioScheduler {
    tx: WeakUnboundedSender<Message>,
    runtime: Handle,
    live: Generations,
    tasks: HashMap<TimerId, JoinHandle<()>>,
    next_gen: u64,
}

impl TokioScheduler {
    /// Deliver expiries to `tx`, sleeping on `runtime`.
    pub fn new(tx: &UnboundedSender<Message>, runtime: Handle) -> Self {
        Self {
            tx: tx.downgrade(),
            runtime,
            live: Arc::default(),
            tasks: HashMap::new(),
            next_gen: 0,
        }
    }

    fn live(&self) -> MutexGuard<'_, HashMap<TimerId, u64>> {
        self.live.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Scheduler for TokioScheduler {
    fn arm(&mut self, id: TimerId, after: Duration) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
        self.next_gen += 1;
        let generation = self.next_gen;
        self.live().insert(id, generation);

        let live = Arc::clone(&self.live);
        let tx = self.tx.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            {
                let mut live = live.lock().unwrap_or_else(|p| p.into_inner());
                // re-armed or cancelled while sleeping
                if live.get(&id) != Some(&generation) {
                    return;
                }
                live.remove(&id);
            }
            if let Some(tx) = tx.upgrade() {
                trace!("{:?} expired", id);
                let _ = tx.send(Message::TimerExpired(id));
            }
        });
        self.tasks.insert(id, task);
    }

    fn cancel(&mut self, id: TimerId) {
        self.live().remove(&id);
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }

    fn is_armed(&self, id: TimerId) -> bool {
        self.live().contains_key(&id)
    }
}

/// Cloneable handle to a spawned manager task.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    tx: UnboundedSender<Message>,
}

impl ManagerHandle {
    /// Queue a command, NCI event or device-management signal.
    pub fn send(&self, msg: impl Into<Message>) -> Result<()> {
        self.tx
            .send(msg.into())
            .map_err(|_| Error::Failed("manager task has stopped".into()))
    }

    /// Raw sender for transport reader tasks.
    pub fn sender(&self) -> UnboundedSender<Message> {
        self.tx.clone()
    }
}

/// Spawn the manager on the current tokio runtime. The task ends and yields
/// the manager once every [`ManagerHandle`] is dropped.
pub fn spawn(
    config: Config,
    transport: Box<dyn NciTransport>,
) -> Result<(ManagerHandle, JoinHandle<Manager>)> {
    config.validate()?;
    let runtime = Handle::try_current()
        .map_err(|e| Error::Failed(format!("no tokio runtime: {}", e)))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let timers = TokioScheduler::new(&tx, runtime.clone());
    let mut manager = Manager::new(config, transport, Box::new(timers));

    let task = runtime.spawn(async move {
        while let Some(msg) = rx.recv().await {
            trace!("dispatch {}", msg.name());
            manager.handle(msg);
        }
        debug!("manager task finished");
        manager
    });
    Ok((ManagerHandle { tx }, task))
}
