//! Serialized world context.
//!
//! Every world mutation runs on a single task that drains this channel, so
//! handlers never race each other on the same encounter. Deferred commands
//! sleep on their own task and then join the same queue.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::infrastructure::ports::{DispatchError, WorldCommand, WorldScheduler};

pub type WorldReceiver = mpsc::UnboundedReceiver<WorldCommand>;

#[derive(Clone)]
pub struct WorldContext {
    tx: mpsc::UnboundedSender<WorldCommand>,
}

impl WorldContext {
    pub fn new() -> (Self, WorldReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl WorldScheduler for WorldContext {
    fn dispatch(&self, command: WorldCommand) -> Result<(), DispatchError> {
        self.tx.send(command).map_err(|_| DispatchError::Closed)
    }

    fn dispatch_after(&self, delay: Duration, command: WorldCommand) -> Result<(), DispatchError> {
        if self.tx.is_closed() {
            return Err(DispatchError::Closed);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let tx = self.tx.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let name = command.name();
            if tx.send(command).is_err() {
                tracing::debug!(command = name, "World context closed before deferred command");
            }
        });
        Ok(())
    }
}

/// Scheduler that queues commands for a test to run by hand.
#[cfg(test)]
#[derive(Default)]
pub struct QueuedScheduler {
    queue: std::sync::Mutex<std::collections::VecDeque<(Option<Duration>, WorldCommand)>>,
    closed: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl QueuedScheduler {
    pub fn drain(&self) -> Vec<(Option<Duration>, WorldCommand)> {
        self.queue.lock().expect("queue lock").drain(..).collect()
    }

    pub fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn push(&self, delay: Option<Duration>, command: WorldCommand) -> Result<(), DispatchError> {
        if self.closed.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(DispatchError::Closed);
        }
        self.queue
            .lock()
            .expect("queue lock")
            .push_back((delay, command));
        Ok(())
    }
}

#[cfg(test)]
impl WorldScheduler for QueuedScheduler {
    fn dispatch(&self, command: WorldCommand) -> Result<(), DispatchError> {
        self.push(None, command)
    }

    fn dispatch_after(&self, delay: Duration, command: WorldCommand) -> Result<(), DispatchError> {
        self.push(Some(delay), command)
    }
}
