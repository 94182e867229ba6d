//! Cooperative executor
//!
//! One task owns the engine state `S` and runs posted callbacks against it in
//! the order they were posted. Background work runs on blocking worker
//! threads and ends by posting a callback with its result, so the state is
//! never shared with workers.

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

type Task<S> = Box<dyn FnOnce(&mut S, &ExecutorHandle<S>) + Send>;

enum Message<S> {
    Run(Task<S>),
    Shutdown,
}

pub struct ExecutorHandle<S> {
    sender: mpsc::UnboundedSender<Message<S>>,
    runtime: Handle,
}

impl<S> Clone for ExecutorHandle<S> {
    fn clone(&self) -> Self {
        ExecutorHandle {
            sender: self.sender.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<S: 'static> ExecutorHandle<S> {
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Queue `task`; `false` once the executor has stopped
    pub fn post(&self, task: impl FnOnce(&mut S, &ExecutorHandle<S>) + Send + 'static) -> bool {
        self.sender.send(Message::Run(Box::new(task))).is_ok()
    }

    /// Run `work` on a worker thread, then `then` on the executor
    pub fn spawn_blocking<T>(
        &self,
        work: impl FnOnce() -> T + Send + 'static,
        then: impl FnOnce(&mut S, &ExecutorHandle<S>, T) + Send + 'static,
    ) where
        T: Send + 'static,
    {
        let handle = self.clone();
        self.runtime.spawn_blocking(move || {
            let output = work();
            handle.post(move |state, handle| then(state, handle, output));
        });
    }

    /// Run `query` on the executor and wait for its answer
    ///
    /// `None` when the executor stopped before answering.
    pub async fn call<T>(&self, query: impl FnOnce(&mut S, &ExecutorHandle<S>) -> T + Send + 'static) -> Option<T>
    where
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let posted = self.post(move |state, handle| {
            let _ = sender.send(query(state, handle));
        });
        if !posted {
            return None;
        }
        receiver.await.ok()
    }

    /// Stop the executor after the callbacks already queued
    pub fn shutdown(&self) {
        let _ = self.sender.send(Message::Shutdown);
    }
}

pub struct Executor<S> {
    receiver: mpsc::UnboundedReceiver<Message<S>>,
    handle: ExecutorHandle<S>,
}

impl<S: 'static> Executor<S> {
    pub fn new(runtime: Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Executor {
            receiver,
            handle: ExecutorHandle { sender, runtime },
        }
    }

    pub fn handle(&self) -> ExecutorHandle<S> {
        self.handle.clone()
    }

    /// Drain callbacks until shutdown, returning the state
    pub async fn run(mut self, mut state: S) -> S {
        while let Some(message) = self.receiver.recv().await {
            match message {
                Message::Run(task) => task(&mut state, &self.handle),
                Message::Shutdown => break,
            }
        }
        state
    }
}
