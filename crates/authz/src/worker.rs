//! Background worker plumbing.

use std::sync::mpsc;
use std::thread;

/// Handle to control and join a background worker thread.
///
/// Dropping the handle without calling [`WorkerHandle::shutdown`] detaches
/// the thread; it stops on its own when its input disconnects or the process
/// exits.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn a named worker thread. The body receives the shutdown channel
    /// and is expected to poll it between units of work.
    pub fn spawn<F>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(mpsc::Receiver<()>) + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(shutdown_rx))
            .expect("failed to spawn worker thread");

        Self {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }

    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}
