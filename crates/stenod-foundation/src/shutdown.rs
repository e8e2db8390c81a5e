use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::Notify;

type TeardownStep = (&'static str, Box<dyn FnOnce() + Send>);

/// Installs the Ctrl-C handler and hands out the guard the daemon
/// coordinates its shutdown through. Teardown order matters here: the
/// machine must stop first so the chord queue closes, which ends the
/// driver's stream and lets it drain and exit; registering steps in
/// that order and replaying them in order is what this module is for.
pub struct ShutdownHandler {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub async fn install(self) -> ShutdownGuard {
        let requested = Arc::clone(&self.requested);
        let notify = Arc::clone(&self.notify);

        tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl-C handler: {}", e);
                return;
            }
            tracing::info!("Shutdown requested via Ctrl-C");
            requested.store(true, Ordering::SeqCst);
            notify.notify_waiters();
        });

        let original_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            tracing::error!("PANIC: {}", panic_info);
            eprintln!("stenod panicked: {}", panic_info);
            original_panic(panic_info);
        }));

        ShutdownGuard {
            requested: self.requested,
            notify: self.notify,
            teardown: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[derive(Clone)]
pub struct ShutdownGuard {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
    teardown: Arc<Mutex<Vec<TeardownStep>>>,
}

impl ShutdownGuard {
    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested, even if the request
    /// landed before this call.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_shutdown_requested() {
            return;
        }
        notified.await;
    }

    pub fn request_shutdown(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Register a teardown step. Steps run in registration order when
    /// [`ShutdownGuard::run_teardown`] is called, once each.
    pub fn defer(&self, name: &'static str, step: impl FnOnce() + Send + 'static) {
        self.teardown.lock().push((name, Box::new(step)));
    }

    /// Run every registered teardown step in order. Steps registered
    /// after this call run on the next invocation.
    pub fn run_teardown(&self) {
        let steps = std::mem::take(&mut *self.teardown.lock());
        for (name, step) in steps {
            tracing::info!(step = name, "tearing down");
            step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_wakes_waiters_and_sets_flag() {
        let guard = ShutdownHandler::new().install().await;
        assert!(!guard.is_shutdown_requested());

        let waiter = {
            let guard = guard.clone();
            tokio::spawn(async move { guard.wait().await })
        };
        guard.request_shutdown();
        waiter.await.unwrap();
        assert!(guard.is_shutdown_requested());
    }

    #[tokio::test]
    async fn teardown_runs_in_registration_order_once() {
        let guard = ShutdownHandler::new().install().await;
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["machine", "driver"] {
            let order = Arc::clone(&order);
            guard.defer(name, move || order.lock().push(name));
        }
        guard.run_teardown();
        assert_eq!(*order.lock(), ["machine", "driver"]);

        guard.run_teardown();
        assert_eq!(order.lock().len(), 2);
    }
}
