//! # Shutdown Signal
//!
//! Cooperative stop for the link task, built on a `watch` channel.

use tokio::sync::watch;

/// Triggering side, held by whoever decides to stop (e.g. the Ctrl+C handler)
#[derive(Debug)]
pub struct ShutdownSignal {
    sender: watch::Sender<bool>,
}

/// Listening side, polled by long-running tasks at every await point
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Ask every listener to stop
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown was triggered
    ///
    /// Dropping the [`ShutdownSignal`] counts as a trigger. Cancel-safe.
    pub async fn wait(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_listener() {
        let signal = ShutdownSignal::new();
        let mut listener = signal.listener();
        assert!(!listener.is_triggered());

        let waiter = tokio::spawn(async move {
            listener.wait().await;
            listener.is_triggered()
        });
        signal.trigger();

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_listener_created_after_trigger() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        let mut listener = signal.listener();
        tokio::time::timeout(Duration::from_secs(1), listener.wait())
            .await
            .expect("wait should resolve immediately");
    }

    #[tokio::test]
    async fn test_dropped_signal_counts_as_trigger() {
        let signal = ShutdownSignal::new();
        let mut listener = signal.listener();
        drop(signal);

        tokio::time::timeout(Duration::from_secs(1), listener.wait())
            .await
            .expect("wait should resolve once the signal is gone");
    }

    #[tokio::test]
    async fn test_wait_pending_until_trigger() {
        let signal = ShutdownSignal::new();
        let mut listener = signal.listener();

        let result = tokio::time::timeout(Duration::from_millis(20), listener.wait()).await;
        assert!(result.is_err(), "wait should not resolve before trigger");
    }
}
