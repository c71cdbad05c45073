//! Timer-coalesced dispatch.
//!
//! Feed mutation notifications arrive in bursts. A [`Debouncer`] waits until
//! no notification has arrived for one window, then fires once.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Coalesces notifications into one callback per quiet window.
///
/// Notifications that arrive while the callback runs start the next window.
#[derive(Debug)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    handle: JoinHandle<()>,
}

impl Debouncer {
    /// Spawns the dispatch task on the current runtime.
    pub fn spawn<F, Fut>(window: Duration, mut on_fire: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let handle = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                let mut closed = false;
                loop {
                    tokio::select! {
                        message = rx.recv() => {
                            if message.is_none() {
                                closed = true;
                                break;
                            }
                        }
                        () = tokio::time::sleep(window) => break,
                    }
                }

                tracing::trace!("Debounce window elapsed");
                on_fire().await;

                if closed {
                    break;
                }
            }
        });

        Self { tx, handle }
    }

    /// Records one notification. Returns false once the dispatcher stopped.
    pub fn notify(&self) -> bool {
        self.tx.send(()).is_ok()
    }

    /// Stops accepting notifications, fires any pending window immediately,
    /// and waits for the dispatcher to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Debounce task failed");
        }
    }
}
