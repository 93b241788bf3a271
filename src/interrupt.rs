use tokio::sync::watch;

/// Ctrl+C fan-out. The first interrupt flips the token so a pending wait
/// can abort cleanly; a second interrupt exits outright.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Install the process-wide Ctrl+C watcher. Call once, from an async
    /// context.
    pub fn install() -> Self {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            let _ = tx.send(true);
            // Listening replaced the default SIGINT behaviour for the rest
            // of the process; keep honouring it by hand.
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
        Self { rx }
    }

    /// A token driven by the returned sender instead of Ctrl+C.
    pub fn manual() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Watcher gone without cancelling; never resolve.
            std::future::pending::<()>().await;
        }
    }
}
