use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// 静默期调度：每次 `schedule` 都会替换掉尚未触发的上一次
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fut.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn burst_fires_once_after_quiet_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        for text in ["s", "sf", "sfo"] {
            let tx = tx.clone();
            debouncer.schedule(async move {
                let _ = tx.send(text);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(199)).await;
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some("sfo"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_abort_the_pending_task() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u8>();

        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        let t = tx.clone();
        debouncer.schedule(async move {
            let _ = t.send(1);
        });
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        let t = tx.clone();
        debouncer.schedule(async move {
            let _ = t.send(2);
        });
        drop(debouncer);
        drop(tx);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(rx.recv().await, None);
    }
}
