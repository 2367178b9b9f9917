use std::time::Duration;

use log::{error, info};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::conf::ProgressConfig;
use crate::core::BenchError;
use crate::progress::ProgressView;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLine {
    pub text: String,
    pub is_error: bool,
}

/// A line waiting to be rendered. Dropping it without calling [`ack`]
/// makes the posting worker fail with `ProgressChannelClosed`.
///
/// [`ack`]: PendingLine::ack
pub struct PendingLine {
    pub line: ProgressLine,
    ack: oneshot::Sender<()>,
}

impl PendingLine {
    pub fn ack(self) {
        let _ = self.ack.send(());
    }
}

/// Worker half. `post` blocks the calling thread, so it must only be used
/// from a blocking context such as `spawn_blocking` or a plain thread.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<PendingLine>,
    handle: Handle,
    timeout: Duration,
    settle: Duration,
}

/// Presentation half.
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<PendingLine>,
}

pub fn channel(config: &ProgressConfig, handle: Handle) -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ProgressSender {
            tx,
            handle,
            timeout: config.timeout,
            settle: config.settle,
        },
        ProgressReceiver { rx },
    )
}

impl ProgressSender {
    /// Runtime the presentation side is driven by.
    pub fn runtime(&self) -> &Handle {
        &self.handle
    }

    pub fn info(&self, text: &str) -> Result<(), BenchError> {
        self.post(text, false)
    }

    pub fn error(&self, text: &str) -> Result<(), BenchError> {
        self.post(text, true)
    }

    /// Hands the line to the presentation side and waits until it has been
    /// rendered, or until the timeout elapses.
    pub fn post(&self, text: &str, is_error: bool) -> Result<(), BenchError> {
        if is_error {
            error!(target: "perf", "{text}");
        } else {
            info!(target: "perf", "{text}");
        }

        let (ack, rendered) = oneshot::channel();
        let pending = PendingLine {
            line: ProgressLine {
                text: text.to_string(),
                is_error,
            },
            ack,
        };
        self.tx
            .send(pending)
            .map_err(|_| BenchError::ProgressChannelClosed)?;

        let timeout = self.timeout;
        match self
            .handle
            .block_on(async move { tokio::time::timeout(timeout, rendered).await })
        {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(BenchError::ProgressChannelClosed),
            Err(_) => return Err(BenchError::ProgressChannelTimeout(timeout)),
        }

        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
        Ok(())
    }
}

impl ProgressReceiver {
    /// Next line to render, `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<PendingLine> {
        self.rx.recv().await
    }

    /// Renders and acknowledges lines in posting order until every sender
    /// has been dropped.
    pub async fn present<V: ProgressView + ?Sized>(mut self, view: &mut V) -> Result<(), BenchError> {
        while let Some(pending) = self.recv().await {
            view.render(&pending.line).await?;
            pending.ack();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::CaptureView;

    fn fast_config(timeout: Duration) -> ProgressConfig {
        ProgressConfig {
            timeout,
            settle: Duration::ZERO,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lines_rendered_in_order() {
        let (tx, rx) = channel(&fast_config(Duration::from_secs(5)), Handle::current());
        let mut view = CaptureView::new();
        let lines = view.lines();

        let worker = tokio::task::spawn_blocking(move || {
            for i in 0..20 {
                tx.post(&format!("line {i}"), i % 5 == 0)?;
            }
            Ok::<_, BenchError>(())
        });

        rx.present(&mut view).await.unwrap();
        worker.await.unwrap().unwrap();

        let rendered = lines.lock().unwrap();
        assert_eq!(rendered.len(), 20);
        for (i, line) in rendered.iter().enumerate() {
            assert_eq!(line.text, format!("line {i}"));
            assert_eq!(line.is_error, i % 5 == 0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unacknowledged_line_times_out() {
        let (tx, mut rx) = channel(&fast_config(Duration::from_millis(50)), Handle::current());

        let worker = tokio::task::spawn_blocking(move || tx.info("stuck"));

        // Hold the line without acknowledging it.
        let pending = rx.recv().await.unwrap();
        let result = worker.await.unwrap();
        assert_eq!(
            result,
            Err(BenchError::ProgressChannelTimeout(Duration::from_millis(50)))
        );
        drop(pending);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_closed_presentation_side() {
        let (tx, rx) = channel(&fast_config(Duration::from_secs(5)), Handle::current());
        drop(rx);
        let result = tokio::task::spawn_blocking(move || tx.info("nobody listens"))
            .await
            .unwrap();
        assert_eq!(result, Err(BenchError::ProgressChannelClosed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dropped_line_reports_closed() {
        let (tx, mut rx) = channel(&fast_config(Duration::from_secs(5)), Handle::current());
        let worker = tokio::task::spawn_blocking(move || tx.info("dropped"));
        drop(rx.recv().await.unwrap());
        assert_eq!(worker.await.unwrap(), Err(BenchError::ProgressChannelClosed));
    }
}
