use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};

use crate::core::BenchError;
use crate::progress::ProgressLine;

/// Presentation surface for progress lines.
#[async_trait]
pub trait ProgressView: Send {
    async fn render(&mut self, line: &ProgressLine) -> Result<(), BenchError>;
}

/// Writes lines to stdout, error lines in red.
pub struct ConsoleView {
    out: Stdout,
    color: bool,
}

impl ConsoleView {
    pub fn new(color: bool) -> Self {
        Self {
            out: tokio::io::stdout(),
            color,
        }
    }
}

#[async_trait]
impl ProgressView for ConsoleView {
    async fn render(&mut self, line: &ProgressLine) -> Result<(), BenchError> {
        let text = if line.is_error && self.color {
            format!("\x1b[31m{}\x1b[0m\n", line.text)
        } else {
            format!("{}\n", line.text)
        };
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }
}

/// Keeps every rendered line in memory.
#[derive(Default)]
pub struct CaptureView {
    lines: Arc<Mutex<Vec<ProgressLine>>>,
}

impl CaptureView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the rendered lines, usable after the view moved.
    pub fn lines(&self) -> Arc<Mutex<Vec<ProgressLine>>> {
        Arc::clone(&self.lines)
    }
}

#[async_trait]
impl ProgressView for CaptureView {
    async fn render(&mut self, line: &ProgressLine) -> Result<(), BenchError> {
        self.lines
            .lock()
            .map_err(|e| BenchError::IoError(e.to_string()))?
            .push(line.clone());
        Ok(())
    }
}
