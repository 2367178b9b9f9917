//! Ordered hand-off of progress lines from the benchmark worker to the
//! presentation side.

mod channel;
mod view;

pub use channel::{PendingLine, ProgressLine, ProgressReceiver, ProgressSender, channel};
pub use view::{CaptureView, ConsoleView, ProgressView};
