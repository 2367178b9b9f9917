mod operation;
mod recorder;
mod sink;

pub use operation::OperationType;
pub use recorder::{Recorder, RunRecord, TimingSample};
pub use sink::ResultSink;
