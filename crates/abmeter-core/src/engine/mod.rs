pub mod dispatcher;
pub mod recorder;
pub mod stats;

pub use dispatcher::{run_dispatch, DispatchResult};
pub use recorder::{OutcomeRecorder, OutcomeSnapshot};
pub use stats::{average_ms, percentile, throughput_rps, LatencyStats};
