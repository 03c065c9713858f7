mod cancellation;
mod error;
mod supervisor;

pub use cancellation::{cancellation_pair, Canceller, CancellationToken};
pub use error::{Classify, ErrorClass, RelayError};
pub use supervisor::{Supervisor, Worker, WorkerFactory};
