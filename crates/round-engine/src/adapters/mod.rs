//! Concrete adapters wiring the round engine's outbound ports to HTTP, the
//! filesystem, and the in-process event bus.

pub mod plot_reader;
pub mod plot_scanner;
pub mod pool_http;
pub mod progress_sink;

pub use plot_reader::FilesystemPlotReader;
pub use pool_http::{HttpPoolClient, HttpSubmitter};
pub use progress_sink::EventBusProgressSink;
