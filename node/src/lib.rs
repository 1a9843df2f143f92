//! Antibot node: the running gatekeeper process.
//!
//! The node:
//! - Loads the chat registry from disk and restores pending challenges
//! - Long-polls Telegram for join events and verify presses
//! - Feeds them, together with expiry ticks, to a single transition processor
//! - Counts outcomes in Prometheus metrics
//! - On shutdown stops polling, acknowledges handled updates and flushes the
//!   registry one last time

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::GateMetrics;
pub use node::AntibotNode;
pub use shutdown::ShutdownController;
