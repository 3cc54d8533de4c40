// Observability: run metrics and their Pushgateway hand-off

pub mod metrics;

pub use metrics::{init as init_metrics, push_all as push_metrics};
