// Public modules
pub mod types;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod classify;
pub mod client;
pub mod retry;
pub mod pool;
pub mod aggregator;
pub mod resolver;
pub mod progress;
pub mod scanner;
pub mod report;

// Re-export commonly used items
pub use types::*;
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use error::{FetchError, NamespaceScanError, ScanError};
pub use snapshot::{ConditionSnapshot, ContainerSnapshot, PodSnapshot, ReleaseSnapshot, ResourceSnapshot, TerminatedSnapshot};
pub use classify::classify;
pub use client::{KubeResourceClient, ResourceClient};
pub use retry::{retry_fetch, RetryEvent, RetryPolicy, Sleeper, TokioSleeper};
pub use pool::TaskPool;
pub use aggregator::Aggregator;
pub use resolver::resolve_namespaces;
pub use progress::{ConsoleProgress, NoProgress, ScanProgress};
pub use scanner::{run_scan, ScanSettings, Scanner};
pub use report::{render_html, render_json, render_text, write_html_report, open_report};
