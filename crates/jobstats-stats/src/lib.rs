//! Execution stats service and completion hook.
//!
//! - `StatsService`: derives day keys and reads trailing windows
//! - `CompletionHook`: fans a terminal execution out to the stats counter and
//!   the metrics sink, reporting each side effect separately
//! - `ExecutionRegistry`: tracks running executions and fires the hook exactly
//!   once per execution when it finishes

pub mod error;
pub mod hook;
pub mod registry;
pub mod service;

pub use error::{RegistryError, RegistryResult};
pub use hook::{CompletionHook, CompletionReport};
pub use registry::ExecutionRegistry;
pub use service::{Clock, StatsService};
