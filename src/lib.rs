// Library for tests and the binary to access modules

pub mod adapter;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod models;
pub mod publisher;
pub mod rate;
pub mod sampler;
pub mod scheduler;
pub mod sources;

pub use adapter::{SourceAdapter, Telemetry};
pub use error::{CollectError, ErrorKind, SchedulerError};
pub use publisher::{Publisher, SubscriptionId};
pub use sampler::{Sampler, SamplerConfig, SamplerState};
pub use scheduler::{Scheduler, SchedulerBuilder};

