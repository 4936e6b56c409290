// Application Layer - use cases wired over the ports

pub mod config;
pub mod dispatcher;
pub mod enqueue;
pub mod registry;
pub mod resolver;
pub mod retention;
pub mod runtime;
pub mod worker;

pub use config::WorkerConfig;
pub use dispatcher::Dispatcher;
pub use enqueue::ScheduleRequest;
pub use registry::HandlerRegistry;
pub use resolver::TargetResolver;
pub use retention::RetentionSweeper;
pub use runtime::{Scheduler, UpdateService};
pub use worker::{shutdown_channel, Poller, ShutdownSender, ShutdownToken};
