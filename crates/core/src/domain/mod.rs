// Domain Layer - Job lifecycle, documents, handler contracts

pub mod document;
pub mod error;
pub mod handler;
pub mod job;

pub use document::{Document, Modifier, Selector, UpdateOptions};
pub use error::DomainError;
pub use handler::{HandlerContext, HandlerKey, HandlerOutcome, UpdateHandler};
pub use job::{Job, JobId, JobStatus};
