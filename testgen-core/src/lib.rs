//! Core functionality for testgen
//!
//! Turns issue-tracker tickets into structured manual test cases: a prompt is
//! built from the ticket, sent to a text-generation provider, and the response
//! is parsed, validated, cleaned up and persisted per ticket.

pub mod config;
#[cfg(any(test, feature = "test-util"))]
pub mod fixtures;
pub mod llm;
pub mod pipeline;
pub mod store;
pub mod test_gen;
pub mod ticket;

pub use config::TestgenConfig;
pub use pipeline::{GenerationReport, LowYieldWarning, Orchestrator, PipelineError, PipelineResult};
pub use test_gen::{GenerationOptions, TestCase};
pub use ticket::{Ticket, TicketKey, TicketType};

/// Version string reported by the CLI and the health endpoint
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
