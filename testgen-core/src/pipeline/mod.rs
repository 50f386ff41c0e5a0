//! End-to-end generation pipeline: ticket to persisted test cases

pub mod cache;
pub mod orchestrator;

use crate::llm::ProviderError;
use crate::store::StoreError;
use crate::test_gen::{ParseError, TestCase, ValidationReport};
use crate::ticket::{TicketKey, TicketSourceError};
use serde::Serialize;
use thiserror::Error;

pub use cache::{CacheGate, TicketGuard};
pub use orchestrator::Orchestrator;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Ticket {key} not found")]
    TicketNotFound { key: TicketKey },

    #[error("Configuration missing: {variable}")]
    ConfigMissing { variable: String },

    #[error("Ticket source error: {0}")]
    TicketSource(TicketSourceError),

    #[error("Generation failed: {0}")]
    Provider(ProviderError),

    #[error("Could not parse generated test cases: {0}")]
    Parse(#[from] ParseError),

    #[error("No valid test cases generated for {key} ({rejected} drafts rejected)")]
    NoValidTestCases { key: TicketKey, rejected: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Generation cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Stable machine-readable name for error responses
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::TicketNotFound { .. } => "ticketNotFound",
            PipelineError::ConfigMissing { .. } => "configMissing",
            PipelineError::TicketSource(_) => "ticketSource",
            PipelineError::Provider(_) => "provider",
            PipelineError::Parse(_) => "parse",
            PipelineError::NoValidTestCases { .. } => "noValidTestCases",
            PipelineError::Storage(_) => "storage",
            PipelineError::Cancelled => "cancelled",
        }
    }
}

impl From<TicketSourceError> for PipelineError {
    fn from(err: TicketSourceError) -> Self {
        match err {
            TicketSourceError::NotFound { key } => PipelineError::TicketNotFound { key },
            TicketSourceError::ConfigMissing { variable } => PipelineError::ConfigMissing { variable },
            other => PipelineError::TicketSource(other),
        }
    }
}

impl From<ProviderError> for PipelineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ConfigMissing { variable } => PipelineError::ConfigMissing { variable },
            other => PipelineError::Provider(other),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowYieldWarning {
    pub produced: usize,
    pub minimum: usize,
}

impl LowYieldWarning {
    /// Warning for a set of `produced` cases, if it falls short of `minimum`
    pub fn check(produced: usize, minimum: usize) -> Option<Self> {
        (produced < minimum).then_some(Self { produced, minimum })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub ticket_key: TicketKey,
    pub test_cases: Vec<TestCase>,
    pub count: usize,
    pub cache_hit: bool,
    /// Validation rejects plus removed duplicates
    pub discarded: usize,
    pub flagged_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_yield: Option<LowYieldWarning>,
    pub rejected: ValidationReport,
}

impl GenerationReport {
    pub fn cached(ticket_key: TicketKey, test_cases: Vec<TestCase>, min_yield: usize) -> Self {
        let flagged_steps = test_cases.iter().map(|case| case.step_warnings.len()).sum();
        let low_yield = LowYieldWarning::check(test_cases.len(), min_yield);
        Self {
            ticket_key,
            count: test_cases.len(),
            test_cases,
            cache_hit: true,
            discarded: 0,
            flagged_steps,
            low_yield,
            rejected: ValidationReport::default(),
        }
    }
}
