//! Audit trail port.
//!
//! Every detection produces one [`AuditRecord`], whether or not it was
//! executed. The storage schema belongs to the sink implementation.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{AccountId, DetectionEvent, ExecutionResult, RiskAssessment};
use crate::error::Error;

/// Everything known about one processed detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub account_id: AccountId,
    pub detection: DetectionEvent,
    pub assessment: RiskAssessment,
    pub result: ExecutionResult,
    pub recorded_at_ms: i64,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<(), Error>;
}
