//! Audit sink that writes each record to the tracing log.

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::port::outbound::audit::{AuditRecord, AuditSink};

/// Emits every audit record as a structured `info` event with a JSON body.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        let body = serde_json::to_string(record)?;
        info!(
            target: "audit",
            account_id = %record.account_id,
            instrument_id = %record.detection.instrument_id,
            risk_score = record.assessment.risk_score,
            success = record.result.success,
            record = %body,
            "Flash move audited"
        );
        Ok(())
    }
}
