//! Polymarket REST API response types.

use serde::Deserialize;

use crate::domain::{ConditionId, InstrumentId, InstrumentMetadata};

pub use super::message::WireTrade as DataApiTrade;

/// Market from the Gamma API.
///
/// `outcomes` and `clobTokenIds` are JSON-encoded arrays inside strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    pub condition_id: Option<String>,
    #[serde(default)]
    pub question: String,
    pub slug: Option<String>,
    pub image: Option<String>,
    pub outcomes: Option<String>,
    pub clob_token_ids: Option<String>,
}

impl GammaMarket {
    pub fn token_ids(&self) -> Vec<String> {
        decode_list(self.clob_token_ids.as_deref())
    }

    pub fn outcome_names(&self) -> Vec<String> {
        decode_list(self.outcomes.as_deref())
    }

    /// Metadata for one of this market's tokens, or `None` if it is not listed.
    pub fn metadata_for(&self, instrument_id: &InstrumentId) -> Option<InstrumentMetadata> {
        let index = self
            .token_ids()
            .iter()
            .position(|token| token == instrument_id.as_str())?;
        Some(InstrumentMetadata {
            instrument_id: instrument_id.clone(),
            condition_id: self.condition_id.clone().map(ConditionId::from),
            question: self.question.clone(),
            image: self.image.clone(),
            slug: self.slug.clone(),
            outcome: self.outcome_names().get(index).cloned(),
            placeholder: false,
        })
    }
}

fn decode_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> GammaMarket {
        serde_json::from_str(
            r#"{"conditionId":"0xc","question":"Will it rain?","slug":"rain",
                "outcomes":"[\"Yes\", \"No\"]","clobTokenIds":"[\"111\", \"222\"]"}"#,
        )
        .unwrap()
    }

    #[test]
    fn decodes_embedded_lists() {
        let market = market();
        assert_eq!(market.token_ids(), vec!["111", "222"]);
        assert_eq!(market.outcome_names(), vec!["Yes", "No"]);
    }

    #[test]
    fn metadata_picks_outcome_by_token_index() {
        let meta = market().metadata_for(&InstrumentId::from("222")).unwrap();
        assert_eq!(meta.outcome.as_deref(), Some("No"));
        assert_eq!(meta.condition_id, Some(ConditionId::from("0xc")));
        assert!(!meta.placeholder);
    }

    #[test]
    fn unknown_token_has_no_metadata() {
        assert!(market().metadata_for(&InstrumentId::from("333")).is_none());
    }

    #[test]
    fn malformed_lists_decode_empty() {
        let market = GammaMarket {
            condition_id: None,
            question: String::new(),
            slug: None,
            image: None,
            outcomes: Some("not json".into()),
            clob_token_ids: None,
        };
        assert!(market.outcome_names().is_empty());
        assert!(market.token_ids().is_empty());
    }
}
