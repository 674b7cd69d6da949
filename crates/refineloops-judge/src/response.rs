use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::{CriterionScore, EvaluatorResult, JudgeKind, KindProfile};

const BLOCK_OPEN: &str = "<evaluation>";
const BLOCK_CLOSE: &str = "</evaluation>";

/// Raw structured answer from an evaluator, before schema validation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluatorResponse {
    pub criteria: BTreeMap<String, CriterionScore>,
    #[serde(default)]
    pub critical_issues: Vec<String>,
}

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("Evaluator output is empty")]
    Empty,

    #[error("Malformed evaluation block")]
    MalformedBlock,

    #[error("Failed to parse evaluation JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing criterion '{criterion}' for {kind}")]
    MissingCriterion { kind: JudgeKind, criterion: String },

    #[error("Score {score} for '{criterion}' is outside 0..=10")]
    ScoreOutOfRange { criterion: String, score: f64 },
}

impl EvaluatorResponse {
    /// Parse an evaluator's textual output.
    ///
    /// Accepts either a bare JSON document or one wrapped in an
    /// `<evaluation>` block surrounded by free-form prose:
    /// ```text
    /// The palette is strong but the wordmark is cramped.
    /// <evaluation>
    /// {"criteria": {"typography": {"score": 6.0, "suggestions": ["open up tracking"]}},
    ///  "critical_issues": []}
    /// </evaluation>
    /// ```
    pub fn parse(output: &str) -> Result<Self, ResponseError> {
        debug!(output_len = output.len(), "Parsing evaluator response");

        if let Some(json) = Self::extract_block(output)? {
            return Ok(serde_json::from_str(json)?);
        }

        let trimmed = output.trim();
        if trimmed.is_empty() {
            return Err(ResponseError::Empty);
        }
        Ok(serde_json::from_str(trimmed)?)
    }

    fn extract_block(output: &str) -> Result<Option<&str>, ResponseError> {
        let start = output.find(BLOCK_OPEN);
        let end = output.rfind(BLOCK_CLOSE);

        match (start, end) {
            (Some(start), Some(end)) if start < end => {
                Ok(Some(output[start + BLOCK_OPEN.len()..end].trim()))
            }
            (None, None) => Ok(None),
            _ => Err(ResponseError::MalformedBlock),
        }
    }

    /// Check the response against the kind's criterion schema and build the
    /// result. Criteria outside the schema are dropped.
    pub fn into_result(
        self,
        kind: JudgeKind,
        profile: &KindProfile,
        max_critical_issues: usize,
    ) -> Result<EvaluatorResult, ResponseError> {
        let mut criteria = self.criteria;

        let mut expected = BTreeMap::new();
        for name in &profile.criteria {
            let score = criteria
                .remove(name)
                .ok_or_else(|| ResponseError::MissingCriterion {
                    kind,
                    criterion: name.clone(),
                })?;
            if !score.is_in_range() {
                return Err(ResponseError::ScoreOutOfRange {
                    criterion: name.clone(),
                    score: score.score,
                });
            }
            expected.insert(name.clone(), score);
        }

        if !criteria.is_empty() {
            debug!(
                kind = %kind,
                extra = ?criteria.keys().collect::<Vec<_>>(),
                "Ignoring criteria outside the schema"
            );
        }

        Ok(EvaluatorResult::new(
            kind,
            expected,
            self.critical_issues,
            profile.threshold,
            max_critical_issues,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn technical_profile() -> KindProfile {
        KindProfile::new(0.15, 6.0, &["svg_validity", "scalability"])
    }

    #[test]
    fn test_parse_evaluation_block() {
        let output = r#"
The SVG is valid but embeds a raster.

<evaluation>
{"criteria": {
    "svg_validity": {"score": 9.0, "reasoning": "parses cleanly"},
    "scalability": {"score": 5.0, "issues": ["embedded PNG"], "suggestions": ["trace the raster"]}
 },
 "critical_issues": ["embedded raster image"]}
</evaluation>
"#;

        let response = EvaluatorResponse::parse(output).unwrap();
        assert_eq!(response.criteria.len(), 2);
        assert_eq!(response.criteria["scalability"].suggestions, vec!["trace the raster"]);
        assert_eq!(response.critical_issues, vec!["embedded raster image"]);
    }

    #[test]
    fn test_parse_bare_json() {
        let output = r#"{"criteria": {"svg_validity": {"score": 8}}}"#;
        let response = EvaluatorResponse::parse(output).unwrap();
        assert_eq!(response.criteria["svg_validity"].score, 8.0);
        assert!(response.critical_issues.is_empty());
    }

    #[test]
    fn test_parse_rejects_prose() {
        let result = EvaluatorResponse::parse("Looks great to me!");
        assert!(matches!(result, Err(ResponseError::Json(_))));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(
            EvaluatorResponse::parse("  \n "),
            Err(ResponseError::Empty)
        ));
    }

    #[test]
    fn test_parse_rejects_unclosed_block() {
        let result = EvaluatorResponse::parse("<evaluation>{\"criteria\": {}}");
        assert!(matches!(result, Err(ResponseError::MalformedBlock)));
    }

    #[test]
    fn test_into_result_validates_schema() {
        let response =
            EvaluatorResponse::parse(r#"{"criteria": {"svg_validity": {"score": 8}}}"#).unwrap();
        let result = response.into_result(JudgeKind::Technical, &technical_profile(), 0);
        match result {
            Err(ResponseError::MissingCriterion { kind, criterion }) => {
                assert_eq!(kind, JudgeKind::Technical);
                assert_eq!(criterion, "scalability");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_into_result_rejects_out_of_range() {
        let response = EvaluatorResponse::parse(
            r#"{"criteria": {"svg_validity": {"score": 11}, "scalability": {"score": 5}}}"#,
        )
        .unwrap();
        let result = response.into_result(JudgeKind::Technical, &technical_profile(), 0);
        assert!(matches!(result, Err(ResponseError::ScoreOutOfRange { .. })));
    }

    #[test]
    fn test_into_result_drops_extra_criteria() {
        let response = EvaluatorResponse::parse(
            r#"{"criteria": {
                "svg_validity": {"score": 8},
                "scalability": {"score": 7},
                "vibes": {"score": 0}
            }}"#,
        )
        .unwrap();
        let result = response
            .into_result(JudgeKind::Technical, &technical_profile(), 0)
            .unwrap();

        assert_eq!(result.criteria().len(), 2);
        assert_eq!(result.overall_score(), 7.5);
        assert!(result.passed());
    }

    #[test]
    fn test_out_of_range_extra_criterion_is_ignored() {
        let response = EvaluatorResponse::parse(
            r#"{"criteria": {
                "svg_validity": {"score": 9},
                "scalability": {"score": 9},
                "confidence": {"score": 85}
            }}"#,
        )
        .unwrap();
        let result = response
            .into_result(JudgeKind::Technical, &technical_profile(), 0)
            .unwrap();

        assert!(!result.criteria().contains_key("confidence"));
        assert_eq!(result.overall_score(), 9.0);
        assert!(result.passed());
        assert!(!result.is_degraded());
    }
}
