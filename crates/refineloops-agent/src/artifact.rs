use serde::{Deserialize, Serialize};

/// What the caller asked for. Passed unchanged to every producer call and
/// handed to evaluators as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRequest {
    /// Natural language description of the desired artifact
    pub brief: String,
    /// Free-form structured parameters (palette, dimensions, ...)
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl ArtifactRequest {
    pub fn new(brief: impl Into<String>) -> Self {
        Self {
            brief: brief.into(),
            parameters: serde_json::Value::Null,
        }
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// One version of the generated artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Iteration (1-based) that produced this version
    pub iteration: usize,
    /// The artifact body, e.g. SVG markup
    pub content: String,
    /// Optional explanation from the producer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Artifact {
    pub fn new(iteration: usize, content: impl Into<String>) -> Self {
        Self {
            iteration,
            content: content.into(),
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Short single-line preview for logs
    pub fn preview(&self, max_chars: usize) -> String {
        let flat: String = self
            .content
            .chars()
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .take(max_chars)
            .collect();
        if self.content.chars().count() > max_chars {
            format!("{}...", flat)
        } else {
            flat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parameters_default_to_null() {
        let request: ArtifactRequest = serde_json::from_str(r#"{"brief": "a fox logo"}"#).unwrap();
        assert_eq!(request.brief, "a fox logo");
        assert!(request.parameters.is_null());
    }

    #[test]
    fn test_preview_flattens_and_truncates() {
        let artifact = Artifact::new(1, "<svg>\n  <circle/>\n</svg>");
        assert_eq!(artifact.preview(8), "<svg>   ...");
        assert_eq!(Artifact::new(1, "<svg/>").preview(20), "<svg/>");
    }
}
