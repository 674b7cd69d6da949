use refineloops_agent::{Artifact, ArtifactRequest};

use crate::JudgeKind;

/// Instruction templates handed to command-backed evaluators
pub struct JudgePrompts;

impl JudgePrompts {
    /// Build the instructions for one evaluator kind
    pub fn build_evaluation_prompt(
        kind: JudgeKind,
        criteria: &[String],
        request: &ArtifactRequest,
        artifact: &Artifact,
        iteration: usize,
    ) -> String {
        let criteria_list = criteria
            .iter()
            .map(|c| format!("- `{}`", c))
            .collect::<Vec<_>>()
            .join("\n");

        let parameters = if request.parameters.is_null() {
            "(none)".to_string()
        } else {
            serde_json::to_string_pretty(&request.parameters)
                .unwrap_or_else(|_| request.parameters.to_string())
        };

        format!(
            r#"You are the {kind} judge on a design review panel. You assess {focus}.

## Design Brief
{brief}

## Parameters
```json
{parameters}
```

## Artifact (iteration {iteration})
```
{artifact}
```

---

## Criteria

Score every criterion below from 0 to 10 (decimals allowed):
{criteria_list}

For each criterion give short reasoning, the concrete issues you see, and
actionable suggestions the designer can apply in the next revision.

List a **critical issue** only for a defect that must block approval no matter
how good the rest is (broken markup, unreadable text, off-brief content).

## Required Response Format

End your response with an evaluation block:

<evaluation>
{{"criteria": {{"<criterion>": {{"score": 7.5, "reasoning": "...", "issues": ["..."], "suggestions": ["..."]}}}},
 "critical_issues": []}}
</evaluation>"#,
            kind = kind,
            focus = kind.focus(),
            brief = request.brief,
            parameters = parameters,
            iteration = iteration,
            artifact = truncate_output(&artifact.content, 20000),
            criteria_list = criteria_list,
        )
    }
}

fn truncate_output(output: &str, max_len: usize) -> &str {
    if output.len() <= max_len {
        return output;
    }
    let mut end = max_len;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    // Prefer a line boundary
    match output[..end].rfind('\n') {
        Some(pos) => &output[..pos],
        None => &output[..end],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_criteria_and_brief() {
        let request = ArtifactRequest::new("Wordmark for a coffee roaster");
        let artifact = Artifact::new(2, "<svg><text>ROAST</text></svg>");
        let criteria = vec!["legibility".to_string(), "contrast".to_string()];

        let prompt = JudgePrompts::build_evaluation_prompt(
            JudgeKind::Usability,
            &criteria,
            &request,
            &artifact,
            2,
        );

        assert!(prompt.contains("usability judge"));
        assert!(prompt.contains("Wordmark for a coffee roaster"));
        assert!(prompt.contains("- `legibility`"));
        assert!(prompt.contains("- `contrast`"));
        assert!(prompt.contains("<text>ROAST</text>"));
        assert!(prompt.contains("(none)"));
    }

    #[test]
    fn test_truncate_prefers_line_boundary() {
        let text = "line one\nline two\nline three";
        assert_eq!(truncate_output(text, 100), text);
        assert_eq!(truncate_output(text, 12), "line one");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ééééé";
        let truncated = truncate_output(text, 3);
        assert_eq!(truncated, "é");
    }
}
