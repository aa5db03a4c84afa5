//! Parsing of `pulumi` JSON output and error text.

use serde_json::Value;
use strata_core::{ChangeSummary, StackOutputs};
use strata_runtime::EngineError;

/// Change counts from `pulumi preview --json`.
///
/// The document carries a `changeSummary` object mapping operations to
/// resource counts. A preview of an empty program omits it.
pub fn parse_preview(stdout: &str) -> Result<ChangeSummary, EngineError> {
    let doc: Value = parse_json(stdout, "preview")?;
    let mut summary = ChangeSummary::new();

    match doc.get("changeSummary") {
        None | Some(Value::Null) => {}
        Some(Value::Object(counts)) => {
            for (op, count) in counts {
                let count = count.as_u64().ok_or_else(|| {
                    EngineError::InvalidOutput(format!(
                        "preview change count for '{op}' is not a number: {count}"
                    ))
                })?;
                summary.record(op.as_str(), count);
            }
        }
        Some(other) => {
            return Err(EngineError::InvalidOutput(format!(
                "preview changeSummary is not an object: {other}"
            )));
        }
    }
    Ok(summary)
}

/// Outputs from `pulumi stack output --json`. A stack without outputs prints
/// `{}` (older CLIs print nothing).
pub fn parse_outputs(stdout: &str) -> Result<StackOutputs, EngineError> {
    if stdout.trim().is_empty() {
        return Ok(StackOutputs::new());
    }
    match parse_json(stdout, "stack output")? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(EngineError::InvalidOutput(format!(
            "stack output is not an object: {other}"
        ))),
    }
}

fn parse_json(stdout: &str, what: &str) -> Result<Value, EngineError> {
    serde_json::from_str(stdout.trim())
        .map_err(|e| EngineError::InvalidOutput(format!("{what} returned invalid JSON: {e}")))
}

/// `pulumi stack init` on a taken name.
pub fn is_already_exists(stderr: &str) -> bool {
    stderr.contains("already exists")
}

/// Commands run against a stack that does not exist.
pub fn is_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no stack named") || stderr.contains("stack not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_preview_change_summary() {
        let stdout = r#"{
            "steps": [{"op": "create", "urn": "urn:pulumi:dev::p::azure:rg::rg"}],
            "duration": 1200000000,
            "changeSummary": {"create": 2, "same": 10, "update": 1}
        }"#;
        let summary = parse_preview(stdout).unwrap();
        assert_eq!(summary.count("create"), 2);
        assert_eq!(summary.total_changes(), 3);
        assert_eq!(summary.to_string(), "create=2, same=10, update=1");
    }

    #[test]
    fn test_preview_without_summary() {
        assert!(!parse_preview(r#"{"steps": []}"#).unwrap().has_changes());
    }

    #[test]
    fn test_preview_rejects_garbage() {
        assert!(matches!(
            parse_preview("error: no Pulumi.yaml project file found"),
            Err(EngineError::InvalidOutput(_))
        ));
        assert!(matches!(
            parse_preview(r#"{"changeSummary": {"create": "two"}}"#),
            Err(EngineError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_stack_outputs() {
        let stdout = r#"{"clusterName": "aks-dev", "nodeCount": 3, "tags": {"env": "dev"}}"#;
        let outputs = parse_outputs(stdout).unwrap();
        assert_eq!(outputs.get_str("clusterName"), Some("aks-dev"));
        assert_eq!(outputs.get("nodeCount"), Some(&json!(3)));
        assert_eq!(outputs.len(), 3);

        assert!(parse_outputs("").unwrap().is_empty());
        assert!(parse_outputs("{}\n").unwrap().is_empty());
        assert!(parse_outputs("[1, 2]").is_err());
    }

    #[test]
    fn test_error_text_detection() {
        assert!(is_already_exists(
            "error: stack 'app-acme-dev-eastus' already exists"
        ));
        assert!(!is_already_exists("error: permission denied"));
        assert!(is_not_found("error: no stack named 'platform-dev-eastus' found"));
        assert!(!is_not_found("error: update failed"));
    }
}
