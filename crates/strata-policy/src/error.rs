//! Validation result and error types.
//!
//! Validators never fail: they collect every violated rule into a
//! [`ValidationReport`] so callers can report all problems at once. A report
//! with errors converts into a [`ConfigurationError`], which blocks any call
//! to the stack engine.

use serde::Serialize;

/// Accumulated outcome of a validator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Record one violated rule.
    pub fn push(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_result(self) -> Result<(), ConfigurationError> {
        if self.valid {
            Ok(())
        } else {
            Err(ConfigurationError {
                errors: self.errors,
            })
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural problems with a deployment context or tenant configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render(.errors))]
pub struct ConfigurationError {
    pub errors: Vec<String>,
}

impl ConfigurationError {
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

fn render(errors: &[String]) -> String {
    match errors {
        [] => "invalid configuration".to_string(),
        [only] => format!("invalid configuration: {only}"),
        many => {
            let mut out = format!("invalid configuration ({} problems):", many.len());
            for message in many {
                out.push_str("\n  - ");
                out.push_str(message);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_starts_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_push_marks_invalid_and_converts() {
        let mut report = ValidationReport::new();
        report.push("org is required");
        report.push("location is required");
        assert!(!report.is_valid());

        let err = report.into_result().unwrap_err();
        assert_eq!(err.errors.len(), 2);
        let text = err.to_string();
        assert!(text.contains("2 problems"));
        assert!(text.contains("org is required"));
    }

    #[test]
    fn test_single_error_display() {
        let err = ConfigurationError::single("tenantId is required");
        assert_eq!(err.to_string(), "invalid configuration: tenantId is required");
    }
}
