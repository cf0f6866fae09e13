//! Human-readable rendering of classified errors.

use std::error::Error;
use std::fmt::Write as _;

use crate::error::ClassifiedError;

use super::classify;

/// Options for [`format_error`].
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Append the chain of underlying causes.
    pub include_source_chain: bool,
    /// Include the suggested fix line.
    pub include_suggestion: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            include_source_chain: false,
            include_suggestion: true,
        }
    }
}

/// Render an error with its catalog metadata.
///
/// ```
/// use statekeep::taxonomy::{format_error, ErrorCode, FormatOptions};
/// use statekeep::ClassifiedError;
///
/// let err = ClassifiedError::new(ErrorCode::Parse, "Invalid JSON in /x.json");
/// let text = format_error(&err, FormatOptions::default());
/// assert!(text.starts_with("[EPARSE] Invalid JSON in /x.json"));
/// assert!(text.contains("Severity: high | Category: configuration"));
/// ```
pub fn format_error(err: &(dyn Error + 'static), options: FormatOptions) -> String {
    let code = classify(err);
    let kind = code.kind();

    let message = match err.downcast_ref::<ClassifiedError>() {
        Some(classified) => classified.message().to_string(),
        None => err.to_string(),
    };
    let message = if message.is_empty() {
        kind.message.to_string()
    } else {
        message
    };

    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", kind.code, message);
    let _ = write!(
        out,
        "  Severity: {} | Category: {}",
        kind.severity, kind.category
    );

    if options.include_suggestion {
        let _ = write!(out, "\n  Fix: {}", kind.suggested_fix);
    }

    if let Some(action) = kind.auto_fix {
        let _ = write!(out, "\n  Auto-fix available: {}", action);
    }

    if options.include_source_chain {
        let mut source = err.source();
        if source.is_some() {
            out.push_str("\n\nCaused by:");
        }
        let mut depth = 0;
        while let Some(cause) = source {
            let _ = write!(out, "\n  {}: {}", depth, cause);
            depth += 1;
            source = cause.source();
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::ErrorCode;

    #[test]
    fn renders_code_severity_and_fix() {
        let err = ClassifiedError::new(ErrorCode::AccessDenied, "Permission denied writing /a.json");
        let text = format_error(&err, FormatOptions::default());

        let expected = "[EACCES] Permission denied writing /a.json\n  \
            Severity: critical | Category: permission\n  \
            Fix: Check file and directory permissions. Try \"chmod +rw <path>\" or run with appropriate permissions";
        assert_eq!(text, expected);
    }

    #[test]
    fn renders_auto_fix_hint() {
        let err = ClassifiedError::new(ErrorCode::NotFound, "File not found: /a.json");
        let text = format_error(&err, FormatOptions::default());
        assert!(text.ends_with("Auto-fix available: create-missing-file"));
    }

    #[test]
    fn suggestion_can_be_suppressed() {
        let err = ClassifiedError::new(ErrorCode::Schema, "bad");
        let text = format_error(
            &err,
            FormatOptions {
                include_suggestion: false,
                ..FormatOptions::default()
            },
        );
        assert!(!text.contains("Fix:"));
        assert!(text.contains("Auto-fix available: validate-config"));
    }

    #[test]
    fn source_chain_is_opt_in() {
        let err = ClassifiedError::new(ErrorCode::Unknown, "Failed to write /a.json")
            .with_cause(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));

        let plain = format_error(&err, FormatOptions::default());
        assert!(!plain.contains("Caused by"));

        let chained = format_error(
            &err,
            FormatOptions {
                include_source_chain: true,
                ..FormatOptions::default()
            },
        );
        assert!(chained.contains("Caused by:\n  0: disk full"));
    }

    #[test]
    fn plain_errors_are_classified_first() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "request timed out");
        let text = format_error(&err, FormatOptions::default());
        assert!(text.starts_with("[ETIMEOUT] request timed out"));
    }

    #[test]
    fn empty_message_falls_back_to_catalog_text() {
        let err = ClassifiedError::new(ErrorCode::Conflict, "");
        let text = format_error(&err, FormatOptions::default());
        assert!(text.starts_with("[ECONFLICT] Operation conflicts with current state"));
    }
}
