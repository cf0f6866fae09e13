//! Mapping native failures onto the catalog.

use std::error::Error;
use std::io;

use crate::error::{ClassifiedError, Context};

use super::ErrorCode;

/// Classify any error onto the catalog.
///
/// Checks, in order: an already-attached code, a native system error, and
/// finally a scan of the lowercased message. Never fails; anything
/// unrecognised is [`ErrorCode::Unknown`].
pub fn classify(err: &(dyn Error + 'static)) -> ErrorCode {
    if let Some(classified) = err.downcast_ref::<ClassifiedError>() {
        return classified.code();
    }

    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        if let Some(code) = classify_io(io_err) {
            return code;
        }
    }

    if let Some(json_err) = err.downcast_ref::<serde_json::Error>() {
        return if json_err.is_data() {
            ErrorCode::Schema
        } else {
            ErrorCode::Parse
        };
    }

    if err.downcast_ref::<serde_yaml::Error>().is_some() {
        return ErrorCode::Parse;
    }

    classify_message(&err.to_string())
}

/// Classify an `anyhow` error, looking through to the wrapped value.
pub fn classify_anyhow(err: &anyhow::Error) -> ErrorCode {
    let inner: &(dyn Error + Send + Sync + 'static) = err.as_ref();
    classify(inner)
}

/// Map an I/O error by OS error number, then by [`io::ErrorKind`].
///
/// Returns `None` when neither identifies a catalog entry, leaving the
/// caller to fall back on the message.
pub fn classify_io(err: &io::Error) -> Option<ErrorCode> {
    if let Some(code) = classify_errno(err) {
        return Some(code);
    }

    match err.kind() {
        io::ErrorKind::NotFound => Some(ErrorCode::NotFound),
        io::ErrorKind::PermissionDenied => Some(ErrorCode::AccessDenied),
        io::ErrorKind::AlreadyExists => Some(ErrorCode::AlreadyExists),
        io::ErrorKind::TimedOut => Some(ErrorCode::Timeout),
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => Some(ErrorCode::Invalid),
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => Some(ErrorCode::Network),
        _ => None,
    }
}

#[cfg(unix)]
fn classify_errno(err: &io::Error) -> Option<ErrorCode> {
    match err.raw_os_error()? {
        1 => Some(ErrorCode::NotPermitted),
        2 => Some(ErrorCode::NotFound),
        13 => Some(ErrorCode::AccessDenied),
        17 => Some(ErrorCode::AlreadyExists),
        20 => Some(ErrorCode::NotDirectory),
        21 => Some(ErrorCode::IsDirectory),
        30 => Some(ErrorCode::ReadOnlyFs),
        _ => None,
    }
}

#[cfg(not(unix))]
fn classify_errno(_err: &io::Error) -> Option<ErrorCode> {
    None
}

/// Heuristic scan of an error message.
pub fn classify_message(message: &str) -> ErrorCode {
    let message = message.to_lowercase();
    let has = |needle: &str| message.contains(needle);

    if has("permission denied") {
        ErrorCode::AccessDenied
    } else if has("no such file") || has("not found") {
        ErrorCode::NotFound
    } else if has("directory") && has("not exist") {
        ErrorCode::NoDirectory
    } else if has("already exists") {
        ErrorCode::AlreadyExists
    } else if has("timed out") || has("timeout") {
        ErrorCode::Timeout
    } else if has("network") || has("connection") {
        ErrorCode::Network
    } else if has("parse") || has("json") || has("yaml") {
        ErrorCode::Parse
    } else if has("invalid") || has("argument") {
        ErrorCode::Invalid
    } else {
        ErrorCode::Unknown
    }
}

/// Build a pre-classified error in one call.
pub fn create_typed(
    message: impl Into<String>,
    code: ErrorCode,
    cause: Option<anyhow::Error>,
    context: Context,
) -> ClassifiedError {
    let err = ClassifiedError::new(code, message).with_context_map(context);
    match cause {
        Some(cause) => err.with_cause(cause),
        None => err,
    }
}

/// Classify an I/O error into a [`ClassifiedError`] carrying it as source.
pub(crate) fn from_io(err: io::Error, message: impl Into<String>) -> ClassifiedError {
    let code = classify_io(&err).unwrap_or_else(|| classify_message(&err.to_string()));
    ClassifiedError::new(code, message).with_cause(err)
}

/// Whether the error's classification is marked recoverable.
pub fn is_recoverable(err: &(dyn Error + 'static)) -> bool {
    classify(err).is_recoverable()
}

/// The suggested fix for an error's classification.
pub fn suggested_fix(err: &(dyn Error + 'static)) -> &'static str {
    classify(err).kind().suggested_fix
}

/// The named auto-fix action for an error's classification, if any.
pub fn auto_fix(err: &(dyn Error + 'static)) -> Option<&'static str> {
    classify(err).kind().auto_fix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> io::Error {
        io::Error::new(io::ErrorKind::Other, text.to_string())
    }

    #[test]
    fn attached_code_wins() {
        let err = ClassifiedError::new(ErrorCode::Locked, "permission denied while locked");
        assert_eq!(classify(&err), ErrorCode::Locked);
    }

    #[test]
    fn io_kind_maps_natively() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(classify(&err), ErrorCode::NotFound);

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(classify(&err), ErrorCode::AccessDenied);

        let err = io::Error::new(io::ErrorKind::AlreadyExists, "there");
        assert_eq!(classify(&err), ErrorCode::AlreadyExists);
    }

    #[cfg(unix)]
    #[test]
    fn os_errno_maps_natively() {
        assert_eq!(
            classify(&io::Error::from_raw_os_error(30)),
            ErrorCode::ReadOnlyFs
        );
        assert_eq!(
            classify(&io::Error::from_raw_os_error(1)),
            ErrorCode::NotPermitted
        );
        assert_eq!(
            classify(&io::Error::from_raw_os_error(21)),
            ErrorCode::IsDirectory
        );
    }

    #[test]
    fn message_heuristics() {
        assert_eq!(classify(&msg("Permission denied (os)")), ErrorCode::AccessDenied);
        assert_eq!(classify(&msg("no such file or directory")), ErrorCode::NotFound);
        assert_eq!(classify(&msg("thing not found")), ErrorCode::NotFound);
        assert_eq!(classify(&msg("directory does not exist")), ErrorCode::NoDirectory);
        assert_eq!(classify(&msg("key already exists")), ErrorCode::AlreadyExists);
        assert_eq!(classify(&msg("request timed out")), ErrorCode::Timeout);
        assert_eq!(classify(&msg("Connection reset by peer")), ErrorCode::Network);
        assert_eq!(classify(&msg("bad JSON at line 3")), ErrorCode::Parse);
        assert_eq!(classify(&msg("invalid flag")), ErrorCode::Invalid);
        assert_eq!(classify(&msg("something odd")), ErrorCode::Unknown);
    }

    #[test]
    fn serde_syntax_errors_are_parse_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        assert_eq!(classify(&err), ErrorCode::Parse);

        let err = serde_yaml::from_str::<serde_yaml::Value>("a: [1").unwrap_err();
        assert_eq!(classify(&err), ErrorCode::Parse);
    }

    #[test]
    fn serde_data_errors_are_schema_errors() {
        let err = serde_json::from_str::<Vec<u32>>(r#"{"a": 1}"#).unwrap_err();
        assert!(err.is_data());
        assert_eq!(classify(&err), ErrorCode::Schema);
    }

    #[test]
    fn classify_anyhow_sees_through_wrapper() {
        let err = anyhow::Error::new(io::Error::new(io::ErrorKind::NotFound, "x"));
        assert_eq!(classify_anyhow(&err), ErrorCode::NotFound);

        let err = anyhow::anyhow!("value out of range: invalid");
        assert_eq!(classify_anyhow(&err), ErrorCode::Invalid);
    }

    #[test]
    fn create_typed_sets_everything() {
        let mut context = Context::new();
        context.insert("path".into(), "/tmp/x.json".into());
        let err = create_typed(
            "Modifier failed",
            ErrorCode::Invalid,
            Some(anyhow::anyhow!("boom")),
            context,
        );
        assert_eq!(err.code(), ErrorCode::Invalid);
        assert_eq!(err.context()["path"], "/tmp/x.json");
        assert_eq!(err.cause().map(|c| c.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn from_io_classifies_and_keeps_cause() {
        let err = from_io(
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            "Failed to open /x",
        );
        assert_eq!(err.code(), ErrorCode::AccessDenied);
        assert_eq!(err.message(), "Failed to open /x");
        assert!(err.cause().is_some());
    }

    #[test]
    fn helper_accessors() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(is_recoverable(&err));
        assert_eq!(auto_fix(&err), Some("create-missing-file"));
        assert!(suggested_fix(&err).contains("path"));

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(!is_recoverable(&err));
        assert_eq!(auto_fix(&err), None);
    }
}
