//! Options for [`JsonFile`](super::JsonFile).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::RetryPolicy;

/// A schema check run before every write and after every read.
pub type Validator<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// How a [`JsonFile`](super::JsonFile) reads and writes its document.
pub struct StoreOptions<T> {
    /// Extra attempts after the first for the retrying operations.
    pub retries: u32,
    /// Base delay, doubled on every retry.
    pub backoff: Duration,
    /// Create the parent directory on write.
    pub create_dir: bool,
    /// Spaces of indentation in the written JSON.
    pub indent: usize,
    pub validator: Option<Validator<T>>,
    /// Returned by reads when the file does not exist.
    pub default_value: Option<T>,
    /// Restrict written files to owner read/write.
    pub secure_mode: bool,
    /// Warn when a read file is readable or writable by group or others.
    pub warn_insecure: bool,
}

impl<T> StoreOptions<T> {
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_create_dir(mut self, create_dir: bool) -> Self {
        self.create_dir = create_dir;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_validator(
        mut self,
        validator: impl Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_default(mut self, value: T) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_secure_mode(mut self, secure_mode: bool) -> Self {
        self.secure_mode = secure_mode;
        self
    }

    pub fn with_warn_insecure(mut self, warn_insecure: bool) -> Self {
        self.warn_insecure = warn_insecure;
        self
    }

    /// The retry policy for the retrying operations.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.backoff)
    }

    /// Same settings for a different document type, without validator or default.
    pub fn retyped<U>(&self) -> StoreOptions<U> {
        StoreOptions {
            retries: self.retries,
            backoff: self.backoff,
            create_dir: self.create_dir,
            indent: self.indent,
            validator: None,
            default_value: None,
            secure_mode: self.secure_mode,
            warn_insecure: self.warn_insecure,
        }
    }
}

impl<T> Default for StoreOptions<T> {
    fn default() -> Self {
        Self {
            retries: RetryPolicy::DEFAULT_RETRIES,
            backoff: RetryPolicy::DEFAULT_BACKOFF,
            create_dir: true,
            indent: 2,
            validator: None,
            default_value: None,
            secure_mode: false,
            warn_insecure: false,
        }
    }
}

impl<T: Clone> Clone for StoreOptions<T> {
    fn clone(&self) -> Self {
        Self {
            retries: self.retries,
            backoff: self.backoff,
            create_dir: self.create_dir,
            indent: self.indent,
            validator: self.validator.clone(),
            default_value: self.default_value.clone(),
            secure_mode: self.secure_mode,
            warn_insecure: self.warn_insecure,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StoreOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("retries", &self.retries)
            .field("backoff", &self.backoff)
            .field("create_dir", &self.create_dir)
            .field("indent", &self.indent)
            .field("validator", &self.validator.is_some())
            .field("default_value", &self.default_value)
            .field("secure_mode", &self.secure_mode)
            .field("warn_insecure", &self.warn_insecure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn defaults() {
        let options = StoreOptions::<Value>::default();
        assert_eq!(options.retries, 3);
        assert_eq!(options.backoff, Duration::from_millis(100));
        assert!(options.create_dir);
        assert_eq!(options.indent, 2);
        assert!(options.validator.is_none());
        assert!(!options.secure_mode);
    }

    #[test]
    fn builder_sets_fields() {
        let options = StoreOptions::<Value>::default()
            .with_retries(5)
            .with_backoff(Duration::from_millis(1))
            .with_indent(4)
            .with_default(serde_json::json!({"count": 0}))
            .with_validator(|_| Ok(()))
            .with_secure_mode(true);

        assert_eq!(options.retry_policy(), RetryPolicy::new(5, Duration::from_millis(1)));
        assert_eq!(options.indent, 4);
        assert!(options.validator.is_some());
        assert!(options.default_value.is_some());
        assert!(options.secure_mode);
    }

    #[test]
    fn retyped_drops_typed_fields() {
        let options = StoreOptions::<Value>::default()
            .with_retries(1)
            .with_default(Value::Null);
        let other: StoreOptions<u32> = options.retyped();
        assert_eq!(other.retries, 1);
        assert!(other.default_value.is_none());
    }
}
