//! Error context and chaining utilities
//!
//! Lets callers annotate a failing statement with the table or request
//! that produced it without losing the underlying error kind.

use super::Error;
use std::fmt;

/// Trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to the error
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<String>;

    /// Add context with lazy evaluation
    fn with_context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> ErrorContext<T> for Result<T, Error> {
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<String>,
    {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

/// Helper for walking an error chain
pub struct ErrorChain<'a> {
    error: &'a Error,
    chain: Vec<String>,
}

impl<'a> ErrorChain<'a> {
    pub fn new(error: &'a Error) -> Self {
        let mut chain = Vec::new();
        Self::build_chain(error, &mut chain);
        Self { error, chain }
    }

    fn build_chain(error: &Error, chain: &mut Vec<String>) {
        chain.push(error.to_string());

        if let Error::WithContext { source, .. } = error {
            Self::build_chain(source, chain);
        }
    }

    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    pub fn root_cause(&self) -> &Error {
        self.error.root()
    }

    /// Format the error chain for logging
    pub fn format_for_log(&self) -> String {
        self.chain.join(" -> ")
    }
}

impl<'a> fmt::Display for ErrorChain<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_for_log())
    }
}

/// Extension trait for Option types
pub trait OptionExt<T> {
    /// Convert None to an invalid-params error
    fn or_invalid<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<String>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_invalid<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<String>,
    {
        self.ok_or_else(|| Error::invalid_params(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_chaining() {
        let error = Error::execution("duplicate key")
            .with_context("inserting into users")
            .with_context("upsert users");

        let chain = ErrorChain::new(&error);
        assert_eq!(chain.chain().len(), 3);
        assert_eq!(
            chain.format_for_log(),
            "upsert users -> inserting into users -> Execution failed: duplicate key"
        );
        assert!(matches!(chain.root_cause(), Error::Execution(_)));
    }

    #[test]
    fn test_result_context() {
        let result: Result<(), Error> = Err(Error::invalid_params("missing distinct"));
        let err = result.context("reading users").unwrap_err();
        assert_eq!(err.error_code(), "E_INVALID_PARAMS");
    }

    #[test]
    fn test_option_or_invalid() {
        let none_value: Option<&str> = None;
        let err = none_value.or_invalid("distinct field required").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameters: distinct field required"
        );
    }
}
