//! Error-code contract shared by every orbit crate.
//!
//! Errors crossing the host/script boundary end up as plain strings in
//! a script's `{err, result}` table, so each error also carries a stable
//! machine-readable code. [`ErrorCode`] is that contract.
//!
//! # Example
//!
//! ```
//! use orbit_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum QueueError {
//!     Full,
//!     Gone,
//! }
//!
//! impl ErrorCode for QueueError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Full => "QUEUE_FULL",
//!             Self::Gone => "QUEUE_GONE",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Full)
//!     }
//! }
//!
//! assert_eq!(QueueError::Gone.code(), "QUEUE_GONE");
//! assert!(QueueError::Full.is_recoverable());
//! ```

/// Machine-readable classification of an error.
///
/// # Code Format
///
/// - UPPER_SNAKE_CASE
/// - prefixed with the owning layer (`DISPATCH_`, `LUA_`, `CONFIG_`)
/// - stable once published; scripts may match on them
pub trait ErrorCode {
    /// Returns the stable error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the same operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code is non-empty, prefixed and UPPER_SNAKE_CASE.
///
/// # Panics
///
/// Panics with a descriptive message when any check fails.
///
/// ```
/// use orbit_types::{assert_error_code, ErrorCode};
///
/// struct Timeout;
///
/// impl ErrorCode for Timeout {
///     fn code(&self) -> &'static str { "DISPATCH_TIMEOUT" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&Timeout, "DISPATCH_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Runs [`assert_error_code`] over every variant of an error enum.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
