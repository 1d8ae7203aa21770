//! Result type alias for the loader
//!
//! This module provides a convenient Result type alias that uses DeidError
//! as the error type.

use super::errors::DeidError;

/// Result type alias for loader operations
///
/// # Examples
///
/// ```
/// use deid_loader::domain::result::Result;
/// use deid_loader::domain::errors::DeidError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(DeidError::MalformedInput("missing header".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, DeidError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(DeidError::Other("test error".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i64> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
