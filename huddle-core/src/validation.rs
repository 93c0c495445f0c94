//! Business-invariant input validation.
//!
//! The transport layer validates shape and type; the validators here enforce
//! the bounds the core owns (community name and description lengths).

// ============================================================================
// Canonical validation limits — single source of truth for the entire codebase
// ============================================================================

/// Minimum community name length
pub const COMMUNITY_NAME_MIN: usize = 3;
/// Maximum community name length
pub const COMMUNITY_NAME_MAX: usize = 50;

/// Minimum community description length
pub const DESCRIPTION_MIN: usize = 10;
/// Maximum community description length
pub const DESCRIPTION_MAX: usize = 500;

/// Validation error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid {field}: {message}")]
    Field { field: String, message: String },

    #[error("Multiple validation errors: {0}")]
    Multiple(String),
}

/// Validation result
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Community name validator
pub struct CommunityNameValidator {
    min_length: usize,
    max_length: usize,
}

impl Default for CommunityNameValidator {
    fn default() -> Self {
        Self {
            min_length: COMMUNITY_NAME_MIN,
            max_length: COMMUNITY_NAME_MAX,
        }
    }
}

impl CommunityNameValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_length(mut self, min: usize, max: usize) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn validate(&self, name: &str) -> ValidationResult<()> {
        let len = name.chars().count();

        if len < self.min_length {
            return Err(ValidationError::Field {
                field: "name".to_string(),
                message: format!("must be at least {} characters", self.min_length),
            });
        }

        if len > self.max_length {
            return Err(ValidationError::Field {
                field: "name".to_string(),
                message: format!("must be at most {} characters", self.max_length),
            });
        }

        if name.chars().any(char::is_control) {
            return Err(ValidationError::Field {
                field: "name".to_string(),
                message: "cannot contain control characters".to_string(),
            });
        }

        Ok(())
    }
}

/// Community description validator
pub struct DescriptionValidator {
    min_length: usize,
    max_length: usize,
}

impl Default for DescriptionValidator {
    fn default() -> Self {
        Self {
            min_length: DESCRIPTION_MIN,
            max_length: DESCRIPTION_MAX,
        }
    }
}

impl DescriptionValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_length(mut self, min: usize, max: usize) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn validate(&self, description: &str) -> ValidationResult<()> {
        let len = description.chars().count();

        if len < self.min_length {
            return Err(ValidationError::Field {
                field: "description".to_string(),
                message: format!("must be at least {} characters", self.min_length),
            });
        }

        if len > self.max_length {
            return Err(ValidationError::Field {
                field: "description".to_string(),
                message: format!("must be at most {} characters", self.max_length),
            });
        }

        Ok(())
    }
}

/// Batch validator for multiple fields
pub struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn validate_field<F>(&mut self, _field: &str, result: ValidationResult<F>) -> &mut Self {
        if let Err(e) = result {
            self.errors.push(e);
        }
        self
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> ValidationResult<()> {
        let mut errors = self.errors;
        match errors.len() {
            0 => Ok(()),
            1 => match errors.pop() {
                Some(err) => Err(err),
                None => Ok(()),
            },
            _ => {
                let messages: Vec<String> = errors
                    .iter()
                    .map(std::string::ToString::to_string)
                    .collect();
                Err(ValidationError::Multiple(messages.join("; ")))
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_community_name_validation() {
        let validator = CommunityNameValidator::new();

        assert!(validator.validate("rustaceans").is_ok());
        assert!(validator.validate("abc").is_ok()); // exactly min
        assert!(validator.validate(&"a".repeat(50)).is_ok()); // exactly max

        assert!(validator.validate("ab").is_err()); // too short
        assert!(validator.validate(&"a".repeat(51)).is_err()); // too long
        assert!(validator.validate("bad\nname").is_err()); // control char
    }

    #[test]
    fn test_description_validation() {
        let validator = DescriptionValidator::new();

        assert!(validator.validate("a community for rust people").is_ok());
        assert!(validator.validate(&"d".repeat(10)).is_ok()); // exactly min
        assert!(validator.validate(&"d".repeat(500)).is_ok()); // exactly max

        assert!(validator.validate("too short").is_err()); // 9 chars
        assert!(validator.validate(&"d".repeat(501)).is_err());
    }

    #[test]
    fn test_name_length_counts_chars_not_bytes() {
        let validator = CommunityNameValidator::new();
        // three multibyte chars satisfy the 3-char minimum
        assert!(validator.validate("社区名").is_ok());
    }

    #[test]
    fn test_batch_validation_multiple_errors() {
        let mut validator = Validator::new();

        validator
            .validate_field("name", CommunityNameValidator::new().validate("ab"))
            .validate_field("description", DescriptionValidator::new().validate("short"));

        let result = validator.into_result();
        match result {
            Err(ValidationError::Multiple(msgs)) => {
                assert!(msgs.contains("name"));
                assert!(msgs.contains("description"));
            }
            other => panic!("Expected Multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_batch_validation_single_error_returns_field() {
        let mut validator = Validator::new();
        validator.validate_field("name", CommunityNameValidator::new().validate("ab"));
        match validator.into_result() {
            Err(ValidationError::Field { field, .. }) => assert_eq!(field, "name"),
            _ => panic!("Expected Field error for single validation failure"),
        }
    }
}
