//! Macro for implementing Display and FromStr for lowercase keyword enums
//!
//! This macro eliminates boilerplate for status enum conversions by providing
//! a single implementation for both Display and FromStr traits. It handles
//! case-insensitive parsing and consistent string representation.
//!
//! # Example
//!
//! ```rust
//! use odatalink_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum QueryState {
//!     Queued,
//!     Sent,
//!     Completed,
//! }
//!
//! impl_domain_status_conversions!(QueryState {
//!     Queued => "queued",
//!     Sent => "sent",
//!     Completed => "completed",
//! });
//! ```

/// Implements Display and FromStr traits for status enums
///
/// This macro generates:
/// - Display trait: converts enum variants to lowercase strings
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their string
///   representations
///
/// # Features
///
/// - Case-insensitive parsing (e.g., "PENDING", "pending", "Pending" all work)
/// - Consistent lowercase string output
/// - Descriptive error messages with enum name
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Stage {
        Queued,
        Built,
        Failed,
    }

    impl_domain_status_conversions!(Stage {
        Queued => "queued",
        Built => "built",
        Failed => "failed",
    });

    #[test]
    fn display_uses_keyword() {
        assert_eq!(Stage::Queued.to_string(), "queued");
        assert_eq!(Stage::Built.to_string(), "built");
    }

    #[test]
    fn parsing_ignores_case() {
        assert_eq!(Stage::from_str("FAILED").unwrap(), Stage::Failed);
        assert_eq!(Stage::from_str("Built").unwrap(), Stage::Built);
    }

    #[test]
    fn unknown_keyword_names_the_enum() {
        let err = Stage::from_str("sent").unwrap_err();
        assert!(err.contains("Invalid Stage: sent"));
    }
}
