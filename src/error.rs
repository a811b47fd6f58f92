//! Error types shared by the graphics settings engine and the mission loader.
//!
//! Only two kinds of failure stop a subsystem: broken configuration data and
//! shader requirements the hardware cannot meet. Everything else (full pools,
//! commands sent to a craft in the wrong state) is logged and recovered where
//! it happens, so it has no variant here.

use std::fmt;

/// Malformed or inconsistent configuration data.
#[derive(Debug)]
pub enum ConfigError {
    /// The JSON text could not be parsed into the expected structure.
    Json {
        /// What was being parsed (e.g. "mission", "classes").
        context: &'static str,
        source: serde_json::Error,
    },
    /// A class referenced by name does not exist in the class library.
    UnknownClass {
        kind: &'static str,
        name: String,
    },
    /// A named reference (team, trigger, profile, spacecraft) could not be resolved.
    UnknownReference {
        kind: &'static str,
        name: String,
        context: String,
    },
    /// Two spacecraft ended up with the same string ID.
    DuplicateId(String),
    /// A value is present but unusable.
    Invalid {
        context: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn json(context: &'static str, source: serde_json::Error) -> Self {
        ConfigError::Json { context, source }
    }

    pub fn invalid(context: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Json { context, source } => {
                write!(f, "invalid {} data: {}", context, source)
            }
            ConfigError::UnknownClass { kind, name } => {
                write!(f, "unknown {} class '{}'", kind, name)
            }
            ConfigError::UnknownReference {
                kind,
                name,
                context,
            } => write!(f, "{} references unknown {} '{}'", context, kind, name),
            ConfigError::DuplicateId(id) => write!(f, "duplicate spacecraft id '{}'", id),
            ConfigError::Invalid { context, reason } => write!(f, "{}: {}", context, reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised by the graphics settings engine.
#[derive(Debug)]
pub enum GraphicsError {
    /// A setter received a value that is not among the setting's options.
    /// Minor: the previous value stays in effect.
    InvalidOption { setting: &'static str, value: String },
    /// Even with every optional feature lowered to its floor the shader
    /// complexity needs more than the hardware offers.
    Unsatisfiable { complexity: String },
    /// The graphics configuration itself is broken.
    Config(ConfigError),
}

impl GraphicsError {
    /// Minor errors leave the engine usable and are meant to be shown to the
    /// user, not to stop anything.
    pub fn is_minor(&self) -> bool {
        matches!(self, GraphicsError::InvalidOption { .. })
    }
}

impl From<ConfigError> for GraphicsError {
    fn from(e: ConfigError) -> Self {
        GraphicsError::Config(e)
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::InvalidOption { setting, value } => {
                write!(f, "'{}' is not a valid option for {}", value, setting)
            }
            GraphicsError::Unsatisfiable { complexity } => write!(
                f,
                "shader complexity '{}' cannot be satisfied by this graphics device",
                complexity
            ),
            GraphicsError::Config(e) => write!(f, "graphics configuration: {}", e),
        }
    }
}

impl std::error::Error for GraphicsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphicsError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenience alias: a `Result` using `ConfigError` as the error type.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Convenience alias: a `Result` using `GraphicsError` as the error type.
pub type GraphicsResult<T> = Result<T, GraphicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_is_minor() {
        let err = GraphicsError::InvalidOption {
            setting: "texture quality",
            value: "ultra".to_string(),
        };
        assert!(err.is_minor());
        assert_eq!(
            err.to_string(),
            "'ultra' is not a valid option for texture quality"
        );

        let err = GraphicsError::Unsatisfiable {
            complexity: "normal".to_string(),
        };
        assert!(!err.is_minor());
    }

    #[test]
    fn test_json_error_keeps_source() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = ConfigError::json("mission", source);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("invalid mission data"));
    }
}
