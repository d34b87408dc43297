use thiserror::Error;

/// Result type alias for document builds
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that abort a document build.
///
/// Every variant is a configuration defect in the declared services or models.
/// A build that fails will fail the same way on every retry until the
/// declarations are fixed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Two distinct parameter descriptors were registered under one reference name
    #[error("parameter reference '{name}' is bound to two different parameters")]
    ParameterConflict { name: String },

    /// Two distinct response descriptors were registered under one reference name
    #[error("response reference '{name}' is bound to two different responses")]
    ResponseConflict { name: String },

    /// A non-body parameter or header whose type has no primitive kind
    #[error("cannot derive a primitive type for '{name}' from {type_name}")]
    UnsupportedParameterType { name: String, type_name: String },

    /// A struct key that is not present in the type registry
    #[error("type '{name}' is not registered")]
    UnresolvedType { name: String },

    /// A route or service path template that cannot be parsed
    #[error("malformed path template '{path}': {reason}")]
    MalformedPath { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_reference() {
        let err = BuildError::ParameterConflict {
            name: "userID".to_string(),
        };
        assert!(err.to_string().contains("userID"));
    }

    #[test]
    fn test_malformed_path_message() {
        let err = BuildError::MalformedPath {
            path: "/a/{b".to_string(),
            reason: "unclosed '{'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed path template '/a/{b': unclosed '{'"
        );
    }
}
