use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("throttled calling {operation} after exhausting retries")]
    Throttled { operation: String },

    #[error("{operation} failed: {message}")]
    Sdk { operation: String, message: String },

    /// Access-denied is first-class per §7: recoverable at the item level
    /// (the calling account/region), never fatal. `sdk()` classifies into
    /// this variant automatically whenever the underlying SDK error message
    /// looks like an authorization failure, so every adapter gets this for
    /// free without special-casing each call site.
    #[error("access denied calling {operation}: {message}")]
    AccessDenied { operation: String, message: String },

    #[error("credentials could not be resolved: {0}")]
    Credentials(String),

    #[error("assume-role into {role_arn} failed: {message}")]
    AssumeRole { role_arn: String, message: String },

    #[error("config aggregator {0} not found")]
    AggregatorNotFound(String),

    #[error("organization access denied: {0}")]
    OrganizationAccessDenied(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] discovery_core::error::CoreError),
}

impl ProviderError {
    pub fn sdk(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        let operation = operation.into();
        let message = err.to_string();
        if is_access_denied_message(&message) {
            Self::AccessDenied { operation, message }
        } else {
            Self::Sdk { operation, message }
        }
    }

    /// `true` for any variant §4.4's "access-denied during assume/probe"
    /// fallback applies to: an explicit `AccessDenied`, an `AssumeRole`
    /// failure whose underlying message is an authorization failure, or
    /// the dedicated organization-access variant.
    pub fn is_access_denied(&self) -> bool {
        match self {
            Self::AccessDenied { .. } | Self::OrganizationAccessDenied(_) => true,
            Self::AssumeRole { message, .. } => is_access_denied_message(message),
            _ => false,
        }
    }
}

fn is_access_denied_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("accessdenied")
        || lower.contains("access denied")
        || lower.contains("not authorized")
        || lower.contains("unauthorizedaccess")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdk_classifies_access_denied_messages() {
        let err = ProviderError::sdk("ListTasks", "User is not authorized to perform this action");
        assert!(err.is_access_denied());
    }

    #[test]
    fn sdk_leaves_other_failures_as_plain_sdk_errors() {
        let err = ProviderError::sdk("ListTasks", "service unavailable");
        assert!(!err.is_access_denied());
        assert!(matches!(err, ProviderError::Sdk { .. }));
    }

    #[test]
    fn assume_role_failure_is_access_denied_only_when_the_message_says_so() {
        let denied = ProviderError::AssumeRole {
            role_arn: "arn:aws:iam::111111111111:role/x".into(),
            message: "AccessDenied".into(),
        };
        assert!(denied.is_access_denied());

        let other = ProviderError::AssumeRole {
            role_arn: "arn:aws:iam::111111111111:role/x".into(),
            message: "role does not exist".into(),
        };
        assert!(!other.is_access_denied());
    }
}
