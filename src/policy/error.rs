use thiserror::Error;

/// Errors raised while loading or normalizing a provider policy document.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy document is not valid JSON: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot read policy document {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("profile name is empty")]
    EmptyProfileName,
    #[error("profile '{profile}' has a rule with an empty id")]
    EmptyRuleId { profile: String },
    #[error("profile '{profile}' declares rule '{id}' more than once")]
    DuplicateRuleId { profile: String, id: String },
    #[error("rule '{id}' in profile '{profile}' has an empty match pattern")]
    EmptyPattern { profile: String, id: String },
    #[error("rule '{id}' in profile '{profile}' has an empty reason")]
    EmptyReason { profile: String, id: String },
    #[error("rule '{id}' in profile '{profile}' resolves to valid without a deliverable decision")]
    InconsistentOutcome { profile: String, id: String },
}

impl PolicyError {
    pub(crate) fn json(source: serde_json::Error) -> Self {
        Self::Json { source }
    }

    pub(crate) fn read(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn duplicate(profile: &str, id: &str) -> Self {
        Self::DuplicateRuleId {
            profile: profile.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn empty_pattern(profile: &str, id: &str) -> Self {
        Self::EmptyPattern {
            profile: profile.to_string(),
            id: id.to_string(),
        }
    }
}
