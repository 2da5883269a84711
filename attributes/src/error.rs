use crate::alert::Alert;

/// Attribute settings errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to fetch the claim configuration: {source}")]
    FetchConfiguration { alert: Alert, source: idp::Error },

    #[error("invalid attribute settings: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to update the attribute settings: {source}")]
    Submit { alert: Alert, source: idp::Error },
}

impl Error {
    /// The alert to surface to the user, if the error carries one.
    #[must_use]
    pub fn alert(&self) -> Option<&Alert> {
        match self {
            Self::FetchConfiguration { alert, .. } | Self::Submit { alert, .. } => Some(alert),
            Self::Validation(_) => None,
        }
    }
}

/// Rejects a submission before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{} invalid claim mapping(s)", .0.len())]
    ClaimMappings(Vec<MappingError>),

    #[error("sector identifier URI must be an absolute https URL: {0}")]
    SectorIdentifierUri(String),
}

/// A claim mapping that blocks submission, addressed by the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("claim {local_claim_uri} is mapped to an empty application claim")]
    EmptyTarget { local_claim_uri: String },

    #[error("application claim {application_claim} is mapped from more than one claim")]
    DuplicateTarget {
        application_claim: String,
        local_claim_uris: Vec<String>,
    },
}
