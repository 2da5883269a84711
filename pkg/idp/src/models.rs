use serde::{Deserialize, Serialize};

/// Dialect id of the identity server's local claims.
pub const LOCAL_DIALECT_ID: &str = "local";

/// A claim of the local dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: String,
    #[serde(rename = "claimURI")]
    pub claim_uri: String,
    #[serde(rename = "dialectURI")]
    pub dialect_uri: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A claim of a non-local dialect, mapped onto exactly one local claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalClaim {
    pub id: String,
    #[serde(rename = "claimURI")]
    pub claim_uri: String,
    #[serde(rename = "claimDialectURI")]
    pub claim_dialect_uri: String,
    #[serde(rename = "mappedLocalClaimURI")]
    pub mapped_local_claim_uri: String,
    /// Joined from the local claim catalog, never sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_claim_display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDialect {
    pub id: String,
    #[serde(rename = "dialectURI")]
    pub dialect_uri: String,
}

/// An OIDC scope and the external claim URIs it releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcScope {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub claims: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialectMode {
    #[default]
    Local,
    Custom,
}

/// The claim configuration of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimConfiguration {
    pub dialect: DialectMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_mappings: Option<Vec<ClaimMapping>>,
    #[serde(default)]
    pub requested_claims: Vec<RequestedClaim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMapping {
    pub application_claim: String,
    pub local_claim: LocalClaimRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalClaimRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl LocalClaimRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            display_name: None,
            id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedClaim {
    pub claim: ClaimRef,
    #[serde(default)]
    pub mandatory: bool,
}

impl RequestedClaim {
    pub fn new(uri: impl Into<String>, mandatory: bool) -> Self {
        Self {
            claim: ClaimRef::new(uri),
            mandatory,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRef {
    pub uri: String,
}

impl ClaimRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectConfig {
    pub claim: ClaimRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_user_domain: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_tenant_domain: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_mapped_local_subject: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_local_subject_mandatory: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<ClaimRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_user_domain: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<Vec<RoleMapping>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMapping {
    pub local_role: String,
    pub application_role: String,
}

/// Body of the application PATCH request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimConfigurationUpdate {
    pub claim_configuration: ClaimConfiguration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    #[default]
    Public,
    Pairwise,
}

/// Subject settings of an application's OIDC inbound protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcSubject {
    pub subject_type: SubjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_identifier_uri: Option<String>,
}

/// Error document returned by the identity server on rejected requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub(crate) code: String,
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub(crate) trace_id: Option<String>,
}
