use std::error::Error;

use setup::patched_host;
use url::Url;

pub const LOCAL_DIALECT_URI: &str = "http://wso2.org/claims";
pub const OIDC_DIALECT_URI: &str = "http://wso2.org/oidc/claim";
pub const DEFAULT_SUBJECT_CLAIM: &str = "http://wso2.org/claims/userid";

/// Policy the reconciler applies to every application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Local claim used as subject until the user picks another one.
    pub default_subject_claim: String,
    /// Whether the claim released as subject is always sent as mandatory.
    pub force_subject_mandatory: bool,
    pub local_dialect_uri: String,
    pub oidc_dialect_uri: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            default_subject_claim: DEFAULT_SUBJECT_CLAIM.to_string(),
            force_subject_mandatory: true,
            local_dialect_uri: LOCAL_DIALECT_URI.to_string(),
            oidc_dialect_uri: OIDC_DIALECT_URI.to_string(),
        }
    }
}

impl ReconcilerConfig {
    /// The dialect attributes are selected from: applications that only
    /// speak OIDC select OIDC claims, every other application local claims.
    #[must_use]
    pub fn dialect_uri(&self, only_oidc_configured: bool) -> &str {
        if only_oidc_configured {
            &self.oidc_dialect_uri
        } else {
            &self.local_dialect_uri
        }
    }
}

/// Which optional settings the deployment exposes. Hidden settings are left
/// out of the submitted configuration so the server keeps its own values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFeatures {
    pub show_include_user_domain_subject: bool,
    pub show_include_tenant_domain: bool,
    pub show_validate_linked_local_account: bool,
    pub show_mandate_linked_local_account: bool,
    pub show_role_mapping: bool,
    pub show_role_attribute: bool,
    /// Leave the subject out of the submission entirely.
    pub exclude_subject_claim: bool,
}

impl Default for AttributeFeatures {
    fn default() -> Self {
        Self {
            show_include_user_domain_subject: true,
            show_include_tenant_domain: true,
            show_validate_linked_local_account: true,
            show_mandate_linked_local_account: true,
            show_role_mapping: true,
            show_role_attribute: true,
            exclude_subject_claim: false,
        }
    }
}

/// Configuration of the `attributes` binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub idp_base_url: String,
    pub idp_access_token: String,
    pub app_id: String,
    pub only_oidc_configured: bool,
    /// Submit the rebuilt configuration instead of only printing it.
    pub apply: bool,
    pub reconciler: ReconcilerConfig,
    pub features: AttributeFeatures,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, if a flag is not
    /// `true` or `false`, or if `IDP_BASE_URL` is not a URL.
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars<F>(var: F) -> Result<Self, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| var(key).ok_or_else(|| format!("{key} must be set"));
        let flag = |key: &str, default: bool| -> Result<bool, Box<dyn Error>> {
            match var(key) {
                Some(value) => Ok(value
                    .parse::<bool>()
                    .map_err(|err| format!("{key}: {err}"))?),
                None => Ok(default),
            }
        };

        let mut reconciler = ReconcilerConfig::default();
        if let Some(claim) = var("DEFAULT_SUBJECT_CLAIM") {
            reconciler.default_subject_claim = claim;
        }
        reconciler.force_subject_mandatory = flag("FORCE_SUBJECT_MANDATORY", true)?;

        let features = AttributeFeatures {
            exclude_subject_claim: flag("EXCLUDE_SUBJECT_CLAIM", false)?,
            ..Default::default()
        };

        Ok(Self {
            idp_base_url: patched_url(&required("IDP_BASE_URL")?)?,
            idp_access_token: required("IDP_ACCESS_TOKEN")?,
            app_id: required("APP_ID")?,
            only_oidc_configured: flag("ONLY_OIDC_CONFIGURED", false)?,
            apply: flag("ATTRIBUTES_APPLY", false)?,
            reconciler,
            features,
        })
    }
}

fn patched_url(raw: &str) -> Result<String, Box<dyn Error>> {
    let mut url = Url::parse(raw)?;
    if let Some(host) = url.host_str() {
        let host = patched_host(host);
        url.set_host(Some(&host))?;
    }
    Ok(url.into())
}
