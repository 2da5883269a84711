#![cfg(test)]

use idp::models::{
    Claim, ClaimConfiguration, ClaimDialect, ClaimRef, DialectMode, ExternalClaim, OidcScope,
    RoleConfig, SubjectConfig,
};

use crate::{
    catalog::{Catalog, SelectedDialect},
    config::{LOCAL_DIALECT_URI, OIDC_DIALECT_URI, ReconcilerConfig},
    reconciler::{AttributeState, SelectedExternalClaim},
    submission::AdvancedSettings,
};

pub const USERID: &str = "http://wso2.org/claims/userid";
pub const EMAIL: &str = "http://wso2.org/claims/emailaddress";
pub const GIVEN_NAME: &str = "http://wso2.org/claims/givenname";
pub const ROLE: &str = "http://wso2.org/claims/role";

pub fn fixture_claim<F>(mut func: F) -> Claim
where
    F: FnMut(&mut Claim),
{
    let mut claim = Claim {
        id: "dXNlcmlk".to_string(),
        claim_uri: USERID.to_string(),
        dialect_uri: LOCAL_DIALECT_URI.to_string(),
        display_name: "User ID".to_string(),
        description: None,
    };
    func(&mut claim);
    claim
}

pub fn fixture_local_claims() -> Vec<Claim> {
    [
        (USERID, "User ID"),
        (EMAIL, "Email"),
        (GIVEN_NAME, "First Name"),
        (ROLE, "Role"),
    ]
    .into_iter()
    .map(|(uri, name)| {
        fixture_claim(|c| {
            c.id = uri.rsplit('/').next().unwrap().to_string();
            c.claim_uri = uri.to_string();
            c.display_name = name.to_string();
        })
    })
    .collect()
}

pub fn fixture_external_claim<F>(mut func: F) -> ExternalClaim
where
    F: FnMut(&mut ExternalClaim),
{
    let mut claim = ExternalClaim {
        id: "ZW1haWw".to_string(),
        claim_uri: "email".to_string(),
        claim_dialect_uri: OIDC_DIALECT_URI.to_string(),
        mapped_local_claim_uri: EMAIL.to_string(),
        local_claim_display_name: None,
    };
    func(&mut claim);
    claim
}

pub fn fixture_external_claims() -> Vec<ExternalClaim> {
    [
        ("email", EMAIL, "Email"),
        ("given_name", GIVEN_NAME, "First Name"),
        ("sub", USERID, "User ID"),
    ]
    .into_iter()
    .map(|(uri, local, name)| {
        fixture_external_claim(|c| {
            c.id = uri.to_string();
            c.claim_uri = uri.to_string();
            c.mapped_local_claim_uri = local.to_string();
            c.local_claim_display_name = Some(name.to_string());
        })
    })
    .collect()
}

pub fn fixture_selected_external_claim<F>(mut func: F) -> SelectedExternalClaim
where
    F: FnMut(&mut SelectedExternalClaim),
{
    let mut claim = SelectedExternalClaim {
        claim: fixture_external_claim(|_| {}),
        requested: false,
        mandatory: false,
    };
    func(&mut claim);
    claim
}

pub fn fixture_dialect<F>(mut func: F) -> ClaimDialect
where
    F: FnMut(&mut ClaimDialect),
{
    let mut dialect = ClaimDialect {
        id: "b2lkYw".to_string(),
        dialect_uri: OIDC_DIALECT_URI.to_string(),
    };
    func(&mut dialect);
    dialect
}

pub fn fixture_scope<F>(mut func: F) -> OidcScope
where
    F: FnMut(&mut OidcScope),
{
    let mut scope = OidcScope {
        name: "email".to_string(),
        display_name: "Email".to_string(),
        description: Some("Email address scope".to_string()),
        claims: vec!["email".to_string()],
    };
    func(&mut scope);
    scope
}

pub fn fixture_scopes() -> Vec<OidcScope> {
    vec![
        fixture_scope(|_| {}),
        fixture_scope(|s| {
            s.name = "profile".to_string();
            s.display_name = "Profile".to_string();
            s.description = None;
            s.claims = vec!["given_name".to_string()];
        }),
    ]
}

pub fn fixture_configuration<F>(mut func: F) -> ClaimConfiguration
where
    F: FnMut(&mut ClaimConfiguration),
{
    let mut configuration = ClaimConfiguration {
        dialect: DialectMode::Local,
        claim_mappings: None,
        requested_claims: Vec::new(),
        subject: Some(SubjectConfig {
            claim: ClaimRef::new(USERID),
            include_user_domain: Some(false),
            include_tenant_domain: Some(false),
            use_mapped_local_subject: Some(false),
            mapped_local_subject_mandatory: Some(false),
        }),
        role: Some(RoleConfig {
            claim: Some(ClaimRef::new(ROLE)),
            include_user_domain: Some(true),
            mappings: None,
        }),
    };
    func(&mut configuration);
    configuration
}

pub fn fixture_settings<F>(mut func: F) -> AdvancedSettings
where
    F: FnMut(&mut AdvancedSettings),
{
    let mut settings = AdvancedSettings::from_configuration(&fixture_configuration(|_| {}));
    func(&mut settings);
    settings
}

pub fn fixture_local_catalog() -> Catalog {
    Catalog {
        dialect: SelectedDialect::local(LOCAL_DIALECT_URI),
        local_claims: fixture_local_claims(),
        external_claims: Vec::new(),
    }
}

pub fn fixture_external_catalog() -> Catalog {
    Catalog {
        dialect: SelectedDialect {
            id: "b2lkYw".to_string(),
            dialect_uri: OIDC_DIALECT_URI.to_string(),
            local: false,
        },
        local_claims: fixture_local_claims(),
        external_claims: fixture_external_claims(),
    }
}

pub fn fixture_state(
    config: ReconcilerConfig,
    catalog: Catalog,
    configuration: &ClaimConfiguration,
) -> AttributeState {
    AttributeState::new(config, catalog, fixture_scopes(), configuration)
}

pub fn fixture_local_state(configuration: &ClaimConfiguration) -> AttributeState {
    fixture_state(ReconcilerConfig::default(), fixture_local_catalog(), configuration)
}

pub fn fixture_external_state(configuration: &ClaimConfiguration) -> AttributeState {
    fixture_state(ReconcilerConfig::default(), fixture_external_catalog(), configuration)
}
