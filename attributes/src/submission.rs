use idp::models::{
    ClaimConfiguration, ClaimConfigurationUpdate, ClaimMapping, ClaimRef, DialectMode,
    LocalClaimRef, OidcSubject, RequestedClaim, RoleConfig, RoleMapping, SubjectConfig,
};
use url::Url;

use crate::{
    config::AttributeFeatures,
    error::{MappingError, ValidationError},
    reconciler::{AttributeState, MappingEntry},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectSettings {
    pub include_user_domain: bool,
    pub include_tenant_domain: bool,
    pub use_mapped_local_subject: bool,
    pub mapped_local_subject_mandatory: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSettings {
    /// Must be one of the subject options to be submitted.
    pub claim: Option<String>,
    pub include_user_domain: bool,
    pub mappings: Vec<RoleMapping>,
}

/// Settings edited next to the attribute selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvancedSettings {
    pub subject: SubjectSettings,
    pub role: RoleSettings,
    /// Only for applications with an OIDC inbound protocol.
    pub oidc_subject: Option<OidcSubject>,
}

impl AdvancedSettings {
    /// Settings as stored in the server-side configuration.
    pub fn from_configuration(configuration: &ClaimConfiguration) -> Self {
        let subject = configuration.subject.as_ref();
        let role = configuration.role.as_ref();

        Self {
            subject: SubjectSettings {
                include_user_domain: subject.and_then(|s| s.include_user_domain).unwrap_or(false),
                include_tenant_domain: subject
                    .and_then(|s| s.include_tenant_domain)
                    .unwrap_or(false),
                use_mapped_local_subject: subject
                    .and_then(|s| s.use_mapped_local_subject)
                    .unwrap_or(false),
                mapped_local_subject_mandatory: subject
                    .and_then(|s| s.mapped_local_subject_mandatory)
                    .unwrap_or(false),
            },
            role: RoleSettings {
                claim: role.and_then(|r| r.claim.as_ref()).map(|c| c.uri.clone()),
                include_user_domain: role.and_then(|r| r.include_user_domain).unwrap_or(false),
                mappings: role.and_then(|r| r.mappings.clone()).unwrap_or_default(),
            },
            oidc_subject: None,
        }
    }
}

/// Requests that persist an attribute selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub update: ClaimConfigurationUpdate,
    pub oidc_subject: Option<OidcSubject>,
}

impl AttributeState {
    fn emitted_mappings(&self) -> impl Iterator<Item = &MappingEntry> {
        let active = self.dialect.local && self.claim_mapping_on;
        self.mappings.iter().filter(move |m| active && m.add_mapping)
    }

    /// The claim mappings a submission would carry.
    ///
    /// A default subject claim that was carried implicitly is mapped onto
    /// itself (or its previous target) so the mapping table stays complete.
    pub fn final_mappings(&self) -> Vec<ClaimMapping> {
        let mut mappings: Vec<ClaimMapping> = self
            .emitted_mappings()
            .map(|entry| ClaimMapping {
                application_claim: entry.application_claim.trim().to_string(),
                local_claim: LocalClaimRef::new(entry.local_claim.claim_uri.clone()),
            })
            .collect();

        let default = &self.config.default_subject_claim;
        if let Some(implicit) = &self.implicit_subject {
            let covered = mappings.iter().any(|m| m.local_claim.uri == *default);
            let mapped_before = implicit.application_claim.is_some();
            if self.claim_mapping_on && !covered && (!mappings.is_empty() || mapped_before) {
                let application_claim = implicit
                    .application_claim
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| default.clone());
                mappings.push(ClaimMapping {
                    application_claim,
                    local_claim: LocalClaimRef::new(default.clone()),
                });
            }
        }

        mappings
    }

    /// Mappings that block submission: enabled mappings without a target,
    /// and targets shared by several claims.
    pub fn mapping_errors(&self) -> Vec<MappingError> {
        let mut errors: Vec<MappingError> = self
            .emitted_mappings()
            .filter(|m| m.application_claim.trim().is_empty())
            .map(|m| MappingError::EmptyTarget {
                local_claim_uri: m.local_claim.claim_uri.clone(),
            })
            .collect();

        let mut targets: Vec<(String, Vec<String>)> = Vec::new();
        for mapping in self.final_mappings() {
            if mapping.application_claim.is_empty() {
                continue;
            }
            match targets.iter_mut().find(|(t, _)| *t == mapping.application_claim) {
                Some((_, locals)) => locals.push(mapping.local_claim.uri),
                None => targets.push((mapping.application_claim, vec![mapping.local_claim.uri])),
            }
        }
        errors.extend(
            targets
                .into_iter()
                .filter(|(_, locals)| locals.len() > 1)
                .map(|(application_claim, local_claim_uris)| MappingError::DuplicateTarget {
                    application_claim,
                    local_claim_uris,
                }),
        );

        errors
    }

    fn requested_claims(&self, mappings: &[ClaimMapping], subject_value: &str) -> Vec<RequestedClaim> {
        let outbound = |local: &str| {
            mappings
                .iter()
                .find(|m| m.local_claim.uri == local)
                .map_or_else(|| local.to_string(), |m| m.application_claim.clone())
        };
        let mandatory_for = |uri: &str, mandatory: bool| {
            mandatory || (self.config.force_subject_mandatory && uri == subject_value)
        };

        let mut requested: Vec<RequestedClaim> = Vec::new();
        let mut add = |uri: String, mandatory: bool| {
            match requested.iter_mut().find(|r| r.claim.uri == uri) {
                Some(existing) => existing.mandatory |= mandatory,
                None => requested.push(RequestedClaim::new(uri, mandatory)),
            }
        };

        if self.dialect.local {
            for selected in &self.selected_claims {
                let is_subject = selected.claim.claim_uri == self.subject_claim;
                if !selected.requested && !is_subject {
                    continue;
                }
                let uri = outbound(&selected.claim.claim_uri);
                let mandatory = mandatory_for(&uri, selected.mandatory);
                add(uri, mandatory);
            }
        } else {
            for external in self.external_claims.iter().filter(|c| c.requested) {
                let uri = external.claim.mapped_local_claim_uri.clone();
                let mandatory = mandatory_for(&uri, external.mandatory);
                add(uri, mandatory);
            }
        }

        if let Some(implicit) = self.implicit_subject.as_ref().filter(|i| i.requested) {
            let uri = outbound(&self.config.default_subject_claim);
            let mandatory = mandatory_for(&uri, implicit.mandatory);
            add(uri, mandatory);
        }

        requested
    }
}

/// Builds the requests persisting `state`.
///
/// # Errors
/// - [`ValidationError::ClaimMappings`] if a mapping is empty or shared
/// - [`ValidationError::SectorIdentifierUri`] if the sector identifier is not
///   an absolute https URL
pub fn build_submission(
    state: &AttributeState,
    settings: &AdvancedSettings,
    features: &AttributeFeatures,
) -> Result<Submission, ValidationError> {
    let errors = state.mapping_errors();
    if !errors.is_empty() {
        return Err(ValidationError::ClaimMappings(errors));
    }
    let oidc_subject = settings.oidc_subject.clone().map(|mut subject| {
        subject.sector_identifier_uri = subject
            .sector_identifier_uri
            .filter(|uri| !uri.trim().is_empty());
        subject
    });
    if let Some(uri) = oidc_subject
        .as_ref()
        .and_then(|s| s.sector_identifier_uri.as_deref())
    {
        validate_sector_identifier_uri(uri)?;
    }

    let mut subject_value = state.subject_value();
    if subject_value.trim().is_empty() {
        subject_value = state.loaded_subject_uri().unwrap_or_default().to_string();
    }

    let claim_mappings = state.final_mappings();
    let requested_claims = state.requested_claims(&claim_mappings, &subject_value);
    let dialect = if claim_mappings.is_empty() {
        DialectMode::Local
    } else {
        DialectMode::Custom
    };

    let subject = (!features.exclude_subject_claim).then(|| SubjectConfig {
        claim: ClaimRef::new(subject_value.clone()),
        include_user_domain: features
            .show_include_user_domain_subject
            .then_some(settings.subject.include_user_domain),
        include_tenant_domain: features
            .show_include_tenant_domain
            .then_some(settings.subject.include_tenant_domain),
        use_mapped_local_subject: features
            .show_validate_linked_local_account
            .then_some(settings.subject.use_mapped_local_subject),
        mapped_local_subject_mandatory: features
            .show_mandate_linked_local_account
            .then_some(settings.subject.mapped_local_subject_mandatory),
    });

    let role_options: Vec<String> = state
        .subject_options()
        .into_iter()
        .map(|o| o.value)
        .collect();
    let role = RoleConfig {
        claim: settings
            .role
            .claim
            .as_ref()
            .filter(|_| features.show_role_attribute)
            .filter(|claim| role_options.contains(claim))
            .map(ClaimRef::new),
        include_user_domain: Some(settings.role.include_user_domain),
        mappings: (features.show_role_mapping && !settings.role.mappings.is_empty())
            .then(|| settings.role.mappings.clone()),
    };

    Ok(Submission {
        update: ClaimConfigurationUpdate {
            claim_configuration: ClaimConfiguration {
                dialect,
                claim_mappings: (!claim_mappings.is_empty()).then_some(claim_mappings),
                requested_claims,
                subject,
                role: Some(role),
            },
        },
        oidc_subject,
    })
}

fn validate_sector_identifier_uri(uri: &str) -> Result<(), ValidationError> {
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "https" && url.host().is_some() => Ok(()),
        _ => Err(ValidationError::SectorIdentifierUri(uri.to_string())),
    }
}
