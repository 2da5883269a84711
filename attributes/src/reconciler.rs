//! In-memory attribute selection of one application.
//!
//! [`AttributeState`] is initialised from the catalog and the server-side
//! claim configuration, then evolves through [`AttributeState::apply`], one
//! user edit at a time. Everything the UI renders is derived on demand.

use std::collections::HashSet;

use idp::models::{Claim, ClaimConfiguration, DialectMode, ExternalClaim, OidcScope};
use tracing::{debug, warn};

use crate::{
    catalog::{Catalog, SelectedDialect},
    config::ReconcilerConfig,
    scopes::{ScopeGroup, group_by_scopes},
};

/// A selected local claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedClaim {
    pub claim: Claim,
    pub requested: bool,
    pub mandatory: bool,
}

/// An external claim with its selection flags. It counts as selected
/// while it is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedExternalClaim {
    pub claim: ExternalClaim,
    pub requested: bool,
    pub mandatory: bool,
}

/// Presentation of a selected local claim to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub local_claim: Claim,
    pub application_claim: String,
    pub add_mapping: bool,
}

/// The default subject claim while it is present without being selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImplicitSubject {
    pub(crate) application_claim: Option<String>,
    pub(crate) requested: bool,
    pub(crate) mandatory: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimFlags {
    pub requested: bool,
    pub mandatory: bool,
    pub read_only: bool,
}

/// A single user edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeEvent {
    /// Adds local claims to the selection.
    SelectClaims(Vec<String>),
    /// Removes local claims from the selection.
    DeselectClaims(Vec<String>),
    /// Local claim URI for the local dialect, external claim URI otherwise.
    SetRequested { claim_uri: String, requested: bool },
    /// Local claim URI for the local dialect, external claim URI otherwise.
    SetMandatory { claim_uri: String, mandatory: bool },
    /// Requests or releases every claim of a scope. The empty name addresses
    /// the claims no scope releases.
    SelectScope { name: String, selected: bool },
    EnableClaimMapping,
    DisableClaimMapping,
    SetMappingTarget {
        local_claim_uri: String,
        application_claim: String,
    },
    SetMappingEnabled { local_claim_uri: String, enabled: bool },
    /// Local URI of the claim to use as subject.
    SelectSubject(String),
}

/// Selected claims of either dialect, as returned by
/// [`AttributeState::filter_selected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedView<'a> {
    Local(Vec<&'a SelectedClaim>),
    External(Vec<&'a SelectedExternalClaim>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeState {
    pub(crate) config: ReconcilerConfig,
    pub(crate) dialect: SelectedDialect,
    pub(crate) local_claims: Vec<Claim>,
    pub(crate) selected_claims: Vec<SelectedClaim>,
    pub(crate) external_claims: Vec<SelectedExternalClaim>,
    pub(crate) scopes: Vec<OidcScope>,
    pub(crate) mappings: Vec<MappingEntry>,
    pub(crate) claim_mapping_on: bool,
    /// Local URI of the subject claim.
    pub(crate) subject_claim: String,
    pub(crate) implicit_subject: Option<ImplicitSubject>,
    pub(crate) loaded_subject_uri: Option<String>,
}

/// Lookups over the configuration the state is initialised from.
struct InitialSelection<'a> {
    custom: bool,
    /// `(local claim, application claim)`, only for the custom dialect.
    mappings: Vec<(&'a str, &'a str)>,
    /// `(claim, mandatory)`
    requested: Vec<(&'a str, bool)>,
}

impl<'a> InitialSelection<'a> {
    fn new(configuration: &'a ClaimConfiguration) -> Self {
        let custom = configuration.dialect == DialectMode::Custom;
        let mappings = if custom {
            configuration
                .claim_mappings
                .iter()
                .flatten()
                .map(|m| (m.local_claim.uri.as_str(), m.application_claim.as_str()))
                .collect()
        } else {
            Vec::new()
        };
        let requested = configuration
            .requested_claims
            .iter()
            .map(|r| (r.claim.uri.as_str(), r.mandatory))
            .collect();

        Self {
            custom,
            mappings,
            requested,
        }
    }

    /// Local claim URIs selected by the configuration, in server order.
    fn selected_uris(&self) -> Vec<&'a str> {
        let uris = if self.custom {
            self.mappings.iter().map(|(local, _)| *local).collect::<Vec<_>>()
        } else {
            self.requested.iter().map(|(uri, _)| *uri).collect()
        };
        let mut seen = HashSet::new();
        uris.into_iter().filter(|uri| seen.insert(*uri)).collect()
    }

    fn target_of(&self, local_uri: &str) -> Option<&'a str> {
        self.mappings
            .iter()
            .find(|(local, _)| *local == local_uri)
            .map(|(_, target)| *target)
    }

    /// Maps a URI the application sees back to its local claim.
    fn local_uri_of(&self, uri: &str) -> String {
        self.mappings
            .iter()
            .find(|(_, target)| *target == uri)
            .map_or(uri, |(local, _)| *local)
            .to_string()
    }

    /// The requested entry of a local claim: through its mapping if it has
    /// one, else by its own URI. Returns the entry's mandatory flag.
    fn entry_for(&self, local_uri: &str) -> Option<bool> {
        let uri = self.target_of(local_uri).unwrap_or(local_uri);
        self.requested
            .iter()
            .find(|(requested, _)| *requested == uri)
            .map(|(_, mandatory)| *mandatory)
    }

    fn is_requested(&self, local_uri: &str) -> bool {
        !self.custom || self.entry_for(local_uri).is_some()
    }
}

impl AttributeState {
    /// Reconciles the server-side configuration with the claim catalog.
    ///
    /// Claims the catalog does not know are dropped with a warning. For local
    /// claims the default subject claim, while it is the subject, is kept out
    /// of the selection and carried implicitly instead.
    pub fn new(
        config: ReconcilerConfig,
        catalog: Catalog,
        scopes: Vec<OidcScope>,
        configuration: &ClaimConfiguration,
    ) -> Self {
        let initial = InitialSelection::new(configuration);
        let loaded_subject_uri = configuration
            .subject
            .as_ref()
            .map(|s| s.claim.uri.clone())
            .filter(|uri| !uri.is_empty());
        let subject_claim = loaded_subject_uri
            .as_deref()
            .map_or_else(|| config.default_subject_claim.clone(), |uri| initial.local_uri_of(uri));

        let mut state = Self {
            config,
            dialect: catalog.dialect,
            local_claims: catalog.local_claims,
            selected_claims: Vec::new(),
            external_claims: Vec::new(),
            scopes,
            mappings: Vec::new(),
            claim_mapping_on: false,
            subject_claim,
            implicit_subject: None,
            loaded_subject_uri,
        };

        let default_subject = state.config.default_subject_claim.clone();
        let selected = initial.selected_uris();
        if state.dialect.local
            && state.subject_claim == default_subject
            && selected.contains(&default_subject.as_str())
        {
            let mandatory = initial.entry_for(&default_subject);
            state.implicit_subject = Some(ImplicitSubject {
                application_claim: initial.target_of(&default_subject).map(str::to_string),
                requested: mandatory.is_some(),
                mandatory: mandatory.unwrap_or(false),
            });
        }

        if state.dialect.local {
            state.init_local(&initial, &selected);
        } else {
            state.init_external(&initial, &selected, catalog.external_claims);
        }

        state.normalize_subject();
        state
    }

    fn init_local(&mut self, initial: &InitialSelection<'_>, selected: &[&str]) {
        for uri in selected {
            if self.implicit_subject.is_some() && *uri == self.config.default_subject_claim {
                continue;
            }
            let Some(claim) = self.local_claim(uri).cloned() else {
                warn!(claim_uri = uri, "selected claim is not in the catalog, dropping it");
                continue;
            };

            self.selected_claims.push(SelectedClaim {
                claim: claim.clone(),
                requested: initial.is_requested(uri),
                mandatory: initial.entry_for(uri).unwrap_or(false),
            });
            self.mappings.push(MappingEntry {
                local_claim: claim,
                application_claim: initial.target_of(uri).unwrap_or_default().to_string(),
                add_mapping: initial.custom,
            });
        }
        self.claim_mapping_on = initial.custom;
    }

    fn init_external(
        &mut self,
        initial: &InitialSelection<'_>,
        selected: &[&str],
        external_claims: Vec<ExternalClaim>,
    ) {
        for uri in selected {
            if self.local_claim(uri).is_none() {
                warn!(claim_uri = uri, "selected claim is not in the catalog, dropping it");
            }
        }

        self.external_claims = external_claims
            .into_iter()
            .map(|claim| {
                let local = claim.mapped_local_claim_uri.as_str();
                let requested = selected.contains(&local);
                let mandatory = requested && initial.entry_for(local).unwrap_or(false);
                SelectedExternalClaim {
                    claim,
                    requested,
                    mandatory,
                }
            })
            .collect();
    }

    /// Applies one edit and returns the reconciled state.
    #[must_use]
    pub fn apply(mut self, event: AttributeEvent) -> Self {
        match event {
            AttributeEvent::SelectClaims(uris) => self.select_claims(&uris),
            AttributeEvent::DeselectClaims(uris) => self.deselect_claims(&uris),
            AttributeEvent::SetRequested {
                claim_uri,
                requested,
            } => self.set_requested(&claim_uri, requested),
            AttributeEvent::SetMandatory {
                claim_uri,
                mandatory,
            } => self.set_mandatory(&claim_uri, mandatory),
            AttributeEvent::SelectScope { name, selected } => self.select_scope(&name, selected),
            AttributeEvent::EnableClaimMapping => self.enable_claim_mapping(),
            AttributeEvent::DisableClaimMapping => self.disable_claim_mapping(),
            AttributeEvent::SetMappingTarget {
                local_claim_uri,
                application_claim,
            } => self.set_mapping_target(&local_claim_uri, application_claim),
            AttributeEvent::SetMappingEnabled {
                local_claim_uri,
                enabled,
            } => self.set_mapping_enabled(&local_claim_uri, enabled),
            AttributeEvent::SelectSubject(local_claim_uri) => self.select_subject(local_claim_uri),
        }
        self.normalize_subject();
        self
    }

    fn select_claims(&mut self, uris: &[String]) {
        if !self.dialect.local {
            debug!("claims of an external dialect are selected through scopes, ignoring");
            return;
        }
        for uri in uris {
            if self.selected_claim(uri).is_some() {
                continue;
            }
            let Some(claim) = self.local_claim(uri).cloned() else {
                warn!(claim_uri = %uri, "claim is not in the catalog, ignoring");
                continue;
            };

            let implicit = if *uri == self.config.default_subject_claim {
                self.implicit_subject.take()
            } else {
                None
            };
            let application_claim = implicit
                .as_ref()
                .and_then(|i| i.application_claim.clone())
                .unwrap_or_else(|| {
                    if self.claim_mapping_on {
                        uri.clone()
                    } else {
                        String::new()
                    }
                });

            self.selected_claims.push(SelectedClaim {
                claim: claim.clone(),
                requested: true,
                mandatory: implicit.is_some_and(|i| i.mandatory),
            });
            self.mappings.push(MappingEntry {
                local_claim: claim,
                application_claim,
                add_mapping: self.claim_mapping_on,
            });
        }
    }

    fn deselect_claims(&mut self, uris: &[String]) {
        self.selected_claims
            .retain(|c| !uris.contains(&c.claim.claim_uri));
        self.mappings
            .retain(|m| !uris.contains(&m.local_claim.claim_uri));
    }

    fn set_requested(&mut self, claim_uri: &str, requested: bool) {
        if self.is_read_only(claim_uri) {
            debug!(claim_uri, "flags of the subject claim are fixed, ignoring");
            return;
        }

        if !self.dialect.local {
            for external in self.external_claims_mut(claim_uri) {
                external.requested = requested;
                if !requested {
                    external.mandatory = false;
                }
            }
            return;
        }

        match (self.selected_claim(claim_uri).is_some(), requested) {
            (false, true) => self.select_claims(&[claim_uri.to_string()]),
            (false, false) => {
                if let Some(implicit) = self.implicit_subject_mut(claim_uri) {
                    implicit.requested = false;
                    implicit.mandatory = false;
                }
            }
            (true, false) if !self.claim_mapping_on => {
                self.deselect_claims(&[claim_uri.to_string()]);
            }
            (true, _) => {
                if let Some(claim) = self.selected_claim_mut(claim_uri) {
                    claim.requested = requested;
                    if !requested {
                        claim.mandatory = false;
                    }
                }
            }
        }
    }

    fn set_mandatory(&mut self, claim_uri: &str, mandatory: bool) {
        if self.is_read_only(claim_uri) {
            debug!(claim_uri, "flags of the subject claim are fixed, ignoring");
            return;
        }

        if !self.dialect.local {
            for external in self.external_claims_mut(claim_uri) {
                external.mandatory = mandatory;
                if mandatory {
                    external.requested = true;
                }
            }
            return;
        }

        if self.selected_claim(claim_uri).is_none() {
            if mandatory {
                self.select_claims(&[claim_uri.to_string()]);
            } else if let Some(implicit) = self.implicit_subject_mut(claim_uri) {
                implicit.mandatory = false;
            }
        }
        if let Some(claim) = self.selected_claim_mut(claim_uri) {
            claim.mandatory = mandatory;
            if mandatory {
                claim.requested = true;
            }
        }
    }

    fn select_scope(&mut self, name: &str, selected: bool) {
        if self.dialect.local {
            debug!(scope = name, "local claims are not grouped by scope, ignoring");
            return;
        }

        let members: Vec<String> = if name.is_empty() {
            self.external_claims
                .iter()
                .map(|c| c.claim.claim_uri.clone())
                .filter(|uri| !self.scopes.iter().any(|s| s.claims.contains(uri)))
                .collect()
        } else {
            match self.scopes.iter().find(|s| s.name == name) {
                Some(scope) => scope.claims.clone(),
                None => {
                    warn!(scope = name, "unknown scope, ignoring");
                    return;
                }
            }
        };

        for uri in &members {
            if self.is_read_only(uri) {
                continue;
            }
            for external in self.external_claims_mut(uri) {
                external.requested = selected;
                if !selected {
                    external.mandatory = false;
                }
            }
        }
    }

    fn enable_claim_mapping(&mut self) {
        if !self.dialect.local {
            debug!("claim mapping is only available for local claims, ignoring");
            return;
        }
        self.claim_mapping_on = true;
        for entry in &mut self.mappings {
            entry.add_mapping = true;
            if entry.application_claim.is_empty() {
                entry.application_claim = entry.local_claim.claim_uri.clone();
            }
        }
    }

    fn disable_claim_mapping(&mut self) {
        if !self.claim_mapping_on {
            return;
        }
        self.claim_mapping_on = false;
        for entry in &mut self.mappings {
            entry.add_mapping = false;
            entry.application_claim.clear();
        }

        // Without mappings only requested claims stay selected.
        let unrequested: Vec<String> = self
            .selected_claims
            .iter()
            .filter(|c| !c.requested)
            .map(|c| c.claim.claim_uri.clone())
            .collect();
        self.deselect_claims(&unrequested);
    }

    fn set_mapping_target(&mut self, local_claim_uri: &str, application_claim: String) {
        if !self.claim_mapping_on {
            debug!(local_claim_uri, "claim mapping is disabled, ignoring");
            return;
        }
        match self.mapping_mut(local_claim_uri) {
            Some(entry) => {
                entry.application_claim = application_claim;
                entry.add_mapping = true;
            }
            None => debug!(local_claim_uri, "claim is not selected, ignoring"),
        }
    }

    fn set_mapping_enabled(&mut self, local_claim_uri: &str, enabled: bool) {
        if !self.claim_mapping_on {
            debug!(local_claim_uri, "claim mapping is disabled, ignoring");
            return;
        }
        match self.mapping_mut(local_claim_uri) {
            Some(entry) => entry.add_mapping = enabled,
            None => debug!(local_claim_uri, "claim is not selected, ignoring"),
        }
    }

    fn local_claim(&self, uri: &str) -> Option<&Claim> {
        self.local_claims.iter().find(|c| c.claim_uri == uri)
    }

    fn selected_claim(&self, uri: &str) -> Option<&SelectedClaim> {
        self.selected_claims.iter().find(|c| c.claim.claim_uri == uri)
    }

    fn selected_claim_mut(&mut self, uri: &str) -> Option<&mut SelectedClaim> {
        self.selected_claims
            .iter_mut()
            .find(|c| c.claim.claim_uri == uri)
    }

    fn external_claims_mut<'s>(
        &'s mut self,
        claim_uri: &'s str,
    ) -> impl Iterator<Item = &'s mut SelectedExternalClaim> + 's {
        self.external_claims
            .iter_mut()
            .filter(move |c| c.claim.claim_uri == claim_uri)
    }

    fn implicit_subject_mut(&mut self, local_claim_uri: &str) -> Option<&mut ImplicitSubject> {
        if local_claim_uri != self.config.default_subject_claim {
            return None;
        }
        self.implicit_subject.as_mut()
    }

    pub(crate) fn mapping(&self, local_claim_uri: &str) -> Option<&MappingEntry> {
        self.mappings
            .iter()
            .find(|m| m.local_claim.claim_uri == local_claim_uri)
    }

    fn mapping_mut(&mut self, local_claim_uri: &str) -> Option<&mut MappingEntry> {
        self.mappings
            .iter_mut()
            .find(|m| m.local_claim.claim_uri == local_claim_uri)
    }

    /// Resolves a claim URI of the active dialect to its local claim URI.
    pub(crate) fn local_uri_of<'s>(&'s self, claim_uri: &'s str) -> &'s str {
        if self.dialect.local {
            return claim_uri;
        }
        self.external_claims
            .iter()
            .find(|c| c.claim.claim_uri == claim_uri)
            .map_or(claim_uri, |c| c.claim.mapped_local_claim_uri.as_str())
    }

    /// Whether the requested and mandatory flags of a claim are fixed, which
    /// holds for the claim currently used as subject.
    #[must_use]
    pub fn is_read_only(&self, claim_uri: &str) -> bool {
        self.local_uri_of(claim_uri) == self.subject_claim
    }
}

/// Derived selectors.
impl AttributeState {
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn dialect(&self) -> &SelectedDialect {
        &self.dialect
    }

    pub fn selected_claims(&self) -> &[SelectedClaim] {
        &self.selected_claims
    }

    /// Local claims that can still be added to the selection.
    pub fn available_claims(&self) -> Vec<&Claim> {
        self.local_claims
            .iter()
            .filter(|c| self.selected_claim(&c.claim_uri).is_none())
            .collect()
    }

    pub fn external_claims(&self) -> &[SelectedExternalClaim] {
        &self.external_claims
    }

    pub fn selected_external_claims(&self) -> Vec<&SelectedExternalClaim> {
        self.external_claims.iter().filter(|c| c.requested).collect()
    }

    pub fn mappings(&self) -> &[MappingEntry] {
        &self.mappings
    }

    pub fn claim_mapping_on(&self) -> bool {
        self.claim_mapping_on
    }

    pub fn loaded_subject_uri(&self) -> Option<&str> {
        self.loaded_subject_uri.as_deref()
    }

    /// Flags of a claim of the active dialect as the UI shows them.
    pub fn flags(&self, claim_uri: &str) -> ClaimFlags {
        if self.is_read_only(claim_uri) {
            return ClaimFlags {
                requested: true,
                mandatory: true,
                read_only: true,
            };
        }

        let flags = if self.dialect.local {
            self.selected_claim(claim_uri)
                .map(|c| (c.requested, c.mandatory))
                .or_else(|| {
                    self.implicit_subject
                        .as_ref()
                        .filter(|_| claim_uri == self.config.default_subject_claim)
                        .map(|i| (i.requested, i.mandatory))
                })
        } else {
            self.external_claims
                .iter()
                .find(|c| c.claim.claim_uri == claim_uri)
                .map(|c| (c.requested, c.mandatory))
        };
        let (requested, mandatory) = flags.unwrap_or_default();

        ClaimFlags {
            requested,
            mandatory,
            read_only: false,
        }
    }

    pub fn scope_groups(&self) -> Vec<ScopeGroup> {
        group_by_scopes(&self.external_claims, &self.scopes)
    }

    /// Case-insensitive search over the selection: local claims by display
    /// name, external claims by claim URI.
    pub fn filter_selected(&self, query: &str) -> SelectedView<'_> {
        let query = query.trim().to_lowercase();
        if self.dialect.local {
            SelectedView::Local(
                self.selected_claims
                    .iter()
                    .filter(|c| c.claim.display_name.to_lowercase().contains(&query))
                    .collect(),
            )
        } else {
            SelectedView::External(
                self.external_claims
                    .iter()
                    .filter(|c| c.requested && c.claim.claim_uri.to_lowercase().contains(&query))
                    .collect(),
            )
        }
    }
}
