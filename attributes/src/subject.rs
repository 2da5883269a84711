use tracing::warn;

use crate::reconciler::AttributeState;

/// An entry of the subject dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectOption {
    pub local_claim_uri: String,
    /// The claim URI sent as subject: the application claim while the
    /// local claim is mapped, else the local claim URI.
    pub value: String,
    pub display_name: String,
}

impl AttributeState {
    /// Local URI of the subject claim.
    pub fn subject_claim(&self) -> &str {
        &self.subject_claim
    }

    /// Claims the subject can be chosen from. The default subject claim is
    /// always the first option.
    pub fn subject_options(&self) -> Vec<SubjectOption> {
        let default = &self.config.default_subject_claim;
        let mut options = vec![SubjectOption {
            local_claim_uri: default.clone(),
            value: self.default_subject_value(),
            display_name: self.display_name_of(default),
        }];
        let mut push = |local: &str, value: &str, display_name: String| {
            if options.iter().all(|o| o.local_claim_uri != local) {
                options.push(SubjectOption {
                    local_claim_uri: local.to_string(),
                    value: value.to_string(),
                    display_name,
                });
            }
        };

        if !self.dialect.local {
            for external in self.external_claims.iter().filter(|c| c.requested) {
                let local = &external.claim.mapped_local_claim_uri;
                let display_name = external
                    .claim
                    .local_claim_display_name
                    .clone()
                    .unwrap_or_else(|| external.claim.claim_uri.clone());
                push(local, local, display_name);
            }
        } else if self.claim_mapping_on {
            for entry in self
                .mappings
                .iter()
                .filter(|m| m.add_mapping && !m.application_claim.trim().is_empty())
            {
                push(
                    &entry.local_claim.claim_uri,
                    &entry.application_claim,
                    entry.local_claim.display_name.clone(),
                );
            }
        } else {
            for selected in self.selected_claims.iter().filter(|c| c.requested) {
                push(
                    &selected.claim.claim_uri,
                    &selected.claim.claim_uri,
                    selected.claim.display_name.clone(),
                );
            }
        }

        options
    }

    /// The claim URI currently sent as subject.
    pub fn subject_value(&self) -> String {
        self.subject_options()
            .into_iter()
            .find(|o| o.local_claim_uri == self.subject_claim)
            .map_or_else(|| self.subject_claim.clone(), |o| o.value)
    }

    /// How the default subject claim is presented to the application.
    pub(crate) fn default_subject_value(&self) -> String {
        let default = &self.config.default_subject_claim;
        if !self.claim_mapping_on {
            return default.clone();
        }

        let mapped = self
            .mapping(default)
            .filter(|m| m.add_mapping && !m.application_claim.trim().is_empty())
            .map(|m| m.application_claim.clone());
        let implicit = self
            .implicit_subject
            .as_ref()
            .and_then(|i| i.application_claim.clone());

        mapped.or(implicit).unwrap_or_else(|| default.clone())
    }

    pub(crate) fn select_subject(&mut self, local_claim_uri: String) {
        if self
            .subject_options()
            .iter()
            .any(|o| o.local_claim_uri == local_claim_uri)
        {
            self.subject_claim = local_claim_uri;
        } else {
            warn!(claim_uri = %local_claim_uri, "claim is not a subject option, ignoring");
        }
    }

    /// Falls back to the default subject claim once the subject is no
    /// longer among the options.
    pub(crate) fn normalize_subject(&mut self) {
        let default = &self.config.default_subject_claim;
        if self.subject_claim == *default {
            return;
        }
        if self
            .subject_options()
            .iter()
            .all(|o| o.local_claim_uri != self.subject_claim)
        {
            warn!(
                claim_uri = %self.subject_claim,
                "subject claim is no longer selected, using the default subject claim"
            );
            self.subject_claim = self.config.default_subject_claim.clone();
        }
    }

    fn display_name_of(&self, local_uri: &str) -> String {
        self.local_claims
            .iter()
            .find(|c| c.claim_uri == local_uri)
            .map_or_else(|| local_uri.to_string(), |c| c.display_name.clone())
    }
}
