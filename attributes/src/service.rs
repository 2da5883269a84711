use idp::IdentityApi;
use tracing::{info, instrument, warn};

use crate::{
    alert::Alert,
    catalog::load_catalog,
    config::{AttributeFeatures, ReconcilerConfig},
    error::Error,
    reconciler::AttributeState,
    submission::{AdvancedSettings, build_submission},
};

/// Attribute settings of an application, ready for editing.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub state: AttributeState,
    pub settings: AdvancedSettings,
    /// Failures the load recovered from.
    pub alerts: Vec<Alert>,
}

/// Attribute settings as stored after a successful update.
#[derive(Debug, Clone)]
pub struct Updated {
    pub state: AttributeState,
    pub settings: AdvancedSettings,
    /// Starts with the success alert.
    pub alerts: Vec<Alert>,
}

pub struct AttributeService<A: IdentityApi> {
    api: A,
    config: ReconcilerConfig,
    features: AttributeFeatures,
}

impl<A: IdentityApi> AttributeService<A> {
    pub fn new(api: A, config: ReconcilerConfig, features: AttributeFeatures) -> Self {
        Self {
            api,
            config,
            features,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn features(&self) -> &AttributeFeatures {
        &self.features
    }

    /// Loads the catalog, the OIDC scopes and the claim configuration of an
    /// application and reconciles them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchConfiguration`] if the claim configuration cannot
    /// be fetched. Every other failure is reported as an alert.
    #[instrument(skip_all, fields(app_id = %app_id), err)]
    pub async fn load(&self, app_id: &str, only_oidc_configured: bool) -> Result<Loaded, Error> {
        let dialect_uri = self.config.dialect_uri(only_oidc_configured);
        self.load_dialect(app_id, dialect_uri).await
    }

    async fn load_dialect(&self, app_id: &str, dialect_uri: &str) -> Result<Loaded, Error> {
        let ((catalog, mut alerts), scopes, configuration) = tokio::join!(
            load_catalog(&self.api, dialect_uri, &self.config),
            self.api.fetch_oidc_scopes(),
            self.api.fetch_claim_configuration(app_id),
        );

        let configuration = configuration.map_err(|source| Error::FetchConfiguration {
            alert: Alert::from_api_error(
                "Retrieval error",
                "An error occurred while retrieving the claim configuration.",
                &source,
            ),
            source,
        })?;

        let scopes = match scopes {
            Ok(scopes) => scopes,
            Err(err) => {
                warn!(error = %err, "failed to fetch OIDC scopes");
                if !catalog.dialect.local {
                    alerts.push(Alert::error(
                        "Retrieval error",
                        "An error occurred while retrieving the OIDC scopes.",
                    ));
                }
                Vec::new()
            }
        };

        let settings = AdvancedSettings::from_configuration(&configuration);
        let state = AttributeState::new(self.config.clone(), catalog, scopes, &configuration);
        info!(
            dialect_uri = %state.dialect().dialect_uri,
            selected_claims = state.selected_claims().len(),
            selected_external_claims = state.selected_external_claims().len(),
            "loaded attribute settings"
        );

        Ok(Loaded {
            state,
            settings,
            alerts,
        })
    }

    /// Submits the selection and reloads the stored settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] without calling the server if the
    /// selection is invalid, and [`Error::Submit`] if the server rejects it.
    #[instrument(skip_all, fields(app_id = %app_id), err)]
    pub async fn update(
        &self,
        app_id: &str,
        state: &AttributeState,
        settings: &AdvancedSettings,
    ) -> Result<Updated, Error> {
        let submission = build_submission(state, settings, &self.features)?;

        self.api
            .submit_claim_configuration(app_id, &submission.update)
            .await
            .map_err(|source| Error::Submit {
                alert: Alert::from_api_error(
                    "Update error",
                    "An error occurred while updating the attribute settings.",
                    &source,
                ),
                source,
            })?;

        if let Some(subject) = &submission.oidc_subject {
            self.api
                .update_oidc_subject(app_id, subject)
                .await
                .map_err(|source| Error::Submit {
                    alert: Alert::from_api_error(
                        "Update error",
                        "An error occurred while updating the subject type.",
                        &source,
                    ),
                    source,
                })?;
        }

        info!(
            dialect = ?submission.update.claim_configuration.dialect,
            requested_claims = submission.update.claim_configuration.requested_claims.len(),
            "updated attribute settings"
        );

        let mut alerts = vec![Alert::success(
            "Update successful",
            "Successfully updated the attribute settings.",
        )];
        match self.load_dialect(app_id, &state.dialect().dialect_uri).await {
            Ok(loaded) => {
                alerts.extend(loaded.alerts);
                Ok(Updated {
                    state: loaded.state,
                    settings: AdvancedSettings {
                        oidc_subject: submission.oidc_subject,
                        ..loaded.settings
                    },
                    alerts,
                })
            }
            Err(err) => {
                warn!(error = %err, "failed to reload attribute settings");
                alerts.extend(err.alert().cloned());
                Ok(Updated {
                    state: state.clone(),
                    settings: settings.clone(),
                    alerts,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlertLevel;
    use crate::error::{MappingError, ValidationError};
    use crate::fixture::*;
    use crate::reconciler::AttributeEvent;
    use idp::MockIdentityApi;
    use idp::models::{ClaimConfiguration, OidcSubject, RequestedClaim, SubjectType};

    fn given_api(configuration: ClaimConfiguration) -> MockIdentityApi {
        MockIdentityApi::default()
            .with_fetch_local_claims(Ok(fixture_local_claims()))
            .with_fetch_dialects(Ok(vec![fixture_dialect(|_| {})]))
            .with_fetch_external_claims(Ok(fixture_external_claims()))
            .with_fetch_oidc_scopes(Ok(fixture_scopes()))
            .with_fetch_claim_configuration(Ok(configuration))
    }

    fn given_service(api: MockIdentityApi) -> AttributeService<MockIdentityApi> {
        AttributeService::new(api, ReconcilerConfig::default(), AttributeFeatures::default())
    }

    fn api_error(status: u16, description: Option<&str>) -> idp::Error {
        idp::Error::Api {
            status: status.try_into().unwrap(),
            code: "CMT-60001".to_string(),
            message: "Invalid request.".to_string(),
            description: description.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_load_local_dialect() {
        // given
        let configuration = fixture_configuration(|c| {
            c.requested_claims = vec![RequestedClaim::new(EMAIL, true)];
        });
        let service = given_service(given_api(configuration));

        // when
        let got = service.load("app-1", false).await.unwrap();

        // then
        assert!(got.alerts.is_empty());
        assert!(got.state.dialect().local);
        assert_eq!(got.state.selected_claims().len(), 1);
        assert_eq!(got.settings.role.claim.as_deref(), Some(ROLE));
        assert_eq!(service.api().fetch_external_claims_calls(), 0);
    }

    #[tokio::test]
    async fn test_load_oidc_dialect() {
        // given
        let configuration = fixture_configuration(|c| {
            c.requested_claims = vec![RequestedClaim::new(GIVEN_NAME, false)];
        });
        let service = given_service(given_api(configuration));

        // when
        let got = service.load("app-1", true).await.unwrap();

        // then
        assert!(!got.state.dialect().local);
        let groups: Vec<_> = got
            .state
            .scope_groups()
            .iter()
            .map(|g| (g.name.clone(), g.selected))
            .collect();
        assert_eq!(
            groups,
            vec![
                ("".to_string(), false),
                ("email".to_string(), false),
                ("profile".to_string(), true),
            ]
        );
    }

    #[tokio::test]
    async fn test_load_fails_without_configuration() {
        // given
        let api = MockIdentityApi::default()
            .with_fetch_local_claims(Ok(fixture_local_claims()))
            .with_fetch_dialects(Ok(vec![]))
            .with_fetch_oidc_scopes(Ok(vec![]))
            .with_fetch_claim_configuration(Err(api_error(404, None)));
        let service = given_service(api);

        // when
        let got = service.load("app-1", false).await;

        // then
        let Err(err @ Error::FetchConfiguration { .. }) = got else {
            panic!("expected a fetch error");
        };
        assert_eq!(err.alert().unwrap().level, AlertLevel::Error);
    }

    #[tokio::test]
    async fn test_load_degrades_on_scope_failure() {
        // given
        let api = MockIdentityApi::default()
            .with_fetch_local_claims(Ok(fixture_local_claims()))
            .with_fetch_dialects(Ok(vec![fixture_dialect(|_| {})]))
            .with_fetch_external_claims(Ok(fixture_external_claims()))
            .with_fetch_oidc_scopes(Err(api_error(500, None)))
            .with_fetch_claim_configuration(Ok(fixture_configuration(|_| {})));
        let service = given_service(api);

        // when
        let got = service.load("app-1", true).await.unwrap();

        // then
        assert_eq!(got.alerts.len(), 1);
        assert_eq!(got.state.scope_groups().len(), 1);
    }

    #[tokio::test]
    async fn test_update_submits_and_reloads() {
        // given
        let stored = fixture_configuration(|c| {
            c.requested_claims = vec![RequestedClaim::new(EMAIL, false)];
        });
        let api = given_api(fixture_configuration(|_| {}))
            .with_submit_claim_configuration(Ok(()))
            .with_update_oidc_subject(Ok(()))
            .with_fetch_local_claims(Ok(fixture_local_claims()))
            .with_fetch_dialects(Ok(vec![fixture_dialect(|_| {})]))
            .with_fetch_oidc_scopes(Ok(fixture_scopes()))
            .with_fetch_claim_configuration(Ok(stored));
        let service = given_service(api);
        let loaded = service.load("app-1", false).await.unwrap();
        let state = loaded
            .state
            .apply(AttributeEvent::SelectClaims(vec![EMAIL.to_string()]));
        let settings = AdvancedSettings {
            oidc_subject: Some(OidcSubject {
                subject_type: SubjectType::Public,
                sector_identifier_uri: None,
            }),
            ..loaded.settings
        };

        // when
        let got = service.update("app-1", &state, &settings).await.unwrap();

        // then
        assert_eq!(got.alerts[0].level, AlertLevel::Success);
        assert_eq!(got.state.selected_claims().len(), 1);
        assert_eq!(got.settings.oidc_subject, settings.oidc_subject);
        assert_eq!(service.api().submit_claim_configuration_calls(), 1);
        assert_eq!(service.api().update_oidc_subject_calls(), 1);
        assert_eq!(service.api().fetch_claim_configuration_calls(), 2);
    }

    #[tokio::test]
    async fn test_update_validation_failure_skips_submit() {
        // given
        let configuration = fixture_configuration(|c| {
            c.requested_claims = vec![
                RequestedClaim::new(EMAIL, false),
                RequestedClaim::new(GIVEN_NAME, false),
            ];
        });
        let service = given_service(given_api(configuration));
        let loaded = service.load("app-1", false).await.unwrap();
        let state = loaded
            .state
            .apply(AttributeEvent::EnableClaimMapping)
            .apply(AttributeEvent::SetMappingTarget {
                local_claim_uri: GIVEN_NAME.to_string(),
                application_claim: EMAIL.to_string(),
            });

        // when
        let got = service.update("app-1", &state, &loaded.settings).await;

        // then
        let Err(Error::Validation(ValidationError::ClaimMappings(errors))) = got else {
            panic!("expected a validation error");
        };
        assert!(matches!(errors[0], MappingError::DuplicateTarget { .. }));
        assert_eq!(service.api().submit_claim_configuration_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_rejected_uses_server_description() {
        // given
        let api = given_api(fixture_configuration(|_| {})).with_submit_claim_configuration(Err(
            api_error(400, Some("Claim mapping 'mail' is duplicated.")),
        ));
        let service = given_service(api);
        let loaded = service.load("app-1", false).await.unwrap();

        // when
        let got = service
            .update("app-1", &loaded.state, &loaded.settings)
            .await;

        // then
        let Err(Error::Submit { alert, .. }) = got else {
            panic!("expected a submit error");
        };
        assert_eq!(alert.description, "Claim mapping 'mail' is duplicated.");
        assert_eq!(service.api().update_oidc_subject_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_state_when_reload_fails() {
        // given
        let api = given_api(fixture_configuration(|_| {}))
            .with_submit_claim_configuration(Ok(()))
            .with_fetch_local_claims(Ok(fixture_local_claims()))
            .with_fetch_dialects(Ok(vec![]))
            .with_fetch_oidc_scopes(Ok(vec![]))
            .with_fetch_claim_configuration(Err(api_error(500, None)));
        let service = given_service(api);
        let loaded = service.load("app-1", false).await.unwrap();

        // when
        let got = service
            .update("app-1", &loaded.state, &loaded.settings)
            .await
            .unwrap();

        // then
        let levels: Vec<_> = got.alerts.iter().map(|a| a.level).collect();
        assert_eq!(levels, vec![AlertLevel::Success, AlertLevel::Error]);
        assert_eq!(got.state, loaded.state);
    }
}
