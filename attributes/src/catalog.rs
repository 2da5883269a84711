use idp::IdentityApi;
use idp::models::{Claim, ClaimDialect, ExternalClaim, LOCAL_DIALECT_ID};
use tracing::{info, warn};

use crate::{alert::Alert, config::ReconcilerConfig};

/// The dialect attributes are selected from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedDialect {
    pub id: String,
    pub dialect_uri: String,
    pub local: bool,
}

impl SelectedDialect {
    pub fn local(dialect_uri: impl Into<String>) -> Self {
        Self {
            id: LOCAL_DIALECT_ID.to_string(),
            dialect_uri: dialect_uri.into(),
            local: true,
        }
    }
}

/// Claims available for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub dialect: SelectedDialect,
    pub local_claims: Vec<Claim>,
    /// Empty for the local dialect. Every entry carries the display name of
    /// the local claim it maps to, if that claim is known.
    pub external_claims: Vec<ExternalClaim>,
}

/// Loads the claim catalog of the requested dialect.
///
/// Never fails: fetch failures are logged, reported as alerts and replaced by
/// empty lists. A dialect unknown to the server falls back to the local one.
pub async fn load_catalog<A>(
    api: &A,
    dialect_uri: &str,
    config: &ReconcilerConfig,
) -> (Catalog, Vec<Alert>)
where
    A: IdentityApi + ?Sized,
{
    let mut alerts = Vec::new();

    let (local_claims, dialects) = tokio::join!(api.fetch_local_claims(), api.fetch_dialects());
    let local_claims = local_claims.unwrap_or_else(|err| {
        warn!(error = %err, "failed to fetch local claims");
        alerts.push(Alert::error(
            "Retrieval error",
            "An error occurred while retrieving the local claims.",
        ));
        Vec::new()
    });

    let local_dialect_uri = local_claims
        .first()
        .map(|claim| claim.dialect_uri.clone())
        .unwrap_or_else(|| config.local_dialect_uri.clone());

    if dialect_uri == local_dialect_uri || dialect_uri == config.local_dialect_uri {
        info!(claims = local_claims.len(), "loaded local claim catalog");
        let catalog = Catalog {
            dialect: SelectedDialect::local(local_dialect_uri),
            local_claims,
            external_claims: Vec::new(),
        };
        return (catalog, alerts);
    }

    let dialects = dialects.unwrap_or_else(|err| {
        warn!(error = %err, "failed to fetch claim dialects");
        alerts.push(Alert::error(
            "Retrieval error",
            "An error occurred while retrieving the claim dialects.",
        ));
        Vec::new()
    });

    let Some(ClaimDialect { id, .. }) = dialects.into_iter().find(|d| d.dialect_uri == dialect_uri)
    else {
        warn!(dialect_uri, "dialect not found, falling back to local claims");
        alerts.push(Alert::warning(
            "Dialect not found",
            format!("The dialect {dialect_uri} is not available, local claims are used instead."),
        ));
        let catalog = Catalog {
            dialect: SelectedDialect::local(local_dialect_uri),
            local_claims,
            external_claims: Vec::new(),
        };
        return (catalog, alerts);
    };

    let external_claims = api.fetch_external_claims(&id).await.unwrap_or_else(|err| {
        warn!(error = %err, dialect_uri, "failed to fetch external claims");
        alerts.push(Alert::error(
            "Retrieval error",
            "An error occurred while retrieving the external claims.",
        ));
        Vec::new()
    });
    let external_claims = join_display_names(external_claims, &local_claims);

    info!(
        claims = local_claims.len(),
        external_claims = external_claims.len(),
        dialect_uri,
        "loaded external claim catalog"
    );

    let catalog = Catalog {
        dialect: SelectedDialect {
            id,
            dialect_uri: dialect_uri.to_string(),
            local: false,
        },
        local_claims,
        external_claims,
    };
    (catalog, alerts)
}

fn join_display_names(external: Vec<ExternalClaim>, local: &[Claim]) -> Vec<ExternalClaim> {
    external
        .into_iter()
        .map(|mut claim| {
            claim.local_claim_display_name = local
                .iter()
                .find(|l| l.claim_uri == claim.mapped_local_claim_uri)
                .map(|l| l.display_name.clone());
            claim
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{fixture_claim, fixture_dialect, fixture_external_claim};
    use idp::MockIdentityApi;

    fn given_api(external: Result<Vec<ExternalClaim>, idp::Error>) -> MockIdentityApi {
        MockIdentityApi::default()
            .with_fetch_local_claims(Ok(vec![
                fixture_claim(|_| {}),
                fixture_claim(|c| {
                    c.claim_uri = "http://wso2.org/claims/emailaddress".to_string();
                    c.display_name = "Email".to_string();
                }),
            ]))
            .with_fetch_dialects(Ok(vec![fixture_dialect(|_| {})]))
            .with_fetch_external_claims(external)
    }

    #[tokio::test]
    async fn test_load_catalog_local_dialect() {
        // given
        let api = given_api(Ok(vec![]));

        // when
        let (got, alerts) =
            load_catalog(&api, "http://wso2.org/claims", &ReconcilerConfig::default()).await;

        // then
        assert!(alerts.is_empty());
        assert_eq!(got.dialect, SelectedDialect::local("http://wso2.org/claims"));
        assert_eq!(got.local_claims.len(), 2);
        assert!(got.external_claims.is_empty());
        assert_eq!(api.fetch_external_claims_calls(), 0);
    }

    #[tokio::test]
    async fn test_load_catalog_joins_display_names() {
        // given
        let api = given_api(Ok(vec![
            fixture_external_claim(|_| {}),
            fixture_external_claim(|c| {
                c.claim_uri = "nickname".to_string();
                c.mapped_local_claim_uri = "http://wso2.org/claims/nickname".to_string();
            }),
        ]));

        // when
        let (got, alerts) =
            load_catalog(&api, "http://wso2.org/oidc/claim", &ReconcilerConfig::default()).await;

        // then
        assert!(alerts.is_empty());
        assert!(!got.dialect.local);
        assert_eq!(got.dialect.id, "b2lkYw");
        assert_eq!(
            got.external_claims[0].local_claim_display_name.as_deref(),
            Some("Email")
        );
        assert_eq!(got.external_claims[1].local_claim_display_name, None);
    }

    #[tokio::test]
    async fn test_load_catalog_degrades_on_fetch_failure() {
        // given
        let api = given_api(Err(idp::Error::UnexpectedStatusCode(
            500u16.try_into().unwrap(),
        )));

        // when
        let (got, alerts) =
            load_catalog(&api, "http://wso2.org/oidc/claim", &ReconcilerConfig::default()).await;

        // then
        assert!(got.external_claims.is_empty());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, crate::AlertLevel::Error);
    }

    #[tokio::test]
    async fn test_load_catalog_falls_back_to_local_dialect() {
        // given
        let api = MockIdentityApi::default()
            .with_fetch_local_claims(Ok(vec![fixture_claim(|_| {})]))
            .with_fetch_dialects(Ok(vec![ClaimDialect {
                id: "c2NpbQ".to_string(),
                dialect_uri: "urn:ietf:params:scim:schemas:core:2.0".to_string(),
            }]));

        // when
        let (got, alerts) =
            load_catalog(&api, "http://wso2.org/oidc/claim", &ReconcilerConfig::default()).await;

        // then
        assert!(got.dialect.local);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, crate::AlertLevel::Warning);
        assert_eq!(api.fetch_external_claims_calls(), 0);
    }
}
