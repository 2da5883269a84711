use attributes::{
    AlertLevel, AttributeEvent, AttributeFeatures, AttributeService, Error, ReconcilerConfig,
};
use idp::IdentityServerClient;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APP_ID: &str = "app-1";
const USERID: &str = "http://wso2.org/claims/userid";
const EMAIL: &str = "http://wso2.org/claims/emailaddress";
const ROLE: &str = "http://wso2.org/claims/role";

fn local_claims() -> Value {
    json!([
        { "id": "dXNlcmlk", "claimURI": USERID, "dialectURI": "http://wso2.org/claims", "displayName": "User ID" },
        { "id": "ZW1haWw", "claimURI": EMAIL, "dialectURI": "http://wso2.org/claims", "displayName": "Email" },
        { "id": "cm9sZQ", "claimURI": ROLE, "dialectURI": "http://wso2.org/claims", "displayName": "Role" }
    ])
}

fn claim_configuration() -> Value {
    json!({
        "dialect": "LOCAL",
        "requestedClaims": [
            { "claim": { "uri": USERID }, "mandatory": true }
        ],
        "subject": {
            "claim": { "uri": USERID },
            "includeUserDomain": false,
            "includeTenantDomain": false,
            "useMappedLocalSubject": false,
            "mappedLocalSubjectMandatory": false
        },
        "role": {
            "claim": { "uri": ROLE },
            "includeUserDomain": true
        }
    })
}

async fn given_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/server/v1/claim-dialects/local/claims"))
        .respond_with(ResponseTemplate::new(200).set_body_json(local_claims()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/server/v1/claim-dialects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "b2lkYw", "dialectURI": "http://wso2.org/oidc/claim" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/server/v1/claim-dialects/b2lkYw/claims"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "ZW1haWw",
                "claimURI": "email",
                "claimDialectURI": "http://wso2.org/oidc/claim",
                "mappedLocalClaimURI": EMAIL
            },
            {
                "id": "c3Vi",
                "claimURI": "sub",
                "claimDialectURI": "http://wso2.org/oidc/claim",
                "mappedLocalClaimURI": USERID
            }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/server/v1/oidc/scopes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "email", "displayName": "Email", "claims": ["email"] }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/server/v1/applications/{APP_ID}/claim-configuration")))
        .respond_with(ResponseTemplate::new(200).set_body_json(claim_configuration()))
        .mount(&server)
        .await;
    server
}

fn given_service(server: &MockServer) -> AttributeService<IdentityServerClient> {
    let client = IdentityServerClient::new(&server.uri(), "access-token").unwrap();
    AttributeService::new(client, ReconcilerConfig::default(), AttributeFeatures::default())
}

#[tokio::test]
async fn test_map_claim_and_submit() {
    // given
    let server = given_server().await;
    Mock::given(method("PATCH"))
        .and(path(format!("/api/server/v1/applications/{APP_ID}")))
        .and(body_json(json!({
            "claimConfiguration": {
                "dialect": "CUSTOM",
                "claimMappings": [
                    { "applicationClaim": "mail", "localClaim": { "uri": EMAIL } },
                    { "applicationClaim": USERID, "localClaim": { "uri": USERID } }
                ],
                "requestedClaims": [
                    { "claim": { "uri": "mail" }, "mandatory": false },
                    { "claim": { "uri": USERID }, "mandatory": true }
                ],
                "subject": {
                    "claim": { "uri": USERID },
                    "includeUserDomain": false,
                    "includeTenantDomain": false,
                    "useMappedLocalSubject": false,
                    "mappedLocalSubjectMandatory": false
                },
                "role": { "includeUserDomain": true }
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let service = given_service(&server);
    let loaded = service.load(APP_ID, false).await.unwrap();

    // when
    let state = loaded
        .state
        .apply(AttributeEvent::SelectClaims(vec![EMAIL.to_string()]))
        .apply(AttributeEvent::EnableClaimMapping)
        .apply(AttributeEvent::SetMappingTarget {
            local_claim_uri: EMAIL.to_string(),
            application_claim: "mail".to_string(),
        });
    let got = service.update(APP_ID, &state, &loaded.settings).await.unwrap();

    // then
    assert_eq!(got.alerts[0].level, AlertLevel::Success);
    assert!(got.state.selected_claims().is_empty());
}

#[tokio::test]
async fn test_oidc_scope_selection_rejected() {
    // given
    let server = given_server().await;
    Mock::given(method("PATCH"))
        .and(path(format!("/api/server/v1/applications/{APP_ID}")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "APP-60001",
            "message": "Invalid claim configuration.",
            "description": "Requested claim 'http://wso2.org/claims/emailaddress' is not allowed.",
            "traceId": "6f0d1a2e"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let service = given_service(&server);
    let loaded = service.load(APP_ID, true).await.unwrap();

    // when
    let state = loaded.state.apply(AttributeEvent::SelectScope {
        name: "email".to_string(),
        selected: true,
    });
    let got = service.update(APP_ID, &state, &loaded.settings).await;

    // then
    assert!(!state.dialect().local);
    let Err(Error::Submit { alert, .. }) = got else {
        panic!("expected a submit error");
    };
    assert_eq!(
        alert.description,
        "Requested claim 'http://wso2.org/claims/emailaddress' is not allowed."
    );
}
