use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, HeaderMap},
};
use serde::{Serialize, de::DeserializeOwned};
use setup::inject_trace_context;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    error::Error,
    models::{
        ApiErrorBody, Claim, ClaimConfiguration, ClaimConfigurationUpdate, ClaimDialect,
        ExternalClaim, LOCAL_DIALECT_ID, OidcScope, OidcSubject,
    },
};

const API_PREFIX: &str = "api/server/v1";

/// The identity server endpoints consumed by the attribute settings.
#[cfg_attr(feature = "mock", mock::api_client)]
#[async_trait]
pub trait IdentityApi: Send + Sync + 'static {
    async fn fetch_local_claims(&self) -> Result<Vec<Claim>, Error>;

    async fn fetch_dialects(&self) -> Result<Vec<ClaimDialect>, Error>;

    /// Dialects without any claims are reported as not found by the server
    /// and resolve to an empty list.
    async fn fetch_external_claims(&self, dialect_id: &str) -> Result<Vec<ExternalClaim>, Error>;

    async fn fetch_oidc_scopes(&self) -> Result<Vec<OidcScope>, Error>;

    async fn fetch_claim_configuration(&self, app_id: &str) -> Result<ClaimConfiguration, Error>;

    async fn submit_claim_configuration(
        &self,
        app_id: &str,
        update: &ClaimConfigurationUpdate,
    ) -> Result<(), Error>;

    async fn update_oidc_subject(&self, app_id: &str, subject: &OidcSubject) -> Result<(), Error>;
}

/// REST client of the identity server's management API.
#[derive(Clone, Debug)]
pub struct IdentityServerClient {
    client: Client,
    base_url: Url,
    access_token: String,
}

impl IdentityServerClient {
    /// Creates a client for the server (or tenant) rooted at `base_url`.
    ///
    /// # Errors
    /// - if `base_url` is not an absolute URL
    pub fn new(base_url: &str, access_token: impl Into<String>) -> Result<Self, Error> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            access_token: access_token.into(),
        })
    }

    /// Appends `segments` to the API root, percent-encoding each one so ids
    /// cannot address another resource.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.join(API_PREFIX)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut headers = HeaderMap::new();
        inject_trace_context(&mut headers);

        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/json")
            .headers(headers)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, Error> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");

        let response = self.request(Method::GET, url).send().await?;
        let response = check_status(response).await?;

        Ok(response.json::<T>().await?)
    }

    async fn patch_json<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<(), Error> {
        let url = self.endpoint(segments)?;
        debug!(%url, "PATCH");

        let response = self.request(Method::PATCH, url).json(body).send().await?;
        check_status(response).await?;

        Ok(())
    }
}

/// Maps non-2xx responses to [`Error::Api`] if the server sent its error
/// document, else to [`Error::UnexpectedStatusCode`].
async fn check_status(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match response.json::<ApiErrorBody>().await {
        Ok(body) => Err(Error::Api {
            status,
            code: body.code,
            message: body.message,
            description: body.description,
        }),
        Err(_) => Err(Error::UnexpectedStatusCode(status)),
    }
}

#[derive(Serialize)]
struct OidcSubjectUpdate<'a> {
    subject: &'a OidcSubject,
}

#[async_trait]
impl IdentityApi for IdentityServerClient {
    #[instrument(skip_all, err)]
    async fn fetch_local_claims(&self) -> Result<Vec<Claim>, Error> {
        self.get_json(&["claim-dialects", LOCAL_DIALECT_ID, "claims"])
            .await
    }

    #[instrument(skip_all, err)]
    async fn fetch_dialects(&self) -> Result<Vec<ClaimDialect>, Error> {
        self.get_json(&["claim-dialects"]).await
    }

    #[instrument(skip_all, fields(dialect_id = %dialect_id), err)]
    async fn fetch_external_claims(&self, dialect_id: &str) -> Result<Vec<ExternalClaim>, Error> {
        let url = self.endpoint(&["claim-dialects", dialect_id, "claims"])?;

        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("dialect has no claims");
            return Ok(Vec::new());
        }
        let response = check_status(response).await?;

        Ok(response.json::<Vec<ExternalClaim>>().await?)
    }

    #[instrument(skip_all, err)]
    async fn fetch_oidc_scopes(&self) -> Result<Vec<OidcScope>, Error> {
        self.get_json(&["oidc", "scopes"]).await
    }

    #[instrument(skip_all, fields(app_id = %app_id), err)]
    async fn fetch_claim_configuration(&self, app_id: &str) -> Result<ClaimConfiguration, Error> {
        self.get_json(&["applications", app_id, "claim-configuration"])
            .await
    }

    #[instrument(skip_all, fields(app_id = %app_id), err)]
    async fn submit_claim_configuration(
        &self,
        app_id: &str,
        update: &ClaimConfigurationUpdate,
    ) -> Result<(), Error> {
        self.patch_json(&["applications", app_id], update)
            .await
    }

    #[instrument(skip_all, fields(app_id = %app_id), err)]
    async fn update_oidc_subject(&self, app_id: &str, subject: &OidcSubject) -> Result<(), Error> {
        self.patch_json(
            &["applications", app_id, "inbound-protocols", "oidc"],
            &OidcSubjectUpdate { subject },
        )
        .await
    }
}
