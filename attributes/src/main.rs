use std::error::Error;

use attributes::{AlertLevel, AttributeService, Config, build_submission};
use dotenv::dotenv;
use idp::IdentityServerClient;
use setup::init_tracer;
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "attributes";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let tracer = init_tracer(SERVICE_NAME)?;

    let cfg = Config::from_env()?;
    let client = IdentityServerClient::new(&cfg.idp_base_url, cfg.idp_access_token.clone())?;
    let service = AttributeService::new(client, cfg.reconciler.clone(), cfg.features.clone());

    let loaded = service.load(&cfg.app_id, cfg.only_oidc_configured).await?;
    for alert in &loaded.alerts {
        warn!(%alert, "attribute settings loaded with errors");
    }
    for claim in loaded.state.selected_claims() {
        info!(
            claim_uri = %claim.claim.claim_uri,
            requested = claim.requested,
            mandatory = claim.mandatory,
            "selected claim"
        );
    }
    for claim in loaded.state.selected_external_claims() {
        info!(
            claim_uri = %claim.claim.claim_uri,
            mandatory = claim.mandatory,
            "selected external claim"
        );
    }
    info!(subject = %loaded.state.subject_value(), "subject claim");

    let submission = build_submission(&loaded.state, &loaded.settings, service.features())?;
    println!("{}", serde_json::to_string_pretty(&submission.update)?);

    if cfg.apply {
        match service
            .update(&cfg.app_id, &loaded.state, &loaded.settings)
            .await
        {
            Ok(updated) => {
                for alert in &updated.alerts {
                    match alert.level {
                        AlertLevel::Success | AlertLevel::Info => info!(%alert),
                        AlertLevel::Warning | AlertLevel::Error => warn!(%alert),
                    }
                }
            }
            Err(err) => {
                if let Some(alert) = err.alert() {
                    error!(%alert, "update failed");
                }
                return Err(err.into());
            }
        }
    }

    if let Some(tracer) = tracer {
        tracer.shutdown()?;
    }

    Ok(())
}
