pub mod tracing;
pub use tracing::{init_tracer, inject_trace_context};

/// Rewrites a remote host for the environment given in `APP_ENV`.
///
/// Running locally, every collaborator is reached through `localhost`.
pub fn patched_host<S: Into<String>>(host: S) -> String {
    let app_env = std::env::var("APP_ENV").unwrap_or_default();
    patch_host(host.into(), &app_env)
}

fn patch_host(host: String, app_env: &str) -> String {
    match app_env {
        "local" => "localhost".to_string(),
        "integration-test" => format!("{host}-integration-test"),
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::patch_host;
    use rstest::rstest;

    #[rstest]
    #[case::local("identity-server", "local", "localhost")]
    #[case::integration_test("identity-server", "integration-test", "identity-server-integration-test")]
    #[case::production("identity-server", "", "identity-server")]
    #[case::unknown_env("identity-server", "staging", "identity-server")]
    fn test_patch_host(#[case] host: &str, #[case] app_env: &str, #[case] want: &str) {
        // when
        let got = patch_host(host.to_string(), app_env);

        // then
        assert_eq!(got, want);
    }
}
