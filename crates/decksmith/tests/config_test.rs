use decksmith::{DecksmithConfig, ErrorHandler};
use std::io::Write;

#[test]
fn from_file_fills_missing_keys_with_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[cache]
cache_dir = "/tmp/decksmith-cards"
search_ttl_secs = 600

[rate_limit]
burst_limit = 4

[retry.api_request]
max_attempts = 5
jitter = false
retryable_error_kinds = ["network", "timeout", "server_error"]
"#
    )
    .unwrap();

    let config = DecksmithConfig::from_file(file.path()).unwrap();

    assert_eq!(*config.cache().search_ttl_secs(), 600);
    assert_eq!(*config.cache().card_ttl_secs(), 86_400);
    assert_eq!(*config.rate_limit().burst_limit(), 4);
    assert_eq!(*config.rate_limit().requests_per_minute(), 60);
    assert_eq!(*config.queue().min_spacing_ms(), 500);
    assert_eq!(config.upstream().base_url(), "https://db.ygoprodeck.com/api/v7");

    let retry = &config.retry()["api_request"];
    assert_eq!(*retry.max_attempts(), 5);
    assert!(!*retry.jitter());
    assert_eq!(*retry.base_delay_secs(), 1.0);
    assert_eq!(retry.retryable_error_kinds().len(), 3);
}

#[test]
fn configured_retry_policies_override_the_built_in_table() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[retry.cache_operation]\nmax_attempts = 4").unwrap();

    let config = DecksmithConfig::from_file(file.path()).unwrap();
    let handler = config
        .retry()
        .iter()
        .fold(ErrorHandler::new(), |handler, (category, retry)| {
            handler.with_category(category.clone(), retry.clone())
        });

    assert_eq!(*handler.config_for("cache_operation").max_attempts(), 4);
    assert_eq!(*handler.config_for("api_request").max_attempts(), 3);
    assert_eq!(*handler.config_for("unlisted").max_attempts(), 3);
}

#[test]
fn invalid_values_are_rejected() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[queue]\nmax_concurrent = 0").unwrap();

    let err = DecksmithConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("max_concurrent"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = DecksmithConfig::from_file(dir.path().join("absent.toml"));
    assert!(result.is_err());
}
