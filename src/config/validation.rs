use crate::config::types::{Config, CrawlerConfig, FetcherConfig, Locators, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_locators(&config.locators)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
///
/// `max-workers` is deliberately not checked here: zero is clamped to one
/// worker rather than rejected.
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let seed = Url::parse(&config.seed_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid seed-url '{}': {}", config.seed_url, e))
    })?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "seed-url '{}' must use HTTP or HTTPS",
            config.seed_url
        )));
    }

    if seed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "seed-url '{}' has no host",
            config.seed_url
        )));
    }

    if config.increment_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "increment-threshold must be >= 1, got {}",
            config.increment_threshold
        )));
    }

    if config.max_scroll_rounds < 1 {
        return Err(ConfigError::Validation(format!(
            "max-scroll-rounds must be >= 1, got {}",
            config.max_scroll_rounds
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates that every locator is present
fn validate_locators(locators: &Locators) -> Result<(), ConfigError> {
    let named = [
        ("detail-marker", &locators.detail_marker),
        ("image", &locators.image),
        ("title", &locators.title),
        ("weight", &locators.weight),
        ("price-primary", &locators.price_primary),
        ("price-secondary", &locators.price_secondary),
        ("description", &locators.description),
        ("breadcrumb", &locators.breadcrumb),
        ("links", &locators.links),
    ];

    for (name, value) in named {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "locator '{}' cannot be empty",
                name
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("checkpoint-path", &config.checkpoint_path),
        ("products-path", &config.products_path),
        ("images-dir", &config.images_dir),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.checkpoint_path == config.products_path {
        return Err(ConfigError::Validation(
            "checkpoint-path and products-path must differ".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler_config(seed: &str) -> CrawlerConfig {
        CrawlerConfig {
            seed_url: seed.to_string(),
            max_workers: 2,
            increment_threshold: 100,
            max_retries: 3,
            max_scroll_rounds: 10,
        }
    }

    #[test]
    fn test_validate_seed_url() {
        assert!(validate_crawler_config(&crawler_config("https://shop.example.com/")).is_ok());
        assert!(validate_crawler_config(&crawler_config("http://127.0.0.1:9000/")).is_ok());

        assert!(validate_crawler_config(&crawler_config("")).is_err());
        assert!(validate_crawler_config(&crawler_config("shop.example.com")).is_err());
        assert!(validate_crawler_config(&crawler_config("ftp://shop.example.com/")).is_err());
    }

    #[test]
    fn test_validate_scroll_rounds() {
        let mut config = crawler_config("https://shop.example.com/");
        config.max_scroll_rounds = 0;
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_locators() {
        assert!(validate_locators(&Locators::default()).is_ok());

        let mut locators = Locators::default();
        locators.price_secondary = "  ".to_string();
        assert!(validate_locators(&locators).is_err());
    }

    #[test]
    fn test_validate_fetcher() {
        assert!(validate_fetcher_config(&FetcherConfig::default()).is_ok());

        let config = FetcherConfig {
            user_agent: "bot".to_string(),
            timeout_secs: 0,
        };
        assert!(validate_fetcher_config(&config).is_err());
    }

    #[test]
    fn test_validate_output_paths_differ() {
        let config = OutputConfig {
            checkpoint_path: "same.json".to_string(),
            products_path: "same.json".to_string(),
            format: Default::default(),
            images_dir: "images".to_string(),
        };
        assert!(validate_output_config(&config).is_err());
    }
}
