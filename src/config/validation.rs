use super::Config;
use crate::error::{Error, Result};
use crate::orchestrator::MAX_PROBE_TIMEOUT;

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let probe_timeout = self.probe_timeout()?;
        if probe_timeout.is_zero() {
            return Err(Error::Validation(
                "probe_timeout must be greater than zero".to_string(),
            ));
        }
        if probe_timeout > MAX_PROBE_TIMEOUT {
            return Err(Error::Validation(format!(
                "probe_timeout '{}' must be at most {}s",
                self.probe_timeout,
                MAX_PROBE_TIMEOUT.as_secs()
            )));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(Error::Validation(format!(
                "origin '{}' must use http or https",
                self.origin
            )));
        }

        if self.cache.version.trim().is_empty() {
            return Err(Error::Validation(
                "cache.version must not be empty".to_string(),
            ));
        }

        // Versions end up in bucket directory names
        if !self
            .cache
            .version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(Error::Validation(format!(
                "cache.version '{}' may only contain alphanumerics, '-', '_' and '.'",
                self.cache.version
            )));
        }

        for asset in &self.cache.manifest {
            if !asset.starts_with('/') {
                return Err(Error::Validation(format!(
                    "cache.manifest entry '{}' must be an absolute path starting with '/'",
                    asset
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config_is_valid() {
        config().validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut c = config();
        c.probe_timeout = "0ms".to_string();
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_rejects_timeout_above_limit() {
        let c = crate::config::Parser::new()
            .parse_config("probe_timeout: \"18446744073709551615\"")
            .unwrap();
        let err = c.validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("at most 60s"));

        let mut c = config();
        c.probe_timeout = "60s".to_string();
        c.validate().unwrap();
        c.probe_timeout = "61s".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_rejects_non_http_origin() {
        let mut c = config();
        c.origin = "file:///srv/shell/".to_string();
        assert!(matches!(c.validate(), Err(Error::Validation(_))));

        c.origin = "not a url".to_string();
        assert!(matches!(c.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_rejects_bad_cache_version() {
        let mut c = config();
        c.cache.version = "  ".to_string();
        assert!(c.validate().is_err());

        c.cache.version = "../v3".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_rejects_relative_manifest_entry() {
        let mut c = config();
        c.cache.manifest.push("app.css".to_string());
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("app.css"));
    }
}
