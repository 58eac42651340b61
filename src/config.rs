use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{Config, OutputFormat, ResourceKind};

pub const DEFAULT_REPORT_PATH: &str = "kobot-report.html";

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    // empty means "every namespace in the cluster"
    let namespaces: Vec<String> = env
        .get_var("NAMESPACES")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let scan_kind: ResourceKind = env
        .get_var("SCAN_KIND")
        .unwrap_or_else(|| "pods".to_string())
        .parse()
        .map_err(|e: String| anyhow!(e))
        .context("Invalid SCAN_KIND")?;

    let concurrency: usize = match env.get_var("CONCURRENCY") {
        Some(v) => v.trim().parse().context("Invalid CONCURRENCY")?,
        None => scan_kind.default_concurrency(),
    };
    if concurrency == 0 {
        return Err(anyhow!("CONCURRENCY must be at least 1"));
    }

    let call_timeout = match env.get_var("CALL_TIMEOUT_SECONDS") {
        Some(v) => Duration::from_secs(v.trim().parse().context("Invalid CALL_TIMEOUT_SECONDS")?),
        None => scan_kind.default_call_timeout(),
    };
    if call_timeout.is_zero() {
        return Err(anyhow!("CALL_TIMEOUT_SECONDS must be at least 1"));
    }

    let grace_seconds: u64 = env
        .get_var("GRACE_PERIOD_SECONDS")
        .unwrap_or_else(|| "5".to_string())
        .trim()
        .parse()
        .unwrap_or(5);

    let retry_attempts: u32 = env
        .get_var("RETRY_ATTEMPTS")
        .unwrap_or_else(|| "3".to_string())
        .trim()
        .parse()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(3);

    let output_format: OutputFormat = env
        .get_var("OUTPUT_FORMAT")
        .unwrap_or_default()
        .parse()
        .map_err(|e: String| anyhow!(e))
        .context("Invalid OUTPUT_FORMAT")?;

    let html_report = parse_flag(env.get_var("HTML_REPORT"), false);
    let open_report = parse_flag(env.get_var("OPEN_REPORT"), false);

    let report_path = env
        .get_var("REPORT_PATH")
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH));

    let cluster_name = env.get_var("CLUSTER_NAME").filter(|s| !s.trim().is_empty());

    Ok(Config {
        namespaces,
        scan_kind,
        concurrency,
        call_timeout,
        grace_period: Duration::from_secs(grace_seconds),
        retry_attempts,
        output_format,
        html_report,
        report_path,
        open_report,
        cluster_name,
    })
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_loading_with_env() {
        let env = MockEnvironment::new()
            .with_var("NAMESPACES", "default,kube-system,monitoring")
            .with_var("SCAN_KIND", "pods-deep")
            .with_var("CONCURRENCY", "6")
            .with_var("CALL_TIMEOUT_SECONDS", "20")
            .with_var("GRACE_PERIOD_SECONDS", "10")
            .with_var("RETRY_ATTEMPTS", "5")
            .with_var("OUTPUT_FORMAT", "json")
            .with_var("HTML_REPORT", "true")
            .with_var("REPORT_PATH", "/tmp/out.html")
            .with_var("OPEN_REPORT", "1")
            .with_var("CLUSTER_NAME", "test-cluster");

        let config = load_config_with_env(&env).unwrap();

        assert_eq!(config.namespaces, vec!["default", "kube-system", "monitoring"]);
        assert_eq!(config.scan_kind, ResourceKind::PodsDeep);
        assert_eq!(config.concurrency, 6);
        assert_eq!(config.call_timeout, Duration::from_secs(20));
        assert_eq!(config.grace_period, Duration::from_secs(10));
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert!(config.html_report);
        assert_eq!(config.report_path, PathBuf::from("/tmp/out.html"));
        assert!(config.open_report);
        assert_eq!(config.cluster_name, Some("test-cluster".to_string()));
    }

    #[test]
    fn test_config_loading_defaults() {
        let config = load_config_with_env(&MockEnvironment::new()).unwrap();

        assert!(config.namespaces.is_empty()); // all namespaces
        assert_eq!(config.scan_kind, ResourceKind::Pods);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert_eq!(config.grace_period, Duration::from_secs(5));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.output_format, OutputFormat::Text);
        assert!(!config.html_report);
        assert_eq!(config.report_path, PathBuf::from(DEFAULT_REPORT_PATH));
        assert!(!config.open_report);
        assert_eq!(config.cluster_name, None);
    }

    #[test]
    fn test_kind_specific_defaults() {
        let env = MockEnvironment::new().with_var("SCAN_KIND", "pods-deep");
        let config = load_config_with_env(&env).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.call_timeout, Duration::from_secs(45));

        let env = MockEnvironment::new().with_var("SCAN_KIND", "releases");
        let config = load_config_with_env(&env).unwrap();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.call_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_config_loading_invalid_values() {
        let env = MockEnvironment::new().with_var("SCAN_KIND", "deployments");
        let result = load_config_with_env(&env);
        assert!(result.unwrap_err().to_string().contains("SCAN_KIND"));

        let env = MockEnvironment::new().with_var("CONCURRENCY", "many");
        let result = load_config_with_env(&env);
        assert!(result.unwrap_err().to_string().contains("CONCURRENCY"));

        let env = MockEnvironment::new().with_var("CONCURRENCY", "0");
        let result = load_config_with_env(&env);
        assert!(result.unwrap_err().to_string().contains("CONCURRENCY"));

        let env = MockEnvironment::new().with_var("CALL_TIMEOUT_SECONDS", "0");
        let result = load_config_with_env(&env);
        assert!(result.unwrap_err().to_string().contains("CALL_TIMEOUT_SECONDS"));

        let env = MockEnvironment::new().with_var("CALL_TIMEOUT_SECONDS", "-1");
        let result = load_config_with_env(&env);
        assert!(result.unwrap_err().to_string().contains("CALL_TIMEOUT_SECONDS"));

        let env = MockEnvironment::new().with_var("OUTPUT_FORMAT", "yaml");
        let result = load_config_with_env(&env);
        assert!(result.unwrap_err().to_string().contains("OUTPUT_FORMAT"));
    }

    #[test]
    fn test_namespace_parsing() {
        let env = MockEnvironment::new().with_var("NAMESPACES", " ns1 , ns2 ,  ns3  ,");
        let config = load_config_with_env(&env).unwrap();
        assert_eq!(config.namespaces, vec!["ns1", "ns2", "ns3"]);

        // blank entries collapse to "all namespaces"
        let env = MockEnvironment::new().with_var("NAMESPACES", " , , ,");
        let config = load_config_with_env(&env).unwrap();
        assert!(config.namespaces.is_empty());
    }

    #[test]
    fn test_boolean_parsing() {
        for val in ["1", "true", "TRUE", "True"] {
            let env = MockEnvironment::new().with_var("HTML_REPORT", val);
            let config = load_config_with_env(&env).unwrap();
            assert!(config.html_report, "Failed for value: {}", val);
        }

        for val in ["0", "false", "FALSE", "False", "no", "off", ""] {
            let env = MockEnvironment::new().with_var("HTML_REPORT", val);
            let config = load_config_with_env(&env).unwrap();
            assert!(!config.html_report, "Failed for value: {}", val);
        }
    }

    #[test]
    fn test_numeric_parsing_with_invalid_values() {
        let env = MockEnvironment::new()
            .with_var("GRACE_PERIOD_SECONDS", "invalid")
            .with_var("RETRY_ATTEMPTS", "0");

        let config = load_config_with_env(&env).unwrap();
        assert_eq!(config.grace_period, Duration::from_secs(5)); // default fallback
        assert_eq!(config.retry_attempts, 3); // default fallback
    }
}
