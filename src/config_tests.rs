// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use super::super::{Cli, OperatorConfig};
    use clap::Parser;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["statichost-operator"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_operator_config_default() {
        // Flags only: environment variables are not set in the test process.
        let config = OperatorConfig::try_from(parse(&[])).unwrap();
        assert_eq!(config, OperatorConfig::default());
    }

    #[test]
    fn test_default_values() {
        let config = OperatorConfig::default();
        assert_eq!(config.default_proxy_service, "nginx-proxy");
        assert_eq!(config.ingress_class, "nginx");
        assert_eq!(config.cluster_issuer.as_deref(), Some("letsencrypt-prod"));
        assert_eq!(config.proxy_service_port, 80);
        assert_eq!(config.retry_budget, 5);
        assert_eq!(config.drift_interval, Duration::from_secs(10));
        assert_eq!(config.metrics_addr.port(), 8080);
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = OperatorConfig::try_from(parse(&[
            "--namespace",
            "web",
            "--default-proxy-service",
            "edge-proxy",
            "--ingress-class",
            "traefik",
            "--concurrency",
            "2",
            "--drift-interval-secs",
            "30",
            "--metrics-addr",
            "127.0.0.1:9090",
        ]))
        .unwrap();

        assert_eq!(config.namespace.as_deref(), Some("web"));
        assert_eq!(config.default_proxy_service, "edge-proxy");
        assert_eq!(config.ingress_class, "traefik");
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.drift_interval, Duration::from_secs(30));
        assert_eq!(config.metrics_addr.to_string(), "127.0.0.1:9090");
    }

    #[test]
    fn test_empty_cluster_issuer_disables_tls() {
        let config = OperatorConfig::try_from(parse(&["--cluster-issuer", ""])).unwrap();
        assert!(config.cluster_issuer.is_none());
    }

    #[test]
    fn test_blank_namespace_means_all_namespaces() {
        let config = OperatorConfig::try_from(parse(&["--namespace", "  "])).unwrap();
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_invalid_default_proxy_service_rejected() {
        let result = OperatorConfig::try_from(parse(&["--default-proxy-service", "Nginx_Proxy"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = OperatorConfig::try_from(parse(&["--concurrency", "0"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_retry_budget_rejected() {
        let result = OperatorConfig::try_from(parse(&["--retry-budget", "0"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_non_numeric_concurrency_is_a_parse_error() {
        let result = Cli::try_parse_from(["statichost-operator", "--concurrency", "many"]);
        assert!(result.is_err());
    }
}
