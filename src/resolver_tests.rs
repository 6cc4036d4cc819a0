// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resolver.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::{AwsSource, AzureSource, ProxyOverride, StaticHostSpec};

    const ALL: &[Provider] = &[Provider::Azure, Provider::Aws];

    fn azure_spec(account: &str, zone: Option<&str>, subpath: Option<&str>) -> StaticHostSpec {
        StaticHostSpec {
            provider: "azure".to_string(),
            ingress: "site.example.com".to_string(),
            azure: Some(AzureSource {
                account_name: Some(account.to_string()),
                dns_zone_id: zone.map(str::to_string),
                subpath: subpath.map(str::to_string),
            }),
            aws: None,
            proxy: None,
        }
    }

    fn aws_spec(bucket: &str, region: &str) -> StaticHostSpec {
        StaticHostSpec {
            provider: "aws".to_string(),
            ingress: "docs.example.com".to_string(),
            azure: None,
            aws: Some(AwsSource {
                bucket_name: Some(bucket.to_string()),
                region: Some(region.to_string()),
                prefix: None,
            }),
            proxy: None,
        }
    }

    // ========================================================================
    // Provider parsing
    // ========================================================================

    #[test]
    fn test_provider_parse_is_case_insensitive() {
        assert_eq!("Azure".parse::<Provider>().unwrap(), Provider::Azure);
        assert_eq!(" AWS ".parse::<Provider>().unwrap(), Provider::Aws);
    }

    #[test]
    fn test_unknown_provider_is_invalid_spec() {
        let mut spec = azure_spec("test", None, None);
        spec.provider = "gcp".to_string();

        let err = resolve(&spec, ALL, "nginx-proxy").unwrap_err();
        assert_eq!(err.field, "spec.provider");
        assert!(err.message.contains("'gcp'"));
    }

    #[test]
    fn test_provider_not_allowed_for_kind() {
        let spec = aws_spec("docs-bucket", "eu-west-3");
        let err = resolve(&spec, &[Provider::Azure], "nginx-proxy").unwrap_err();
        assert_eq!(err.field, "spec.provider");
        assert!(err.message.contains("expected one of: azure"));
    }

    // ========================================================================
    // Azure
    // ========================================================================

    #[test]
    fn test_azure_without_zone() {
        let backend = resolve(&azure_spec("test", None, Some("/")), ALL, "nginx-proxy").unwrap();

        assert_eq!(backend.hostname, "site.example.com");
        assert_eq!(backend.origin_host, "test.web.core.windows.net");
        assert_eq!(backend.origin_path, "");
        assert!(backend.tls);
        assert_eq!(backend.proxy_service, "nginx-proxy");
        assert_eq!(backend.origin_url(), "https://test.web.core.windows.net/");
        assert_eq!(
            backend.origin,
            Origin::Azure {
                account_name: "test".to_string(),
                dns_zone_id: None
            }
        );
    }

    #[test]
    fn test_azure_zone_accepts_both_forms() {
        for zone in ["6", "z6", "Z6"] {
            let backend =
                resolve(&azure_spec("mysite", Some(zone), None), ALL, "nginx-proxy").unwrap();
            assert_eq!(backend.origin_host, "mysite.z6.web.core.windows.net");
        }
    }

    #[test]
    fn test_azure_zone_rejects_garbage() {
        let err = resolve(&azure_spec("mysite", Some("zz"), None), ALL, "nginx-proxy").unwrap_err();
        assert_eq!(err.field, "spec.azure.dnsZoneId");
    }

    #[test]
    fn test_azure_subpath_is_normalized() {
        let backend = resolve(
            &azure_spec("mysite", None, Some("//docs//v2/")),
            ALL,
            "nginx-proxy",
        )
        .unwrap();
        assert_eq!(backend.origin_path, "/docs/v2");
        assert_eq!(
            backend.origin_url(),
            "https://mysite.web.core.windows.net/docs/v2/"
        );
    }

    #[test]
    fn test_azure_missing_sub_spec() {
        let mut spec = azure_spec("test", None, None);
        spec.azure = None;
        let err = resolve(&spec, ALL, "nginx-proxy").unwrap_err();
        assert_eq!(err.field, "spec.azure");
    }

    #[test]
    fn test_azure_incomplete_sub_spec() {
        let mut spec = azure_spec("test", None, None);
        spec.azure = Some(AzureSource::default());
        let err = resolve(&spec, ALL, "nginx-proxy").unwrap_err();
        assert_eq!(err.field, "spec.azure.accountName");
        assert_eq!(err.message, "is required");
    }

    #[test]
    fn test_azure_account_name_rules() {
        for bad in ["ab", "UPPER", "has-dash", "waytoolongaccountname12345"] {
            let err = resolve(&azure_spec(bad, None, None), ALL, "nginx-proxy").unwrap_err();
            assert_eq!(err.field, "spec.azure.accountName", "{bad} should be rejected");
        }
    }

    #[test]
    fn test_both_sub_specs_rejected() {
        let mut spec = azure_spec("test", None, None);
        spec.aws = Some(AwsSource::default());
        let err = resolve(&spec, ALL, "nginx-proxy").unwrap_err();
        assert_eq!(err.field, "spec.aws");
    }

    // ========================================================================
    // AWS
    // ========================================================================

    #[test]
    fn test_aws_dot_region_endpoint() {
        let backend = resolve(&aws_spec("docs-bucket", "eu-west-3"), ALL, "nginx-proxy").unwrap();
        assert_eq!(
            backend.origin_host,
            "docs-bucket.s3-website.eu-west-3.amazonaws.com"
        );
        assert!(!backend.tls);
        assert_eq!(
            backend.origin_url(),
            "http://docs-bucket.s3-website.eu-west-3.amazonaws.com/"
        );
    }

    #[test]
    fn test_aws_dash_region_endpoint() {
        let backend = resolve(&aws_spec("docs-bucket", "us-east-1"), ALL, "nginx-proxy").unwrap();
        assert_eq!(
            backend.origin_host,
            "docs-bucket.s3-website-us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn test_aws_prefix() {
        let mut spec = aws_spec("docs-bucket", "eu-west-3");
        if let Some(aws) = spec.aws.as_mut() {
            aws.prefix = Some("site/".to_string());
        }
        let backend = resolve(&spec, ALL, "nginx-proxy").unwrap();
        assert_eq!(backend.origin_path, "/site");
    }

    #[test]
    fn test_aws_missing_region() {
        let mut spec = aws_spec("docs-bucket", "eu-west-3");
        if let Some(aws) = spec.aws.as_mut() {
            aws.region = None;
        }
        let err = resolve(&spec, ALL, "nginx-proxy").unwrap_err();
        assert_eq!(err.field, "spec.aws.region");
    }

    #[test]
    fn test_aws_invalid_bucket_and_region() {
        let err = resolve(&aws_spec("-bad", "eu-west-3"), ALL, "nginx-proxy").unwrap_err();
        assert_eq!(err.field, "spec.aws.bucketName");

        let err = resolve(&aws_spec("docs-bucket", "europe"), ALL, "nginx-proxy").unwrap_err();
        assert_eq!(err.field, "spec.aws.region");
    }

    // ========================================================================
    // Hostname, path and proxy service
    // ========================================================================

    #[test]
    fn test_hostname_validation() {
        assert_eq!(validate_hostname("site.example.com").unwrap(), "site.example.com");
        assert_eq!(validate_hostname("*.example.com").unwrap(), "*.example.com");
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("Site.Example.com").is_err());
        assert!(validate_hostname("bad_host.example.com").is_err());
        assert!(validate_hostname("-bad.example.com").is_err());
        assert!(validate_hostname("site..example.com").is_err());
    }

    #[test]
    fn test_path_injection_rejected() {
        for bad in ["/../etc", "/a;b", "/a b", "/{x}", "/$host", "/a'b"] {
            let err =
                resolve(&azure_spec("mysite", None, Some(bad)), ALL, "nginx-proxy").unwrap_err();
            assert_eq!(err.field, "spec.azure.subpath", "{bad} should be rejected");
        }
    }

    #[test]
    fn test_proxy_service_override() {
        let mut spec = azure_spec("test", None, None);
        spec.proxy = Some(ProxyOverride {
            service: Some("edge-proxy".to_string()),
        });
        let backend = resolve(&spec, ALL, "nginx-proxy").unwrap();
        assert_eq!(backend.proxy_service, "edge-proxy");
    }

    #[test]
    fn test_proxy_service_override_validated() {
        let mut spec = azure_spec("test", None, None);
        spec.proxy = Some(ProxyOverride {
            service: Some("1proxy".to_string()),
        });
        let err = resolve(&spec, ALL, "nginx-proxy").unwrap_err();
        assert_eq!(err.field, "spec.proxy.service");
    }

    #[test]
    fn test_empty_proxy_override_uses_default() {
        let mut spec = azure_spec("test", None, None);
        spec.proxy = Some(ProxyOverride { service: None });
        let backend = resolve(&spec, ALL, "custom-default").unwrap();
        assert_eq!(backend.proxy_service, "custom-default");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let spec = azure_spec("mysite", Some("z6"), Some("/docs"));
        let first = resolve(&spec, ALL, "nginx-proxy").unwrap();
        let second = resolve(&spec, ALL, "nginx-proxy").unwrap();
        assert_eq!(first, second);
    }
}
