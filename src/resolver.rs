// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Spec resolution: validates a [`StaticHostSpec`] and turns it into a canonical
//! [`BackendDescriptor`].
//!
//! Resolution is pure. The same spec always yields the same descriptor, and a spec
//! that fails here is reported as `InvalidSpec` without any retry.
//!
//! # Origins
//!
//! - **Azure**: `<account>.z<zone>.web.core.windows.net` (or
//!   `<account>.web.core.windows.net` without a zone id), served over HTTPS
//! - **AWS**: `<bucket>.s3-website-<region>.amazonaws.com` for the older regions,
//!   `<bucket>.s3-website.<region>.amazonaws.com` elsewhere, served over plain HTTP
//!   because S3 website endpoints do not support TLS
//!
//! # Example
//!
//! ```rust
//! use statichost::crd::{AzureSource, StaticHostSpec};
//! use statichost::resolver::{resolve, Provider};
//!
//! let spec = StaticHostSpec {
//!     provider: "azure".to_string(),
//!     ingress: "site.example.com".to_string(),
//!     azure: Some(AzureSource {
//!         account_name: Some("test".to_string()),
//!         dns_zone_id: None,
//!         subpath: Some("/".to_string()),
//!     }),
//!     aws: None,
//!     proxy: None,
//! };
//!
//! let backend = resolve(&spec, &[Provider::Azure, Provider::Aws], "nginx-proxy").unwrap();
//! assert_eq!(backend.origin_host, "test.web.core.windows.net");
//! assert_eq!(backend.proxy_service, "nginx-proxy");
//! ```

use crate::constants::{AWS_LEGACY_DASH_REGIONS, AWS_S3_WEBSITE_SUFFIX, AZURE_STATIC_WEBSITE_SUFFIX};
use crate::crd::{AwsSource, AzureSource, StaticHostSpec};
use crate::errors::InvalidSpec;
use std::fmt;
use std::str::FromStr;

/// Object-storage provider hosting the static website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Azure,
    Aws,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Azure => "azure",
            Self::Aws => "aws",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = InvalidSpec;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "aws" => Ok(Self::Aws),
            _ => Err(InvalidSpec::new(
                "spec.provider",
                format!("unsupported provider '{s}' (expected one of: azure, aws)"),
            )),
        }
    }
}

/// Storage origin, tagged by provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Azure {
        account_name: String,
        /// Zone partition digits, without the `z` prefix.
        dns_zone_id: Option<String>,
    },
    Aws {
        bucket_name: String,
        region: String,
    },
}

impl Origin {
    #[must_use]
    pub fn provider(&self) -> Provider {
        match self {
            Self::Azure { .. } => Provider::Azure,
            Self::Aws { .. } => Provider::Aws,
        }
    }
}

/// Canonical, validated form of a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    /// Public hostname served by the Ingress, lowercase.
    pub hostname: String,
    pub origin: Origin,
    /// Storage endpoint requests are proxied to. Also sent as the `Host` header.
    pub origin_host: String,
    /// Path prefix on the origin: empty or `/seg[/seg...]`, never a trailing slash.
    pub origin_path: String,
    /// Whether the origin is reached over HTTPS.
    pub tls: bool,
    /// Service fronting the Nginx proxy.
    pub proxy_service: String,
}

impl BackendDescriptor {
    /// URL scheme used to reach the origin.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.tls {
            "https"
        } else {
            "http"
        }
    }

    /// Base URL requests are proxied to, always ending with `/`.
    #[must_use]
    pub fn origin_url(&self) -> String {
        format!("{}://{}{}/", self.scheme(), self.origin_host, self.origin_path)
    }
}

/// Validate `spec` and resolve it into a [`BackendDescriptor`].
///
/// `allowed` restricts the providers the calling kind may use, and
/// `default_proxy_service` is used when the spec sets no `proxy.service`.
///
/// # Errors
///
/// Returns [`InvalidSpec`] naming the first offending field when the provider is
/// unknown or not allowed, the matching sub-spec is missing or incomplete, the other
/// sub-spec is set, or any value is malformed.
pub fn resolve(
    spec: &StaticHostSpec,
    allowed: &[Provider],
    default_proxy_service: &str,
) -> Result<BackendDescriptor, InvalidSpec> {
    let provider: Provider = spec.provider.parse()?;
    if !allowed.contains(&provider) {
        let expected: Vec<&str> = allowed.iter().map(|p| p.as_str()).collect();
        return Err(InvalidSpec::new(
            "spec.provider",
            format!(
                "provider '{provider}' is not supported by this kind (expected one of: {})",
                expected.join(", ")
            ),
        ));
    }

    let hostname = validate_hostname(&spec.ingress)?;

    let (origin, origin_host, origin_path, tls) = match provider {
        Provider::Azure => {
            if spec.aws.is_some() {
                return Err(InvalidSpec::new(
                    "spec.aws",
                    "must not be set when provider is azure",
                ));
            }
            let azure = spec.azure.as_ref().ok_or_else(|| {
                InvalidSpec::new("spec.azure", "is required when provider is azure")
            })?;
            resolve_azure(azure)?
        }
        Provider::Aws => {
            if spec.azure.is_some() {
                return Err(InvalidSpec::new(
                    "spec.azure",
                    "must not be set when provider is aws",
                ));
            }
            let aws = spec
                .aws
                .as_ref()
                .ok_or_else(|| InvalidSpec::new("spec.aws", "is required when provider is aws"))?;
            resolve_aws(aws)?
        }
    };

    let proxy_service = match spec.proxy.as_ref().and_then(|p| p.service.as_deref()) {
        Some(service) => {
            let service = service.trim();
            validate_service_name(service)
                .map_err(|e| InvalidSpec::new("spec.proxy.service", e.message))?;
            service.to_string()
        }
        None => default_proxy_service.to_string(),
    };

    Ok(BackendDescriptor {
        hostname,
        origin,
        origin_host,
        origin_path,
        tls,
        proxy_service,
    })
}

fn resolve_azure(azure: &AzureSource) -> Result<(Origin, String, String, bool), InvalidSpec> {
    let account_name = required("spec.azure.accountName", azure.account_name.as_deref())?;
    let valid_account = (3..=24).contains(&account_name.len())
        && account_name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !valid_account {
        return Err(InvalidSpec::new(
            "spec.azure.accountName",
            format!("'{account_name}' must be 3-24 lowercase letters or digits"),
        ));
    }

    let dns_zone_id = match azure.dns_zone_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let digits = raw.strip_prefix(['z', 'Z']).unwrap_or(raw);
            if digits.is_empty() || digits.len() > 3 || !digits.chars().all(|c| c.is_ascii_digit())
            {
                return Err(InvalidSpec::new(
                    "spec.azure.dnsZoneId",
                    format!("'{raw}' must be a zone number such as '6' or 'z6'"),
                ));
            }
            Some(digits.to_string())
        }
    };

    let origin_host = match &dns_zone_id {
        Some(zone) => format!("{account_name}.z{zone}.{AZURE_STATIC_WEBSITE_SUFFIX}"),
        None => format!("{account_name}.{AZURE_STATIC_WEBSITE_SUFFIX}"),
    };
    let origin_path = normalize_path("spec.azure.subpath", azure.subpath.as_deref())?;

    Ok((
        Origin::Azure {
            account_name: account_name.to_string(),
            dns_zone_id,
        },
        origin_host,
        origin_path,
        true,
    ))
}

fn resolve_aws(aws: &AwsSource) -> Result<(Origin, String, String, bool), InvalidSpec> {
    let bucket_name = required("spec.aws.bucketName", aws.bucket_name.as_deref())?;
    let valid_bucket = (3..=63).contains(&bucket_name.len())
        && bucket_name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
        && bucket_name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && bucket_name.ends_with(|c: char| c.is_ascii_alphanumeric())
        && !bucket_name.contains("..");
    if !valid_bucket {
        return Err(InvalidSpec::new(
            "spec.aws.bucketName",
            format!("'{bucket_name}' is not a valid S3 bucket name"),
        ));
    }

    let region = required("spec.aws.region", aws.region.as_deref())?;
    let valid_region = region.contains('-')
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && region.starts_with(|c: char| c.is_ascii_lowercase())
        && region.ends_with(|c: char| c.is_ascii_digit());
    if !valid_region {
        return Err(InvalidSpec::new(
            "spec.aws.region",
            format!("'{region}' is not a valid AWS region (e.g. 'eu-west-3')"),
        ));
    }

    let origin_host = if AWS_LEGACY_DASH_REGIONS.contains(&region) {
        format!("{bucket_name}.s3-website-{region}.{AWS_S3_WEBSITE_SUFFIX}")
    } else {
        format!("{bucket_name}.s3-website.{region}.{AWS_S3_WEBSITE_SUFFIX}")
    };
    let origin_path = normalize_path("spec.aws.prefix", aws.prefix.as_deref())?;

    Ok((
        Origin::Aws {
            bucket_name: bucket_name.to_string(),
            region: region.to_string(),
        },
        origin_host,
        origin_path,
        false,
    ))
}

fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, InvalidSpec> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(InvalidSpec::new(field, "is required")),
    }
}

/// Validate the public hostname of a static host.
///
/// Accepts a lowercase DNS-1123 subdomain, optionally starting with a `*.` wildcard label.
///
/// # Errors
///
/// Returns [`InvalidSpec`] on `spec.ingress` if the hostname is empty or malformed.
pub fn validate_hostname(raw: &str) -> Result<String, InvalidSpec> {
    let host = raw.trim();
    if host.is_empty() {
        return Err(InvalidSpec::new("spec.ingress", "is required"));
    }
    if host.len() > 253 {
        return Err(InvalidSpec::new(
            "spec.ingress",
            "must be at most 253 characters",
        ));
    }

    let rest = host.strip_prefix("*.").unwrap_or(host);
    let valid = !rest.is_empty() && rest.split('.').all(is_dns_label);
    if !valid {
        return Err(InvalidSpec::new(
            "spec.ingress",
            format!("'{raw}' is not a valid lowercase DNS hostname"),
        ));
    }
    Ok(host.to_string())
}

/// Validate a Service name (RFC 1035 label).
///
/// # Errors
///
/// Returns [`InvalidSpec`] if `name` is not 1-63 lowercase alphanumerics or `-`,
/// starting with a letter and ending with an alphanumeric.
pub fn validate_service_name(name: &str) -> Result<(), InvalidSpec> {
    if is_dns_label(name) && name.starts_with(|c: char| c.is_ascii_lowercase()) {
        Ok(())
    } else {
        Err(InvalidSpec::new(
            "service",
            format!("'{name}' is not a valid Service name"),
        ))
    }
}

fn is_dns_label(label: &str) -> bool {
    (1..=63).contains(&label.len())
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

/// Normalize a subpath or prefix into `""` or `/seg[/seg...]`.
///
/// Leading, trailing and repeated slashes are dropped. Dot segments, quotes, `$`
/// (Nginx variables) and anything that could end an Nginx directive are rejected.
fn normalize_path(field: &str, raw: Option<&str>) -> Result<String, InvalidSpec> {
    let Some(raw) = raw else {
        return Ok(String::new());
    };

    let mut normalized = String::new();
    for segment in raw.trim().split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(InvalidSpec::new(
                field,
                format!("'{raw}' must not contain '.' or '..' segments"),
            ));
        }
        if let Some(bad) = segment.chars().find(|c| !is_path_char(*c)) {
            return Err(InvalidSpec::new(
                field,
                format!("'{raw}' contains unsupported character '{bad}'"),
            ));
        }
        normalized.push('/');
        normalized.push_str(segment);
    }
    Ok(normalized)
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~!&()*+,=:@%".contains(c)
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
