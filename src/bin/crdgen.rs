// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates Kubernetes CRD YAML files from Rust types defined in src/crd.rs.
//! This ensures the YAML files in deploy/crds/ are always in sync with the Rust code.
//!
//! Usage:
//!   cargo run --bin crdgen
//!
//! Generated files will be written to deploy/crds/ with proper headers.

use anyhow::Result;
use kube::CustomResourceExt;
use serde_json::Value;
use statichost::constants::{API_GROUP_VERSION, LEGACY_API_GROUP_VERSION};
use statichost::crd::{AzureStaticHost, StaticHost};
use std::fs;
use std::path::Path;

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<()> {
    let output_dir = Path::new("deploy/crds");

    // Ensure output directory exists
    fs::create_dir_all(output_dir)?;

    println!("Generating CRD YAML files from src/crd.rs...");

    generate_crd::<StaticHost>("statichosts.crd.yaml", output_dir, None)?;
    let legacy_warning = format!(
        "{LEGACY_API_GROUP_VERSION} AzureStaticHost is deprecated. Use {API_GROUP_VERSION} StaticHost instead."
    );
    generate_crd::<AzureStaticHost>(
        "azurestatichosts.crd.yaml",
        output_dir,
        Some(&legacy_warning),
    )?;

    println!("✓ Successfully generated CRD YAML files in deploy/crds/");
    println!("\nNext steps:");
    println!("  1. Review the generated files");
    println!("  2. Deploy with: kubectl apply -f deploy/crds/");

    Ok(())
}

fn generate_crd<T>(filename: &str, output_dir: &Path, deprecation: Option<&str>) -> Result<()>
where
    T: CustomResourceExt,
{
    let crd = T::crd();

    // Convert CRD to JSON for manipulation
    let mut crd_json: Value = serde_json::to_value(&crd)?;

    // The legacy kind is still served, but clients get a warning on every request
    if let Some(warning) = deprecation {
        if let Some(versions) = crd_json["spec"]["versions"].as_array_mut() {
            for version in versions {
                version["deprecated"] = Value::Bool(true);
                version["deprecationWarning"] = Value::String(warning.to_string());
            }
        }
    }

    let yaml = serde_yaml::to_string(&crd_json)?;
    let content = format!("{COPYRIGHT_HEADER}{yaml}");

    let output_path = output_dir.join(filename);
    fs::write(&output_path, content)?;

    println!("  ✓ Generated {filename}");

    Ok(())
}
