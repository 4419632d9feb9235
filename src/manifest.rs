use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::BuildError;

/// Metadata read from a built application bundle's embedded `Info.plist`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    pub identifier: String,
    pub name: String,
}

impl BundleInfo {
    /// Read identifier and display name from `{app}/Info.plist`. The file
    /// may be binary or XML; built bundles usually carry the binary form.
    pub fn from_app_bundle(app_path: &Path) -> Result<Self, BuildError> {
        let value = plist::Value::from_file(app_path.join("Info.plist"))?;
        let dict = value
            .as_dictionary()
            .ok_or_else(|| anyhow::anyhow!("Info.plist root is not a dictionary"))?;
        Ok(Self {
            identifier: plist_string(dict, "CFBundleIdentifier")?,
            name: plist_string(dict, "CFBundleName")?,
        })
    }
}

fn plist_string(dict: &plist::Dictionary, field: &'static str) -> Result<String, BuildError> {
    dict.get(field)
        .and_then(|value| value.as_string())
        .map(str::to_string)
        .ok_or(BuildError::MetadataMissing { field })
}

/// The over-the-air install manifest consumed by `itms-services`: a single
/// item pairing the archive URL with the bundle's identity.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct InstallManifest {
    pub items: Vec<ManifestItem>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ManifestItem {
    pub assets: Vec<ManifestAsset>,
    pub metadata: ManifestMetadata,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ManifestAsset {
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestMetadata {
    pub kind: String,
    pub bundle_identifier: String,
    pub title: String,
}

impl InstallManifest {
    pub fn new(info: &BundleInfo, ipa_url: &str) -> Self {
        Self {
            items: vec![ManifestItem {
                assets: vec![ManifestAsset {
                    kind: "software-package".to_string(),
                    url: ipa_url.to_string(),
                }],
                metadata: ManifestMetadata {
                    kind: "software".to_string(),
                    bundle_identifier: info.identifier.clone(),
                    title: info.name.clone(),
                },
            }],
        }
    }
}

/// Write the manifest as an XML property list, replacing any previous one.
pub fn write_manifest(path: &Path, info: &BundleInfo, ipa_url: &str) -> Result<(), BuildError> {
    plist::to_file_xml(path, &InstallManifest::new(info, ipa_url))?;
    Ok(())
}
