// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use serde::Deserialize;

/// Deployment settings for Android proof verification, loaded from the
/// `settings.json` file shipped next to the certificate bundle.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// API key for the attestation authority's verification endpoint
    #[serde(rename(deserialize = "googleApiKey"))]
    pub google_api_key: String,

    /// Expected base64 SHA-256 digest of the prover application's APK
    #[serde(rename(deserialize = "apkDigest"))]
    pub apk_digest: String,

    /// Expected base64 SHA-256 digest of the APK signing certificate
    #[serde(rename(deserialize = "apkCertDigest"))]
    pub apk_cert_digest: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("google_api_key", &"<redacted>")
            .field("apk_digest", &self.apk_digest)
            .field("apk_cert_digest", &self.apk_cert_digest)
            .finish()
    }
}

impl Settings {
    pub fn load_json(j: &str) -> Result<Settings, Error> {
        serde_json::from_str(j).map_err(|e| Error::Config(e.to_string()))
    }
}
