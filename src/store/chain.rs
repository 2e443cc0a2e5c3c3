// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use crate::token::base64;
use crate::token::x509::Certificate;
use ciborium::de::from_reader;
use ciborium::Value;
use openssl::x509::X509;

const LEAF_LABEL: &str = "leaf";
const INTERMEDIATE_LABEL: &str = "intermediate";
const ROOT_LABEL: &str = "root";

/// A certificate held in the three forms verification needs: the DER
/// encoding (for TLV extraction), the PEM armor (for loading keys), and the
/// parsed OpenSSL object.
#[derive(Clone)]
pub struct ChainCert {
    der: Vec<u8>,
    pem: String,
    x509: X509,
}

impl std::fmt::Debug for ChainCert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.x509.subject_name())
    }
}

impl ChainCert {
    /// Parse a DER certificate; `name` identifies the chain slot in errors
    pub fn from_der(der: &[u8], name: &str) -> Result<ChainCert, Error> {
        // strict DER first: OpenSSL is lenient with some encodings the
        // TLV extraction would later reject
        Certificate::parse(der).map_err(|e| Error::CertBundle(format!("{name}: {e}")))?;

        let x509 = X509::from_der(der).map_err(|e| Error::CertBundle(format!("{name}: {e}")))?;

        Ok(ChainCert {
            der: der.to_vec(),
            pem: base64::pem_armor(der),
            x509,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn x509(&self) -> &X509 {
        &self.x509
    }
}

/// The pinned leaf → intermediate → root chain of the device attestation
/// key.  It is loaded once and shared read-only by all verifications.
#[derive(Clone, Debug)]
pub struct CertificateChain {
    pub leaf: ChainCert,
    pub intermediate: ChainCert,
    pub root: ChainCert,
}

impl CertificateChain {
    pub fn from_der(leaf: &[u8], intermediate: &[u8], root: &[u8]) -> Result<Self, Error> {
        Ok(CertificateChain {
            leaf: ChainCert::from_der(leaf, LEAF_LABEL)?,
            intermediate: ChainCert::from_der(intermediate, INTERMEDIATE_LABEL)?,
            root: ChainCert::from_der(root, ROOT_LABEL)?,
        })
    }

    /// Decode a CBOR bundle mapping `leaf`, `intermediate` and `root` to
    /// DER certificates
    pub fn decode(bundle: &[u8]) -> Result<Self, Error> {
        let v: Value = from_reader(bundle).map_err(|e| Error::CertBundle(e.to_string()))?;

        let contents = match v {
            Value::Map(contents) => contents,
            _ => return Err(Error::CertBundle("expecting map type".to_string())),
        };

        let mut leaf: Option<Vec<u8>> = None;
        let mut intermediate: Option<Vec<u8>> = None;
        let mut root: Option<Vec<u8>> = None;

        for (k, v) in contents.iter() {
            let label = match k {
                Value::Text(label) => label.as_str(),
                _ => return Err(Error::CertBundle("expecting text key".to_string())),
            };

            let slot = match label {
                LEAF_LABEL => &mut leaf,
                INTERMEDIATE_LABEL => &mut intermediate,
                ROOT_LABEL => &mut root,
                unknown => {
                    log::debug!("ignoring unknown key {unknown} in certificate bundle");
                    continue;
                }
            };

            if slot.is_some() {
                return Err(Error::CertBundle(format!("duplicated entry {label}")));
            }

            match v {
                Value::Bytes(der) => *slot = Some(der.clone()),
                _ => {
                    return Err(Error::CertBundle(format!(
                        "{label} must be a byte string"
                    )))
                }
            }
        }

        let missing = |n: &str| Error::CertBundle(format!("missing entry {n}"));

        Self::from_der(
            &leaf.ok_or_else(|| missing(LEAF_LABEL))?,
            &intermediate.ok_or_else(|| missing(INTERMEDIATE_LABEL))?,
            &root.ok_or_else(|| missing(ROOT_LABEL))?,
        )
    }

    /// PEM text of leaf, intermediate and root, in that order
    pub fn to_pem(&self) -> [&str; 3] {
        [self.leaf.pem(), self.intermediate.pem(), self.root.pem()]
    }
}
