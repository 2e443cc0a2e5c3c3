// SPDX-License-Identifier: Apache-2.0

use base64::{self, engine::general_purpose, Engine as _};

const PEM_LINE_LEN: usize = 64;

/// encodes bytes as unpadded base64url, as used in compact JWS serialization
pub fn encode_url(v: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(v)
}

/// encodes bytes as padded standard base64
pub fn encode_std(v: &[u8]) -> String {
    general_purpose::STANDARD.encode(v)
}

/// decodes bytes from a padded standard base64 string
pub fn decode_std(v: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(v)
}

/// wraps a DER certificate in PEM armor with 64-character body lines
pub fn pem_armor(der: &[u8]) -> String {
    let body = encode_std(der);

    let mut out = String::from("-----BEGIN CERTIFICATE-----\n");

    // base64 output is ASCII, so byte chunks are valid str boundaries
    for line in body.as_bytes().chunks(PEM_LINE_LEN) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push('\n');
    }

    out.push_str("-----END CERTIFICATE-----\n");

    out
}
