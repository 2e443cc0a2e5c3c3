// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use ciborium::Value;

/// Type tag carried by the first three bytes of an Android proof.
pub const ANDROID_PROOF_TAG: &[u8; 3] = b"S01";

/// OID of the Android key attestation extension in the leaf certificate.
pub const KEY_DESCRIPTION_OID: asn1::ObjectIdentifier =
    asn1::oid!(1, 3, 6, 1, 4, 1, 11129, 2, 1, 17);

pub(crate) fn to_bstr(v: &Value, n: &str) -> Result<Vec<u8>, Error> {
    match v {
        Value::Bytes(x) => Ok(x.clone()),
        _ => Err(Error::Decode(format!("{n} must be a byte string"))),
    }
}

/// Text fields are also accepted as UTF-8 byte strings, which is how some
/// provers serialise them.
pub(crate) fn to_tstr(v: &Value, n: &str) -> Result<String, Error> {
    match v {
        Value::Text(x) => Ok(x.clone()),
        Value::Bytes(x) => String::from_utf8(x.clone())
            .map_err(|e| Error::Decode(format!("{n} is not valid UTF-8: {e}"))),
        _ => Err(Error::Decode(format!("{n} must be a text string"))),
    }
}
