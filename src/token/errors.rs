// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("Envelope decoding error: {0}")]
    Decode(String),
    #[error("ASN.1 decoding error: {0}")]
    AsnDecode(String),
    #[error("Unsupported proof: {0}")]
    Unsupported(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Decode(e) | Error::AsnDecode(e) | Error::Unsupported(e) => {
                write!(f, "{}", e)
            }
        }
    }
}
