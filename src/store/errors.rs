// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Certificate bundle error: {0}")]
    CertBundle(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::CertBundle(e) | Error::Config(e) => {
                write!(f, "{}", e)
            }
        }
    }
}
