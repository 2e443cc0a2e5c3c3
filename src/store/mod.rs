// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Material provisioned by the caller ahead of verification: the pinned
//! attestation certificate chain and the deployment settings.

pub use self::chain::{CertificateChain, ChainCert};
pub use self::errors::Error;
pub use self::settings::Settings;

mod chain;
mod errors;
mod settings;
