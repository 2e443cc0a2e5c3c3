// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use androidproof::proof::{AndroidVerifier, ProofKind, ProofVerifier};
use androidproof::store::{CertificateChain, Settings};
use androidproof::verify::GoogleAuthority;
use clap::Parser;
use serde_json::json;
use std::error::Error;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
enum AndroidProofCli {
    Verify(VerifyArgs),
    Pem(PemArgs),
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Verify the supplied proof against the pinned attestation \
    certificate chain and print a JSON summary of the outcome")]
struct VerifyArgs {
    #[arg(short, long, default_value = "proof.bin")]
    proof: String,

    #[arg(short, long, default_value = "AndroidProof.chain")]
    chain: String,

    #[arg(short, long, default_value = "settings.json")]
    settings: String,

    /// Attestation authority timeout, in seconds
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Print the PEM encoding of the leaf, intermediate and root \
    certificates found in the supplied bundle")]
struct PemArgs {
    #[arg(short, long, default_value = "AndroidProof.chain")]
    chain: String,
}

fn main() -> ExitCode {
    env_logger::init();

    match AndroidProofCli::parse() {
        AndroidProofCli::Verify(args) => match verify(&args) {
            Ok((summary, passed)) => {
                println!("{summary}");
                if passed {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(e) => {
                eprintln!("verification failed: {e}");
                ExitCode::FAILURE
            }
        },

        AndroidProofCli::Pem(args) => match pem(&args) {
            Ok(pems) => {
                print!("{pems}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("certificate bundle decoding failed: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

fn verify(args: &VerifyArgs) -> Result<(String, bool), Box<dyn Error>> {
    let p: Vec<u8> = fs::read(&args.proof)?;

    let kind = match ProofKind::sniff(&p) {
        Some(ProofKind::Android) => ProofKind::Android,
        Some(other) => {
            log::warn!("{other} proofs are verified by an external verifier");
            let j = json!({"result": false, "type": other, "failures": []});
            return Ok((serde_json::to_string_pretty(&j)?, false));
        }
        None => {
            log::warn!("unknown proof type");
            let j = json!({"result": false, "type": null, "failures": []});
            return Ok((serde_json::to_string_pretty(&j)?, false));
        }
    };

    let j = fs::read_to_string(&args.settings)?;
    let settings = Settings::load_json(&j)?;

    let b: Vec<u8> = fs::read(&args.chain)?;
    let chain = CertificateChain::decode(&b)?;

    let authority = Arc::new(GoogleAuthority::new(&settings.google_api_key));
    let verifier = AndroidVerifier::new(
        &chain,
        &settings,
        authority,
        Duration::from_secs(args.timeout),
    );

    log::debug!("verifying {kind} proof {}", args.proof);

    let report = verifier.verify(&p)?;
    let summary = report.summary();

    Ok((serde_json::to_string_pretty(&summary)?, summary.result))
}

fn pem(args: &PemArgs) -> Result<String, Box<dyn Error>> {
    let b: Vec<u8> = fs::read(&args.chain)?;

    let chain = CertificateChain::decode(&b)?;

    Ok(chain.to_pem().concat())
}
