//! Generate a development Phase 1 SRS (NOT FOR PRODUCTION).
//!
//! Behind the `dev-srs` feature only: samples tau/alpha/beta from a
//! fixed-seed `StdRng` rather than `OsRng`, so the resulting file's secret
//! is public and reproducible. Useful for local circuit iteration where
//! waiting on a real multi-party ceremony is unnecessary.

use anyhow::Result;
use bn254_setup::phase1;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let power: u8 = if let Some(pos) = args.iter().position(|s| s == "--power") {
        args.get(pos + 1).and_then(|s| s.parse().ok()).unwrap_or(14)
    } else if let Some(arg) = args.iter().find(|s| s.starts_with("--power=")) {
        arg.strip_prefix("--power=")
            .and_then(|s| s.parse().ok())
            .unwrap_or(14)
    } else {
        14
    };

    let out_path = args
        .iter()
        .position(|s| s == "--output")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dev-phase1.srs"));

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("⚠️  WARNING: Generating DEVELOPMENT Phase 1 SRS (seed=42, tau is PUBLIC)");
    println!("⚠️  This file is NOT SECURE and must NEVER be used in production!");
    println!("⚠️  Anyone who reads this source can forge proofs against it.");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("Generating dev Phase 1 SRS: power={power} (N = 2^{power})");

    let mut bootstrap = Vec::new();
    phase1::initialize(power, &mut bootstrap)?;
    println!("  bootstrap file initialized ({} bytes)", bootstrap.len());

    let out_f = BufWriter::new(File::create(&out_path)?);
    phase1::dev_contribute(std::io::Cursor::new(&bootstrap), out_f)?;
    println!("✓ Dev SRS generated with one deterministic contribution");

    phase1::verify(BufReader::new(File::open(&out_path)?))?;
    println!("✓ Verified");
    println!("  {}", out_path.display());

    Ok(())
}
