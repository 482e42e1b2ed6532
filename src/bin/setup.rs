//! Command-line driver for the Groth16 trusted-setup ceremony.
//!
//! Sub-command names are canonical, not mandatory; argument parsing is
//! manual dispatch on `std::env::args()`, matching `generate_production_srs`
//! rather than reaching for a CLI-parsing crate (§6).

use bn254_setup::error::CeremonyError;
use bn254_setup::r1cs::R1cs;
use bn254_setup::{ceremony_digest, key_extractor, phase1, phase2};
use std::fs::File;
use std::io::{BufReader, BufWriter};

fn usage() -> &'static str {
    "usage:\n  \
     setup p1n <power> <out>\n  \
     setup p1c <in> <out>\n  \
     setup p1v <in>\n  \
     setup p2n <phase1> <r1cs> <phase2>\n  \
     setup p2c <in> <out>\n  \
     setup p2v <in> <origin>\n  \
     setup key <phase2>"
}

fn parse_power(s: &str) -> Result<u8, CeremonyError> {
    s.parse::<u8>()
        .map_err(|_| CeremonyError::InvalidArgument(format!("not a valid power: {s}")))
}

fn cmd_p1n(args: &[String]) -> Result<(), CeremonyError> {
    let [power, out] = args else {
        return Err(CeremonyError::InvalidArgument("p1n <power> <out>".into()));
    };
    let power = parse_power(power)?;
    tracing::info!(power, "phase1 initialize: writing {out}");
    let f = BufWriter::new(File::create(out)?);
    phase1::initialize(power, f)?;
    tracing::info!("phase1 initialize complete");
    Ok(())
}

fn cmd_p1c(args: &[String]) -> Result<(), CeremonyError> {
    let [input, out] = args else {
        return Err(CeremonyError::InvalidArgument("p1c <in> <out>".into()));
    };
    tracing::info!("phase1 contribute: {input} -> {out}");
    let input_f = BufReader::new(File::open(input)?);
    let out_f = BufWriter::new(File::create(out)?);
    phase1::contribute(input_f, out_f)?;
    tracing::info!("phase1 contribute complete");
    Ok(())
}

fn cmd_p1v(args: &[String]) -> Result<(), CeremonyError> {
    let [input] = args else {
        return Err(CeremonyError::InvalidArgument("p1v <in>".into()));
    };

    {
        let mut digest_f = BufReader::new(File::open(input)?);
        let digest = ceremony_digest::digest_of(&mut digest_f)?;
        match ceremony_digest::check_digest(digest) {
            ceremony_digest::DigestCheck::Known(name) => {
                tracing::info!(ceremony = name, "recognized known ceremony transcript")
            }
            ceremony_digest::DigestCheck::Unrecognized => {}
        }
    }

    tracing::info!("phase1 verify: {input}");
    let f = BufReader::new(File::open(input)?);
    phase1::verify(f)?;
    tracing::info!("phase1 verify: OK");
    Ok(())
}

fn cmd_p2n(args: &[String]) -> Result<(), CeremonyError> {
    let [phase1_path, r1cs_path, phase2_path] = args else {
        return Err(CeremonyError::InvalidArgument(
            "p2n <phase1> <r1cs> <phase2>".into(),
        ));
    };
    tracing::info!("phase2 initialize: {phase1_path} + {r1cs_path} -> {phase2_path}");

    let r1cs_f = BufReader::new(File::open(r1cs_path)?);
    let r1cs = R1cs::read(r1cs_f)?;

    let phase1_f = BufReader::new(File::open(phase1_path)?);
    let phase2_out = BufWriter::new(File::create(phase2_path)?);
    let lag_out = BufWriter::new(File::create("srs.lag")?);
    let evals_out = BufWriter::new(File::create("evals")?);

    phase2::initialize(phase1_f, &r1cs, phase2_out, lag_out, evals_out)?;
    tracing::info!("phase2 initialize complete; wrote srs.lag and evals alongside");
    Ok(())
}

fn cmd_p2c(args: &[String]) -> Result<(), CeremonyError> {
    let [input, out] = args else {
        return Err(CeremonyError::InvalidArgument("p2c <in> <out>".into()));
    };
    tracing::info!("phase2 contribute: {input} -> {out}");
    let input_f = BufReader::new(File::open(input)?);
    let out_f = BufWriter::new(File::create(out)?);
    phase2::contribute(input_f, out_f)?;
    tracing::info!("phase2 contribute complete");
    Ok(())
}

fn cmd_p2v(args: &[String]) -> Result<(), CeremonyError> {
    let [input, origin] = args else {
        return Err(CeremonyError::InvalidArgument("p2v <in> <origin>".into()));
    };
    tracing::info!("phase2 verify: {input} against origin {origin}");
    let input_f = BufReader::new(File::open(input)?);
    let origin_f = BufReader::new(File::open(origin)?);
    phase2::verify(input_f, origin_f)?;
    tracing::info!("phase2 verify: OK");
    Ok(())
}

fn cmd_key(args: &[String]) -> Result<(), CeremonyError> {
    let [phase2_path] = args else {
        return Err(CeremonyError::InvalidArgument("key <phase2>".into()));
    };
    tracing::info!("extracting proving/verifying keys from {phase2_path}");

    let phase2_f = BufReader::new(File::open(phase2_path)?);
    let evals_f = BufReader::new(File::open("evals")?);
    let pk_out = BufWriter::new(File::create("pk")?);
    let vk_out = BufWriter::new(File::create("vk")?);

    key_extractor::extract(phase2_f, evals_f, pk_out, vk_out)?;
    tracing::info!("wrote pk and vk");
    Ok(())
}

fn run(args: &[String]) -> Result<(), CeremonyError> {
    let (cmd, rest) = args
        .split_first()
        .ok_or_else(|| CeremonyError::InvalidArgument(usage().into()))?;

    match cmd.as_str() {
        "p1n" => cmd_p1n(rest),
        "p1c" => cmd_p1c(rest),
        "p1v" => cmd_p1v(rest),
        "p2n" => cmd_p2n(rest),
        "p2c" => cmd_p2c(rest),
        "p2v" => cmd_p2v(rest),
        "key" => cmd_key(rest),
        other => Err(CeremonyError::InvalidArgument(format!(
            "unknown sub-command '{other}'\n{}",
            usage()
        ))),
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
