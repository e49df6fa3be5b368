//! Command-line front end: `hash`, `verify` and `gensalt`.

use std::fmt;
use std::io::{self, BufRead};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

use bcrypt_kit::{gen_salt, hash, verify, Cost, Prefix, DEFAULT_COST, MAX_KEY_LEN};

/// Exit status for usage errors, unreadable input and malformed hashes.
pub const EXIT_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "bcrypt_kit",
    version,
    about = "Generate and verify bcrypt hashes",
    long_about = "Generate a bcrypt hash from a password, or check a password against an existing hash. \
                  Higher costs are more secure but take longer to compute."
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log progress to stderr (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Hash a password read from the terminal
    Hash {
        /// Cost factor, 4 to 31
        #[arg(short, long, default_value_t = DEFAULT_COST)]
        cost: u32,

        /// Version tag of the produced hash
        #[arg(short, long, default_value_t = Prefix::V2b)]
        prefix: Prefix,

        #[command(flatten)]
        input: PasswordInput,
    },
    /// Check a password against a hash
    Verify {
        /// The bcrypt hash to check against
        #[arg(value_name = "HASH")]
        hash: String,

        #[command(flatten)]
        input: PasswordInput,
    },
    /// Print a fresh salt setting, such as `$2b$12$...`
    Gensalt {
        /// Cost factor, 4 to 31
        #[arg(short, long, default_value_t = DEFAULT_COST)]
        cost: u32,

        /// Version tag of the salt setting
        #[arg(short, long, default_value_t = Prefix::V2b)]
        prefix: Prefix,
    },
}

#[derive(clap::Args, Debug)]
pub struct PasswordInput {
    /// Apply Unicode NFKC normalization to the password first
    #[arg(long)]
    pub normalize: bool,

    /// Read the password from the first line of stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,
}

/// How a cost factor rates for production use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CostRating {
    Low,
    Medium,
    High,
    Excessive,
}

impl CostRating {
    pub fn of(cost: u32) -> Self {
        match cost {
            0..=7 => CostRating::Low,
            8..=11 => CostRating::Medium,
            12..=15 => CostRating::High,
            _ => CostRating::Excessive,
        }
    }
}

impl fmt::Display for CostRating {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            CostRating::Low => "Low security - not recommended for production",
            CostRating::Medium => "Medium security - good for testing",
            CostRating::High => "High security - suitable for production",
            CostRating::Excessive => "Excessive security - but very slow",
        })
    }
}

/// What a successful run ended with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Done,
    Matched,
    Mismatched,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Outcome::Done | Outcome::Matched => 0,
            Outcome::Mismatched => 1,
        }
    }
}

/// Maps a run to the process exit status: 0 success or match, 1 mismatch, 2 error.
pub fn exit_status(result: &Result<Outcome>) -> u8 {
    match result {
        Ok(outcome) => outcome.code(),
        Err(_) => EXIT_ERROR,
    }
}

pub fn exit_code(result: &Result<Outcome>) -> ExitCode {
    ExitCode::from(exit_status(result))
}

pub fn normalize_password(password: &str) -> Zeroizing<String> {
    Zeroizing::new(password.nfkc().collect::<String>())
}

/// Applies the front end's password policy to raw input.
pub fn prepare_password(raw: Zeroizing<String>, normalize: bool) -> Result<Zeroizing<String>> {
    // Empty input is legal bcrypt, but almost certainly a mistake here.
    if raw.is_empty() {
        bail!("Password must not be empty");
    }

    let password = if normalize { normalize_password(&raw) } else { raw };
    if password.len() > MAX_KEY_LEN {
        log::warn!(
            "password is {} bytes; bcrypt ignores everything past byte {}",
            password.len(),
            MAX_KEY_LEN
        );
    }
    Ok(password)
}

fn read_line<R: BufRead>(mut reader: R) -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    reader
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let trimmed = line.trim_end_matches(&['\n', '\r'][..]).len();
    line.truncate(trimmed);
    Ok(line)
}

impl PasswordInput {
    fn read<R: BufRead>(&self, prompt: &str, stdin: R) -> Result<Zeroizing<String>> {
        let raw = if self.password_stdin {
            read_line(stdin)?
        } else {
            Zeroizing::new(rpassword::prompt_password(prompt).context("Failed to read password")?)
        };
        prepare_password(raw, self.normalize)
    }
}

pub fn run(cli: Cli) -> Result<Outcome> {
    run_with_input(cli, io::stdin().lock())
}

/// [`run`] with `--password-stdin` reading from `stdin` instead of the process's.
pub fn run_with_input<R: BufRead>(cli: Cli, stdin: R) -> Result<Outcome> {
    match cli.command {
        Command::Hash { cost, prefix, input } => {
            let cost = Cost::new(cost)?;
            let password = input.read("Enter password to hash: ", stdin)?;

            log::debug!("hashing with prefix {} and cost {}", prefix, cost);
            let started = Instant::now();
            let hashed = hash(password.as_bytes(), cost.get(), prefix)?;
            log::info!("hash computed in {:?}", started.elapsed());

            println!("{}", hashed);
            eprintln!("Cost {}: {}", cost.get(), CostRating::of(cost.get()));
            Ok(Outcome::Done)
        }
        Command::Verify { hash, input } => {
            let password = input.read("Enter password to verify: ", stdin)?;

            let started = Instant::now();
            let matched = verify(password.as_bytes(), hash.trim()).context("Cannot verify against this hash")?;
            log::info!("hash checked in {:?}", started.elapsed());

            if matched {
                println!("Password verification: success");
                Ok(Outcome::Matched)
            } else {
                println!("Password verification: failed");
                Ok(Outcome::Mismatched)
            }
        }
        Command::Gensalt { cost, prefix } => {
            println!("{}", gen_salt(cost, prefix)?);
            Ok(Outcome::Done)
        }
    }
}
