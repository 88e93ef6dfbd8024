// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{info, LevelFilter};
use std::path::PathBuf;
use syno_cert_decoder::{
    config::{DEFAULT_OUTPUT_PATH, ENV_JSON_FILE, VERSION},
    secret::{PassphraseArgs, StdioPassphraseReader},
    util, write_pem_files, write_pkcs12, CertificateBundle,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
/// Extract PEM files from a syno-cli JSON certificate data file, or package
/// them as a PKCS#12 file.
struct Args {
    /// Increase verbosity
    #[clap(long, env)]
    verbose: bool,

    /// Print our pid and wait for a debugger to attach before running
    #[clap(long, env)]
    debugger: bool,

    /// subcommands
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the version and exit.
    Version,

    /// Extract the private key, certificate and issuer certificate from a
    /// JSON data file and write each to its own PEM file, e.g.
    /// `<output-path>/myservice.mydomain.com-privateKey.pem`.
    WritePemFiles {
        /// The path to the JSON file that includes the encoded certificate,
        /// key, and issuer cert.
        #[clap(long, env = ENV_JSON_FILE)]
        json_file: PathBuf,

        /// The path to where the PEM files will be written.
        #[clap(long, default_value = DEFAULT_OUTPUT_PATH)]
        output_path: PathBuf,
    },

    /// Create a PKCS#12 file from the private key and certificate in a JSON
    /// data file.
    Pkcs12 {
        /// The path to the JSON file that includes the encoded certificate,
        /// key, and issuer cert.
        #[clap(long, env = ENV_JSON_FILE)]
        json_file: PathBuf,

        /// The path to the file that will be created
        /// (e.g. myservice.mydomain.com.pfx).
        #[clap(long)]
        output_file: PathBuf,

        #[command(flatten)]
        passphrases: PassphraseArgs,

        /// Add the issuer certificate to the PKCS#12 file as CA chain.
        #[clap(long)]
        include_issuer: bool,

        /// Friendly name for the key and certificate, defaults to the JSON
        /// file stem.
        #[clap(long)]
        friendly_name: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = Builder::from_default_env();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    builder.filter(None, level).init();

    if args.debugger {
        util::wait_for_debugger()?;
    }

    match args.command {
        Command::Version => {
            println!("{}", VERSION);
            Ok(())
        }
        Command::WritePemFiles {
            json_file,
            output_path,
        } => {
            info!("Parsing file at {}", json_file.display());
            let bundle = CertificateBundle::decode(&json_file)
                .context("Failed to decode JSON data file")?;
            write_pem_files(&bundle, &output_path).with_context(|| {
                format!("Failed to write PEM files to {}", output_path.display())
            })?;
            Ok(())
        }
        Command::Pkcs12 {
            json_file,
            output_file,
            passphrases,
            include_issuer,
            friendly_name,
        } => {
            info!("Parsing file at {}", json_file.display());
            let bundle = CertificateBundle::decode(&json_file)
                .context("Failed to decode JSON data file")?;

            let mut options =
                passphrases.into_options(&mut StdioPassphraseReader::default())?;
            options.include_issuer = include_issuer;
            options.friendly_name = friendly_name;

            write_pkcs12(&bundle, &options, &output_file).with_context(|| {
                format!("Failed to create PKCS#12 file {}", output_file.display())
            })
        }
    }
}
