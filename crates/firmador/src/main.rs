#![forbid(unsafe_code)]

//! Firmador CLI — sign an XML document with a PKCS#12 credential.

use clap::{Parser, Subcommand};
use firmador_core::Error;
use firmador_xades::{sign_with_options, SignOptions, SignParams};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "firmador",
    about = "Firmador — XAdES-BES enveloped XML signatures from a PKCS#12 credential",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign an XML document
    Sign {
        /// PKCS#12 credential bundle (.p12/.pfx)
        #[arg(long)]
        p12: PathBuf,

        /// Import password for the credential
        #[arg(long)]
        password: String,

        /// Local name of the root element the signature is inserted into
        #[arg(long)]
        root: String,

        /// XML document file to sign (takes precedence over --xml-string)
        #[arg(long)]
        xml: Option<PathBuf>,

        /// XML document passed inline
        #[arg(long = "xml-string")]
        xml_string: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fixed seed for the signature identifiers (reproducible output)
        #[arg(long)]
        seed: Option<u64>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List supported algorithms and container formats
    Info,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sign {
            p12,
            password,
            root,
            xml,
            xml_string,
            output,
            seed,
            verbose,
        } => cmd_sign(p12, password, root, xml, xml_string, output, seed, verbose),

        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn cmd_sign(
    p12: PathBuf,
    password: String,
    root: String,
    xml: Option<PathBuf>,
    xml_string: Option<String>,
    output: Option<PathBuf>,
    seed: Option<u64>,
    verbose: bool,
) -> Result<(), Error> {
    if verbose {
        match (&xml, &xml_string) {
            (Some(path), _) => eprintln!("Signing: {}", path.display()),
            (None, Some(_)) => eprintln!("Signing: inline document"),
            (None, None) => {}
        }
        eprintln!("Credential: {}", p12.display());
    }

    let params = SignParams {
        p12_path: &p12,
        password: &password,
        root_tag: &root,
        xml_path: xml.as_deref(),
        xml_string: xml_string.as_deref(),
    };
    let opts = SignOptions {
        id_seed: seed,
        ..SignOptions::default()
    };

    let signed = sign_with_options(&params, &opts)?;
    write_output(output, signed.as_bytes())
}

fn cmd_info() -> Result<(), Error> {
    println!("Firmador — XAdES-BES enveloped XML signatures");
    println!();
    println!("Signature profile:");
    println!("  XAdES-BES, enveloped, RSA PKCS#1 v1.5 with SHA-1");
    println!("  Canonicalization: C14N 1.0 (omits comments)");
    println!();
    println!("Credential container:");
    println!("  PKCS#12 (.p12/.pfx), MAC: SHA-1 or SHA-256");
    println!("  Key/cert encryption: PBE-SHA1-3DES, PBES2 (AES-256-CBC,");
    println!("  PBKDF2 with HMAC-SHA1 or HMAC-SHA256)");
    println!();
    println!("Keys:");
    println!("  RSA (PKCS#8 private key inside the container)");
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(Error::Io),
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout();
            stdout.write_all(data).map_err(Error::Io)?;
            stdout.write_all(b"\n").map_err(Error::Io)
        }
    }
}
