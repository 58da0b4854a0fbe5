use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use pdf_protector::{ParseOptions, Permissions, ProtectOptions, ProtectionInfo, Protector};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "pdfprotector",
    about = "Password-protect PDF files and detect existing protection",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Reject inputs larger than this many bytes
    #[arg(long, global = true, value_name = "BYTES")]
    max_size: Option<usize>,

    /// Recover from damaged cross-reference data and dangling references
    #[arg(long, global = true)]
    lenient: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a PDF with a user password
    Protect {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// User password (may be empty)
        #[arg(short, long)]
        password: String,

        /// Owner password (defaults to the user password)
        #[arg(long)]
        owner_password: Option<String>,

        /// Key length in bits: 40 to 128 in steps of 8, or 256
        #[arg(short, long, default_value = "128")]
        key_length: u32,

        /// Use RC4 instead of AES for 128-bit keys
        #[arg(long)]
        rc4: bool,

        /// Granted permissions (e.g. "print,copy"); replaces the default policy
        #[arg(long, value_delimiter = ',')]
        allow: Option<Vec<String>>,

        /// Leave XMP metadata streams unencrypted (AES only)
        #[arg(long)]
        no_encrypt_metadata: bool,
    },

    /// Report whether a PDF is password protected
    Check {
        /// Input PDF file
        input: PathBuf,

        /// Print a JSON report
        #[arg(long)]
        json: bool,
    },

    /// Classify a password as owner, user or none
    Verify {
        /// Input PDF file
        input: PathBuf,

        /// Candidate password
        #[arg(short, long)]
        password: String,
    },

    /// Remove protection using the owner or user password
    Unprotect {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Owner or user password
        #[arg(short, long)]
        password: String,
    },

    /// Show the encryption settings of a PDF
    Info {
        /// Input PDF file
        input: PathBuf,

        /// Print a JSON report
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "pdf_protector=debug,pdfprotector=debug"
    } else {
        "pdf_protector=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut parse_options = if cli.lenient {
        ParseOptions::lenient()
    } else {
        ParseOptions::strict()
    };
    if let Some(limit) = cli.max_size {
        parse_options = parse_options.with_max_document_size(limit);
    }
    let protector = Protector::new(parse_options);

    match cli.command {
        Commands::Protect {
            input,
            output,
            password,
            owner_password,
            key_length,
            rc4,
            allow,
            no_encrypt_metadata,
        } => {
            let mut options = ProtectOptions::new()
                .with_key_length(key_length)
                .with_prefer_aes(!rc4)
                .with_encrypt_metadata(!no_encrypt_metadata);
            if let Some(owner) = owner_password {
                options = options.with_owner_password(owner);
            }
            if let Some(names) = allow {
                options = options.with_permissions(parse_permissions(&names)?);
            }

            let data = read_input(&input)?;
            let protected = protector.protect(&data, &password, &options)?;
            write_output(&output, &protected)?;
            println!(
                "✓ Protected {} with {}",
                output.display(),
                options.algorithm()?
            );
        }

        Commands::Check { input, json } => {
            let data = read_input(&input)?;
            let protected = protector.is_protected(&data)?;
            if json {
                // Settings are best effort; detection alone decides the verdict
                let info = if protected {
                    protector.inspect(&data).unwrap_or_else(|e| {
                        debug!("Encryption settings unavailable: {e}");
                        None
                    })
                } else {
                    None
                };
                let report = serde_json::json!({ "protected": protected, "info": info });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if protected {
                println!("PROTECTED");
            } else {
                println!("NOT_PROTECTED");
            }
        }

        Commands::Verify { input, password } => {
            let data = read_input(&input)?;
            let role = protector.check_password(&data, &password)?;
            println!("{role}");
        }

        Commands::Unprotect {
            input,
            output,
            password,
        } => {
            let data = read_input(&input)?;
            let plain = protector.unprotect(&data, &password)?;
            write_output(&output, &plain)?;
            println!("✓ Removed protection, wrote {}", output.display());
        }

        Commands::Info { input, json } => {
            let data = read_input(&input)?;
            let info = protector.inspect(&data)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print_info(&input, info.as_ref());
            }
        }
    }

    Ok(())
}

fn parse_permissions(names: &[String]) -> Result<Permissions> {
    names.iter().try_fold(Permissions::empty(), |acc, name| {
        Permissions::from_cli_name(name)
            .map(|permission| acc | permission)
            .ok_or_else(|| anyhow!("unknown permission '{name}'"))
    })
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    debug!("Read {} bytes from {}", data.len(), path.display());
    Ok(data)
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).with_context(|| format!("cannot write {}", path.display()))
}

fn print_info(input: &Path, info: Option<&ProtectionInfo>) {
    println!("Encryption settings for: {}", input.display());
    println!("==========================================");

    let Some(info) = info else {
        println!("Not protected");
        return;
    };

    println!("Algorithm: {}", info.algorithm);
    println!("Version (V): {}", info.version);
    println!("Revision (R): {}", info.revision);
    println!("Key length: {} bits", info.key_length);
    println!(
        "Metadata encrypted: {}",
        if info.encrypt_metadata { "Yes" } else { "No" }
    );

    println!("\nPermissions:");
    println!("------------");
    let flags = &info.permissions;
    for (label, granted) in [
        ("Print", flags.print),
        ("Print high quality", flags.print_high_quality),
        ("Modify contents", flags.modify_contents),
        ("Copy / extract", flags.copy),
        ("Annotate", flags.modify_annotations),
        ("Fill forms", flags.fill_forms),
        ("Accessibility", flags.accessibility),
        ("Assemble", flags.assemble),
    ] {
        println!("{label}: {}", if granted { "allowed" } else { "denied" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_permissions() {
        let names = vec!["print".to_string(), "Copy".to_string()];
        assert_eq!(
            parse_permissions(&names).unwrap(),
            Permissions::PRINT | Permissions::COPY
        );
        assert_eq!(parse_permissions(&[]).unwrap(), Permissions::empty());
        assert!(parse_permissions(&["launch-missiles".to_string()]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pdfprotector",
            "check",
            "in.pdf",
            "--lenient",
            "--max-size",
            "1024",
        ])
        .unwrap();
        assert!(cli.lenient);
        assert_eq!(cli.max_size, Some(1024));
    }
}
