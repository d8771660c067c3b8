use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use sigverify::commands;
use sigverify::config::{default_config_path, resolve_config, CliConfig};
use sigverify_core::config::{MissingCrlPolicy, TrustStoreConfig};
use sigverify_fetch::fetcher::DEFAULT_TIMEOUT;

#[derive(Parser)]
#[command(name = "sigverify", about = "Verify update artifacts against detached signatures")]
struct Cli {
    /// Config file (defaults to ~/.sigverify/config.toml, then SIGVERIFY_* variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Signing certificate, overriding the configured one
    #[arg(long, global = true)]
    certificate: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a local file against its detached signature
    Verify {
        data: PathBuf,
        /// Signature file (defaults to <data>.signed)
        #[arg(long)]
        signature: Option<PathBuf>,
    },
    /// Fetch <url>.signed and verify the local copy of <url> against it
    Fetch { url: String, data_path: PathBuf },
    /// Remove the stored signature of a file
    Discard { data_path: PathBuf },
    /// Write trust settings to the config file
    Configure {
        /// PEM file with the root and intermediate certificates
        #[arg(long)]
        chain: PathBuf,
        /// Directory of additional CA certificates
        #[arg(long)]
        ca_dir: Option<PathBuf>,
        /// Certificate revocation list
        #[arg(long)]
        crl: Option<PathBuf>,
        /// Refuse to start when no CRL is configured
        #[arg(long)]
        require_crl: bool,
        /// Do not trust the bundled Mozilla roots
        #[arg(long)]
        no_system_roots: bool,
        /// Signature download timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
        timeout: u64,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Verify { data, signature } => {
            let cfg = resolve_config(config_path)?;
            let session = commands::open_session(&cfg, cli.certificate.as_deref())?;
            commands::verify::run_verify(&session, &data, signature.as_deref())?;
        }
        Commands::Fetch { url, data_path } => {
            let cfg = resolve_config(config_path)?;
            let session = commands::open_session(&cfg, cli.certificate.as_deref())?;
            commands::fetch::run_fetch(&session, &url, &data_path)?;
        }
        Commands::Discard { data_path } => {
            let cfg = resolve_config(config_path)?;
            commands::discard::run_discard(&commands::session(&cfg)?, &data_path);
        }
        Commands::Configure {
            chain,
            ca_dir,
            crl,
            require_crl,
            no_system_roots,
            timeout,
        } => {
            let cfg = CliConfig {
                trust: TrustStoreConfig {
                    chain_path: Some(chain),
                    ca_directory: ca_dir,
                    crl_path: crl,
                    missing_crl: if require_crl {
                        MissingCrlPolicy::Deny
                    } else {
                        MissingCrlPolicy::Allow
                    },
                    use_system_roots: !no_system_roots,
                },
                certificate: cli.certificate,
                fetch_timeout_secs: timeout,
            };
            let path = config_path.map_or_else(default_config_path, Path::to_path_buf);
            commands::configure::run_configure(&cfg, &path)?;
        }
    }
    Ok(())
}
