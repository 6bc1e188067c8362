use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use appcast_core::codec::ManifestFormat;
use appcast_model::SecurityMode;

#[derive(Debug, Parser)]
#[command(name = "appcast")]
#[command(author, version, about = "Check, sign, and convert appcast update manifests")]
pub struct Cli {
    /// Log debug output to stderr and the log file
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file to use instead of the per-user default
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch the manifest and report whether an update is available
    Check {
        /// Manifest URL (overrides settings)
        #[arg(long)]
        url: Option<String>,
        /// Installed version (overrides settings)
        #[arg(long)]
        installed: Option<String>,
        /// Manifest format (overrides settings)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Security mode (overrides settings)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Download and verify the newest candidate
        #[arg(long)]
        download: bool,
    },
    /// Generate an Ed25519 key pair for signing manifests and updates
    Keygen {
        /// Directory to write the key files into (defaults to the config dir)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
    },
    /// Print the base64 signature of a file
    Sign {
        file: PathBuf,
        /// Private key file
        #[arg(long, value_name = "PATH")]
        key: PathBuf,
    },
    /// Verify a file against a detached signature
    Verify {
        file: PathBuf,
        /// Base64 signature
        #[arg(long, conflicts_with = "signature_file")]
        signature: Option<String>,
        /// File holding the base64 signature
        #[arg(long, value_name = "PATH")]
        signature_file: Option<PathBuf>,
        /// Base64 public key (defaults to the configured key)
        #[arg(long, conflicts_with = "public_key_file")]
        public_key: Option<String>,
        /// File holding the base64 public key
        #[arg(long, value_name = "PATH")]
        public_key_file: Option<PathBuf>,
    },
    /// Remember a version the user does not want to be offered
    Skip {
        #[arg(required_unless_present = "clear")]
        version: Option<String>,
        /// Forget the skipped version
        #[arg(long, conflicts_with = "version")]
        clear: bool,
    },
    /// Convert a manifest between XML and JSON
    Convert {
        input: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Input format (defaults to the input file extension)
        #[arg(long, value_enum)]
        from: Option<FormatArg>,
        /// Output format (defaults to the output file extension, or the
        /// opposite of the input format)
        #[arg(long, value_enum)]
        to: Option<FormatArg>,
        /// Indent JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Xml,
    Json,
}

impl From<FormatArg> for ManifestFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Xml => Self::Xml,
            FormatArg::Json => Self::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    UseIfPossible,
    Strict,
    Unsafe,
    OnlyVerifySoftwareDownloads,
}

impl From<ModeArg> for SecurityMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::UseIfPossible => Self::UseIfPossible,
            ModeArg::Strict => Self::Strict,
            ModeArg::Unsafe => Self::Unsafe,
            ModeArg::OnlyVerifySoftwareDownloads => Self::OnlyVerifySoftwareDownloads,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands, FormatArg, ModeArg};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_overrides() {
        let cli = Cli::try_parse_from([
            "appcast",
            "--verbose",
            "check",
            "--url",
            "https://example.com/appcast.xml",
            "--mode",
            "only-verify-software-downloads",
            "--format",
            "json",
        ])
        .expect("check arguments should parse");

        assert!(cli.verbose);
        let Commands::Check {
            url, mode, format, ..
        } = cli.command
        else {
            panic!("expected check command");
        };
        assert_eq!(url.as_deref(), Some("https://example.com/appcast.xml"));
        assert_eq!(mode, Some(ModeArg::OnlyVerifySoftwareDownloads));
        assert_eq!(format, Some(FormatArg::Json));
    }

    #[test]
    fn skip_requires_version_or_clear() {
        assert!(Cli::try_parse_from(["appcast", "skip"]).is_err());
        assert!(Cli::try_parse_from(["appcast", "skip", "--clear"]).is_ok());
        assert!(Cli::try_parse_from(["appcast", "skip", "1.2.0", "--clear"]).is_err());
    }

    #[test]
    fn verify_rejects_two_signature_sources() {
        let result = Cli::try_parse_from([
            "appcast",
            "verify",
            "app.msi",
            "--signature",
            "c2ln",
            "--signature-file",
            "app.msi.signature",
        ]);
        assert!(result.is_err());
    }
}
