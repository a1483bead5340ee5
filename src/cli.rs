use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pvtextmgr",
    about = "Private extension manager - keeps editor extensions checked out from private git repositories up to date",
    version,
    author
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Increase output verbosity (-v status, -vv step details, -vvv command output)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Update every configured extension to the newest tag its selector allows
    Update {
        /// Remove untracked files after checking out a new tag
        #[arg(long)]
        clean: bool,

        /// Write a timestamped run log
        #[arg(long)]
        keep_log: bool,

        /// Run each extension in its own worker process (still one at a time)
        #[arg(long)]
        out_of_process: bool,

        /// Ask before applying each update
        #[arg(short, long)]
        interactive: bool,

        /// Override the extensions install directory
        #[arg(long, value_name = "DIR")]
        extensions_dir: Option<PathBuf>,
    },

    /// Report available updates without changing any checkout
    Check {
        /// Override the extensions install directory
        #[arg(long, value_name = "DIR")]
        extensions_dir: Option<PathBuf>,
    },

    /// List configured extensions with their selector and installed tag
    List {
        /// Override the extensions install directory
        #[arg(long, value_name = "DIR")]
        extensions_dir: Option<PathBuf>,
    },

    /// Add or replace an extension entry in the configuration file
    Add {
        /// Extension directory name under the install root
        name: String,

        /// Source location, e.g. git+ssh://git@host:/srv/git/ext.git#semver:^1.0.0
        source: String,

        /// Skip listing remote tags to check that the selector resolves
        #[arg(long)]
        no_verify: bool,
    },

    /// Update a single extension and report the outcome (worker entry point)
    #[command(name = "update-extension", hide = true)]
    UpdateExtension {
        /// Extension directory name
        name: String,

        /// Install root containing the extension directory
        path: PathBuf,

        /// Source location with its #semver: selector
        source: String,

        /// Remove untracked files after checkout (true/false)
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        clean: bool,

        /// Dependency install command and its arguments
        #[arg(long, num_args = 1.., value_name = "ARGV", allow_hyphen_values = true)]
        install_command: Option<Vec<String>>,
    },
}
