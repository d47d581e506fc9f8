use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command line of the `infralink` binary and of provider crates embedding it.
#[derive(Debug, Parser)]
#[command(name = "infralink")]
#[command(about = "Resolve service definitions into wired infrastructure and provision them")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct InfralinkCli {
    #[command(subcommand)]
    pub command: Commands,

    /// Definitions root directory
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage encrypted secrets and the keys allowed to read them
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },

    /// Manage environments
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },

    /// List the compiled-in runtimes and what they support
    Providers,

    /// Show what would change in an environment
    Plan(DeployArgs),

    /// Provision an environment
    Apply(DeployArgs),

    /// Tear an environment down
    Delete(DeployArgs),

    /// Write the generated provider configuration without running it
    Export(DeployArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    /// Target environment
    #[arg(short, long)]
    pub environment: String,

    /// Deploy every service at this version instead of environments/<env>/versions.yaml
    #[arg(short, long)]
    pub version: Option<String>,

    /// Skip the interactive confirmation of destructive commands ("yes")
    #[arg(long)]
    pub confirm: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum SecretCommands {
    /// Create your private key if needed and register it for an environment
    Init {
        #[arg(short, long)]
        environment: String,
        /// Your name, used in the key identity
        #[arg(long)]
        name: Option<String>,
        /// Your email, used in the key identity
        #[arg(long)]
        email: Option<String>,
    },

    /// Encrypt a secret for every registered key of an environment
    Add {
        #[arg(short, long)]
        environment: String,
        /// Secret name
        name: String,
        /// Secret value; prompted for when omitted
        #[arg(long)]
        value: Option<String>,
        /// Replace an existing secret
        #[arg(long)]
        overwrite: bool,
    },

    /// Re-encrypt every secret for the currently registered keys
    Refresh {
        #[arg(short, long)]
        environment: String,
    },

    /// List secret names
    List {
        #[arg(short, long)]
        environment: String,
    },

    /// Remove a registered key; run `secret refresh` afterwards
    RemoveKey {
        #[arg(short, long)]
        environment: String,
        /// Identity of the key, e.g. "Jane Doe <jane@doe.com>"
        identity: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum EnvCommands {
    /// Create an environment definition and bootstrap its provider account
    Init {
        #[arg(short, long)]
        environment: String,
        /// Provider context, e.g. a cloud project
        #[arg(long)]
        context: String,
        #[arg(long)]
        region: String,
        /// Runtime that bootstraps the account
        #[arg(long)]
        runtime: String,
    },
}
