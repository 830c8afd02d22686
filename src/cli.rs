// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bondi")]
#[command(about = "Deploy a container to your servers, optionally behind a TLS reverse proxy")]
#[command(version)]
pub struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a bondi.yml template in the current directory
    Init {
        /// Overwrite an existing bondi.yml
        #[arg(long)]
        force: bool,
    },

    /// Install Docker, prepare the ACME file and start the agent on every server
    Setup,

    /// Deploy an image tag to every server
    Deploy {
        /// Image tag to deploy
        tag: String,
    },

    /// Show the deployed service on every server
    Status,

    /// Run a docker command on every server
    Docker {
        #[command(subcommand)]
        command: DockerCommands,
    },
}

#[derive(Subcommand)]
pub enum DockerCommands {
    /// List running containers
    Ps,

    /// Print a container's logs
    Logs {
        /// Container name or id
        #[arg(value_parser = clap::builder::NonEmptyStringValueParser::new())]
        container: String,
    },
}
