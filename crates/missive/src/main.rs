//! Missive CLI - email template rendering and delivery toolkit.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "missive")]
#[command(about = "Email template rendering and delivery toolkit")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to missive.toml config file
    #[arg(short, long, default_value = "missive.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a missive project in the current directory
    Init {
        /// Skip interactive prompts, overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// List registered templates
    List,

    /// Render a template to HTML
    Render {
        /// Template id
        #[arg(short, long)]
        template: String,

        /// JSON file with props
        #[arg(long)]
        props: Option<PathBuf>,

        /// Individual prop as key=value (repeatable, overrides --props)
        #[arg(long = "prop")]
        prop: Vec<String>,

        /// Locale suffix to try first (e.g. "tr" for welcome.tr)
        #[arg(long)]
        locale: Option<String>,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render every previewable template to a directory
    Export {
        /// Output directory (defaults to config or "previews")
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Start the template preview server with hot reload
    Preview {
        /// Port to listen on
        #[arg(short, long, default_value = "7878")]
        port: u16,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Compose a message from a template and deliver it
    Send {
        /// Template id
        #[arg(short, long)]
        template: String,

        /// Recipient address (repeatable)
        #[arg(long)]
        to: Vec<String>,

        /// Sender address (defaults to config)
        #[arg(long)]
        from: Option<String>,

        /// Subject line (defaults to the template's subject)
        #[arg(long)]
        subject: Option<String>,

        /// Individual prop as key=value (repeatable)
        #[arg(long = "prop")]
        prop: Vec<String>,

        /// File to attach (repeatable)
        #[arg(long)]
        attach: Vec<PathBuf>,

        /// Write to a local outbox directory instead of SMTP
        #[arg(long)]
        outbox: Option<PathBuf>,
    },

    /// Probe the configured SMTP server
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(yes).await?;
        }
        Commands::List => {
            commands::list::run(&cli.config)?;
        }
        Commands::Render {
            template,
            props,
            prop,
            locale,
            out,
        } => {
            commands::render::run(&cli.config, &template, props, &prop, locale, out)?;
        }
        Commands::Export { out } => {
            commands::export::run(&cli.config, out)?;
        }
        Commands::Preview { port, no_open } => {
            commands::preview::run(&cli.config, port, !no_open).await?;
        }
        Commands::Send {
            template,
            to,
            from,
            subject,
            prop,
            attach,
            outbox,
        } => {
            commands::send::run(&cli.config, &template, to, from, subject, &prop, attach, outbox)
                .await?;
        }
        Commands::Check => {
            commands::check::run(&cli.config).await?;
        }
    }

    Ok(())
}
