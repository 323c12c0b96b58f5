//! ui2code entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use ui2code::Pipeline;
use ui2code_web::config::{self, AppConfig};
use ui2code_web::server::{self, AppState};

#[derive(Parser)]
#[command(
    name = "ui2code",
    about = "Turn a UI screenshot into a single HTML file with inline CSS",
    version
)]
struct Cli {
    /// Gemini API key.
    /// Also reads from GEMINI_API_KEY or GOOGLE_API_KEY.
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Model name.
    #[arg(long, global = true, env = "UI2CODE_MODEL")]
    model: Option<String>,

    /// Override the API base URL.
    #[arg(long, global = true, env = "UI2CODE_API_BASE")]
    api_base: Option<String>,

    /// Where to write the generated HTML.
    #[arg(short, long, global = true, env = "UI2CODE_OUTPUT")]
    output: Option<String>,

    /// Listen address (host:port) for `serve`.
    #[arg(long, global = true, default_value = "127.0.0.1:8501", env = "UI2CODE_ADDR")]
    addr: String,

    /// Largest accepted upload for `serve`, in megabytes.
    #[arg(
        long,
        global = true,
        default_value_t = 20,
        env = "UI2CODE_MAX_UPLOAD_MB",
        value_parser = clap::value_parser!(u32).range(1..=config::MAX_UPLOAD_MB_LIMIT as i64)
    )]
    max_upload_mb: u32,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the browser UI (default).
    Serve,

    /// Run the chain once on an image file and print each stage.
    Run {
        /// Path to a .jpg, .jpeg or .png screenshot.
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   ui2code completions bash > ~/.local/share/bash-completion/completions/ui2code
    ///   ui2code completions zsh > ~/.zfunc/_ui2code
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = cli.command.unwrap_or(Commands::Serve);

    let resolve = || -> anyhow::Result<(AppConfig, Pipeline)> {
        let config = AppConfig::resolve(
            cli.api_key.as_deref(),
            cli.model.as_deref(),
            cli.api_base.as_deref(),
            cli.output.as_deref(),
        )?;
        tracing::info!("Model: {}", config.model);
        tracing::info!("Output: {}", config.output.display());
        let pipeline = Pipeline::new(Arc::new(config.client()));
        Ok((config, pipeline))
    };

    match command {
        Commands::Serve => {
            let (config, pipeline) = resolve()?;
            let state = Arc::new(AppState::new(pipeline, config.output));
            let max_upload = config::upload_limit_bytes(cli.max_upload_mb);
            server::serve(&cli.addr, state, max_upload).await?;
        }

        Commands::Run { image } => {
            let (config, pipeline) = resolve()?;
            if !ui2code_web::cli::run(&pipeline, &image, &config.output).await {
                std::process::exit(1);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "ui2code", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_settings_apply_without_subcommand() {
        std::env::set_var("UI2CODE_ADDR", "0.0.0.0:9000");
        let bare = Cli::try_parse_from(["ui2code"]).unwrap();
        let explicit = Cli::try_parse_from(["ui2code", "serve"]).unwrap();
        std::env::remove_var("UI2CODE_ADDR");

        assert!(bare.command.is_none());
        assert_eq!(bare.addr, "0.0.0.0:9000");
        assert_eq!(explicit.addr, "0.0.0.0:9000");
        assert_eq!(bare.max_upload_mb, 20);

        let flagged = Cli::try_parse_from(["ui2code", "--max-upload-mb", "64"]).unwrap();
        assert_eq!(flagged.max_upload_mb, 64);
    }

    #[test]
    fn test_oversized_upload_limit_is_rejected() {
        let huge = (u64::from(config::MAX_UPLOAD_MB_LIMIT) + 1).to_string();
        assert!(Cli::try_parse_from(["ui2code", "--max-upload-mb", huge.as_str()]).is_err());
        assert!(Cli::try_parse_from(["ui2code", "--max-upload-mb", "0"]).is_err());
    }
}
