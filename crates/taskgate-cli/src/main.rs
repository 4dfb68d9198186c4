use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use taskgate_core::{AppBuilder, DispatchMode, ServerConfig, TaskgateError};

#[derive(Parser, Debug)]
#[command(name = "taskgate")]
#[command(version)]
#[command(about = "Line-protocol task server that runs one script per resource at a time")]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Address to listen on (default 0.0.0.0:2500)
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Executable run once per connection; exit code 0 admits the client
    #[arg(long)]
    validator: Option<PathBuf>,

    /// Directory holding the task scripts
    #[arg(long)]
    script_dir: Option<PathBuf>,

    /// Minimum interval between accepted requests from one client name
    #[arg(long)]
    rate_limit_ms: Option<u64>,

    /// What to do with a task whose resource is busy
    #[arg(long, value_enum)]
    dispatch_mode: Option<DispatchModeArg>,

    /// Cap on scripts running at once (unbounded if unset)
    #[arg(long)]
    max_workers: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DispatchModeArg {
    SkipBlocked,
    RetryHead,
}

impl From<DispatchModeArg> for DispatchMode {
    fn from(arg: DispatchModeArg) -> Self {
        match arg {
            DispatchModeArg::SkipBlocked => DispatchMode::SkipBlocked,
            DispatchModeArg::RetryHead => DispatchMode::RetryHead,
        }
    }
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, TaskgateError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(validator) = self.validator {
            config.validator = validator;
        }
        if let Some(script_dir) = self.script_dir {
            config.script_dir = script_dir;
        }
        if let Some(ms) = self.rate_limit_ms {
            config.rate_limit_window_ms = ms;
        }
        if let Some(mode) = self.dispatch_mode {
            config.dispatch.mode = mode.into();
        }
        if let Some(n) = self.max_workers {
            config.max_concurrent_workers = Some(n);
        }
        Ok(config)
    }
}

async fn run(args: Args) -> Result<(), TaskgateError> {
    let config = args.into_config()?;
    tracing::info!(
        listen = %config.listen_addr,
        validator = %config.validator.display(),
        script_dir = %config.script_dir.display(),
        "Starting taskgate"
    );

    let app = AppBuilder::new(config).build()?;
    app.serve(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
    .await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "taskgate stopped");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
