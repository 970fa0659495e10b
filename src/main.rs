use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use terranaut::app::{run_tui, App};
use terranaut::config::{setup_api_key_interactive, Config};
use terranaut::provider::CloudProvider;
use terranaut::session::{ActionReport, Session};
use terranaut::toolchain;
use terranaut::util::CancelFlag;

#[derive(Parser, Debug)]
#[command(
    name = "terranaut",
    about = "A terminal companion that drafts and validates Terraform with AI",
    version
)]
struct Args {
    /// Target cloud provider
    #[arg(short, long, value_enum)]
    provider: Option<CloudProvider>,

    /// Infrastructure request for --check mode (e.g. "an S3 bucket")
    #[arg(short, long)]
    request: Option<String>,

    /// Generate and validate once, print the verdict, and exit (no TUI)
    #[arg(short, long)]
    check: bool,

    /// Working directory for terraform init/validate
    #[arg(short, long)]
    workdir: Option<PathBuf>,

    /// Per-subcommand timeout for terraform, in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Use an existing terraform executable instead of provisioning one
    #[arg(long)]
    terraform_bin: Option<PathBuf>,

    /// Configure the OpenRouter API key and exit
    #[arg(long)]
    setup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.setup {
        setup_api_key_interactive().map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let mut config = Config::load();
    if let Some(workdir) = args.workdir {
        config.workdir = Some(workdir);
    }
    if let Some(timeout) = args.timeout {
        config.validate_timeout_secs = timeout;
    }
    if let Some(bin) = args.terraform_bin {
        toolchain::set_resolved(bin);
    }

    let provider = args.provider.unwrap_or(config.default_provider);
    let api_key = config.get_api_key();

    if args.check {
        return run_check(&config, provider, api_key, args.request).await;
    }

    if api_key.is_none() {
        eprintln!("  No API key configured. Run `terranaut --setup` to add one.");
        eprintln!("  The editor still works; generation needs a key.");
        eprintln!();
    }

    let app = App::new(config, provider, api_key);
    run_tui(app).await
}

/// One-shot mode: draft from the request, validate, print the verdict.
/// Exit code reflects the verdict so this is scriptable.
async fn run_check(
    config: &Config,
    provider: CloudProvider,
    api_key: Option<String>,
    request: Option<String>,
) -> Result<()> {
    let api_key =
        api_key.ok_or_else(|| anyhow::anyhow!("No API key configured. Run `terranaut --setup`."))?;
    let request =
        request.ok_or_else(|| anyhow::anyhow!("--check needs a request, e.g. --request \"an S3 bucket\""))?;

    let mut session = Session::new(provider);
    session.request = request;

    eprintln!("  Drafting {} configuration...", provider.label());
    match session.generate(&api_key).await {
        ActionReport::DraftReplaced { warning, .. } => {
            if let Some(warning) = warning {
                eprintln!("  Warning: {}", warning);
            }
        }
        ActionReport::Failed(message) => {
            if let Some(debug) = &session.debug_response {
                if !debug.is_empty() {
                    eprintln!("  Raw model output:\n{}", debug);
                }
            }
            anyhow::bail!("{}", message);
        }
        ActionReport::Validated { .. } => {}
    }

    println!("{}", session.draft.content);

    eprintln!("  Setting up Terraform...");
    let terraform = toolchain::resolve().await?;

    eprintln!("  Running terraform init and validate...");
    let timeout = Duration::from_secs(config.validate_timeout_secs);
    let report = session.run_validation(
        &terraform,
        &config.validate_workdir(),
        timeout,
        &CancelFlag::new(),
    );

    match report {
        ActionReport::Validated { succeeded } => {
            if let Some(verdict) = &session.verdict {
                eprintln!();
                eprintln!("{}", verdict.message);
            }
            if succeeded {
                Ok(())
            } else {
                std::process::exit(1);
            }
        }
        ActionReport::Failed(message) => anyhow::bail!("{}", message),
        ActionReport::DraftReplaced { .. } => Ok(()),
    }
}
