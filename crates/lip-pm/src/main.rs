//! Lip Package Manager fetch tool (lippm)

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};
use lip_pm::{
    cache_path, fetch_teeth, maybe_rewrite, ArtifactFetcher, Config, Context, FetchOptions,
    HttpDownloader, ToothSpecifier, Verbosity, ZipArchiveOpener,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Log directives overriding `-v` / `-q` (e.g. `LIP_LOG=lip_pm=trace`)
const LOG_ENV: &str = "LIP_LOG";

#[derive(Parser)]
#[command(name = "lippm")]
#[command(about = "Lip package fetcher", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/lip/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More output; repeat for more
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Less output; repeat for less
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch tooth archives and their assets into the cache
    Fetch {
        /// Teeth to fetch, as <repo path>@<version>
        #[arg(required = true)]
        teeth: Vec<String>,
    },
    /// Print the cache path a URL maps to
    CachePath {
        url: String,
    },
    /// Print a URL after GitHub mirror rewriting
    Mirror {
        url: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.level_filter().into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let ctx = Context::new(config);

    match cli.command {
        Commands::Fetch { teeth } => {
            let specifiers = teeth
                .iter()
                .map(|s| s.parse::<ToothSpecifier>())
                .collect::<Result<Vec<_>, _>>()?;

            let downloader = HttpDownloader::new().context("failed to create HTTP client")?;
            let fetcher = ArtifactFetcher::from_context(&ctx, downloader, ZipArchiveOpener)?
                .with_options(FetchOptions::for_verbosity(verbosity));

            let summary = fetch_teeth(&fetcher, &specifiers)?;
            info!(
                "Fetched {} archive(s) ({} from cache), {} asset(s)",
                summary.downloaded + summary.cached,
                summary.cached,
                summary.assets
            );
        }
        Commands::CachePath { url } => {
            let url = url::Url::parse(&url).with_context(|| format!("invalid URL: {}", url))?;
            println!("{}", cache_path(&ctx.cache_dir()?, &url).display());
        }
        Commands::Mirror { url } => {
            let url = url::Url::parse(&url).with_context(|| format!("invalid URL: {}", url))?;
            let mirror = ctx.github_mirror_url()?;
            println!("{}", maybe_rewrite(&url, mirror.as_ref())?);
        }
    }

    Ok(())
}
