use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use pkglens::inventory::{DiscoverOptions, build_environments};
use pkglens::{scheduler, search, server};

/// pkglens - package inventory search
///
/// Periodically lists the packages installed on the local host or inside
/// every container image under an image directory, and answers fuzzy
/// package searches across the collected inventories.
///
/// Examples:
///   pkglens serve --image-dir /data/images
///   pkglens search vim,wget=1.20 --image-dir /data/images
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGLENS_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory scanned for container images; inventories the local host
    /// when unset
    #[arg(
        long = "image-dir",
        env = "PKGLENS_IMAGE_DIR",
        value_name = "PATH",
        global = true
    )]
    pub image_dir: Option<PathBuf>,

    /// File extension identifying a container image
    #[arg(
        long = "image-ext",
        env = "PKGLENS_IMAGE_EXT",
        value_name = "EXT",
        default_value = "img",
        global = true
    )]
    pub image_extension: String,

    /// Container runtime used to run listing commands inside an image
    #[arg(
        long = "runtime-bin",
        env = "PKGLENS_RUNTIME",
        value_name = "BIN",
        default_value = "singularity",
        global = true
    )]
    pub runtime_binary: String,

    /// Per-command timeout in seconds
    #[arg(
        long,
        env = "PKGLENS_TIMEOUT",
        value_name = "SECONDS",
        default_value_t = 30,
        global = true
    )]
    pub timeout: u64,

    /// Inventory only manually installed and top-level packages instead of
    /// everything installed
    #[arg(long, global = true)]
    pub manual_only: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Refresh inventories on an interval and serve the search API
    Serve(ServeArgs),

    /// Refresh once and print search results as JSON
    Search(SearchArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(
        long,
        env = "PKGLENS_LISTEN",
        value_name = "ADDR",
        default_value = "127.0.0.1:8080"
    )]
    pub listen: SocketAddr,

    /// Seconds between refresh passes
    #[arg(
        long,
        env = "PKGLENS_INTERVAL",
        value_name = "SECONDS",
        default_value_t = 300
    )]
    pub interval: u64,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Comma separated terms, each `name` or `name=version`
    #[arg(value_name = "QUERY")]
    pub query: String,
}

impl Cli {
    fn discover_options(&self) -> DiscoverOptions {
        DiscoverOptions {
            image_dir: self.image_dir.clone(),
            image_extension: self.image_extension.clone(),
            runtime_binary: self.runtime_binary.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let options = cli.discover_options();
    let long = !cli.manual_only;

    match cli.command {
        Commands::Serve(args) => serve(&options, long, &args).await,
        Commands::Search(args) => search_once(&options, long, &args.query).await,
    }
}

async fn serve(options: &DiscoverOptions, long: bool, args: &ServeArgs) -> Result<()> {
    if options.image_dir.is_none() {
        warn!("no image directory configured; inventorying the local host");
    }
    let environments = Arc::new(build_environments(options)?);
    info!("inventorying {} environment(s)", environments.len());

    let scheduler = scheduler::start(
        Arc::clone(&environments),
        Duration::from_secs(args.interval),
        long,
    );
    let app = server::router(environments);
    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!("listening on {}", args.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    scheduler.cancel().await;
    Ok(())
}

async fn search_once(options: &DiscoverOptions, long: bool, query: &str) -> Result<()> {
    let environments = build_environments(options)?;
    environments.refresh_all(long).await;

    let terms = search::parse_query(query);
    let results = search::search_environments(&environments, &terms);
    let body = server::render::json_body(&results, query);
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_search_parsing() {
        let cli = Cli::try_parse_from(["pkglens", "search", "vim,wget=1.20"]).unwrap();
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, "vim,wget=1.20");
            }
            _ => panic!("Expected Search command"),
        }
        assert_eq!(cli.image_dir, None);
    }

    #[test]
    fn test_cli_serve_defaults() {
        let cli = Cli::try_parse_from(["pkglens", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.listen, "127.0.0.1:8080".parse().unwrap());
                assert_eq!(args.interval, 300);
            }
            _ => panic!("Expected Serve command"),
        }
        assert_eq!(cli.image_extension, "img");
        assert_eq!(cli.runtime_binary, "singularity");
        assert_eq!(cli.timeout, 30);
        assert!(!cli.manual_only);
    }

    #[test]
    fn test_cli_global_image_dir_parsing() {
        let cli =
            Cli::try_parse_from(["pkglens", "--image-dir", "/data/images", "serve"]).unwrap();
        assert_eq!(cli.image_dir, Some(PathBuf::from("/data/images")));
    }

    #[test]
    fn test_cli_image_dir_after_subcommand() {
        let cli =
            Cli::try_parse_from(["pkglens", "search", "vim", "--image-dir", "/data/images"])
                .unwrap();
        assert_eq!(cli.image_dir, Some(PathBuf::from("/data/images")));
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["pkglens", "vim"]).is_err());
    }

    #[test]
    fn test_cli_rejects_bad_listen_address() {
        assert!(Cli::try_parse_from(["pkglens", "serve", "--listen", "nowhere"]).is_err());
    }
}
