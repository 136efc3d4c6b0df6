use anyhow::Result;
use clap::Parser;
use pypi_download::{config::Config, mirror::mirror};
use std::path::PathBuf;
use std::time::Duration;

/// pypi-download - mirror a package and its dependencies from a Python package index
///
/// Every file the index lists for the package is downloaded, its metadata is
/// read, and the same is done for every declared dependency, recursively.
/// Files already present in the download directory are not fetched again.
///
/// Examples:
///   pypi-download -p requests                 # Mirror requests into ./downloads
///   pypi-download -p flask -d /srv/mirror -j 8
#[derive(Parser, Debug)]
#[command(author, version = env!("PYPI_DOWNLOAD_VERSION"), about)]
struct Cli {
    /// Name of the package to mirror
    #[arg(long, short = 'p', value_name = "NAME")]
    pub package: String,

    /// Directory the artifacts are stored in (also via PYPI_DOWNLOAD_DIR)
    #[arg(
        long = "download_dir",
        short = 'd',
        visible_alias = "download-dir",
        env = "PYPI_DOWNLOAD_DIR",
        value_name = "PATH",
        default_value = "./downloads"
    )]
    pub download_dir: PathBuf,

    /// Index base URL (also via PYPI_REPOSITORY)
    #[arg(
        long,
        short = 'r',
        env = "PYPI_REPOSITORY",
        value_name = "URL",
        default_value = pypi_download::index::DEFAULT_INDEX_URL
    )]
    pub repository: String,

    /// Maximum number of concurrent jobs
    #[arg(
        long,
        short = 'j',
        value_name = "N",
        default_value_t = pypi_download::traversal::DEFAULT_JOBS,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub jobs: usize,

    /// Per-request timeout in seconds
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = pypi_download::config::DEFAULT_TIMEOUT_SECS
    )]
    pub timeout: u64,

    /// Only print the final summary
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            package: cli.package,
            download_dir: cli.download_dir,
            repository: cli.repository,
            jobs: cli.jobs,
            timeout: Duration::from_secs(cli.timeout),
            quiet: cli.quiet,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let config: Config = Cli::parse().into();
    let runtime = pypi_download::runtime::RealRuntime;

    mirror(runtime, &config).await?;
    Ok(())
}
