use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use hangar::config::Config;
use hangar::{logging, web};

#[derive(Parser)]
#[command(name = "hangar")]
#[command(version, about = "Web front-end for on-demand iOS branch builds")]
struct Cli {
    /// Port to serve on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Directory holding the pre-existing repository checkouts
    #[arg(long, default_value = "repos")]
    repos_dir: PathBuf,

    /// Directory that receives per-branch build output
    #[arg(long, default_value = "build")]
    build_dir: PathBuf,

    /// External base URL used in download links. Defaults to the request host.
    #[arg(long)]
    public_url: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::new(cli.repos_dir, cli.build_dir, cli.public_url);
    web::start_server(config, cli.port).await
}
