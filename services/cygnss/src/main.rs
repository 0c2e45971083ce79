//! CYGNSS command-line tool.
//!
//! - `cygnss download`: fetch daily L1 granules from the PO.DAAC archive
//!   into the local archive layout
//! - `cygnss footprints`: read granules, screen them and export footprint
//!   polygons as GeoJSON

mod download;
mod footprints;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cygnss_l1::geojson::DEFAULT_VERTICES;
use cygnss_l1::{
    BoundingBox, CygnssConfig, ProductLevel, ReaderOptions, SnrCorrectionColumns,
    DEFAULT_CONFIG_PATH,
};

use download::{plan_downloads, Credentials, DownloadSettings, GranuleDownloader};
use footprints::{FootprintJob, JobSource};

#[derive(Parser, Debug)]
#[command(name = "cygnss", version)]
#[command(about = "CYGNSS L1 downloader and footprint exporter")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "CYGNSS_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download local copies of CYGNSS granules from the PO.DAAC HTTP archive
    Download(DownloadArgs),
    /// Export footprint ellipses of screened DDM samples as GeoJSON
    Footprints(FootprintsArgs),
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Data product level
    #[arg(long, value_parser = ["L1"])]
    level: String,

    /// Product version
    #[arg(long, value_parser = ["v2.1", "v3.0", "v3.1"], default_value = "v3.1")]
    version: String,

    /// First date to download (YYYY-MM-DD)
    #[arg(long)]
    start_date: NaiveDate,

    /// Last date to download, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end_date: NaiveDate,

    /// Root of the local archive
    #[arg(long, env = "CYGNSS_DATA_PATH")]
    dest_dir: PathBuf,

    #[arg(long, env = "EARTHDATA_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "EARTHDATA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Maximum retry attempts per granule
    #[arg(long, default_value = "5")]
    max_retries: u32,
}

#[derive(Args, Debug)]
struct FootprintsArgs {
    /// A single L1 granule
    #[arg(long, required_unless_present = "start_date", conflicts_with = "start_date")]
    input: Option<PathBuf>,

    /// First archive date to process (YYYY-MM-DD)
    #[arg(long, requires = "end_date")]
    start_date: Option<NaiveDate>,

    /// Last archive date to process, inclusive (YYYY-MM-DD)
    #[arg(long, requires = "start_date")]
    end_date: Option<NaiveDate>,

    /// Root of the local archive
    #[arg(long, env = "CYGNSS_DATA_PATH", default_value = "data")]
    data_path: PathBuf,

    /// Product version of the archive (defaults to the configured one)
    #[arg(long)]
    version: Option<String>,

    /// Output GeoJSON file, or an existing directory for a date range
    #[arg(short, long)]
    output: PathBuf,

    /// Keep only specular points inside xmin,ymin,xmax,ymax (degrees)
    #[arg(long, allow_hyphen_values = true)]
    bbox: Option<BoundingBox>,

    /// Keep only specular points over or near land
    #[arg(long)]
    near_land: bool,

    /// Properties to export (default: all attributes)
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Vertices per footprint polygon
    #[arg(long, default_value_t = DEFAULT_VERTICES)]
    vertices: usize,

    /// Add a range- and gain-corrected `ddm_snr_corrected` attribute
    #[arg(long)]
    snr_correction: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    let config = CygnssConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    match cli.command {
        Command::Download(args) => run_download(&config, args).await,
        Command::Footprints(args) => {
            let job = footprint_job(&config, args)?;
            let summaries =
                tokio::task::spawn_blocking(move || footprints::run(&config, &job)).await??;
            let features: usize = summaries.iter().map(|s| s.features_written).sum();
            info!(granules = summaries.len(), features = features, "Footprints written");
            Ok(())
        }
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

async fn run_download(config: &CygnssConfig, args: DownloadArgs) -> Result<()> {
    let level: ProductLevel = args.level.parse()?;

    let credentials = match (args.username, args.password) {
        (Some(username), Some(password)) => Some(Credentials { username, password }),
        _ => {
            tracing::warn!("EARTHDATA_USERNAME/EARTHDATA_PASSWORD not set; protected granules will fail");
            None
        }
    };

    let plan = plan_downloads(
        &config.download,
        &args.dest_dir,
        level,
        &args.version,
        args.start_date,
        args.end_date,
    )?;
    info!(
        granules = plan.len(),
        start = %args.start_date,
        end = %args.end_date,
        dest = %args.dest_dir.display(),
        "Starting CYGNSS download"
    );

    let settings = DownloadSettings {
        max_retries: args.max_retries,
        ..Default::default()
    };
    let downloader = GranuleDownloader::new(settings, credentials)?;
    let summary = downloader.run(&plan).await;

    if summary.failed > 0 {
        return Err(anyhow!("{} of {} granules failed to download", summary.failed, plan.len()));
    }
    Ok(())
}

fn footprint_job(config: &CygnssConfig, args: FootprintsArgs) -> Result<FootprintJob> {
    let source = match (args.input, args.start_date, args.end_date) {
        (Some(input), _, _) => JobSource::File(input),
        (None, Some(start), Some(end)) => JobSource::Archive {
            root: args.data_path,
            version: args
                .version
                .unwrap_or_else(|| config.l1.product_version.clone()),
            start,
            end,
        },
        _ => return Err(anyhow!("Give either --input or --start-date and --end-date")),
    };

    Ok(FootprintJob {
        source,
        output: args.output,
        options: ReaderOptions {
            bbox: args.bbox,
            near_land: args.near_land,
            snr_correction: args.snr_correction.then(SnrCorrectionColumns::default),
        },
        columns: args.columns,
        vertices: args.vertices,
    })
}
