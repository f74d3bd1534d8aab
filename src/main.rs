pub mod types;
pub mod error;
pub mod config;
pub mod data;
pub mod projection;
pub mod geometry;
pub mod style;
pub mod render;
pub mod output;
pub mod pipeline;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the seagrass plot map and open it in the browser
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Survey data file, overrides [input] data_file
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// Ignore any data file and map random records
        #[arg(long, conflicts_with = "input")]
        random: bool,
        /// HTML output path
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Also export the plot grid as GeoJSON
        #[arg(long, value_name = "FILE")]
        geojson: Option<PathBuf>,
        /// Do not open the map in a browser
        #[arg(long)]
        no_open: bool,
    },
    /// Write random survey records to a data file
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_name = "FILE", default_value = "random_lat_lon.txt")]
        output: PathBuf,
        #[arg(short = 'n', long)]
        count: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Serve the rendered map over HTTP
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { config, input, random, output, geojson, no_open } => {
            let mut app_config = config::AppConfig::load_or_default(&config)?;
            if let Some(input) = input {
                app_config.input.data_file = Some(input);
            }
            if random {
                app_config.input.data_file = None;
            }
            if let Some(output) = output {
                app_config.output.html = output;
            }
            if geojson.is_some() {
                app_config.output.geojson = geojson;
            }
            if no_open {
                app_config.output.open_browser = false;
            }

            let summary = tokio::task::spawn_blocking(move || pipeline::run(&app_config)).await??;

            println!("Mapped {} plots to {:?}", summary.plots, summary.html);
            if let Some(path) = &summary.geojson {
                println!("Plot grid exported to {:?}", path);
            }
            if !summary.opened {
                println!("Open {:?} in a browser to view the map.", summary.html);
            }
        }
        Commands::Generate { config, output, count, seed } => {
            let mut app_config = config::AppConfig::load_or_default(&config)?;
            if let Some(count) = count {
                app_config.random.count = count;
            }
            if seed.is_some() {
                app_config.random.seed = seed;
            }

            let records = data::generate_records(&app_config.random)?;
            data::write_records(&output, &records)?;
            println!("Wrote {} random records to {:?}", records.len(), output);
        }
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load_or_default(&config)?;
            server::start_server(app_config).await?;
        }
    }

    Ok(())
}
