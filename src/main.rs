use clap::Parser;
use mesomatch::{
    load_stations, read_record, write_table, MatchConfig, MatchError, StationMatcher, WrfGrid,
    DEFAULT_PREFIX,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Matches MesoWest station observations to WRF output and saves the combined table.
struct Cli {
    /// MesoWest time-series JSON response
    #[arg(long)]
    observations: PathBuf,

    /// Directory holding the wrfout files
    #[arg(long)]
    wrf_dir: PathBuf,

    /// File name prefix of the wrfout files to use
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Output table, .parquet or .csv
    #[arg(long, default_value = "model_matched_obs.parquet")]
    output: PathBuf,

    /// JSON file overriding the network list and variable table
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma separated MesoWest network ids, replaces the configured list
    #[arg(long, value_delimiter = ',')]
    networks: Option<Vec<i64>>,
}

fn run(cli: &Cli) -> Result<PathBuf, MatchError> {
    let mut config = match &cli.config {
        Some(path) => MatchConfig::from_json_file(path)?,
        None => MatchConfig::default(),
    };
    if let Some(networks) = &cli.networks {
        config = config.with_allowed_networks(networks.iter().copied());
    }

    let grid = WrfGrid::discover(&cli.wrf_dir, Some(&cli.prefix))?;
    let record = read_record(&cli.observations)?;

    let matcher = StationMatcher::builder().grid(&grid).config(config).build();
    let output = matcher.run(load_stations(&record))?;
    println!("{}", output.summary);

    let mut df = output.table.to_dataframe()?;
    write_table(&mut df, &cli.output)?;
    Ok(cli.output.clone())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(path) => {
            println!("File saved to `{}`", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
