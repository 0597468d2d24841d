use anyhow::{bail, Context};
use clap::Parser;
use memetico::config::{ConfigManager, ENV_PREFIX};
use memetico::data::CsvConnector;
use memetico::engines::generation::{
    ConsoleProgressCallback, DiscardSwapLog, JsonLinesSwapLog, Population, RunContext, SwapLog,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Evolve continued-fraction regression models for a CSV dataset
#[derive(Parser, Debug)]
#[command(name = "memetico")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV file with a `y` column and one column per variable
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed (overrides the configuration)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of generations (overrides the configuration)
    #[arg(short, long)]
    generations: Option<usize>,

    /// Append one JSON line per pocket swap to this file
    #[arg(long)]
    log: Option<PathBuf>,

    /// Print the configuration fields with their defaults and exit
    #[arg(long)]
    describe_config: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let manager = ConfigManager::new();
    manager
        .load_layered(args.config.as_ref(), ENV_PREFIX)
        .context("loading configuration")?;
    manager
        .update(|config| {
            if let Some(seed) = args.seed {
                config.evolution.seed = seed;
            }
            if let Some(generations) = args.generations {
                config.evolution.generations = generations;
            }
        })
        .context("applying command line overrides")?;
    let config = manager.get();

    if args.describe_config {
        println!("{}", serde_json::to_string_pretty(&config.manifests())?);
        return Ok(());
    }

    let data_path = match args.data {
        Some(path) => path,
        None => bail!("--data is required unless --describe-config is given"),
    };
    let data = CsvConnector::load_dataset(&data_path, None)
        .with_context(|| format!("loading dataset {}", data_path.display()))?;

    let log: Box<dyn SwapLog> = match &args.log {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating swap log {}", path.display()))?;
            Box::new(JsonLinesSwapLog::new(BufWriter::new(file)))
        }
        None => Box::new(DiscardSwapLog),
    };

    let ctx = RunContext::new(config)?;
    let mut population = Population::with_context(&data, ctx, log)?;
    let summary = population.run(ConsoleProgressCallback)?;

    println!("Best model: {}", summary.best);
    println!("Fitness: {:.6}  Error: {:.6}", summary.fitness, summary.error);
    println!(
        "Generations: {}  Elapsed: {:.2}s{}",
        summary.generations_run,
        summary.elapsed.as_secs_f64(),
        if summary.timed_out { "  (time limit reached)" } else { "" }
    );
    Ok(())
}
