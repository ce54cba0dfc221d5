use power_rank::{
    generate_sample_config, Config, EngineOptions, MemoryStore, Ranker, Ranking, Result, RunParams,
};
use rayon::prelude::*;
use std::{env, process};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.get(1).map(String::as_str) == Some("--sample-config") {
        print!("{}", generate_sample_config());
        return;
    }

    let config = Config::load_or_default(args.get(1).map(String::as_str));
    if let Err(e) = run(&config) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(config: &Config) -> Result<()> {
    let store = MemoryStore::from_csv(
        &config.data.games_csv,
        &config.data.teams_csv,
        config.data.composite_csv.as_ref(),
    )?;
    let ranker = Ranker::new(&store, EngineOptions::from_config(config)?);

    // runs share the store but each builds its own Team List
    let rankings: Vec<Result<Ranking>> = config
        .runs
        .par_iter()
        .map(|run| ranker.calculate_ranking(&RunParams::from(run)))
        .collect();

    for ranking in rankings {
        println!("{}", ranking?.render_table(25));
    }
    Ok(())
}
