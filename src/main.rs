//! Hamlet - Entry Point
//!
//! Builds a town (the demo town or a maze file), moves the residents in and
//! runs the step loop, writing one JSON snapshot per step. Uses a hosted
//! model when `LLM_API_KEY` is set, the offline heuristics otherwise.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use hamlet::cognition::llm::{LlmClient, ResponseCache};
use hamlet::cognition::{Cognition, LlmCognition, ScriptedCognition};
use hamlet::core::config::SimulationConfig;
use hamlet::core::error::Result;
use hamlet::demo::{demo_residents, demo_town};
use hamlet::maze::{Maze, MazeDefinition};
use hamlet::simulation::{persistence, step, AgentSpawn, World};

/// Hamlet - a town of generative agents
#[derive(Parser, Debug)]
#[command(name = "hamlet")]
#[command(about = "Run a tile-based town of agents and stream per-step snapshots as JSON lines")]
struct Args {
    /// Use the offline heuristics even if a model is configured
    #[arg(long)]
    offline: bool,

    /// Number of steps to run
    #[arg(long, default_value_t = 360)]
    steps: u64,

    /// Simulation config (TOML); missing fields take defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maze definition (JSON); defaults to the built-in demo town
    #[arg(long)]
    maze: Option<PathBuf>,

    /// Residents to spawn (JSON list); defaults to the demo residents
    #[arg(long)]
    agents: Option<PathBuf>,

    /// Resume from a save directory
    #[arg(long)]
    load: Option<PathBuf>,

    /// Save the final state to this directory
    #[arg(long)]
    save: Option<PathBuf>,

    /// Write snapshots here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Model answer cache, loaded at start and written at the end
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Print whispers up to this level (1-3) to stderr; 0 disables them
    #[arg(long, short = 'v', default_value_t = 0)]
    verbosity: u8,
}

fn load_maze(args: &Args) -> Result<Maze> {
    match &args.maze {
        Some(path) => Maze::from_definition(&MazeDefinition::load(path)?),
        None => demo_town(),
    }
}

fn load_residents(args: &Args) -> Result<Vec<AgentSpawn>> {
    match &args.agents {
        Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(demo_residents()),
    }
}

/// The cognition backend, plus the model-backed one when in use so its cache can be saved
fn build_cognition(args: &Args, config: &SimulationConfig) -> Result<(Arc<dyn Cognition>, Option<Arc<LlmCognition>>)> {
    if args.offline {
        return Ok((Arc::new(ScriptedCognition::new()), None));
    }
    let client = match LlmClient::from_env() {
        Ok(client) => client,
        Err(_) => {
            tracing::warn!("LLM_API_KEY not set - running with offline heuristics");
            return Ok((Arc::new(ScriptedCognition::new()), None));
        }
    };
    tracing::info!("using model {}", client.model());

    let cache = match &args.cache {
        Some(path) if path.exists() => ResponseCache::load(path)?,
        _ => ResponseCache::new(),
    };
    let llm = Arc::new(LlmCognition::new(client, config.cognition_retries).with_cache(cache));
    Ok((llm.clone(), Some(llm)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hamlet=info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!("Hamlet starting...");

    let config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let maze = load_maze(&args)?;
    let (cognition, llm) = build_cognition(&args, &config)?;

    let mut world = match &args.load {
        Some(dir) => persistence::load(dir, maze, cognition)?,
        None => {
            let mut world = World::new(config, maze, cognition);
            for spawn in load_residents(&args)? {
                world.spawn(spawn)?;
            }
            world
        }
    };

    if args.verbosity > 0 {
        let mut whispers = world.narrator.subscribe();
        let verbosity = args.verbosity;
        tokio::spawn(async move {
            loop {
                match whispers.recv().await {
                    Ok(whisper) if whisper.level <= verbosity => {
                        eprintln!("[{}] {}: {}", whisper.step, whisper.agent, whisper.message);
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    for _ in 0..args.steps {
        let snapshot = tokio::select! {
            snapshot = step(&mut world) => snapshot?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping");
                break;
            }
        };
        serde_json::to_writer(&mut out, &snapshot)?;
        writeln!(out)?;
    }
    out.flush()?;

    if let Some(dir) = &args.save {
        persistence::save(&world, dir)?;
    }
    if let (Some(path), Some(llm)) = (&args.cache, &llm) {
        llm.cache().save(path)?;
        tracing::info!("cached {} model answers", llm.cache().len());
    }
    tracing::info!("Hamlet finished at {}", world.clock.now());
    Ok(())
}
