use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::{fs, io};

use clap::Parser;
use thiserror::Error;
use tracing::{error, info};

use flood_core::mapgen::build_demo_terrain;
use flood_core::terrain::{TerrainParseError, MAX_GRID_SIDE};
use flood_core::{
    build_app_with_engine, load_flood_config, load_flood_config_from_env, run_tick,
    FloodConfigMetadata, FloodEngine, FloodMetrics, FloodParameters, FloodSimulationEngine,
    LastFloodReport, TerrainGrid, WeatherCategory, WeatherState,
};

/// Runs the flood simulation headless and prints the final map.
#[derive(Parser, Debug)]
#[command(name = "flood_runner", version)]
struct Args {
    /// Number of ticks to run.
    #[arg(long, default_value_t = 60)]
    ticks: u32,

    /// Seed for the engine RNG and the generated terrain.
    #[arg(long, default_value_t = flood_core::DEFAULT_FLOOD_SEED)]
    seed: u64,

    #[arg(long, default_value_t = 48, value_parser = grid_side)]
    width: u32,

    #[arg(long, default_value_t = 24, value_parser = grid_side)]
    height: u32,

    /// ASCII terrain map (`~` river, `.` land, `#` obstacle, ` `/`_` open).
    /// Overrides the generated terrain.
    #[arg(long)]
    map: Option<PathBuf>,

    /// Flood parameter JSON. Defaults to `FLOOD_CONFIG_PATH` or the bundled file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Weather phases as `Category[:ticks]`, e.g. `Storm:20,Clear:40`.
    /// The last phase holds once the schedule runs out.
    #[arg(long, value_delimiter = ',', value_parser = parse_weather_phase, default_value = "HeavyRain:20,LightRain:20,Clear")]
    weather: Vec<WeatherPhase>,

    /// Print the map every N ticks in addition to the final render.
    #[arg(long)]
    render_every: Option<u32>,

    /// Flood every source before the first tick.
    #[arg(long)]
    seed_sources: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WeatherPhase {
    category: WeatherCategory,
    ticks: Option<u32>,
}

fn grid_side(value: &str) -> Result<u32, String> {
    let side = value
        .parse::<u32>()
        .map_err(|err| format!("invalid grid side `{value}`: {err}"))?;
    if (1..=MAX_GRID_SIDE).contains(&side) {
        Ok(side)
    } else {
        Err(format!("grid side must be within 1..={MAX_GRID_SIDE}, got {side}"))
    }
}

fn parse_weather_phase(value: &str) -> Result<WeatherPhase, String> {
    let (name, ticks) = match value.split_once(':') {
        Some((name, ticks)) => {
            let ticks = ticks
                .trim()
                .parse::<u32>()
                .map_err(|err| format!("invalid tick count in `{value}`: {err}"))?;
            (name, Some(ticks))
        }
        None => (value, None),
    };
    let category = WeatherCategory::parse(name.trim())
        .ok_or_else(|| format!("unknown weather category `{}`", name.trim()))?;
    Ok(WeatherPhase { category, ticks })
}

/// Category in effect on `tick` (zero-based).
fn weather_for_tick(schedule: &[WeatherPhase], tick: u32) -> WeatherCategory {
    let mut start = 0u32;
    for phase in schedule {
        match phase.ticks {
            Some(length) if tick >= start.saturating_add(length) => {
                start = start.saturating_add(length);
            }
            _ => return phase.category,
        }
    }
    schedule
        .last()
        .map(|phase| phase.category)
        .unwrap_or(WeatherCategory::Clear)
}

#[derive(Debug, Error)]
enum RunnerError {
    #[error("failed to read terrain map {path:?}: {source}")]
    MapRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid terrain map {path:?}: {source}")]
    MapParse {
        path: PathBuf,
        #[source]
        source: TerrainParseError,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target: "flood::runner", error = %err, "flood_runner.failed");
            ExitCode::FAILURE
        }
    }
}

fn load_terrain(args: &Args) -> Result<TerrainGrid, RunnerError> {
    let Some(path) = &args.map else {
        return Ok(build_demo_terrain(args.width, args.height, args.seed));
    };
    let text = fs::read_to_string(path).map_err(|source| RunnerError::MapRead {
        path: path.clone(),
        source,
    })?;
    let rows: Vec<&str> = text.lines().filter(|line| !line.is_empty()).collect();
    TerrainGrid::from_ascii(&rows).map_err(|source| RunnerError::MapParse {
        path: path.clone(),
        source,
    })
}

fn run(args: &Args) -> Result<(), RunnerError> {
    let (params, metadata): (Arc<FloodParameters>, FloodConfigMetadata) = match &args.config {
        Some(path) => load_flood_config(path.clone()),
        None => load_flood_config_from_env(),
    };
    let terrain = load_terrain(args)?;
    let sources = terrain.river_positions();
    let mut engine = FloodSimulationEngine::seeded(params, terrain, sources, args.seed);
    if args.seed_sources {
        engine.seed_sources();
    }

    info!(
        target: "flood::runner",
        width = engine.terrain().width(),
        height = engine.terrain().height(),
        sources = engine.sources().len(),
        blocked = engine.block_index().len(),
        seed = args.seed,
        config = ?metadata.path(),
        "flood_runner.ready"
    );

    let mut app = build_app_with_engine(engine);
    app.insert_resource(metadata);

    for tick in 0..args.ticks {
        let category = weather_for_tick(&args.weather, tick);
        app.world
            .resource_mut::<WeatherState>()
            .set(category, category.typical_rain_intensity());
        run_tick(&mut app);

        if let Some(report) = app.world.resource::<LastFloodReport>().0 {
            info!(
                target: "flood::runner",
                tick = tick + 1,
                weather = %report.weather,
                count = report.count,
                delta = report.delta,
                spawned = report.spawned,
                expanded = report.expanded,
                jumped = report.jumped,
                shrunk = report.shrunk,
                "flood_tick.report"
            );
        }

        if let Some(every) = args.render_every.filter(|every| *every > 0) {
            if (tick + 1) % every == 0 {
                let engine = app.world.resource::<FloodEngine>();
                println!("tick {}:", tick + 1);
                print!(
                    "{}",
                    engine.terrain().render_ascii(&engine.all_flooded_positions())
                );
            }
        }
    }

    let engine = app.world.resource::<FloodEngine>();
    print!(
        "{}",
        engine.terrain().render_ascii(&engine.all_flooded_positions())
    );
    let metrics = app.world.resource::<FloodMetrics>();
    println!(
        "ticks={} flooded={} peak={} added={} removed={} hash={:016x}",
        metrics.ticks,
        metrics.flooded_cells,
        metrics.peak_flooded,
        metrics.total_added,
        metrics.total_removed,
        metrics.state_hash
    );
    Ok(())
}
