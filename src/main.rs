use anyhow::{bail, Context, Result};
use bus_sim::catalog::{load_gtfs, load_snapshot, load_xml, save_snapshot, StdinOracle};
use bus_sim::telemetry::{BrokerPreset, BrokerSink, TsvSink};
use bus_sim::{
    Bus, BusAttributes, Driver, DriverOptions, OpenRouteService, Pacing, PathProvider, Retrying,
    RouteCatalog, StraightLine, TelemetrySink, Topology,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "bus-sim",
    author,
    version,
    about = "Simulates a bus driving its route and emits telemetry every tick"
)]
struct Args {
    /// Bus velocity in m/s
    #[arg(long, default_value_t = 13.9, value_name = "V")]
    velocity: f64,

    /// How long the bus waits at each stop for passengers to board, in s
    #[arg(long, default_value_t = 60.0, value_name = "T")]
    bus_stop_boarding_time: f64,

    /// Number of trips after the first, alternating inbound and outbound
    #[arg(long, default_value_t = 1)]
    trips: u32,

    /// How long the bus waits between trips, in s
    #[arg(long, default_value_t = 300.0, value_name = "T")]
    inter_trip_pause: f64,

    /// Rate at which data is produced, in s
    #[arg(long, default_value_t = 1.0, value_name = "R")]
    data_rate: f64,

    /// Load routes from an XML route file
    #[arg(long, conflicts_with_all = ["gtfs", "snapshot"])]
    routes_xml: Option<PathBuf>,

    /// Load routes from a GTFS feed directory
    #[arg(long, conflicts_with = "snapshot")]
    gtfs: Option<PathBuf>,

    /// Load routes from a catalog snapshot
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Save the loaded catalog as a snapshot
    #[arg(long)]
    save_snapshot: Option<PathBuf>,

    /// Write tab separated telemetry to this file
    #[arg(short, long, conflicts_with_all = ["broker", "broker_address"])]
    output: Option<PathBuf>,

    /// Publish telemetry to a well known broker (local, bridge)
    #[arg(long, conflicts_with = "broker_address")]
    broker: Option<BrokerPreset>,

    /// Publish telemetry to the broker at host:port
    #[arg(long)]
    broker_address: Option<String>,

    /// Drive in straight lines instead of asking the routing service
    #[arg(long)]
    offline: bool,

    /// API key for OpenRouteService
    #[arg(long, env = "ORS_API_KEY", hide_env_values = true)]
    ors_api_key: Option<String>,

    /// Seed for the random choices of route and path
    #[arg(long)]
    seed: Option<u64>,

    /// The bus ID; random if absent
    #[arg(long)]
    bus_id: Option<u32>,

    /// Run one tick per data rate interval of wall clock time
    #[arg(long)]
    real_time: bool,

    /// Make a single outbound trip and stop at the last stop
    #[arg(long)]
    reduced: bool,

    /// Attach synthetic sensor readings to the telemetry
    #[arg(long)]
    sensors: bool,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    if args.data_rate <= 0.0 {
        bail!("The data rate must be positive, got {}", args.data_rate);
    }

    let catalog = load_catalog(&args)?;
    if let Some(path) = &args.save_snapshot {
        save_snapshot(&catalog, path)
            .with_context(|| format!("Failed to save snapshot to {}", path.display()))?;
        log::info!("Saved {} routes to {}", catalog.len(), path.display());
    }

    let attributes = BusAttributes {
        velocity: args.velocity,
        boarding_time: args.bus_stop_boarding_time,
        tick_interval: args.data_rate,
        number_trips: args.trips,
        inter_trip_pause: args.inter_trip_pause,
        topology: if args.reduced {
            Topology::Reduced
        } else {
            Topology::Full
        },
        bus_id: args.bus_id,
        seed: args.seed,
        ..Default::default()
    };
    let options = DriverOptions {
        pacing: if args.real_time {
            Pacing::RealTime
        } else {
            Pacing::AsFastAsPossible
        },
        max_ticks: args.max_ticks,
        sensors: args.sensors,
        ..Default::default()
    };

    let paths: Box<dyn PathProvider> = if args.offline {
        Box::new(StraightLine::default())
    } else {
        let Some(key) = &args.ors_api_key else {
            bail!("An OpenRouteService API key is required, pass --ors-api-key or --offline");
        };
        Box::new(Retrying::new(OpenRouteService::new(key.as_str())))
    };

    let mut sink = open_sink(&args)?;
    let mut bus = Bus::new(&attributes, Arc::new(catalog), paths);
    log::info!("Bus {} leaving the depot", bus.id());

    let summary = Driver::new(options)
        .run(&mut bus, sink.as_mut())
        .context("Simulation failed")?;
    log::info!(
        "Finished in phase {} after {} ticks",
        summary.final_phase,
        summary.ticks
    );
    Ok(())
}

fn load_catalog(args: &Args) -> Result<RouteCatalog> {
    let catalog = if let Some(path) = &args.routes_xml {
        load_xml(path).with_context(|| format!("Failed to load routes from {}", path.display()))?
    } else if let Some(dir) = &args.gtfs {
        load_gtfs(dir, &mut StdinOracle)
            .with_context(|| format!("Failed to load GTFS feed from {}", dir.display()))?
    } else if let Some(path) = &args.snapshot {
        load_snapshot(path)
            .with_context(|| format!("Failed to load snapshot from {}", path.display()))?
    } else {
        log::info!("No route data given, using the test route");
        RouteCatalog::with_test_route()
    };
    if catalog.is_empty() {
        bail!("No usable routes were loaded");
    }
    Ok(catalog)
}

fn open_sink(args: &Args) -> Result<Box<dyn TelemetrySink>> {
    let address = match (&args.broker, &args.broker_address) {
        (_, Some(address)) => Some(address.clone()),
        (Some(preset), None) => Some(preset.address().to_string()),
        (None, None) => None,
    };
    if let Some(address) = address {
        let sink = BrokerSink::connect(&address)
            .with_context(|| format!("Failed to connect to broker at {}", address))?;
        return Ok(Box::new(sink));
    }
    let sink: Box<dyn TelemetrySink> = match &args.output {
        Some(path) => Box::new(
            TsvSink::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(TsvSink::new(std::io::stdout())),
    };
    Ok(sink)
}
