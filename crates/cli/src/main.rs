use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use event_data::{read_events, write_events, Event, EventId, Jet, LorentzVector, Muon, TriggerPath};
use pipeline::{ConsumerOutput, PipelineSummary};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runner::{PipelineRunner, RunReport, StageCatalogue};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

const MUON_MASS: f64 = 0.105_658;

/// cutflow - configurable event selection pipelines
#[derive(Parser)]
#[command(name = "cutflow")]
#[command(about = "Run configurable producer/filter/consumer pipelines over event files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured pipelines over an event file
    Run {
        /// JSON configuration with a `Pipelines` section
        #[arg(short, long)]
        config: PathBuf,

        /// JSON-lines event file
        #[arg(short, long)]
        input: PathBuf,

        /// Only run these pipelines (repeatable; default: all)
        #[arg(short, long)]
        pipeline: Vec<String>,

        /// Print the full report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the stages and bindings each pipeline resolves to
    Settings {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(short, long)]
        pipeline: Vec<String>,
    },

    /// List the built-in producers, filters and consumers
    Stages,

    /// Write a synthetic dimuon event sample
    Generate {
        /// Output JSON-lines file
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value = "1000")]
        events: usize,

        /// Seed for reproducible samples
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            input,
            pipeline,
            json,
        } => handle_run(config, input, pipeline, json)?,
        Commands::Settings { config, pipeline } => handle_settings(config, pipeline)?,
        Commands::Stages => handle_stages(),
        Commands::Generate {
            output,
            events,
            seed,
        } => handle_generate(output, events, seed)?,
    }

    Ok(())
}

/// Handle the 'run' command
fn handle_run(config: PathBuf, input: PathBuf, pipelines: Vec<String>, json: bool) -> Result<()> {
    let runner = PipelineRunner::from_config_file(&config)?;

    println!("Loading events from {}...", input.display());
    let start = Instant::now();
    let events = read_events(&input)
        .with_context(|| format!("Failed to read events from {}", input.display()))?;
    println!("{} Loaded {} events in {:?}", "✓".green(), events.len(), start.elapsed());

    let report = runner.run(&events, &pipelines)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Handle the 'settings' command
fn handle_settings(config: PathBuf, pipelines: Vec<String>) -> Result<()> {
    let runner = PipelineRunner::from_config_file(&config)?;
    let global = runner.global();

    println!("{}", "Global settings:".bold().blue());
    println!("{}Electrons: {}", "• ".green(), global.collections.electrons);
    println!("{}Muons: {}", "• ".green(), global.collections.muons);
    println!("{}Taus: {}", "• ".green(), global.collections.taus);
    println!("{}Jets: {}", "• ".green(), global.collections.jets);
    match global.year {
        Some(year) => println!("{}Year: {}", "• ".green(), year),
        None => println!("{}Year: unset", "• ".green()),
    }
    println!("{}Input is data: {}", "• ".green(), global.input_is_data);

    for name in runner.select_pipelines(&pipelines)? {
        let settings = runner.pipeline_settings(&name);
        let processors = settings.get_string_list("Processors")?;
        let consumers = settings.get_string_list("Consumers")?;

        println!();
        println!("{}", format!("Pipeline '{}':", name).bold().blue());
        println!("  Processors:");
        for (position, processor) in processors.iter().enumerate() {
            println!("    {}. {}", (position + 1).to_string().green(), processor);
        }
        println!("  Consumers: {}", consumers.join(", "));
    }
    Ok(())
}

/// Handle the 'stages' command
fn handle_stages() {
    let catalogue = StageCatalogue::with_builtins();

    println!("{}", "Producers:".bold().blue());
    for name in catalogue.producer_names() {
        println!("  producer:{}", name);
    }
    println!("{}", "Filters:".bold().blue());
    for name in catalogue.filter_names() {
        println!("  filter:{}", name);
    }
    println!("{}", "Consumers:".bold().blue());
    for name in catalogue.consumer_names() {
        println!("  {}", name);
    }
}

/// Handle the 'generate' command
fn handle_generate(output: PathBuf, count: usize, seed: Option<u64>) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    info!("Generating {} events with seed {}", count, seed);

    let events: Vec<Event> = (0..count)
        .map(|i| generate_event(&mut rng, i as u64 + 1))
        .collect();

    write_events(&output, &events)
        .with_context(|| format!("Failed to write events to {}", output.display()))?;
    println!(
        "{} Wrote {} events to {} (seed {})",
        "✓".green(),
        events.len(),
        output.display(),
        seed
    );
    Ok(())
}

fn generate_event(rng: &mut StdRng, number: u64) -> Event {
    let mut event = Event::new(EventId {
        run: 190_456 + number / 5000,
        lumi: 1 + number / 100,
        event: number,
    });
    event.weight = rng.random_range(0.8..1.2);

    let n_muons = rng.random_range(0..=3);
    let muons: Vec<Muon> = (0..n_muons).map(|_| generate_muon(rng)).collect();
    let leading_pt = muons.iter().map(|m| m.p4.pt).fold(0.0, f64::max);
    event.scalars.insert("rawPt".to_string(), leading_pt);
    event.muons.insert("muons".to_string(), muons);

    let n_jets = rng.random_range(0..=5);
    event
        .jets
        .insert("jets".to_string(), (0..n_jets).map(|_| generate_jet(rng)).collect());

    event.triggers = Some(vec![
        TriggerPath {
            name: "HLT_Mu17_Mu8_v2".to_string(),
            fired: rng.random_bool(0.7),
            prescale: 1,
        },
        TriggerPath {
            name: "HLT_IsoMu24_v1".to_string(),
            fired: rng.random_bool(0.4),
            prescale: if rng.random_bool(0.9) { 1 } else { 10 },
        },
    ]);
    event
}

fn generate_muon(rng: &mut StdRng) -> Muon {
    let loose = rng.random_bool(0.95);
    let tight = loose && rng.random_bool(0.8);
    Muon {
        p4: LorentzVector::new(
            rng.random_range(3.0..80.0),
            rng.random_range(-2.5..2.5),
            rng.random_range(-std::f64::consts::PI..std::f64::consts::PI),
            MUON_MASS,
        ),
        charge: if rng.random_bool(0.5) { 1 } else { -1 },
        id_loose: loose,
        id_medium: tight,
        id_tight: tight,
        rel_iso: rng.random_range(0.0..0.4),
    }
}

fn generate_jet(rng: &mut StdRng) -> Jet {
    let neutral_hadron_fraction = rng.random_range(0.0..0.5);
    let photon_fraction = rng.random_range(0.0..0.4);
    Jet {
        p4: LorentzVector::new(
            rng.random_range(10.0..150.0),
            rng.random_range(-4.7..4.7),
            rng.random_range(-std::f64::consts::PI..std::f64::consts::PI),
            rng.random_range(2.0..15.0),
        ),
        neutral_hadron_fraction,
        charged_hadron_fraction: 1.0 - neutral_hadron_fraction - photon_fraction,
        photon_fraction,
        electron_fraction: rng.random_range(0.0..0.05),
        muon_fraction: rng.random_range(0.0..0.05),
        n_constituents: rng.random_range(2..30),
        n_charged: rng.random_range(1..15),
        ..Default::default()
    }
}

/// Print one cut-flow table per pipeline
fn print_report(report: &RunReport) {
    println!(
        "{}",
        format!("Processed {} events in {:?}", report.events, report.elapsed)
            .bold()
            .blue()
    );
    for summary in &report.summaries {
        print_summary(summary);
    }
}

fn print_summary(summary: &PipelineSummary) {
    println!();
    println!("{}", format!("Pipeline '{}':", summary.pipeline).bold());

    let mut remaining = summary.processed;
    println!("  {:<32} {:>10}", "input", remaining);
    for stats in &summary.filters {
        remaining -= stats.rejected;
        println!(
            "  {:<32} {:>10} {}",
            stats.filter,
            remaining,
            format!("(-{})", stats.rejected).red()
        );
    }
    println!(
        "  {:<32} {:>10}",
        "accepted".green(),
        summary.accepted.to_string().green()
    );

    for report in &summary.consumers {
        match &report.output {
            ConsumerOutput::Count { events, weighted } => {
                println!("  {}: {} events (weighted {:.2})", report.consumer, events, weighted);
            }
            ConsumerOutput::Table { columns, rows } => {
                println!(
                    "  {}: {} rows [{}]",
                    report.consumer,
                    rows.len(),
                    columns.join(", ")
                );
            }
            ConsumerOutput::Histograms { histograms } => {
                for histogram in histograms {
                    println!(
                        "  {}: {} ({} entries, integral {:.2})",
                        report.consumer,
                        histogram.quantity,
                        histogram.entries,
                        histogram.integral()
                    );
                }
            }
        }
    }
}
