use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ht_app::{
    AppError, AppResult, FileJobStore, JobStore, JobView, RecoveryPolicy, Scheduler,
    SchedulerConfig, SimulationExecutor, poll, queue_status,
};
use ht_core::SimulationId;
use ht_results::{ResultPayload, SnapshotStatus, diff_snapshots};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ht-cli")]
#[command(about = "HeatTreat CLI - heat-treatment cycle simulation", long_about = None)]
struct Cli {
    /// Root directory for the job table, results and snapshots
    #[arg(long, global = true, default_value = "./heattreat-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file (YAML or JSON)
    Validate {
        config_path: PathBuf,
    },
    /// Create a simulation from a configuration file
    Submit {
        config_path: PathBuf,
        /// Name shown in listings; defaults to the configuration's name
        #[arg(long)]
        name: Option<String>,
        /// Queue it right away
        #[arg(long)]
        queue: bool,
    },
    /// Queue a ready or finished simulation
    Enqueue {
        id: u32,
    },
    /// Show one simulation
    Status {
        id: u32,
        /// Print the full view as JSON
        #[arg(long)]
        json: bool,
    },
    /// List running and queued simulations
    Queue,
    /// Cancel a queued or running simulation
    Cancel {
        id: u32,
    },
    /// Run queued simulations
    Work {
        /// Exit once the queue is empty instead of polling for new jobs
        #[arg(long)]
        drain: bool,
        /// Wall-clock budget per job in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Mark simulations left running by a dead worker as interrupted
    Recover {
        /// Only recover jobs whose worker lease has expired
        #[arg(long)]
        expired_only: bool,
    },
    /// List the stored results of a simulation
    Results {
        id: u32,
        /// Snapshot version; defaults to the latest run
        #[arg(long)]
        version: Option<u32>,
    },
    /// List the snapshots of a simulation
    Snapshots {
        id: u32,
    },
    /// Compare two snapshots of a simulation
    Diff {
        id: u32,
        v1: u32,
        v2: u32,
    },
    /// List the built-in steel grades
    Grades,
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.as_path();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Submit {
            config_path,
            name,
            queue,
        } => cmd_submit(data_dir, &config_path, name, queue),
        Commands::Enqueue { id } => cmd_enqueue(data_dir, id),
        Commands::Status { id, json } => cmd_status(data_dir, id, json),
        Commands::Queue => cmd_queue(data_dir),
        Commands::Cancel { id } => cmd_cancel(data_dir, id),
        Commands::Work { drain, timeout } => cmd_work(data_dir, drain, timeout),
        Commands::Recover { expired_only } => cmd_recover(data_dir, expired_only),
        Commands::Results { id, version } => cmd_results(data_dir, id, version),
        Commands::Snapshots { id } => cmd_snapshots(data_dir, id),
        Commands::Diff { id, v1, v2 } => cmd_diff(data_dir, id, v1, v2),
        Commands::Grades => cmd_grades(),
    }
}

fn open_store(data_dir: &Path) -> AppResult<Arc<dyn JobStore>> {
    Ok(Arc::new(FileJobStore::open(data_dir.join("jobs.json"))?))
}

fn parse_id(id: u32) -> AppResult<SimulationId> {
    SimulationId::from_display(id)
        .ok_or_else(|| AppError::InvalidInput(format!("simulation ids start at 1, got {id}")))
}

fn cmd_validate(config_path: &Path) -> AppResult<()> {
    println!("Validating configuration: {}", config_path.display());
    let config = ht_project::load_config(config_path)?;
    let phases: Vec<String> = config.enabled_phases().map(|p| p.kind().to_string()).collect();
    println!("✓ Configuration is valid");
    println!("  Name: {}", config.name);
    println!("  Phases: {}", phases.join(" → "));
    Ok(())
}

fn cmd_submit(
    data_dir: &Path,
    config_path: &Path,
    name: Option<String>,
    queue: bool,
) -> AppResult<()> {
    let config = ht_project::load_config(config_path)?;
    let store = open_store(data_dir)?;
    let name = name.unwrap_or_else(|| config.name.clone());
    let record = store.create(&name, config)?;
    store.mark_ready(record.id)?;
    info!(simulation_id = %record.id, name = %name, queue, "simulation submitted");
    if queue {
        store.enqueue(record.id)?;
        println!("✓ Simulation {} queued", record.id);
    } else {
        println!("✓ Simulation {} created (ready)", record.id);
    }
    Ok(())
}

fn cmd_enqueue(data_dir: &Path, id: u32) -> AppResult<()> {
    let id = parse_id(id)?;
    let store = open_store(data_dir)?;
    store.enqueue(id)?;
    let view = poll(store.as_ref(), id)?;
    println!(
        "✓ Simulation {} queued (position {})",
        id,
        view.queue_position.unwrap_or(0)
    );
    Ok(())
}

fn cmd_status(data_dir: &Path, id: u32, json: bool) -> AppResult<()> {
    let store = open_store(data_dir)?;
    let view = poll(store.as_ref(), parse_id(id)?)?;
    if json {
        let text = serde_json::to_string_pretty(&view)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    println!("Simulation {} - {}", view.id, view.name);
    println!("  Status: {}", view.status);
    println!("  Progress: {}%", view.progress_percent);
    if let Some(phase) = view.current_phase {
        println!("  Current phase: {phase}");
    }
    if !view.phases.is_empty() {
        let done: Vec<String> = view.phases.iter().map(|p| p.to_string()).collect();
        println!(
            "  Completed phases: {} ({}/{})",
            done.join(", "),
            done.len(),
            view.total_phases
        );
    }
    if let Some(pos) = view.queue_position {
        println!("  Queue position: {pos}");
    }
    if let (Some(kind), Some(message)) = (view.failure_kind, &view.error_message) {
        println!("  Failure ({kind}): {message}");
    }
    if view.cancel_requested && view.failure_kind.is_none() {
        println!("  Cancellation requested");
    }
    if let Some(version) = view.result_version {
        println!("  Results: v{version}");
    }
    println!("  Created: {}", view.created_at);
    if let Some(t) = view.started_at {
        println!("  Started: {t}");
    }
    if let Some(t) = view.completed_at {
        println!("  Finished: {t}");
    }
    Ok(())
}

fn print_job_line(view: &JobView) {
    let phase = view
        .current_phase
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {:>4}  {:<24} {:<9} {:>3}%  {}",
        view.id,
        view.name,
        view.status,
        view.progress_percent,
        phase
    );
}

fn cmd_queue(data_dir: &Path) -> AppResult<()> {
    let store = open_store(data_dir)?;
    let status = queue_status(store.as_ref())?;
    if status.running.is_empty() && status.queued.is_empty() {
        println!("Queue is empty");
        return Ok(());
    }
    if !status.running.is_empty() {
        println!("Running:");
        status.running.iter().for_each(print_job_line);
    }
    if !status.queued.is_empty() {
        println!("Queued:");
        status.queued.iter().for_each(print_job_line);
    }
    Ok(())
}

fn cmd_cancel(data_dir: &Path, id: u32) -> AppResult<()> {
    let id = parse_id(id)?;
    let store = open_store(data_dir)?;
    let record = store.request_cancel(id)?;
    if record.cancel_requested && record.status.is_active() {
        println!("✓ Cancellation requested; the worker stops at its next step");
    } else {
        println!("Simulation {} is {}", id, record.status);
    }
    Ok(())
}

fn scheduler(data_dir: &Path, config: SchedulerConfig) -> AppResult<Scheduler> {
    let store = open_store(data_dir)?;
    let executor = Arc::new(SimulationExecutor::in_dir(data_dir)?);
    Ok(Scheduler::new(store, executor, config))
}

fn cmd_work(data_dir: &Path, drain: bool, timeout: Option<u64>) -> AppResult<()> {
    let scheduler = scheduler(
        data_dir,
        SchedulerConfig {
            job_timeout: timeout.map(Duration::from_secs),
            ..SchedulerConfig::default()
        },
    )?;
    let recovered = scheduler.reconcile()?;
    if !recovered.is_empty() {
        println!("Recovered {} interrupted simulation(s)", recovered.len());
    }
    info!(
        worker_id = %scheduler.config().worker_id,
        drain,
        recovered = recovered.len(),
        "worker starting"
    );

    if drain {
        let reports = scheduler.drain()?;
        for report in &reports {
            match &report.failure {
                None => println!("✓ Simulation {} completed", report.id),
                Some(f) => println!(
                    "✗ Simulation {} failed ({}): {}",
                    report.id, f.kind, f.message
                ),
            }
        }
        println!("Processed {} simulation(s)", reports.len());
        return Ok(());
    }

    println!("Worker {} polling {}", scheduler.config().worker_id, data_dir.display());
    scheduler.start()?;
    // Runs until the process is killed; the next start recovers the job in flight.
    loop {
        std::thread::park();
    }
}

fn cmd_recover(data_dir: &Path, expired_only: bool) -> AppResult<()> {
    let policy = if expired_only {
        RecoveryPolicy::ExpiredLeases
    } else {
        RecoveryPolicy::AllRunning
    };
    let scheduler = scheduler(
        data_dir,
        SchedulerConfig {
            recovery: policy,
            ..SchedulerConfig::default()
        },
    )?;
    let recovered = scheduler.reconcile()?;
    info!(?policy, recovered = recovered.len(), "recovery sweep finished");
    if recovered.is_empty() {
        println!("Nothing to recover");
    } else {
        for id in recovered {
            println!("  Simulation {id} marked interrupted");
        }
    }
    Ok(())
}

fn cmd_results(data_dir: &Path, id: u32, version: Option<u32>) -> AppResult<()> {
    let id = parse_id(id)?;
    let store = open_store(data_dir)?;
    let version = match version {
        Some(v) => v,
        None => store.get(id)?.result_version.ok_or(AppError::NoRun(id))?,
    };
    let executor = SimulationExecutor::in_dir(data_dir)?;
    let manifest = executor.results().load_manifest(id, version)?;
    let records = executor.results().load(id, version)?;

    println!("Results of simulation {id}, v{version} ({})", manifest.saved_at);
    for record in &records {
        let detail = match &record.payload {
            ResultPayload::CoolingCurve {
                times_s,
                t_800_500_s,
                peak_cooling_rate_c_per_s,
                ..
            } => {
                let t85 = t_800_500_s
                    .map(|t| format!("{t:.1} s"))
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "{} points, t8/5 {}, peak rate {:.1} °C/s",
                    times_s.len(),
                    t85,
                    peak_cooling_rate_c_per_s
                )
            }
            ResultPayload::TemperatureProfile {
                positions_m,
                times_s,
                ..
            } => format!("{} nodes x {} times", positions_m.len(), times_s.len()),
            ResultPayload::PhaseFractions {
                phases,
                hardness,
                tempered,
                ..
            } => {
                let f = &phases.fractions;
                let mut line = format!(
                    "M {:.2} B {:.2} F {:.2} P {:.2}, {:.0} HV",
                    f.martensite, f.bainite, f.ferrite, f.pearlite, hardness.hv
                );
                if let Some(t) = tempered {
                    line.push_str(&format!(" ({:.0} HV tempered)", t.hv));
                }
                line
            }
            ResultPayload::CoolingRate { times_s, .. } => format!("{} points", times_s.len()),
        };
        println!("  {:<40} {}", record.key.to_string(), detail);
    }
    Ok(())
}

fn cmd_snapshots(data_dir: &Path, id: u32) -> AppResult<()> {
    let id = parse_id(id)?;
    let executor = SimulationExecutor::in_dir(data_dir)?;
    let snapshots = executor.snapshots().list(id)?;
    if snapshots.is_empty() {
        println!("No snapshots for simulation {id}");
        return Ok(());
    }
    println!("Snapshots of simulation {id}:");
    for s in snapshots {
        let status = match &s.status {
            SnapshotStatus::Completed => "completed".to_string(),
            SnapshotStatus::Failed { message } => format!("failed: {message}"),
        };
        println!(
            "  v{:<3} {}  {}  hash {}",
            s.version,
            s.created_at,
            status,
            &s.input_hash[..12.min(s.input_hash.len())]
        );
    }
    Ok(())
}

fn cmd_diff(data_dir: &Path, id: u32, v1: u32, v2: u32) -> AppResult<()> {
    let id = parse_id(id)?;
    let executor = SimulationExecutor::in_dir(data_dir)?;
    let a = executor.snapshots().load(id, v1)?;
    let b = executor.snapshots().load(id, v2)?;
    let changes = diff_snapshots(&a, &b)?;
    if changes.is_empty() {
        println!("v{v1} and v{v2} are identical");
        return Ok(());
    }
    let show = |v: &Option<serde_json::Value>| {
        v.as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(absent)".to_string())
    };
    println!("{} change(s) from v{v1} to v{v2}:", changes.len());
    for c in &changes {
        println!("  {}: {} → {}", c.path, show(&c.before), show(&c.after));
    }
    Ok(())
}

fn cmd_grades() -> AppResult<()> {
    println!("Built-in grades:");
    for grade in ht_material::standard_grades() {
        let k = grade.conductivity.evaluate(20.0);
        let cp = grade.specific_heat.evaluate(20.0);
        println!(
            "  {:<10} k(20 °C) {:.1} W/(m·K), cp(20 °C) {:.0} J/(kg·K)",
            grade.grade, k, cp
        );
    }
    Ok(())
}
