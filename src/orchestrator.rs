//! Drives a whole run: mesh setup, sinks, the step loop and reporting.

use crate::error::*;
use crate::image;
use crate::kernel::DEFAULT_CONDUCTIVITY;
use crate::mesh::*;
use crate::output::*;
use crate::solver::{self, *};
use crate::vtk;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Validated configuration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub mesh: MeshSpec,
    pub schedule: Schedule,
    pub model: Model,
    pub workers: usize,
    pub conductivity: f64,
    /// Snapshot file, truncated on open.
    pub output: Option<PathBuf>,
    /// Summary file, appended to.
    pub summary: Option<PathBuf>,
    /// PNG of the final field (2D) or of the snapshot history (1D).
    pub image: Option<PathBuf>,
    /// VTK file of the final field.
    pub vtk: Option<PathBuf>,
    /// Suppress every per-run output except the summary.
    pub no_output: bool,
}

impl RunConfig {
    pub fn new(mesh: MeshSpec, schedule: Schedule) -> Self {
        RunConfig {
            mesh,
            schedule,
            model: Model::default(),
            workers: solver::default_workers(),
            conductivity: DEFAULT_CONDUCTIVITY,
            output: None,
            summary: None,
            image: None,
            vtk: None,
            no_output: false,
        }
    }

    /// Solver for the configured model.
    pub fn solver(&self) -> HeatResult<Box<dyn Solver>> {
        solver::build(self.model, self.workers, self.conductivity)
    }
}

/// Configuration and timer epoch of a run, captured once at start.
pub struct RunContext {
    config: RunConfig,
    epoch: Instant,
}

impl RunContext {
    pub fn new(config: RunConfig) -> Self {
        RunContext {
            config,
            epoch: Instant::now(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub model: &'static str,
    pub nodes: usize,
    pub workers: usize,
    pub steps: usize,
    /// Wall clock time of the step loop.
    pub elapsed: Duration,
}

impl RunReport {
    pub fn print_report(&self) {
        println!("Run Report:");
        println!("  - model: {}", self.model);
        println!("  - nodes: {}", self.nodes);
        println!("  - workers: {}", self.workers);
        println!("  - steps: {}", self.steps);
        println!("  - simulation time: {} seconds", self.elapsed.as_secs_f64());
    }
}

/// Run every step of `schedule` and flush `sink`.
pub fn simulate(
    ctx: &RunContext,
    solver: &dyn Solver,
    mesh: Mesh,
    schedule: &Schedule,
    sink: &mut (dyn SnapshotSink + Send),
) -> HeatResult<(Mesh, RunReport)> {
    let nodes = mesh.len();
    log::info!(
        "{} run: {} nodes, {} workers, {} steps, {} snapshots",
        solver.name(),
        nodes,
        solver.workers(),
        schedule.steps,
        schedule.snapshot_count()
    );
    let start = ctx.elapsed();
    let result = solver.solve(mesh, schedule, sink)?;
    sink.finish()?;
    let elapsed = ctx.elapsed().saturating_sub(start);
    log::info!(
        "n = {}, workers = {}, simulation time = {} seconds",
        nodes,
        solver.workers(),
        elapsed.as_secs_f64()
    );
    let report = RunReport {
        model: solver.name(),
        nodes,
        workers: solver.workers(),
        steps: schedule.steps,
        elapsed,
    };
    Ok((result, report))
}

/// Apply the open rule for optional outputs: with output disabled a
/// resource failure only drops the sink.
fn tolerate<T>(opened: HeatResult<T>, no_output: bool) -> HeatResult<Option<T>> {
    match opened {
        Ok(sink) => Ok(Some(sink)),
        Err(e @ HeatError::Resource { .. }) if no_output => {
            log::warn!("output disabled, ignoring: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn open_sinks(config: &RunConfig, dimension: usize, width: usize) -> HeatResult<SinkSet> {
    let mut sinks = SinkSet::new();
    if let Some(path) = &config.output {
        if let Some(csv) = tolerate(CsvSnapshot::create(path), config.no_output)? {
            sinks.push(Box::new(csv));
        }
    }
    if let (Some(path), 1) = (&config.image, dimension) {
        sinks.push(Box::new(image::HistoryImage::new(path.clone(), width)));
    }
    Ok(sinks)
}

/// Build everything the configuration asks for and run it.
pub fn run(config: RunConfig) -> HeatResult<RunReport> {
    let solver = config.solver()?;
    run_with(config, solver.as_ref())
}

/// Run the configuration on an already built solver.
pub fn run_with(config: RunConfig, solver: &dyn Solver) -> HeatResult<RunReport> {
    let ctx = RunContext::new(config);
    let config = ctx.config();

    let mesh = Mesh::initialize(&config.mesh)?;
    let shape = *mesh.shape();

    let mut summary = match &config.summary {
        Some(path) => tolerate(SummaryWriter::append(path), config.no_output)?,
        None => None,
    };

    let opened = open_sinks(config, shape.dimension(), shape.width())?;
    let mut sinks = if config.no_output {
        SinkSet::new()
    } else {
        opened
    };
    let mut schedule = config.schedule;
    schedule.output_enabled = !config.no_output && !sinks.is_empty();
    log::debug!("{} snapshot sinks open", sinks.len());

    let (result, report) = simulate(&ctx, solver, mesh, &schedule, &mut sinks)?;

    if !config.no_output {
        if let (Some(path), 2) = (&config.image, shape.dimension()) {
            image::image2d(&result, path)?;
        }
        if let Some(path) = &config.vtk {
            vtk::write_vtk(&result, path)?;
        }
    }
    if let Some(summary) = summary.as_mut() {
        summary.write_line(report.nodes, report.elapsed)?;
    }
    Ok(report)
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("heatmesh-{}-{}", std::process::id(), name))
    }

    #[test]
    fn simulate_test() {
        let config = RunConfig::new(
            MeshSpec::bar(10, 400.0, 200.0),
            Schedule::new(30, 10).unwrap(),
        );
        let ctx = RunContext::new(config);
        let solver = SerialSolver::default();
        let mesh = Mesh::initialize(&ctx.config().mesh).unwrap();
        let mut sink = CsvSnapshot::new(Vec::new());
        let (result, report) =
            simulate(&ctx, &solver, mesh, &ctx.config().schedule, &mut sink).unwrap();
        assert_eq!(report.nodes, 10);
        assert_eq!(report.workers, 1);
        assert_eq!(report.steps, 30);
        assert_eq!(report.model, "serial");
        assert!(report.elapsed <= ctx.elapsed());
        assert_eq!(sink.records(), 3);
        assert_eq!(result.node(0).temperature, 400.0);
    }

    #[test]
    fn run_writes_outputs_test() {
        let output = temp_path("run-snapshots.txt");
        let summary = temp_path("run-summary.txt");
        let _ = std::fs::remove_file(&summary);

        let mut config = RunConfig::new(
            MeshSpec::plate(6, 5, 400.0, 200.0),
            Schedule::new(20, 10).unwrap(),
        );
        config.model = Model::ForkJoin;
        config.workers = 2;
        config.output = Some(output.clone());
        config.summary = Some(summary.clone());
        let report = run(config).unwrap();
        assert_eq!(report.nodes, 30);

        let snapshots = std::fs::read_to_string(&output).unwrap();
        assert_eq!(snapshots.lines().count(), 2 * 30);
        let summary_text = std::fs::read_to_string(&summary).unwrap();
        assert_eq!(summary_text.lines().count(), 1);
        assert!(summary_text.starts_with("30, "));

        std::fs::remove_file(&output).unwrap();
        std::fs::remove_file(&summary).unwrap();
    }

    #[test]
    fn no_output_keeps_summary_test() {
        let output = temp_path("quiet-snapshots.txt");
        let summary = temp_path("quiet-summary.txt");
        let picture = temp_path("quiet.png");
        let grid = temp_path("quiet.vtu");
        for path in [&output, &summary, &picture, &grid] {
            let _ = std::fs::remove_file(path);
        }

        let mut config = RunConfig::new(
            MeshSpec::plate(8, 6, 400.0, 200.0),
            Schedule::new(10, 2).unwrap().without_output(),
        );
        config.model = Model::Distributed;
        config.workers = 3;
        config.output = Some(output.clone());
        config.summary = Some(summary.clone());
        config.image = Some(picture.clone());
        config.vtk = Some(grid.clone());
        config.no_output = true;
        run(config.clone()).unwrap();
        run(config).unwrap();

        let summary_text = std::fs::read_to_string(&summary).unwrap();
        assert_eq!(summary_text.lines().count(), 2);
        assert!(summary_text.lines().all(|l| l.starts_with("48, ")));
        assert!(!picture.exists());
        assert!(!grid.exists());
        // Opened but never written to
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");

        std::fs::remove_file(&output).unwrap();
        std::fs::remove_file(&summary).unwrap();
    }

    #[test]
    fn run_writes_pictures_test() {
        let history = temp_path("bar-history.png");
        let field = temp_path("plate-field.png");
        let grid = temp_path("plate-field.vtu");

        let mut config = RunConfig::new(
            MeshSpec::bar(12, 400.0, 200.0),
            Schedule::new(20, 5).unwrap(),
        );
        config.model = Model::ForkJoin;
        config.workers = 2;
        config.image = Some(history.clone());
        run(config).unwrap();
        let img = ::image::open(&history).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (12, 4));

        let mut config = RunConfig::new(
            MeshSpec::plate(9, 7, 400.0, 200.0),
            Schedule::new(20, 5).unwrap(),
        );
        config.model = Model::Serial;
        config.image = Some(field.clone());
        config.vtk = Some(grid.clone());
        run(config).unwrap();
        let img = ::image::open(&field).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (9, 7));
        let text = std::fs::read_to_string(&grid).unwrap();
        assert!(text.contains("temperature"));

        for path in [&history, &field, &grid] {
            std::fs::remove_file(path).unwrap();
        }
    }

    #[test]
    fn bad_output_path_test() {
        let mut config = RunConfig::new(
            MeshSpec::bar(10, 400.0, 200.0),
            Schedule::new(5, 1).unwrap(),
        );
        config.output = Some(PathBuf::from("/nonexistent-dir/out.txt"));
        assert!(matches!(
            run(config.clone()),
            Err(HeatError::Resource { .. })
        ));

        config.no_output = true;
        assert!(run(config).is_ok());
    }

    #[test]
    fn invalid_config_test() {
        let mut config = RunConfig::new(
            MeshSpec::bar(1, 400.0, 200.0),
            Schedule::new(5, 1).unwrap(),
        );
        assert!(matches!(
            run(config.clone()),
            Err(HeatError::Configuration(_))
        ));
        config.mesh = MeshSpec::bar(10, 400.0, 200.0);
        config.workers = 0;
        assert!(matches!(run(config), Err(HeatError::Configuration(_))));
    }
}
