use crate::build_info;
use crate::error::*;
use crate::kernel::DEFAULT_CONDUCTIVITY;
use crate::mesh::*;
use crate::orchestrator::*;
use crate::solver::{self, Model, Schedule};
use clap::Parser;
use std::path::PathBuf;

/// Spread of the random initial condition around the default temperature.
const RAND_IC_SPREAD: f64 = 10.0;

/// Jacobi heat diffusion over a bar or a plate.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Number of nodes of a bar, or width of a plate.
    #[arg(short = 'n', long, default_value = "1000")]
    pub size: usize,

    /// Height of a plate, defaults to the width.
    #[arg(long)]
    pub height: Option<usize>,

    /// Mesh shape.
    #[arg(long, value_enum, default_value_t = Topology::Bar)]
    pub topology: Topology,

    /// Temperature of the left (and top) fixed nodes.
    #[arg(long, default_value = "400")]
    pub left: f64,

    /// Temperature of the right (and bottom) fixed nodes.
    #[arg(long, default_value = "200")]
    pub right: f64,

    /// Initial temperature of free nodes.
    #[arg(long, default_value = "200")]
    pub default_temp: f64,

    /// Number of steps.
    #[arg(long, default_value = "1000")]
    pub steps: usize,

    /// Record a snapshot every this many steps.
    #[arg(long, default_value = "10")]
    pub save_freq: usize,

    /// Snapshot file, truncated.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Summary file, appended to.
    #[arg(short, long)]
    pub summary: Option<PathBuf>,

    /// Turn off snapshots and every other per-run output.
    #[arg(long, alias = "no")]
    pub no_output: bool,

    /// Concurrency model.
    #[arg(long, value_enum, default_value_t = Model::ForkJoin)]
    pub model: Model,

    /// Number of workers, defaults to the rayon thread count.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Strength of a heat source in the middle of the mesh.
    #[arg(long)]
    pub hot_spot: Option<f64>,

    /// Perturb the initial temperatures with this seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Thermal conductivity scaling the heat source.
    #[arg(long, default_value_t = DEFAULT_CONDUCTIVITY)]
    pub conductivity: f64,

    /// PNG of the final field, or of the snapshot history for a bar.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// VTK file of the final field.
    #[arg(long)]
    pub vtk: Option<PathBuf>,

    /// Print build information and quit
    #[arg(long)]
    pub build_info: bool,
}

impl Args {
    pub fn cli_setup(name: &str) -> Self {
        let args = Args::parse();

        if args.build_info {
            build_info::print_report(name);
            std::process::exit(0);
        }

        args
    }

    pub fn mesh_spec(&self) -> MeshSpec {
        let mut spec = MeshSpec::new(
            self.topology,
            self.size,
            self.height,
            self.left,
            self.right,
        )
        .with_default_temperature(self.default_temp);
        if let Some(strength) = self.hot_spot {
            spec = spec.with_hot_spot(strength);
        }
        if let Some(seed) = self.seed {
            spec = spec.with_initial_condition(ICType::Rand {
                seed,
                spread: RAND_IC_SPREAD,
            });
        }
        spec
    }

    /// Validate the arguments into a run configuration.
    pub fn run_config(&self) -> HeatResult<RunConfig> {
        let mesh = self.mesh_spec();
        mesh.shape()?;
        let mut schedule = Schedule::new(self.steps, self.save_freq)?;
        if self.no_output {
            schedule = schedule.without_output();
        }
        let workers = self.workers.unwrap_or_else(solver::default_workers);
        if workers == 0 {
            return Err(HeatError::config("worker count must be positive"));
        }
        if self.model == Model::Serial && workers > 1 {
            log::warn!("serial model ignores --workers {workers}");
        }
        if self.image.is_some() && self.no_output {
            log::warn!("--image has no effect with --no-output");
        }

        Ok(RunConfig {
            mesh,
            schedule,
            model: self.model,
            workers,
            conductivity: self.conductivity,
            output: self.output.clone(),
            summary: self.summary.clone(),
            image: self.image.clone(),
            vtk: self.vtk.clone(),
            no_output: self.no_output,
        })
    }
}

/// Keeps the puffin server alive for the duration of a run.
pub struct Profiler {
    #[cfg(feature = "profile-with-puffin")]
    server: Option<puffin_http::Server>,
}

impl Profiler {
    #[cfg(feature = "profile-with-puffin")]
    pub fn start() -> HeatResult<Self> {
        let server_addr = format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT);
        println!("Run this to view profiling data:  puffin_viewer {server_addr}");
        let server = puffin_http::Server::new(&server_addr).map_err(|e| {
            HeatError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                e.to_string(),
            ))
        })?;
        profiling::puffin::set_scopes_on(true);
        Ok(Profiler {
            server: Some(server),
        })
    }

    #[cfg(not(feature = "profile-with-puffin"))]
    pub fn start() -> HeatResult<Self> {
        Ok(Profiler {})
    }

    pub fn finish(self) {
        profiling::finish_frame!();
        #[cfg(feature = "profile-with-puffin")]
        {
            println!("Flushing profiler");
            drop(self.server);
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("heat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_test() {
        let args = parse(&[]);
        assert_eq!(args.size, 1000);
        assert_eq!(args.topology, Topology::Bar);
        assert_eq!(args.left, 400.0);
        assert_eq!(args.right, 200.0);
        assert_eq!(args.steps, 1000);
        assert_eq!(args.save_freq, 10);
        assert_eq!(args.conductivity, DEFAULT_CONDUCTIVITY);
        assert!(!args.no_output);

        let config = args.run_config().unwrap();
        assert_eq!(config.mesh, MeshSpec::bar(1000, 400.0, 200.0));
        assert!(config.schedule.output_enabled);
        assert!(config.workers >= 1);
    }

    #[test]
    fn plate_test() {
        let args = parse(&[
            "-n", "50", "--height", "20", "--topology", "plate", "--model",
            "distributed", "-w", "4", "--no-output", "--seed", "9",
        ]);
        let config = args.run_config().unwrap();
        assert_eq!(config.mesh.shape().unwrap().len(), 1000);
        assert_eq!(config.model, Model::Distributed);
        assert_eq!(config.workers, 4);
        assert!(config.no_output);
        assert!(!config.schedule.output_enabled);
        assert!(matches!(
            config.mesh.initial_condition,
            ICType::Rand { seed: 9, .. }
        ));
    }

    #[test]
    fn no_alias_test() {
        let args = parse(&["--no"]);
        assert!(args.no_output);
    }

    #[test]
    fn invalid_test() {
        assert!(parse(&["-w", "0"]).run_config().is_err());
        assert!(parse(&["--save-freq", "0"]).run_config().is_err());
        assert!(parse(&["-n", "1"]).run_config().is_err());
        assert!(parse(&["--topology", "cavity", "-n", "5"])
            .run_config()
            .is_err());
    }
}
