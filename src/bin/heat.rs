use heatmesh::cli::*;
use heatmesh::orchestrator;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let args = Args::cli_setup("heat");
    let result = Profiler::start().and_then(|profiler| {
        let config = args.run_config()?;
        let solver = config.solver()?;
        solver.print_report();
        let report = orchestrator::run_with(config, solver.as_ref())?;
        report.print_report();
        profiler.finish();
        Ok(())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
