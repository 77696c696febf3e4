pub mod build_info;
pub mod cli;
pub mod error;
pub mod exchange;
pub mod image;
pub mod kernel;
pub mod mesh;
pub mod orchestrator;
pub mod output;
pub mod par_slice;
pub mod partition;
pub mod solver;
pub mod util;
pub mod vtk;
