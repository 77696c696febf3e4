use std::path::PathBuf;
use thiserror::Error;

pub type HeatResult<T> = Result<T, HeatError>;

#[derive(Error, Debug)]
pub enum HeatError {
    /// Rejected before the step loop starts, nothing has been allocated.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A sink could not be opened.
    #[error("cannot open {path:?}: {source}")]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker stopped answering or panicked, the run is aborted.
    #[error("worker {rank} disconnected")]
    WorkerLost { rank: usize },

    /// A message tagged with another step than the one in flight.
    #[error("worker {rank} sent step {received} while step {expected} is in flight")]
    OutOfStep {
        rank: usize,
        expected: usize,
        received: usize,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("vtk error: {0}")]
    Vtk(String),
}

impl HeatError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        HeatError::Configuration(message.into())
    }
}
