mod snapshot;
mod summary;

pub use snapshot::*;
pub use summary::*;
