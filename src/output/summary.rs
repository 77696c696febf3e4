use crate::error::*;
use std::io::prelude::*;
use std::path::Path;
use std::time::Duration;

/// Appends one `node_count, elapsed_seconds` line per run.
pub struct SummaryWriter<W: Write> {
    writer: W,
}

impl SummaryWriter<std::fs::File> {
    /// Open `path` for appending, creating it if needed.
    pub fn append<P: AsRef<Path>>(path: P) -> HeatResult<Self> {
        let path = path.as_ref();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| HeatError::Resource {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(SummaryWriter::new(file))
    }
}

impl<W: Write> SummaryWriter<W> {
    pub fn new(writer: W) -> Self {
        SummaryWriter { writer }
    }

    pub fn write_line(&mut self, nodes: usize, elapsed: Duration) -> HeatResult<()> {
        writeln!(self.writer, "{}, {}", nodes, elapsed.as_secs_f64())?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn write_line_test() {
        let mut summary = SummaryWriter::new(Vec::new());
        summary.write_line(100, Duration::from_millis(1500)).unwrap();
        summary.write_line(200, Duration::from_secs(2)).unwrap();
        let text = String::from_utf8(summary.into_inner()).unwrap();
        assert_eq!(text, "100, 1.5\n200, 2\n");
    }

    #[test]
    fn append_test() {
        let path = std::env::temp_dir()
            .join(format!("heatmesh-summary-{}.txt", std::process::id()));
        let _ = std::fs::remove_file(&path);
        SummaryWriter::append(&path)
            .unwrap()
            .write_line(10, Duration::from_secs(1))
            .unwrap();
        SummaryWriter::append(&path)
            .unwrap()
            .write_line(20, Duration::from_secs(3))
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "10, 1\n20, 3\n");
        std::fs::remove_file(&path).unwrap();
    }
}
