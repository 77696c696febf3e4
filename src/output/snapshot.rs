use crate::error::*;
use crate::mesh::*;
use crate::util::*;
use std::io::prelude::*;
use std::path::Path;

/// Receives the full mesh on snapshot steps.
/// Only one worker ever holds the sink, so implementations need not
/// synchronize.
pub trait SnapshotSink {
    fn record(&mut self, step: usize, shape: &MeshShape, nodes: &[Node]) -> HeatResult<()>;

    /// Called once after the last step.
    fn finish(&mut self) -> HeatResult<()> {
        Ok(())
    }
}

/// Sink used when output is disabled.
#[derive(Debug, Default, Copy, Clone)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn record(&mut self, _step: usize, _shape: &MeshShape, _nodes: &[Node]) -> HeatResult<()> {
        Ok(())
    }
}

/// One text line per active node and snapshot,
/// `step,x,y,temperature` for 2D meshes and `step,x,temperature` for 1D.
pub struct CsvSnapshot<W: Write> {
    writer: W,
    records: usize,
}

impl CsvSnapshot<std::io::BufWriter<std::fs::File>> {
    /// Truncate or create the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> HeatResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|source| HeatError::Resource {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("writing snapshots to {:?}", path);
        Ok(CsvSnapshot::new(std::io::BufWriter::new(file)))
    }
}

impl<W: Write> CsvSnapshot<W> {
    pub fn new(writer: W) -> Self {
        CsvSnapshot { writer, records: 0 }
    }

    /// Number of snapshots written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SnapshotSink for CsvSnapshot<W> {
    fn record(&mut self, step: usize, shape: &MeshShape, nodes: &[Node]) -> HeatResult<()> {
        profiling::scope!("snapshot::record");
        for node in nodes.iter().filter(|n| n.is_active()) {
            let p = node.position();
            match shape.dimension() {
                1 => writeln!(self.writer, "{},{},{}", step, p[0], node.temperature)?,
                _ => writeln!(
                    self.writer,
                    "{},{},{},{}",
                    step, p[0], p[1], node.temperature
                )?,
            }
        }
        self.records += 1;
        log::debug!("snapshot of step {step} written");
        Ok(())
    }

    fn finish(&mut self) -> HeatResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Fans every snapshot out to several sinks.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn SnapshotSink + Send>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn SnapshotSink + Send>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl SnapshotSink for SinkSet {
    fn record(&mut self, step: usize, shape: &MeshShape, nodes: &[Node]) -> HeatResult<()> {
        for sink in self.sinks.iter_mut() {
            sink.record(step, shape, nodes)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> HeatResult<()> {
        for sink in self.sinks.iter_mut() {
            sink.finish()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn bar_record_test() {
        let mesh = Mesh::initialize(&MeshSpec::bar(3, 400.0, 200.0)).unwrap();
        let mut sink = CsvSnapshot::new(Vec::new());
        sink.record(10, mesh.shape(), mesh.nodes()).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.records(), 1);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "10,0,400\n10,0.5,200\n10,1,200\n");
    }

    #[test]
    fn plate_record_test() {
        let mesh = Mesh::initialize(&MeshSpec::plate(3, 2, 400.0, 200.0)).unwrap();
        let mut sink = CsvSnapshot::new(Vec::new());
        sink.record(0, mesh.shape(), mesh.nodes()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "0,0,0,400");
        assert_eq!(lines[5], "0,1,0.5,200");
    }

    #[test]
    fn inactive_nodes_skipped_test() {
        let mesh = Mesh::initialize(&MeshSpec::cavity(10, 400.0, 200.0)).unwrap();
        let mut sink = CsvSnapshot::new(Vec::new());
        sink.record(0, mesh.shape(), mesh.nodes()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.lines().count(), mesh.active_count());
    }

    #[test]
    fn sink_set_test() {
        struct Counter(std::sync::Arc<std::sync::atomic::AtomicUsize>);
        impl SnapshotSink for Counter {
            fn record(&mut self, _: usize, _: &MeshShape, _: &[Node]) -> HeatResult<()> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Ok(())
            }
        }

        let count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut set = SinkSet::new();
        set.push(Box::new(Counter(count.clone())));
        set.push(Box::new(Counter(count.clone())));
        set.push(Box::new(NullSink));
        assert_eq!(set.len(), 3);

        let mesh = Mesh::initialize(&MeshSpec::bar(3, 400.0, 200.0)).unwrap();
        set.record(0, mesh.shape(), mesh.nodes()).unwrap();
        set.record(1, mesh.shape(), mesh.nodes()).unwrap();
        set.finish().unwrap();
        assert_eq!(count.load(std::sync::atomic::Ordering::Relaxed), 4);
    }

    #[test]
    fn create_failure_test() {
        let r = CsvSnapshot::create("/nonexistent-dir/snapshots.txt");
        assert!(matches!(r, Err(HeatError::Resource { .. })));
    }
}
