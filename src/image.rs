use crate::error::*;
use crate::mesh::*;
use crate::output::*;
use crate::par_slice;
use crate::util::*;
use std::path::PathBuf;

const IMAGE_CHUNK_SIZE: usize = 4096;

/// Map `t` into `[0, 1]` over the range `(lo, hi)`.
#[inline]
fn normalize(t: f64, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        ((t - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

#[inline]
fn turbo(t: f64, range: (f64, f64)) -> image::Rgb<u8> {
    let gradient = colorous::TURBO;
    image::Rgb(gradient.eval_continuous(normalize(t, range)).as_array())
}

/// Heat map of a 1D run, one image line per snapshot, top to bottom.
pub struct HistoryImage {
    path: PathBuf,
    width: usize,
    lines: Vec<Vec<f64>>,
}

impl HistoryImage {
    pub fn new<P: Into<PathBuf>>(path: P, width: usize) -> Self {
        HistoryImage {
            path: path.into(),
            width,
            lines: Vec::new(),
        }
    }

    fn render(&self) -> image::RgbImage {
        let flat: Vec<f64> = self.lines.iter().flatten().copied().collect();
        let range = par_slice::min_max(&flat, IMAGE_CHUNK_SIZE).unwrap_or((0.0, 1.0));
        let mut img = image::RgbImage::new(self.width as u32, self.lines.len() as u32);
        for (l, line) in self.lines.iter().enumerate() {
            for (x, t) in line.iter().enumerate() {
                img.put_pixel(x as u32, l as u32, turbo(*t, range));
            }
        }
        img
    }
}

impl SnapshotSink for HistoryImage {
    fn record(&mut self, _step: usize, shape: &MeshShape, nodes: &[Node]) -> HeatResult<()> {
        debug_assert_eq!(shape.len(), self.width);
        self.lines.push(nodes.iter().map(|n| n.temperature).collect());
        Ok(())
    }

    fn finish(&mut self) -> HeatResult<()> {
        if self.lines.is_empty() {
            log::warn!("no snapshots recorded, skipping {:?}", self.path);
            return Ok(());
        }
        log::info!("writing image: {:?}", self.path);
        self.render().save(&self.path)?;
        Ok(())
    }
}

/// Heat map of a mesh, inactive nodes are black.
pub fn render2d(mesh: &Mesh) -> image::RgbImage {
    let shape = mesh.shape();
    let active: Vec<f64> = mesh
        .nodes()
        .iter()
        .filter(|n| n.is_active())
        .map(|n| n.temperature)
        .collect();
    let range = par_slice::min_max(&active, IMAGE_CHUNK_SIZE).unwrap_or((0.0, 1.0));
    let mut img = image::RgbImage::new(shape.width() as u32, shape.height() as u32);
    for (i, node) in mesh.nodes().iter().enumerate() {
        let c = shape.coord(i);
        let pixel = if node.is_active() {
            turbo(node.temperature, range)
        } else {
            image::Rgb([0, 0, 0])
        };
        img.put_pixel(c[1] as u32, c[0] as u32, pixel);
    }
    img
}

pub fn image2d<F: AsRef<std::path::Path>>(mesh: &Mesh, s: &F) -> HeatResult<()> {
    log::info!("writing image: {:?}", s.as_ref());
    render2d(mesh).save(s)?;
    Ok(())
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn normalize_test() {
        assert_eq!(normalize(200.0, (200.0, 400.0)), 0.0);
        assert_eq!(normalize(400.0, (200.0, 400.0)), 1.0);
        assert_eq!(normalize(300.0, (200.0, 400.0)), 0.5);
        assert_eq!(normalize(7.0, (7.0, 7.0)), 0.5);
    }

    #[test]
    fn render2d_test() {
        let mesh = Mesh::initialize(&MeshSpec::cavity(10, 400.0, 200.0)).unwrap();
        let img = render2d(&mesh);
        assert_eq!(img.width(), 10);
        assert_eq!(img.height(), 10);
        // Inside the cut-out
        assert_eq!(*img.get_pixel(0, 5), image::Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(0, 0), turbo(400.0, (200.0, 400.0)));
    }

    #[test]
    fn history_test() {
        let mesh = Mesh::initialize(&MeshSpec::bar(6, 400.0, 200.0)).unwrap();
        let mut history = HistoryImage::new("unused.png", 6);
        for step in 0..3 {
            history.record(step, mesh.shape(), mesh.nodes()).unwrap();
        }
        let img = history.render();
        assert_eq!(img.width(), 6);
        assert_eq!(img.height(), 3);
        assert_eq!(img.get_pixel(0, 2), img.get_pixel(0, 0));
    }

    #[test]
    fn write_test() {
        let mesh = Mesh::initialize(&MeshSpec::plate(8, 4, 400.0, 200.0)).unwrap();
        let path = std::env::temp_dir()
            .join(format!("heatmesh-image-{}.png", std::process::id()));
        image2d(&mesh, &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        std::fs::remove_file(&path).unwrap();
    }
}
