use crate::error::*;
use crate::mesh::*;
use vtkio::model::*;

/// Cells of a mesh: segments between neighbors in 1D, quads in 2D.
/// Only cells whose corners are all active are emitted.
fn cells(mesh: &Mesh) -> (Vec<u64>, Vec<u64>, Vec<CellType>) {
    let shape = mesh.shape();
    let active = |i: usize| mesh.node(i).is_active();
    let mut connectivity = Vec::new();
    let mut offsets = Vec::new();
    let mut cell_types = Vec::new();
    let mut offset = 0;

    match shape.dimension() {
        1 => {
            for i in 0..shape.len().saturating_sub(1) {
                if active(i) && active(i + 1) {
                    connectivity.extend([i as u64, (i + 1) as u64]);
                    offset += 2;
                    offsets.push(offset);
                    cell_types.push(CellType::Line);
                }
            }
        }
        _ => {
            for row in 0..shape.height() - 1 {
                for col in 0..shape.width() - 1 {
                    let vertices = [
                        shape.index(row, col),
                        shape.index(row, col + 1),
                        shape.index(row + 1, col + 1),
                        shape.index(row + 1, col),
                    ];
                    if vertices.iter().all(|v| active(*v)) {
                        connectivity.extend(vertices.iter().map(|v| *v as u64));
                        offset += 4;
                        offsets.push(offset);
                        cell_types.push(CellType::Quad);
                    }
                }
            }
        }
    }
    (connectivity, offsets, cell_types)
}

/// Write the temperature field as an unstructured grid.
pub fn write_vtk<F: AsRef<std::path::Path>>(mesh: &Mesh, s: &F) -> HeatResult<()> {
    log::info!("writing vtk: {:?}", s.as_ref());

    let mut points = Vec::with_capacity(3 * mesh.len());
    for node in mesh.nodes() {
        let p = node.position();
        points.push(p[0] as f32);
        points.push(p[1] as f32);
        points.push(0.0f32);
    }

    let (connectivity, offsets, cell_types) = cells(mesh);
    let data: Vec<f32> = mesh
        .nodes()
        .iter()
        .map(|n| if n.is_active() { n.temperature as f32 } else { 0.0 })
        .collect();

    Vtk {
        version: Version::Auto,
        title: String::new(),
        byte_order: ByteOrder::LittleEndian,
        file_path: None,
        data: DataSet::inline(UnstructuredGridPiece {
            points: IOBuffer::F32(points),
            cells: Cells {
                cell_verts: VertexNumbers::XML {
                    connectivity,
                    offsets,
                },
                types: cell_types,
            },
            data: Attributes {
                point: vec![Attribute::DataArray(DataArray {
                    name: "temperature".to_string(),
                    elem: ElementType::Scalars {
                        num_comp: 1,
                        lookup_table: None,
                    },
                    data: IOBuffer::F32(data),
                })],
                cell: vec![],
            },
        }),
    }
    .export(s)
    .map_err(|e| HeatError::Vtk(format!("{e:?}")))
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn cells_test() {
        let bar = Mesh::initialize(&MeshSpec::bar(5, 400.0, 200.0)).unwrap();
        let (connectivity, offsets, types) = cells(&bar);
        assert_eq!(types.len(), 4);
        assert_eq!(offsets, vec![2, 4, 6, 8]);
        assert_eq!(&connectivity[0..4], &[0, 1, 1, 2]);

        let plate = Mesh::initialize(&MeshSpec::plate(4, 3, 400.0, 200.0)).unwrap();
        let (connectivity, offsets, types) = cells(&plate);
        assert_eq!(types.len(), 6);
        assert!(types.iter().all(|t| matches!(t, CellType::Quad)));
        assert_eq!(offsets.last(), Some(&24));
        assert_eq!(&connectivity[0..4], &[0, 1, 5, 4]);
    }

    #[test]
    fn cavity_cells_test() {
        let n = 20;
        let mesh = Mesh::initialize(&MeshSpec::cavity(n, 400.0, 200.0)).unwrap();
        let (_, _, types) = cells(&mesh);
        assert!(types.len() < (n - 1) * (n - 1));
        assert!(!types.is_empty());
    }

    #[test]
    fn write_test() {
        let mesh = Mesh::initialize(&MeshSpec::plate(5, 5, 400.0, 200.0)).unwrap();
        let path = std::env::temp_dir()
            .join(format!("heatmesh-vtk-{}.vtu", std::process::id()));
        write_vtk(&mesh, &path).unwrap();
        let size = std::fs::metadata(&path).unwrap().len();
        assert!(size > 0);
        std::fs::remove_file(&path).unwrap();
    }
}
