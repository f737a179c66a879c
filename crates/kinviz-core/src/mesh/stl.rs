//! STL decoding

use std::collections::HashMap;
use std::io::Cursor;

use crate::error::MeshError;

use super::RawMesh;

/// Decode ASCII or binary STL bytes into an indexed mesh
pub fn decode_stl(bytes: &[u8]) -> Result<RawMesh, MeshError> {
    let mut reader = Cursor::new(bytes);
    let mesh = stl_io::read_stl(&mut reader).map_err(|e| MeshError::Parse(e.to_string()))?;
    Ok(index_mesh(&mesh))
}

/// Weld coincident vertices of the triangle soup
fn index_mesh(mesh: &stl_io::IndexedMesh) -> RawMesh {
    let mut vertices: Vec<[f32; 3]> = Vec::new();
    let mut vertex_map: HashMap<[i32; 3], u32> = HashMap::new();
    let mut indices: Vec<u32> = Vec::with_capacity(mesh.faces.len() * 3);

    // Precision for vertex comparison (multiply by this, then round to int)
    const PRECISION: f32 = 10000.0;

    for face in &mesh.faces {
        for &vertex_idx in &face.vertices {
            let vertex = mesh.vertices[vertex_idx];
            let v = [vertex[0], vertex[1], vertex[2]];

            // Quantize for comparison
            let key = [
                (v[0] * PRECISION).round() as i32,
                (v[1] * PRECISION).round() as i32,
                (v[2] * PRECISION).round() as i32,
            ];

            let index = *vertex_map.entry(key).or_insert_with(|| {
                vertices.push(v);
                (vertices.len() - 1) as u32
            });
            indices.push(index);
        }
    }

    RawMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TRIANGLES: &str = "solid quad
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 1 1 0
  endloop
endfacet
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 1 0
    vertex 0 1 0
  endloop
endfacet
endsolid quad
";

    #[test]
    fn test_decode_ascii_stl_welds_vertices() {
        let mesh = decode_stl(TWO_TRIANGLES.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertices.len(), 4);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(decode_stl(b"not an stl"), Err(MeshError::Parse(_))));
    }
}
