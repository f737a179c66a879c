//! OBJ decoding

use std::io::{BufReader, Cursor};

use crate::error::MeshError;

use super::RawMesh;

/// Decode Wavefront OBJ bytes, merging all models into one mesh.
///
/// Material libraries are not resolved; only geometry is kept.
pub fn decode_obj(bytes: &[u8]) -> Result<RawMesh, MeshError> {
    let mut reader = BufReader::new(Cursor::new(bytes));
    let (models, _materials) =
        tobj::load_obj_buf(&mut reader, &tobj::GPU_LOAD_OPTIONS, |_| {
            Err(tobj::LoadError::OpenFileFailed)
        })
        .map_err(|e| MeshError::Parse(e.to_string()))?;

    let mut mesh = RawMesh::default();
    for model in models {
        let base = mesh.vertices.len() as u32;
        mesh.vertices.extend(
            model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]]),
        );
        mesh.indices
            .extend(model.mesh.indices.iter().map(|i| i + base));
    }
    Ok(mesh)
}
