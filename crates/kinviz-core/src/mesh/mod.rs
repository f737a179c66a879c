//! Mesh file decoding (STL, OBJ formats)

mod obj;
mod stl;

pub use obj::decode_obj;
pub use stl::decode_stl;

use crate::error::MeshError;

/// Indexed triangle mesh decoded from a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMesh {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl RawMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Reject meshes without triangles or with dangling indices
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.vertices.is_empty() || self.indices.len() < 3 {
            return Err(MeshError::EmptyMesh);
        }
        if let Some(&index) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: self.vertices.len(),
            });
        }
        Ok(())
    }
}

/// Mesh format detected from a reference's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
    Unknown,
}

impl MeshFormat {
    /// Detect format from a path or URI
    pub fn from_uri(uri: &str) -> Self {
        let extension = uri
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("stl") => MeshFormat::Stl,
            Some("obj") => MeshFormat::Obj,
            _ => MeshFormat::Unknown,
        }
    }

    /// Get format name
    pub fn name(&self) -> &'static str {
        match self {
            MeshFormat::Stl => "STL",
            MeshFormat::Obj => "OBJ",
            MeshFormat::Unknown => "Unknown",
        }
    }
}

/// Decode mesh bytes according to the extension of `uri`
pub fn decode_mesh(uri: &str, bytes: &[u8]) -> Result<RawMesh, MeshError> {
    let mesh = match MeshFormat::from_uri(uri) {
        MeshFormat::Stl => decode_stl(bytes)?,
        MeshFormat::Obj => decode_obj(bytes)?,
        MeshFormat::Unknown => {
            let extension = uri.rsplit_once('.').map(|(_, e)| e).unwrap_or("unknown");
            return Err(MeshError::UnsupportedFormat(extension.to_string()));
        }
    };
    mesh.validate()?;
    Ok(mesh)
}
