//! STL export of a [`Solid`] in binary and ASCII form, and import of STL
//! artifacts back into a welded solid.

use std::fs;
use std::path::Path;

use mesh_kernel::{Solid, Tolerance, VertexWelder};
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::errors::{ExportError, LoadError};

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StlFormat {
    #[default]
    Binary,
    Ascii,
}

fn check_solid(solid: &Solid) -> Result<(), ExportError> {
    if solid.is_empty() {
        return Err(ExportError::NoSolid);
    }
    let vertex_count = solid.vertex_count();
    if let Some(&index) = solid
        .faces
        .iter()
        .flatten()
        .find(|&&i| i as usize >= vertex_count)
    {
        return Err(ExportError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }
    Ok(())
}

fn unit_normal(solid: &Solid, face: [u32; 3]) -> Vector3<f32> {
    let n = solid.face_normal(face);
    let len = n.norm();
    if len > 1e-12 {
        (n / len).cast()
    } else {
        Vector3::z()
    }
}

/// Binary STL: an 80-byte header, a little-endian `u32` triangle count, then
/// 50 bytes per triangle (normal, three vertices, attribute count).
pub fn export_binary_stl(solid: &Solid, name: &str) -> Result<Vec<u8>, ExportError> {
    check_solid(solid)?;
    let tri_count = solid.face_count();
    let mut buf = Vec::with_capacity(HEADER_LEN + 4 + tri_count * TRIANGLE_LEN);

    let header = format!("binary STL: {name}");
    let header_bytes = header.as_bytes();
    buf.extend_from_slice(&header_bytes[..header_bytes.len().min(HEADER_LEN)]);
    buf.resize(HEADER_LEN, 0u8);
    buf.extend_from_slice(&(tri_count as u32).to_le_bytes());

    for &face in &solid.faces {
        let normal = unit_normal(solid, face);
        for c in normal.iter() {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        for p in solid.triangle(face) {
            for c in p.coords.iter() {
                buf.extend_from_slice(&(*c as f32).to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }
    Ok(buf)
}

pub fn export_ascii_stl(solid: &Solid, name: &str) -> Result<String, ExportError> {
    check_solid(solid)?;
    let mut out = String::with_capacity(solid.face_count() * 300);
    out.push_str(&format!("solid {name}\n"));
    for &face in &solid.faces {
        let n = unit_normal(solid, face);
        out.push_str(&format!("  facet normal {} {} {}\n", n.x, n.y, n.z));
        out.push_str("    outer loop\n");
        for p in solid.triangle(face) {
            out.push_str(&format!("      vertex {} {} {}\n", p.x, p.y, p.z));
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }
    out.push_str(&format!("endsolid {name}\n"));
    Ok(out)
}

pub fn write_stl(path: &Path, solid: &Solid, format: StlFormat) -> Result<(), ExportError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("solid");
    let bytes = match format {
        StlFormat::Binary => export_binary_stl(solid, name)?,
        StlFormat::Ascii => export_ascii_stl(solid, name)?.into_bytes(),
    };
    fs::write(path, bytes).map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), ?format, faces = solid.face_count(), "STL written");
    Ok(())
}

/// Parse binary or ASCII STL, welding shared corners back into indexed
/// vertices.
pub fn parse_stl(bytes: &[u8], tolerance: &Tolerance) -> Result<Solid, LoadError> {
    let triangles = if is_binary(bytes) {
        parse_binary(bytes)?
    } else {
        let text = std::str::from_utf8(bytes).map_err(|e| LoadError::Stl {
            reason: format!("neither binary nor UTF-8 text: {e}"),
        })?;
        parse_ascii(text)?
    };

    let mut welder = VertexWelder::new(tolerance.weld);
    let faces: Vec<[u32; 3]> = triangles
        .into_iter()
        .map(|tri| tri.map(|p| welder.insert(p)))
        .collect();
    Ok(Solid::new(welder.into_points(), faces))
}

pub fn read_stl(path: &Path, tolerance: &Tolerance) -> Result<Solid, LoadError> {
    let bytes = fs::read(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_stl(&bytes, tolerance)
}

/// Binary files carry an exact size; some exporters still start the header
/// with `solid`, so the size check wins.
fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    bytes.len() == HEADER_LEN + 4 + count * TRIANGLE_LEN
}

fn f32_at(bytes: &[u8], at: usize) -> f64 {
    f64::from(f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]))
}

fn parse_binary(bytes: &[u8]) -> Result<Vec<[Point3<f64>; 3]>, LoadError> {
    let triangles: Vec<[Point3<f64>; 3]> = bytes[HEADER_LEN + 4..]
        .chunks_exact(TRIANGLE_LEN)
        .map(|record| {
            // The stored normal is skipped; winding defines orientation.
            [0, 1, 2].map(|v| {
                let at = 12 + v * 12;
                Point3::new(f32_at(record, at), f32_at(record, at + 4), f32_at(record, at + 8))
            })
        })
        .collect();
    if triangles.is_empty() {
        return Err(LoadError::Stl {
            reason: "no triangles".to_string(),
        });
    }
    Ok(triangles)
}

fn parse_ascii(text: &str) -> Result<Vec<[Point3<f64>; 3]>, LoadError> {
    let mut corners = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let mut words = line.split_whitespace();
        if words.next() != Some("vertex") {
            continue;
        }
        let coords: Vec<f64> = words
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|e| LoadError::Stl {
                reason: format!("line {}: {e}", line_no + 1),
            })?;
        let &[x, y, z] = coords.as_slice() else {
            return Err(LoadError::Stl {
                reason: format!("line {}: expected three coordinates", line_no + 1),
            });
        };
        corners.push(Point3::new(x, y, z));
    }
    if corners.is_empty() || corners.len() % 3 != 0 {
        return Err(LoadError::Stl {
            reason: format!("{} vertices do not form whole triangles", corners.len()),
        });
    }
    Ok(corners
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}
