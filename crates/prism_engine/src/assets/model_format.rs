//! Binary model format
//!
//! A model file holds exactly one mesh. All integers are little-endian and
//! there is no header, magic number or version field:
//!
//! | field            | encoding                                            |
//! |------------------|-----------------------------------------------------|
//! | shading model    | `u8` (0 Blinn-Phong, 1 Cook-Torrance, 2 Ashikhmin-Shirley) |
//! | 5 map paths      | `u8` length `n`, then `n` path bytes; `n == 0` means none. Order: albedo, specular, roughness, normal, ambient occlusion |
//! | vertex count     | `u64`                                               |
//! | vertices         | 44-byte records: position, normal, tangent (3 x `f32` each), uv (2 x `f32`) |
//! | index count      | `u64`                                               |
//! | indices          | `u32` each                                          |
//!
//! The file must end right after the last index.

use std::path::Path;

use crate::render::primitives::mesh::Vertex;
use crate::render::resources::materials::{MapSlot, ShadingModel};
use crate::render::{RenderError, RenderResult};

/// Number of map descriptors in a file
pub const MAP_COUNT: usize = MapSlot::FILE_ORDER.len();

/// Contents of a model file
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFile {
    /// Shading model of the mesh's material
    pub shading_model: ShadingModel,
    /// Texture paths in file order; `None` where the slot uses its constant
    pub maps: [Option<String>; MAP_COUNT],
    /// Vertex records
    pub vertices: Vec<Vertex>,
    /// Triangle-list indices
    pub indices: Vec<u32>,
}

fn invalid(reason: impl Into<String>) -> RenderError {
    RenderError::InvalidFileFormat(reason.into())
}

/// Bounds-checked forward reader over the file bytes
struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize, what: &str) -> RenderResult<&'a [u8]> {
        let remaining = self.bytes.len() - self.offset;
        if len > remaining {
            return Err(invalid(format!(
                "unexpected end of file reading {what} at byte {} ({len} bytes needed, {remaining} left)",
                self.offset
            )));
        }
        let bytes: &'a [u8] = self.bytes;
        let slice = &bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn read_u8(&mut self, what: &str) -> RenderResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn read_u64(&mut self, what: &str) -> RenderResult<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read `count` records of `record_size` bytes as one block
    fn take_block(&mut self, count: u64, record_size: usize, what: &str) -> RenderResult<&'a [u8]> {
        let len = usize::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(record_size))
            .ok_or_else(|| invalid(format!("{what} count {count} is too large")))?;
        self.take(len, what)
    }

    fn finish(&self) -> RenderResult<()> {
        let trailing = self.bytes.len() - self.offset;
        if trailing != 0 {
            return Err(invalid(format!("{trailing} trailing bytes after index block")));
        }
        Ok(())
    }
}

fn read_f32s<const N: usize>(bytes: &[u8]) -> [f32; N] {
    let mut values = [0.0; N];
    for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    values
}

fn decode_vertex(record: &[u8]) -> Vertex {
    Vertex {
        position: read_f32s(&record[0..12]),
        normal: read_f32s(&record[12..24]),
        tangent: read_f32s(&record[24..36]),
        uv: read_f32s(&record[36..44]),
    }
}

impl ModelFile {
    /// Parse a complete model file
    ///
    /// Fails with [`RenderError::InvalidShaderType`] for an unknown shading
    /// model and [`RenderError::InvalidFileFormat`] on short reads, trailing
    /// bytes, non-UTF-8 paths or counts that cannot fit in memory.
    pub fn parse(bytes: &[u8]) -> RenderResult<Self> {
        let mut reader = ByteReader::new(bytes);

        let shading_model = ShadingModel::try_from(reader.read_u8("shading model")?)?;

        let mut maps: [Option<String>; MAP_COUNT] = Default::default();
        for (map, slot) in maps.iter_mut().zip(MapSlot::FILE_ORDER) {
            let len = reader.read_u8("map path length")? as usize;
            if len == 0 {
                continue;
            }
            let raw = reader.take(len, "map path")?;
            let path = std::str::from_utf8(raw)
                .map_err(|e| invalid(format!("{} path is not UTF-8: {e}", slot.uniform_name())))?;
            *map = Some(path.to_string());
        }

        let vertex_count = reader.read_u64("vertex count")?;
        let vertices = reader
            .take_block(vertex_count, Vertex::SIZE, "vertex")?
            .chunks_exact(Vertex::SIZE)
            .map(decode_vertex)
            .collect();

        let index_count = reader.read_u64("index count")?;
        let indices = reader
            .take_block(index_count, 4, "index")?
            .chunks_exact(4)
            .map(|raw| u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            .collect();

        reader.finish()?;

        Ok(Self {
            shading_model,
            maps,
            vertices,
            indices,
        })
    }

    /// Read and parse a model file from disk
    pub fn read_from_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        log::debug!("Parsing model file {:?} ({} bytes)", path, bytes.len());
        Self::parse(&bytes)
    }

    /// Produce the on-disk byte layout
    ///
    /// Fails with [`RenderError::InvalidFileFormat`] if a path is empty or
    /// longer than 255 bytes, since neither can be represented.
    pub fn encode(&self) -> RenderResult<Vec<u8>> {
        let paths_len: usize = self.maps.iter().flatten().map(String::len).sum();
        let mut out = Vec::with_capacity(
            1 + MAP_COUNT + paths_len + 16 + self.vertices.len() * Vertex::SIZE + self.indices.len() * 4,
        );

        out.push(self.shading_model.index());
        for (map, slot) in self.maps.iter().zip(MapSlot::FILE_ORDER) {
            match map {
                None => out.push(0),
                Some(path) => {
                    let len = u8::try_from(path.len())
                        .ok()
                        .filter(|&len| len > 0)
                        .ok_or_else(|| {
                            invalid(format!("{} path must be 1-255 bytes, got {}", slot.uniform_name(), path.len()))
                        })?;
                    out.push(len);
                    out.extend_from_slice(path.as_bytes());
                }
            }
        }

        out.extend_from_slice(&(self.vertices.len() as u64).to_le_bytes());
        for vertex in &self.vertices {
            let fields = vertex.position.iter().chain(&vertex.normal).chain(&vertex.tangent).chain(&vertex.uv);
            for value in fields {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }

        out.extend_from_slice(&(self.indices.len() as u64).to_le_bytes());
        for index in &self.indices {
            out.extend_from_slice(&index.to_le_bytes());
        }
        Ok(out)
    }

    /// Encode and write to disk
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let bytes = self.encode()?;
        std::fs::write(path.as_ref(), &bytes)?;
        log::info!("Wrote model file {:?} ({} bytes)", path.as_ref(), bytes.len());
        Ok(())
    }

    /// Path stored for `slot`, if the format has a descriptor for it
    pub fn map_path(&self, slot: MapSlot) -> Option<&str> {
        MapSlot::FILE_ORDER
            .iter()
            .position(|&candidate| candidate == slot)
            .and_then(|index| self.maps[index].as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModelFile {
        let vertex = |x: f32| Vertex {
            position: [x, 1.0, -2.5],
            normal: [0.0, 0.0, 1.0],
            tangent: [1.0, 0.0, 0.0],
            uv: [0.25, x],
        };
        ModelFile {
            shading_model: ShadingModel::CookTorrance,
            maps: [
                Some("textures/albedo.png".into()),
                None,
                Some("textures/roughness.png".into()),
                Some("normal.png".into()),
                None,
            ],
            vertices: vec![vertex(0.0), vertex(1.0), vertex(2.0)],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let model = sample();
        let bytes = model.encode().unwrap();
        assert_eq!(ModelFile::parse(&bytes).unwrap(), model);
    }

    #[test]
    fn test_encoded_layout() {
        let bytes = sample().encode().unwrap();
        let paths = "textures/albedo.png".len() + "textures/roughness.png".len() + "normal.png".len();
        assert_eq!(bytes.len(), 1 + 5 + paths + 8 + 3 * 44 + 8 + 3 * 4);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1] as usize, "textures/albedo.png".len());
        assert_eq!(&bytes[2..21], b"textures/albedo.png");
        assert_eq!(bytes[21], 0);
    }

    #[test]
    fn test_truncated_index_block_is_invalid() {
        let mut bytes = sample().encode().unwrap();
        bytes.pop();
        assert!(matches!(ModelFile::parse(&bytes), Err(RenderError::InvalidFileFormat(_))));
    }

    #[test]
    fn test_trailing_bytes_are_invalid() {
        let mut bytes = sample().encode().unwrap();
        bytes.push(0);
        assert!(matches!(ModelFile::parse(&bytes), Err(RenderError::InvalidFileFormat(_))));
    }

    #[test]
    fn test_unknown_shading_model() {
        let mut bytes = sample().encode().unwrap();
        bytes[0] = 7;
        assert!(matches!(ModelFile::parse(&bytes), Err(RenderError::InvalidShaderType(7))));
    }

    #[test]
    fn test_huge_vertex_count_is_invalid() {
        let mut bytes = vec![0u8; 6];
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(ModelFile::parse(&bytes), Err(RenderError::InvalidFileFormat(_))));
    }

    #[test]
    fn test_empty_file_is_invalid() {
        assert!(matches!(ModelFile::parse(&[]), Err(RenderError::InvalidFileFormat(_))));
    }

    #[test]
    fn test_overlong_path_cannot_be_encoded() {
        let mut model = sample();
        model.maps[1] = Some("x".repeat(256));
        assert!(matches!(model.encode(), Err(RenderError::InvalidFileFormat(_))));
    }

    #[test]
    fn test_map_path_lookup() {
        let model = sample();
        assert_eq!(model.map_path(MapSlot::Normal), Some("normal.png"));
        assert_eq!(model.map_path(MapSlot::Specular), None);
        assert_eq!(model.map_path(MapSlot::Ior), None);
    }
}
