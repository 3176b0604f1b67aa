//! Encodings of a reconciled mesh for the buffer-upload side
//!
//! - JSON with base64-encoded little-endian Float32Array/Uint32Array payloads
//! - MessagePack of the mesh structure
//! - A flat binary layout whose float/index sections are 4-byte aligned so the
//!   receiver can view them in place

use std::io::{self, Read, Write};

use base64::{engine::general_purpose, Engine as _};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Serialize, Serializer};

use super::types::{AttributeBuffer, Bounds, ReconciledMesh, SubMesh};
use super::types::{NORMAL_STRIDE, POSITION_STRIDE, TEXCOORD_STRIDE};

const BINARY_MAGIC: &[u8; 8] = b"DAEMESH1";
const NO_MATERIAL: u32 = u32::MAX;

/// Serialize f32 data as base64 of its little-endian bytes
pub fn serialize_f32_vec_base64<S>(data: &Vec<f32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut bytes = vec![0u8; data.len() * 4];
    LittleEndian::write_f32_into(data, &mut bytes);
    serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
}

/// Serialize u32 data as base64 of its little-endian bytes
pub fn serialize_u32_vec_base64<S>(data: &Vec<u32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut bytes = vec![0u8; data.len() * 4];
    LittleEndian::write_u32_into(data, &mut bytes);
    serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
}

/// JSON form of one model, matching what the WebGL/WebGPU side decodes
#[derive(Serialize, Clone)]
pub struct MeshJSON {
    #[serde(rename = "modelName")]
    pub model_name: String,

    #[serde(rename = "vertexCount")]
    pub vertex_count: usize,

    /// Base64-encoded Float32 positions (x, y, z, ...)
    #[serde(rename = "vertexData", serialize_with = "serialize_f32_vec_base64")]
    pub vertex_data: Vec<f32>,

    /// Base64-encoded Float32 normals (x, y, z, ...)
    #[serde(rename = "normalData", serialize_with = "serialize_f32_vec_base64")]
    pub normal_data: Vec<f32>,

    /// Base64-encoded Float32 texture coordinates (u, v, ...)
    #[serde(rename = "texCoordData", serialize_with = "serialize_f32_vec_base64")]
    pub texcoord_data: Vec<f32>,

    /// Base64-encoded Uint32 triangle indices
    #[serde(rename = "indexData", serialize_with = "serialize_u32_vec_base64")]
    pub index_data: Vec<u32>,

    #[serde(rename = "indexCount")]
    pub index_count: usize,

    pub submeshes: Vec<SubMesh>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

impl MeshJSON {
    pub fn from_mesh(model_name: &str, mesh: &ReconciledMesh) -> Self {
        MeshJSON {
            model_name: model_name.to_string(),
            vertex_count: mesh.vertex_count(),
            vertex_data: mesh.vertices.data.clone(),
            normal_data: mesh.normals.data.clone(),
            texcoord_data: mesh.texcoords.data.clone(),
            index_data: mesh.indices.clone(),
            index_count: mesh.indices.len(),
            submeshes: mesh.submeshes.clone(),
            bounds: mesh.bounds(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// MessagePack encoding of a mesh (field names kept, so the receiver can decode by name)
pub fn to_msgpack(mesh: &ReconciledMesh) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(mesh)
}

pub fn from_msgpack(bytes: &[u8]) -> Result<ReconciledMesh, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}

/// Binary model data for direct buffer upload
pub struct MeshBinary<'a> {
    pub model_name: &'a str,
    pub mesh: &'a ReconciledMesh,
}

impl<'a> MeshBinary<'a> {
    pub fn new(model_name: &'a str, mesh: &'a ReconciledMesh) -> Self {
        MeshBinary { model_name, mesh }
    }

    /// Write the binary format
    /// Format: [magic "DAEMESH1"][name_len: u32][name + padding]
    ///         [vertex_count: u32][index_count: u32][submesh_count: u32]
    ///         [positions: f32 x3][normals: f32 x3][texcoords: f32 x2][indices: u32]
    ///         per submesh: [first_index: u32][index_count: u32][material_len: u32][material + padding]
    /// material_len of 0xFFFFFFFF marks a submesh without material.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(BINARY_MAGIC)?;
        write_padded_str(writer, self.model_name)?;

        let mesh = self.mesh;
        writer.write_u32::<LittleEndian>(mesh.vertex_count() as u32)?;
        writer.write_u32::<LittleEndian>(mesh.indices.len() as u32)?;
        writer.write_u32::<LittleEndian>(mesh.submeshes.len() as u32)?;

        for buffer in [&mesh.vertices, &mesh.normals, &mesh.texcoords] {
            for &value in &buffer.data {
                writer.write_f32::<LittleEndian>(value)?;
            }
        }
        for &index in &mesh.indices {
            writer.write_u32::<LittleEndian>(index)?;
        }

        for submesh in &mesh.submeshes {
            writer.write_u32::<LittleEndian>(submesh.first_index as u32)?;
            writer.write_u32::<LittleEndian>(submesh.index_count as u32)?;
            match &submesh.material {
                Some(material) => write_padded_str(writer, material)?,
                None => writer.write_u32::<LittleEndian>(NO_MATERIAL)?,
            }
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        buffer
    }

    /// Decode the binary format back into a model name and mesh
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<(String, ReconciledMesh)> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != BINARY_MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad mesh magic"));
        }

        let len = reader.read_u32::<LittleEndian>()?;
        let model_name = read_padded_str(reader, len)?;

        let vertex_count = reader.read_u32::<LittleEndian>()? as usize;
        let index_count = reader.read_u32::<LittleEndian>()? as usize;
        let submesh_count = reader.read_u32::<LittleEndian>()? as usize;

        let vertices = read_buffer(reader, POSITION_STRIDE, vertex_count)?;
        let normals = read_buffer(reader, NORMAL_STRIDE, vertex_count)?;
        let texcoords = read_buffer(reader, TEXCOORD_STRIDE, vertex_count)?;
        let raw = read_bytes(reader, section_len(index_count, 1)?)?;
        let mut indices = vec![0u32; index_count];
        LittleEndian::read_u32_into(&raw, &mut indices);

        // counts come from the input, so nothing is preallocated from them
        let mut submeshes = Vec::new();
        for _ in 0..submesh_count {
            let first_index = reader.read_u32::<LittleEndian>()? as usize;
            let index_count = reader.read_u32::<LittleEndian>()? as usize;
            let material_len = reader.read_u32::<LittleEndian>()?;
            let material = if material_len == NO_MATERIAL {
                None
            } else {
                Some(read_padded_str(reader, material_len)?)
            };
            submeshes.push(SubMesh { material, first_index, index_count });
        }

        let mesh = ReconciledMesh { vertices, normals, texcoords, indices, submeshes };
        Ok((model_name, mesh))
    }
}

fn write_padded_str<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let bytes = value.as_bytes();
    writer.write_u32::<LittleEndian>(bytes.len() as u32)?;
    writer.write_all(bytes)?;
    // keep the following sections 4-byte aligned for Float32Array/Uint32Array views
    let padding = (4 - (bytes.len() % 4)) % 4;
    writer.write_all(&[0u8; 3][..padding])
}

fn read_padded_str<R: Read>(reader: &mut R, len: u32) -> io::Result<String> {
    let len = len as usize;
    let padded = len + (4 - (len % 4)) % 4;
    let mut bytes = read_bytes(reader, padded)?;
    bytes.truncate(len);
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn read_buffer<R: Read>(reader: &mut R, stride: usize, count: usize) -> io::Result<AttributeBuffer> {
    let raw = read_bytes(reader, section_len(count, stride)?)?;
    let mut data = vec![0f32; raw.len() / 4];
    LittleEndian::read_f32_into(&raw, &mut data);
    Ok(AttributeBuffer { stride, data })
}

/// Byte length of `count` elements of `stride` 4-byte values
fn section_len(count: usize, stride: usize) -> io::Result<usize> {
    count
        .checked_mul(stride)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "mesh section size overflows"))
}

/// Read exactly `len` bytes, growing the buffer only as data arrives
fn read_bytes<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("mesh data truncated: expected {} bytes, found {}", len, bytes.len()),
        ));
    }
    Ok(bytes)
}
