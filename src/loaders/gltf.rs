use glam::{Mat3, Mat4, Vec3};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::fetch::{fetch, Source};
use crate::error::LoadError;
use crate::scene::{ColorSpace, Entity, Material, MeshData, Model, ModelPart, TextureImage, Vertex};

static NEXT_STAGE: AtomicU64 = AtomicU64::new(0);

/// Fetch and decode a glTF/GLB file into an entity named after the file
pub fn load_model(url: &str, progress: &mut dyn FnMut(f32)) -> Result<Entity, LoadError> {
    let source = Source::parse(url)?;
    let bytes = fetch(&source, progress)?;
    let model = decode_model(&bytes, &source, url)?;
    log::info!(
        "{}: {} parts, {} triangles",
        url,
        model.parts.len(),
        model.triangle_count()
    );
    Ok(Entity::new(source.stem(), model))
}

/// Decode glTF/GLB bytes. External buffers and images are resolved relative
/// to `source`.
pub fn decode_model(bytes: &[u8], source: &Source, url: &str) -> Result<Model, LoadError> {
    let decode_err = |reason: String| LoadError::Decode {
        url: url.to_string(),
        reason,
    };

    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes).map_err(|e| decode_err(e.to_string()))?;

    let staged = match source {
        Source::Remote(_) => stage_remote(&document, source, url)?,
        Source::File(_) => None,
    };
    let base: Option<&Path> = match &staged {
        Some(staged) => Some(staged.dir.as_path()),
        None => source.base_dir(),
    };

    let buffers = gltf::import_buffers(&document, base, blob).map_err(|e| decode_err(e.to_string()))?;
    let images = gltf::import_images(&document, base, &buffers).map_err(|e| decode_err(e.to_string()))?;
    drop(staged);

    log::debug!(
        "{}: {} nodes, {} meshes, {} materials, {} images",
        url,
        document.nodes().count(),
        document.meshes().count(),
        document.materials().count(),
        images.len()
    );

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| decode_err("no scene".to_string()))?;

    let mut textures = TextureCache::new(&images);
    let mut parts = Vec::new();
    for node in scene.nodes() {
        process_node(&node, &buffers, &Mat4::IDENTITY, &mut textures, &mut parts)?;
    }

    if parts.is_empty() {
        log::warn!("{}: no geometry found", url);
    }
    Ok(Model { parts })
}

fn process_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    parent_transform: &Mat4,
    textures: &mut TextureCache,
    parts: &mut Vec<ModelPart>,
) -> Result<(), LoadError> {
    let local_transform = Mat4::from_cols_array_2d(&node.transform().matrix());
    let global_transform = *parent_transform * local_transform;

    if let Some(mesh) = node.mesh() {
        process_mesh(&mesh, buffers, &global_transform, textures, parts);
    }

    for child in node.children() {
        process_node(&child, buffers, &global_transform, textures, parts)?;
    }

    Ok(())
}

fn process_mesh(
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
    transform: &Mat4,
    textures: &mut TextureCache,
    parts: &mut Vec<ModelPart>,
) {
    let normal_matrix = Mat3::from_mat4(*transform).inverse().transpose();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "mesh {:?}: skipping {:?} primitive",
                mesh.name(),
                primitive.mode()
            );
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

        let Some(positions) = reader.read_positions() else {
            log::warn!("mesh {:?}: primitive has no positions", mesh.name());
            continue;
        };
        let positions: Vec<Vec3> = positions
            .map(|p| transform.transform_point3(Vec3::from_array(p)))
            .collect();
        if positions.is_empty() {
            continue;
        }

        let normals: Option<Vec<Vec3>> = reader.read_normals().map(|normals| {
            normals
                .map(|n| (normal_matrix * Vec3::from_array(n)).normalize_or_zero())
                .collect()
        });
        let uvs: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
            Some(uvs) => uvs.into_f32().collect(),
            None => vec![[0.0, 0.0]; positions.len()],
        };

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let indices: Vec<u32> = indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| (i as usize) < positions.len()))
            .flatten()
            .copied()
            .collect();

        let mut vertices: Vec<Vertex> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| Vertex {
                position: p.to_array(),
                normal: normals
                    .as_ref()
                    .and_then(|n| n.get(i))
                    .map(|n| n.to_array())
                    .unwrap_or([0.0; 3]),
                uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect();
        if normals.is_none() {
            compute_normals(&mut vertices, &indices);
        }

        let material = convert_material(&primitive.material(), textures);
        parts.push(ModelPart {
            mesh: Arc::new(MeshData::new(vertices, indices)),
            material,
        });
    }
}

/// Area-weighted smooth normals for meshes that don't carry their own
pub fn compute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accumulated = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let pa = Vec3::from_array(vertices[a].position);
        let pb = Vec3::from_array(vertices[b].position);
        let pc = Vec3::from_array(vertices[c].position);
        let face = (pb - pa).cross(pc - pa);
        accumulated[a] += face;
        accumulated[b] += face;
        accumulated[c] += face;
    }
    for (vertex, normal) in vertices.iter_mut().zip(accumulated) {
        vertex.normal = normal.normalize_or_zero().to_array();
    }
}

fn convert_material(material: &gltf::Material, textures: &mut TextureCache) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();

    Material {
        color: Vec3::new(r, g, b),
        opacity: a,
        transparent: material.alpha_mode() == gltf::material::AlphaMode::Blend,
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        emissive: Vec3::from_array(material.emissive_factor()),
        emissive_intensity: 1.0,
        color_map: pbr
            .base_color_texture()
            .and_then(|info| textures.get(info.texture().source().index(), ColorSpace::Srgb)),
        // Roughness lives in the green channel, which is where the shader reads it
        roughness_map: pbr
            .metallic_roughness_texture()
            .and_then(|info| textures.get(info.texture().source().index(), ColorSpace::Linear)),
        normal_map: material
            .normal_texture()
            .and_then(|info| textures.get(info.texture().source().index(), ColorSpace::Linear)),
    }
}

/// Converts glTF images to RGBA8 once per color space
struct TextureCache<'a> {
    images: &'a [gltf::image::Data],
    converted: HashMap<(usize, ColorSpace), Arc<TextureImage>>,
}

impl<'a> TextureCache<'a> {
    fn new(images: &'a [gltf::image::Data]) -> Self {
        Self {
            images,
            converted: HashMap::new(),
        }
    }

    fn get(&mut self, index: usize, color_space: ColorSpace) -> Option<Arc<TextureImage>> {
        if let Some(image) = self.converted.get(&(index, color_space)) {
            return Some(image.clone());
        }
        let data = self.images.get(index)?;
        let image = Arc::new(TextureImage::new(
            data.width,
            data.height,
            to_rgba8(data),
            color_space,
        ));
        self.converted.insert((index, color_space), image.clone());
        Some(image)
    }
}

fn to_rgba8(image: &gltf::image::Data) -> Vec<u8> {
    use gltf::image::Format;

    match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
            .collect(),
        Format::R8G8 => image
            .pixels
            .chunks_exact(2)
            .flat_map(|rg| [rg[0], rg[1], 0, 255])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        other => {
            log::warn!("unsupported texture format {:?}, using white", other);
            vec![255; (image.width * image.height * 4) as usize]
        }
    }
}

/// Downloaded external resources of a remote glTF, removed on drop
struct StagedResources {
    dir: PathBuf,
}

impl Drop for StagedResources {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            log::debug!("could not remove {}: {}", self.dir.display(), e);
        }
    }
}

/// Download the relative buffers and images a remote glTF refers to into a
/// scratch directory laid out like the server's
fn stage_remote(
    document: &gltf::Document,
    source: &Source,
    url: &str,
) -> Result<Option<StagedResources>, LoadError> {
    let buffer_uris = document.buffers().filter_map(|b| match b.source() {
        gltf::buffer::Source::Uri(uri) => Some(uri),
        gltf::buffer::Source::Bin => None,
    });
    let image_uris = document.images().filter_map(|i| match i.source() {
        gltf::image::Source::Uri { uri, .. } => Some(uri),
        gltf::image::Source::View { .. } => None,
    });
    let mut uris: Vec<&str> = buffer_uris
        .chain(image_uris)
        .filter(|uri| !uri.starts_with("data:"))
        .collect();
    uris.sort_unstable();
    uris.dedup();
    if uris.is_empty() {
        return Ok(None);
    }

    let dir = std::env::temp_dir().join(format!(
        "scene-loop-{}-{}",
        std::process::id(),
        NEXT_STAGE.fetch_add(1, Ordering::Relaxed)
    ));
    let staged = StagedResources { dir };
    let io_err = |path: &Path, e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    };

    for uri in uris {
        let relative = PathBuf::from(percent_decode(uri));
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(LoadError::Decode {
                url: url.to_string(),
                reason: format!("refusing to resolve {uri}"),
            });
        }
        let bytes = fetch(&source.join(uri), &mut |_| {})?;
        let path = staged.dir.join(&relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::write(&path, bytes).map_err(|e| io_err(&path, e))?;
        log::debug!("staged {}", uri);
    }

    Ok(Some(staged))
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = [bytes[i + 1], bytes[i + 2]];
            if hex.iter().all(u8::is_ascii_hexdigit) {
                let hi = (hex[0] as char).to_digit(16).unwrap_or(0);
                let lo = (hex[1] as char).to_digit(16).unwrap_or(0);
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_BUFFER: &str = "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA=";

    fn triangle_gltf() -> String {
        format!(
            r#"{{
                "asset": {{ "version": "2.0" }},
                "scene": 0,
                "scenes": [{{ "nodes": [0] }}],
                "nodes": [{{ "mesh": 0, "translation": [0.0, 0.0, -2.0] }}],
                "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }}] }}],
                "materials": [{{
                    "pbrMetallicRoughness": {{
                        "baseColorFactor": [1.0, 0.0, 0.0, 0.5],
                        "metallicFactor": 0.25,
                        "roughnessFactor": 0.75
                    }},
                    "alphaMode": "BLEND"
                }}],
                "buffers": [{{ "byteLength": 44, "uri": "data:application/octet-stream;base64,{TRIANGLE_BUFFER}" }}],
                "bufferViews": [
                    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 }},
                    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }}
                ],
                "accessors": [
                    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
                    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
                ]
            }}"#
        )
    }

    #[test]
    fn decodes_embedded_triangle() {
        let source = Source::File(PathBuf::from("triangle.gltf"));
        let model = decode_model(triangle_gltf().as_bytes(), &source, "triangle.gltf").unwrap();

        assert_eq!(model.parts.len(), 1);
        let part = &model.parts[0];
        assert_eq!(part.mesh.indices, vec![0, 1, 2]);
        // Node translation is baked into positions
        assert_eq!(part.mesh.vertices[1].position, [1.0, 0.0, -2.0]);
        // Missing normals are generated facing +Z
        for vertex in &part.mesh.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }

        let material = &part.material;
        assert_eq!(material.color, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(material.opacity, 0.5);
        assert!(material.transparent);
        assert_eq!(material.metalness, 0.25);
        assert_eq!(material.roughness, 0.75);
        assert!(material.color_map.is_none());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let source = Source::File(PathBuf::from("bad.glb"));
        let err = decode_model(b"not a gltf", &source, "bad.glb").unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn normals_follow_winding() {
        let v = |x: f32, y: f32| Vertex {
            position: [x, y, 0.0],
            normal: [0.0; 3],
            uv: [0.0; 2],
        };
        let mut vertices = vec![v(0.0, 0.0), v(0.0, 1.0), v(1.0, 0.0)];
        compute_normals(&mut vertices, &[0, 1, 2]);
        assert_eq!(vertices[0].normal, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn gray_and_rgb_expand_to_rgba() {
        let gray = gltf::image::Data {
            pixels: vec![10, 20],
            format: gltf::image::Format::R8,
            width: 2,
            height: 1,
        };
        assert_eq!(to_rgba8(&gray), vec![10, 10, 10, 255, 20, 20, 20, 255]);

        let rgb = gltf::image::Data {
            pixels: vec![1, 2, 3],
            format: gltf::image::Format::R8G8B8,
            width: 1,
            height: 1,
        };
        assert_eq!(to_rgba8(&rgb), vec![1, 2, 3, 255]);
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(percent_decode("Damaged%20Helmet.bin"), "Damaged Helmet.bin");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("a%zz"), "a%zz");
    }
}
