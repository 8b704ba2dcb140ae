use std::fmt;

use foundation::math::{Mat4, Vec3};
use gltf::Gltf;
use gltf::json::Value;
use gltf::scene::Transform as NodeTransform;
use scene::components::{Bounds3, LocalTransform, Transform};
use scene::{Mesh, Node, NodeId, SceneGraph};

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
const GLB_MAGIC: [u8; 4] = *b"glTF";

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// A container this decoder does not open (for example a zipped glTF).
    UnsupportedContainer(&'static str),
    UnrecognizedFormat,
    UnsupportedVersion(String),
    /// Malformed GLB header or chunk layout.
    Container(String),
    Json(String),
    InvalidDocument(String),
}

impl DecodeError {
    /// Errors caused by a format choice rather than a broken file.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(
            self,
            DecodeError::UnsupportedContainer(_) | DecodeError::UnsupportedVersion(_)
        )
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnsupportedContainer(kind) => {
                write!(f, "unsupported model container: {kind}")
            }
            DecodeError::UnrecognizedFormat => write!(f, "not a GLB or glTF file"),
            DecodeError::UnsupportedVersion(v) => write!(f, "unsupported glTF version {v}"),
            DecodeError::Container(e) => write!(f, "invalid GLB container: {e}"),
            DecodeError::Json(e) => write!(f, "glTF JSON parse error: {e}"),
            DecodeError::InvalidDocument(reason) => write!(f, "invalid glTF document: {reason}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<gltf::Error> for DecodeError {
    fn from(err: gltf::Error) -> Self {
        match err {
            gltf::Error::Binary(e) => DecodeError::Container(e.to_string()),
            gltf::Error::Deserialize(e) => DecodeError::Json(e.to_string()),
            gltf::Error::Validation(errors) => {
                let reasons: Vec<String> = errors
                    .iter()
                    .map(|(path, e)| format!("{path}: {e}"))
                    .collect();
                DecodeError::InvalidDocument(reasons.join("; "))
            }
            other => DecodeError::InvalidDocument(other.to_string()),
        }
    }
}

/// Decode a GLB container or a glTF JSON document into a scene graph.
///
/// Mesh bounds come from the min/max of each primitive's POSITION accessor.
/// Buffers and textures are left to the rasterizer.
pub fn decode_model(bytes: &[u8]) -> Result<SceneGraph, DecodeError> {
    if bytes.starts_with(&ZIP_MAGIC) {
        return Err(DecodeError::UnsupportedContainer("zip"));
    }
    if !bytes.starts_with(&GLB_MAGIC) && first_non_whitespace(bytes) != Some(b'{') {
        return Err(DecodeError::UnrecognizedFormat);
    }

    let gltf = Gltf::from_slice(bytes)?;
    build_scene_graph(&gltf)
}

pub fn build_scene_graph(gltf: &Gltf) -> Result<SceneGraph, DecodeError> {
    let version = &gltf.as_json().asset.version;
    if !version.starts_with("2.") {
        return Err(DecodeError::UnsupportedVersion(version.clone()));
    }

    // Indices are already validated; shape of the hierarchy is not.
    let node_count = gltf.nodes().len();
    let mut has_parent = vec![false; node_count];
    for node in gltf.nodes() {
        for child in node.children() {
            let (index, child) = (node.index(), child.index());
            if child == index {
                return Err(invalid(format!("node {index} is its own child")));
            }
            if std::mem::replace(&mut has_parent[child], true) {
                return Err(invalid(format!("node {child} has more than one parent")));
            }
        }
    }

    let mut graph = SceneGraph::new();
    for node in gltf.nodes() {
        let mesh = node.mesh().map(|mesh| mesh_bounds(&mesh)).transpose()?;
        graph.add_node(Node {
            name: node.name().map(str::to_string),
            transform: local_transform(node.transform()),
            mesh,
            children: node.children().map(|c| NodeId(c.index())).collect(),
        });
    }

    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    let roots: Vec<NodeId> = match scene {
        Some(scene) => scene.nodes().map(|n| NodeId(n.index())).collect(),
        None => (0..node_count)
            .filter(|&i| !has_parent[i])
            .map(NodeId)
            .collect(),
    };
    graph.set_roots(roots);
    Ok(graph)
}

fn local_transform(transform: NodeTransform) -> LocalTransform {
    match transform {
        NodeTransform::Matrix { matrix } => {
            LocalTransform::Matrix(Mat4::from_cols(matrix.map(|col| col.map(f64::from))))
        }
        NodeTransform::Decomposed {
            translation,
            rotation,
            scale,
        } => LocalTransform::Trs(Transform {
            translation: vec3_f32(translation),
            rotation: rotation.map(f64::from),
            scale: vec3_f32(scale),
        }),
    }
}

fn mesh_bounds(mesh: &gltf::Mesh<'_>) -> Result<Mesh, DecodeError> {
    let mut bounds = Bounds3::EMPTY;
    let mut primitive_count = 0;
    for primitive in mesh.primitives() {
        primitive_count += 1;
        let Some(accessor) = primitive.get(&gltf::Semantic::Positions) else {
            continue;
        };
        let index = accessor.index();
        let (Some(min), Some(max)) = (accessor.min(), accessor.max()) else {
            return Err(invalid(format!("POSITION accessor {index} has no min/max")));
        };
        let (Some(min), Some(max)) = (vec3_json(&min), vec3_json(&max)) else {
            return Err(invalid(format!(
                "POSITION accessor {index} min/max must have 3 components"
            )));
        };
        bounds = bounds.union(&Bounds3::new(min, max));
    }

    Ok(Mesh {
        name: mesh.name().map(str::to_string),
        bounds,
        primitive_count,
    })
}

fn vec3_f32([x, y, z]: [f32; 3]) -> Vec3 {
    Vec3::new(f64::from(x), f64::from(y), f64::from(z))
}

fn vec3_json(value: &Value) -> Option<Vec3> {
    match value.as_array()?.as_slice() {
        [x, y, z] => Some(Vec3::new(x.as_f64()?, y.as_f64()?, z.as_f64()?)),
        _ => None,
    }
}

fn first_non_whitespace(bytes: &[u8]) -> Option<u8> {
    bytes.iter().copied().find(|b| !b.is_ascii_whitespace())
}

fn invalid(reason: String) -> DecodeError {
    DecodeError::InvalidDocument(reason)
}

#[cfg(test)]
mod tests {
    use super::{DecodeError, decode_model};
    use foundation::math::{Mat4, Vec3};
    use pretty_assertions::assert_eq;
    use scene::NodeId;
    use scene::components::LocalTransform;

    const CAR: &str = r#"{
        "asset": { "version": "2.0", "generator": "test" },
        "buffers": [ { "byteLength": 288, "uri": "model.bin" } ],
        "bufferViews": [ { "buffer": 0, "byteLength": 288 } ],
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [
            { "name": "car", "children": [1, 2] },
            { "name": "body", "mesh": 0 },
            { "name": "wheel", "mesh": 1, "translation": [200.0, 0.0, 0.0] }
        ],
        "meshes": [
            { "name": "body", "primitives": [ { "attributes": { "POSITION": 0 } } ] },
            { "primitives": [ { "attributes": { "POSITION": 1, "NORMAL": 2 } } ] }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 24, "type": "VEC3",
              "min": [0, 0, 0], "max": [50, 40, 120] },
            { "bufferView": 0, "componentType": 5126, "count": 24, "type": "VEC3",
              "min": [0, 0, 0], "max": [50, 10, 10] },
            { "bufferView": 0, "componentType": 5126, "count": 24, "type": "VEC3" }
        ]
    }"#;

    /// Wrap a JSON document in a GLB container with a single JSON chunk.
    fn glb(json: &str) -> Vec<u8> {
        let mut chunk = json.as_bytes().to_vec();
        while chunk.len() % 4 != 0 {
            chunk.push(b' ');
        }
        let total = 12 + 8 + chunk.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&chunk);
        out
    }

    #[test]
    fn decodes_gltf_json_hierarchy() {
        let graph = decode_model(CAR.as_bytes()).expect("decode");
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.roots(), &[NodeId(0)]);
        let root = graph.node(NodeId(0)).expect("root");
        assert_eq!(root.name.as_deref(), Some("car"));
        assert_eq!(root.children, vec![NodeId(1), NodeId(2)]);
        assert_eq!(graph.mesh_count(), 2);

        let bounds = graph.world_bounds();
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::new(250.0, 40.0, 120.0));
    }

    #[test]
    fn glb_and_json_decode_identically() {
        let from_json = decode_model(CAR.as_bytes()).expect("json");
        let from_glb = decode_model(&glb(CAR)).expect("glb");
        assert_eq!(from_json, from_glb);
    }

    #[test]
    fn malformed_glb_header_is_a_container_error() {
        let mut bytes = glb(CAR);
        bytes.truncate(16);
        assert!(matches!(
            decode_model(&bytes).expect_err("truncated"),
            DecodeError::Container(_)
        ));
    }

    #[test]
    fn zip_archives_are_unsupported() {
        let err = decode_model(b"PK\x03\x04rest-of-archive").expect_err("zip");
        assert_eq!(err, DecodeError::UnsupportedContainer("zip"));
        assert!(err.is_unsupported_format());
    }

    #[test]
    fn garbage_is_not_a_model() {
        let err = decode_model(b"\x00\x01binary").expect_err("garbage");
        assert_eq!(err, DecodeError::UnrecognizedFormat);
        assert!(!err.is_unsupported_format());
        assert!(matches!(
            decode_model(b"{ not json").expect_err("json"),
            DecodeError::Json(_)
        ));
    }

    #[test]
    fn rejects_gltf_1() {
        let err = decode_model(br#"{ "asset": { "version": "1.0" } }"#).expect_err("v1");
        assert_eq!(err, DecodeError::UnsupportedVersion("1.0".to_string()));
    }

    #[test]
    fn rejects_broken_references() {
        let shared_child = r#"{
            "asset": { "version": "2.0" },
            "nodes": [ { "children": [2] }, { "children": [2] }, {} ]
        }"#;
        assert!(matches!(
            decode_model(shared_child.as_bytes()).expect_err("two parents"),
            DecodeError::InvalidDocument(_)
        ));

        let own_child = r#"{ "asset": { "version": "2.0" }, "nodes": [ { "children": [0] } ] }"#;
        assert!(matches!(
            decode_model(own_child.as_bytes()).expect_err("self"),
            DecodeError::InvalidDocument(_)
        ));

        let bad_mesh = r#"{ "asset": { "version": "2.0" }, "nodes": [ { "mesh": 4 } ] }"#;
        assert!(matches!(
            decode_model(bad_mesh.as_bytes()).expect_err("mesh"),
            DecodeError::InvalidDocument(_)
        ));
    }

    #[test]
    fn parentless_nodes_become_roots_without_scenes() {
        let doc = r#"{
            "asset": { "version": "2.0" },
            "nodes": [
                { "children": [1] },
                {},
                { "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 5,0,0,1] }
            ]
        }"#;
        let graph = decode_model(doc.as_bytes()).expect("decode");
        assert_eq!(graph.roots(), &[NodeId(0), NodeId(2)]);

        let node = graph.node(NodeId(2)).expect("matrix node");
        let expected = Mat4::from_col_major_slice(&[
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 5.0, 0.0, 0.0, 1.0,
        ])
        .expect("16 values");
        assert_eq!(node.transform, LocalTransform::Matrix(expected));
    }
}
