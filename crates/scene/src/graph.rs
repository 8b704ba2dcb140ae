use foundation::math::Mat4;

use crate::components::{Bounds3, LocalTransform, Transform};

/// Models larger than this (local units) are shrunk on load.
pub const MAX_MODEL_DIMENSION: f64 = 100.0;
/// Largest dimension of a model after shrinking.
pub const NORMALIZED_MODEL_DIMENSION: f64 = 50.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    /// Object-space bounds of all primitives.
    pub bounds: Bounds3,
    pub primitive_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: Option<String>,
    pub transform: LocalTransform,
    pub mesh: Option<Mesh>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_transform(mut self, transform: LocalTransform) -> Self {
        self.transform = transform;
        self
    }
}

/// A loaded model's node hierarchy under a single root group.
///
/// The graph owns all of its nodes, so `Clone` is a deep copy: a clone can be
/// mounted into a second layer without sharing any transform with the
/// original.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneGraph {
    root: Transform,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Add a node directly under the root group.
    pub fn add_root_node(&mut self, node: Node) -> NodeId {
        let id = self.add_node(node);
        self.roots.push(id);
        id
    }

    /// Add a node under `parent`. Returns `None` if `parent` is unknown.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Option<NodeId> {
        if parent.0 >= self.nodes.len() {
            return None;
        }
        let id = self.add_node(node);
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    pub fn set_roots(&mut self, roots: Vec<NodeId>) {
        self.roots = roots;
    }

    pub fn root_transform(&self) -> &Transform {
        &self.root
    }

    pub fn root_transform_mut(&mut self) -> &mut Transform {
        &mut self.root
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.mesh.is_some()).count()
    }

    /// Independent copy for mounting into a fresh layer.
    pub fn clone_for_remount(&self) -> Self {
        self.clone()
    }

    /// Bounds of every reachable mesh in root-group space (root transform
    /// included). Nodes reachable twice are visited once.
    pub fn world_bounds(&self) -> Bounds3 {
        let mut visited = vec![false; self.nodes.len()];
        let mut bounds = Bounds3::EMPTY;
        let mut stack: Vec<(NodeId, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|id| (*id, self.root.matrix()))
            .collect();

        while let Some((id, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            if std::mem::replace(&mut visited[id.0], true) {
                continue;
            }
            let world = parent.mul(&node.transform.matrix());
            if let Some(mesh) = &node.mesh {
                bounds = bounds.union(&mesh.bounds.transformed(&world));
            }
            for child in node.children.iter().rev() {
                stack.push((*child, world));
            }
        }
        bounds
    }

    /// Shrink oversized models so their largest dimension becomes
    /// [`NORMALIZED_MODEL_DIMENSION`]. Returns the factor applied, if any.
    pub fn normalize_scale(&mut self) -> Option<f64> {
        let max_dimension = self.world_bounds().max_dimension();
        if max_dimension > MAX_MODEL_DIMENSION {
            let factor = NORMALIZED_MODEL_DIMENSION / max_dimension;
            self.root.multiply_scale(factor);
            Some(factor)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Mesh, Node, NodeId, SceneGraph};
    use crate::components::{Bounds3, LocalTransform, Transform};
    use foundation::math::Vec3;

    fn cube_mesh(size: f64) -> Mesh {
        Mesh {
            name: None,
            bounds: Bounds3::new(Vec3::ZERO, Vec3::splat(size)),
            primitive_count: 1,
        }
    }

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn oversized_model_is_scaled_to_fifty_units() {
        let mut graph = SceneGraph::new();
        graph.add_root_node(Node::named("car").with_mesh(Mesh {
            name: None,
            bounds: Bounds3::new(Vec3::ZERO, Vec3::new(250.0, 40.0, 120.0)),
            primitive_count: 3,
        }));

        let factor = graph.normalize_scale().expect("scaled");
        assert_eq!(factor, 0.2);
        assert_eq!(graph.root_transform().scale, Vec3::splat(0.2));
        assert_close(graph.world_bounds().max_dimension(), 50.0, 1e-9);
    }

    #[test]
    fn small_model_is_left_alone() {
        let mut graph = SceneGraph::new();
        graph.add_root_node(Node::named("cube").with_mesh(cube_mesh(100.0)));
        assert_eq!(graph.normalize_scale(), None);
        assert_eq!(graph.root_transform(), &Transform::identity());
    }

    #[test]
    fn bounds_follow_child_transforms() {
        let mut graph = SceneGraph::new();
        let parent = graph.add_root_node(
            Node::named("parent").with_transform(LocalTransform::Trs(Transform::translate(
                Vec3::new(100.0, 0.0, 0.0),
            ))),
        );
        graph
            .add_child(parent, Node::named("wheel").with_mesh(cube_mesh(1.0)))
            .expect("child");
        graph.add_root_node(Node::named("body").with_mesh(cube_mesh(1.0)));

        let bounds = graph.world_bounds();
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::new(101.0, 1.0, 1.0));
        assert_eq!(graph.mesh_count(), 2);
        assert!(graph.add_child(NodeId(99), Node::default()).is_none());
    }

    #[test]
    fn remount_clone_is_independent() {
        let mut original = SceneGraph::new();
        original.add_root_node(Node::named("car").with_mesh(cube_mesh(300.0)));
        let mut copy = original.clone_for_remount();
        copy.normalize_scale();
        assert_eq!(original.root_transform().scale, Vec3::ONE);
        assert_ne!(copy, original);
    }

    #[test]
    fn shared_child_is_counted_once() {
        let mut graph = SceneGraph::new();
        let a = graph.add_root_node(Node::named("a"));
        let b = graph.add_child(a, Node::named("b").with_mesh(cube_mesh(2.0))).expect("b");
        graph.set_roots(vec![a, b]);
        assert_eq!(graph.world_bounds().max_dimension(), 2.0);
    }
}
