use crate::graph::SceneGraph;
use crate::lighting::{Light, default_light_rig};

/// Everything one model layer draws: its lights and the inserted models.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneRoot {
    lights: Vec<Light>,
    models: Vec<SceneGraph>,
}

impl SceneRoot {
    /// An empty root with no lights.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty root lit by [`default_light_rig`].
    pub fn lit() -> Self {
        Self {
            lights: default_light_rig(),
            models: Vec::new(),
        }
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn add_model(&mut self, model: SceneGraph) {
        self.models.push(model);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn models(&self) -> &[SceneGraph] {
        &self.models
    }

    pub fn has_geometry(&self) -> bool {
        self.models.iter().any(|m| m.mesh_count() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::SceneRoot;
    use crate::components::Bounds3;
    use crate::graph::{Mesh, Node, SceneGraph};
    use foundation::math::Vec3;

    #[test]
    fn lit_root_starts_without_geometry() {
        let root = SceneRoot::lit();
        assert_eq!(root.lights().len(), 3);
        assert!(root.models().is_empty());
        assert!(!root.has_geometry());
    }

    #[test]
    fn inserted_model_counts_as_geometry() {
        let mut graph = SceneGraph::new();
        graph.add_root_node(Node::named("m").with_mesh(Mesh {
            name: None,
            bounds: Bounds3::new(Vec3::ZERO, Vec3::ONE),
            primitive_count: 1,
        }));
        let mut root = SceneRoot::new();
        root.add_model(graph);
        assert!(root.has_geometry());
        assert!(root.lights().is_empty());
    }
}
