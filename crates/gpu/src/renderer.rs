use foundation::math::Mat4;
use scene::SceneRoot;

/// The 3D rasterizer as seen from a model layer.
///
/// Implementations share a GL context with the map engine, so
/// `reset_state` must run before every draw.
pub trait SceneRenderer {
    fn reset_state(&mut self);
    fn render(&mut self, scene: &SceneRoot, camera: &Mat4);
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    ResetState,
    DrawScene {
        camera: Mat4,
        models: usize,
        meshes: usize,
        lights: usize,
    },
}

#[derive(Debug, Default)]
pub struct RenderFrame {
    pub commands: Vec<RenderCommand>,
}

/// Renderer that records what it was asked to do. Used by the headless
/// simulator and by tests.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    frame: RenderFrame,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.frame.commands
    }

    pub fn draw_count(&self) -> usize {
        self.frame
            .commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawScene { .. }))
            .count()
    }

    /// Camera of the most recent draw.
    pub fn last_camera(&self) -> Option<Mat4> {
        self.frame.commands.iter().rev().find_map(|c| match c {
            RenderCommand::DrawScene { camera, .. } => Some(*camera),
            RenderCommand::ResetState => None,
        })
    }

    pub fn take_frame(&mut self) -> RenderFrame {
        std::mem::take(&mut self.frame)
    }
}

impl SceneRenderer for RecordingRenderer {
    fn reset_state(&mut self) {
        self.frame.commands.push(RenderCommand::ResetState);
    }

    fn render(&mut self, scene: &SceneRoot, camera: &Mat4) {
        self.frame.commands.push(RenderCommand::DrawScene {
            camera: *camera,
            models: scene.models().len(),
            meshes: scene.models().iter().map(|m| m.mesh_count()).sum(),
            lights: scene.lights().len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordingRenderer, RenderCommand, SceneRenderer};
    use foundation::math::{Mat4, Vec3};
    use scene::SceneRoot;

    #[test]
    fn records_reset_then_draw() {
        let mut renderer = RecordingRenderer::new();
        let camera = Mat4::translation(Vec3::new(1.0, 2.0, 3.0));
        renderer.reset_state();
        renderer.render(&SceneRoot::lit(), &camera);

        assert!(matches!(
            renderer.commands(),
            [
                RenderCommand::ResetState,
                RenderCommand::DrawScene {
                    models: 0,
                    lights: 3,
                    ..
                }
            ]
        ));
        assert_eq!(renderer.draw_count(), 1);
        assert_eq!(renderer.last_camera(), Some(camera));
    }

    #[test]
    fn take_frame_empties_recording() {
        let mut renderer = RecordingRenderer::new();
        renderer.reset_state();
        let frame = renderer.take_frame();
        assert_eq!(frame.commands.len(), 1);
        assert!(renderer.commands().is_empty());
        assert_eq!(renderer.last_camera(), None);
    }
}
