use std::fmt;

use foundation::geo::{GeographicAnchor, Placement};
use foundation::math::{Mat4, Vec3};
use gpu::SceneRenderer;
use runtime::animation::PlacementUpdate;
use scene::{SceneGraph, SceneRoot};

use crate::host::{HostError, MapHost};
use crate::layer::{Layer, LayerId};

#[derive(Debug, Clone, PartialEq)]
pub enum LayerError {
    Host(HostError),
}

impl fmt::Display for LayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerError::Host(e) => write!(f, "failed to mount model layer: {e}"),
        }
    }
}

impl std::error::Error for LayerError {}

impl From<HostError> for LayerError {
    fn from(value: HostError) -> Self {
        LayerError::Host(value)
    }
}

/// `T(translate) · S(s, −s, s) · Rx · Ry · Rz`.
///
/// The y scale is negated because the map's y axis points south.
pub fn model_matrix(placement: &Placement) -> Mat4 {
    let s = placement.scale;
    Mat4::translation(placement.translation())
        .mul(&Mat4::scale(Vec3::new(s, -s, s)))
        .mul(&Mat4::rotation_x(placement.rotate_x))
        .mul(&Mat4::rotation_y(placement.rotate_y))
        .mul(&Mat4::rotation_z(placement.rotate_z))
}

/// Camera matrix for one draw: the host's view-projection times the model matrix.
pub fn camera_matrix(view: &Mat4, placement: &Placement) -> Mat4 {
    view.mul(&model_matrix(placement))
}

/// One model drawn by the map engine as a custom layer.
///
/// Owns its scene root and its live placement. The engine's draw callback
/// drives [`ModelLayer::render`]; nothing else moves the model.
#[derive(Debug)]
pub struct ModelLayer {
    id: LayerId,
    anchor: GeographicAnchor,
    initial_placement: Placement,
    placement: Placement,
    scene: SceneRoot,
    frames: u64,
}

impl ModelLayer {
    /// Register with the host and build the lit scene root.
    ///
    /// `on_scene_ready` runs once the root exists, before the first draw.
    pub fn mount(
        host: &mut dyn MapHost,
        id: LayerId,
        anchor: GeographicAnchor,
        initial_placement: Placement,
        on_scene_ready: impl FnOnce(&mut SceneRoot),
    ) -> Result<Self, LayerError> {
        host.add_custom_layer(&id)?;

        let mut scene = SceneRoot::lit();
        on_scene_ready(&mut scene);

        Ok(Self {
            id,
            anchor,
            initial_placement,
            placement: initial_placement,
            scene,
            frames: 0,
        })
    }

    /// Draw one frame. Returns the camera matrix handed to the renderer.
    pub fn render(
        &mut self,
        view: &Mat4,
        updater: &mut dyn PlacementUpdate,
        renderer: &mut dyn SceneRenderer,
        host: &mut dyn MapHost,
    ) -> Mat4 {
        self.placement = updater.update(&self.anchor, &self.placement, host.projection());
        let camera = camera_matrix(view, &self.placement);

        renderer.reset_state();
        renderer.render(&self.scene, &camera);
        host.trigger_repaint();

        self.frames += 1;
        camera
    }

    pub fn reset_transform(&mut self) {
        self.placement = self.initial_placement;
    }

    pub fn insert_model(&mut self, model: SceneGraph) {
        self.scene.add_model(model);
    }

    /// Deregister from the host. `false` means the host had already
    /// forgotten the layer.
    pub fn unmount(self, host: &mut dyn MapHost) -> bool {
        host.remove_layer(&self.id)
    }

    pub fn anchor(&self) -> &GeographicAnchor {
        &self.anchor
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn initial_placement(&self) -> &Placement {
        &self.initial_placement
    }

    pub fn scene(&self) -> &SceneRoot {
        &self.scene
    }

    pub fn has_model(&self) -> bool {
        !self.scene.models().is_empty()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }
}

impl Layer for ModelLayer {
    fn id(&self) -> &LayerId {
        &self.id
    }
}
