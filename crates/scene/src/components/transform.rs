use foundation::math::{Mat4, Vec3};

/// Translation / rotation / scale of a scene node.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Unit quaternion `[x, y, z, w]`.
    pub rotation: [f64; 4],
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: Vec3::ONE,
        }
    }

    pub fn translate(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    pub fn scaled(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::identity()
        }
    }

    pub fn multiply_scale(&mut self, factor: f64) {
        self.scale = self.scale * factor;
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_trs(self.translation, self.rotation, self.scale)
    }
}

/// A node's local transform as authored: decomposed or a raw matrix.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LocalTransform {
    Trs(Transform),
    Matrix(Mat4),
}

impl Default for LocalTransform {
    fn default() -> Self {
        LocalTransform::Trs(Transform::identity())
    }
}

impl LocalTransform {
    pub fn matrix(&self) -> Mat4 {
        match self {
            LocalTransform::Trs(t) => t.matrix(),
            LocalTransform::Matrix(m) => *m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LocalTransform, Transform};
    use foundation::math::{Mat4, Vec3};

    #[test]
    fn identity_is_origin() {
        let transform = Transform::identity();
        assert_eq!(transform.translation, Vec3::ZERO);
        assert_eq!(transform.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn uniform_scale_multiplies() {
        let mut t = Transform::scaled(Vec3::new(2.0, 2.0, 2.0));
        t.multiply_scale(0.5);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn raw_matrix_is_used_verbatim() {
        let m = Mat4::translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(LocalTransform::Matrix(m).matrix(), m);
        assert_eq!(LocalTransform::default().matrix(), Mat4::IDENTITY);
    }
}
