use glam::{Mat4, Vec3};

/// A look-at camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl Camera {
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        Self {
            eye,
            target,
            up: Vec3::Y,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }
}

/// Projection applied after the view transform. GL clip space, -1..1 depth.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum Projection {
    #[default]
    Identity,
    Perspective {
        fov_y_radians: f32,
        near: f32,
        far: f32,
    },
    /// `half_height` world units above and below the center; width follows
    /// the aspect ratio.
    Orthographic {
        half_height: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn matrix(&self, aspect: f32) -> Mat4 {
        match *self {
            Projection::Identity => Mat4::IDENTITY,
            Projection::Perspective {
                fov_y_radians,
                near,
                far,
            } => Mat4::perspective_rh_gl(fov_y_radians, aspect, near, far),
            Projection::Orthographic {
                half_height,
                near,
                far,
            } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh_gl(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    near,
                    far,
                )
            }
        }
    }
}

/// How model, view and projection evolve over time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformConfig {
    /// Model rotation axis; a zero axis disables rotation.
    pub axis: Vec3,
    /// Radians per second about `axis`.
    pub angular_rate: f32,
    /// `None` keeps the view at identity.
    pub camera: Option<Camera>,
    pub projection: Projection,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            axis: Vec3::Z,
            angular_rate: 0.0,
            camera: None,
            projection: Projection::Identity,
        }
    }
}

impl TransformConfig {
    pub fn rotation(mut self, axis: Vec3, angular_rate: f32) -> Self {
        self.axis = axis;
        self.angular_rate = angular_rate;
        self
    }

    pub fn camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
}

/// Transforms for one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameState {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    /// Seconds since the loop started.
    pub elapsed: f32,
}

impl FrameState {
    /// Computes the transforms at `elapsed` seconds.
    ///
    /// Pure: the same inputs always give the same matrices.
    pub fn at(elapsed: f32, config: &TransformConfig, aspect: f32) -> Self {
        let axis = config.axis.normalize_or_zero();
        let angle = config.angular_rate * elapsed;
        let model = if axis == Vec3::ZERO || angle == 0.0 {
            Mat4::IDENTITY
        } else {
            Mat4::from_axis_angle(axis, angle)
        };

        let view = config.camera.map_or(Mat4::IDENTITY, |camera| camera.view());
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };

        Self {
            model,
            view,
            projection: config.projection.matrix(aspect),
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    #[test]
    fn start_of_loop_is_identity() {
        let config = TransformConfig::default().rotation(Vec3::Y, 1.0);
        let state = FrameState::at(0.0, &config, 4.0 / 3.0);
        assert_eq!(state.model, Mat4::IDENTITY);
        assert_eq!(state.view, Mat4::IDENTITY);
        assert_eq!(state.projection, Mat4::IDENTITY);
    }

    #[test]
    fn half_turn_after_pi_seconds_at_unit_rate() {
        let config = TransformConfig::default().rotation(Vec3::Z, 1.0);
        let state = FrameState::at(PI, &config, 1.0);

        assert!(state.model.abs_diff_eq(Mat4::from_rotation_z(PI), 1e-6));
        let x = state.model.transform_point3(Vec3::X);
        assert!(x.abs_diff_eq(-Vec3::X, 1e-5), "{x}");
    }

    #[test]
    fn unnormalized_axis_is_normalized() {
        let config = TransformConfig::default().rotation(Vec3::new(0.0, 3.0, 0.0), 0.5);
        let state = FrameState::at(2.0, &config, 1.0);
        assert!(state.model.abs_diff_eq(Mat4::from_rotation_y(1.0), 1e-6));
    }

    #[test]
    fn zero_axis_disables_rotation() {
        let config = TransformConfig::default().rotation(Vec3::ZERO, 2.0);
        assert_eq!(FrameState::at(1.0, &config, 1.0).model, Mat4::IDENTITY);
    }

    #[test]
    fn perspective_uses_aspect_and_degenerate_aspect_falls_back() {
        let projection = Projection::Perspective {
            fov_y_radians: PI / 4.0,
            near: 0.1,
            far: 100.0,
        };
        let config = TransformConfig::default()
            .camera(Camera::new(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO))
            .projection(projection);

        let wide = FrameState::at(0.0, &config, 2.0);
        assert_eq!(wide.projection, Mat4::perspective_rh_gl(PI / 4.0, 2.0, 0.1, 100.0));
        assert_eq!(wide.view, Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y));

        let degenerate = FrameState::at(0.0, &config, f32::NAN);
        assert_eq!(degenerate.projection, projection.matrix(1.0));
    }
}
