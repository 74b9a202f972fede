use std::cell::Cell;

use cgmath::*;

use super::camera_utils::OPENGL_TO_WGPU_MATRIX;
use crate::error::{Result, ViewerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionKind {
    #[default]
    Perspective,
    Orthographic,
}

/// Limits and input sensitivities for camera navigation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBounds {
    /// Smallest distance zoom and `set_distance` may reach
    pub min_distance: f32,
    /// Polar angle is kept within `[polar_margin, PI - polar_margin]`
    pub polar_margin: f32,
    /// Radians per input unit for orbit
    pub orbit_sensitivity: f32,
    /// Pan offset per input unit, scaled by distance
    pub pan_factor: f32,
    /// Fraction of distance removed per zoom unit
    pub zoom_speed: f32,
}

impl Default for CameraBounds {
    fn default() -> Self {
        Self {
            min_distance: 0.1,
            polar_margin: 0.1,
            orbit_sensitivity: 0.01,
            pan_factor: 0.001,
            zoom_speed: 0.1,
        }
    }
}

impl CameraBounds {
    pub fn with_min_distance(mut self, min_distance: f32) -> Self {
        self.min_distance = min_distance.max(f32::EPSILON);
        self
    }

    pub fn with_polar_margin(mut self, polar_margin: f32) -> Self {
        self.polar_margin = polar_margin.clamp(0.0, std::f32::consts::FRAC_PI_2);
        self
    }

    pub fn with_orbit_sensitivity(mut self, sensitivity: f32) -> Self {
        self.orbit_sensitivity = sensitivity;
        self
    }

    pub fn with_pan_factor(mut self, factor: f32) -> Self {
        self.pan_factor = factor;
        self
    }

    pub fn with_zoom_speed(mut self, zoom_speed: f32) -> Self {
        self.zoom_speed = zoom_speed;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct InitialView {
    position: Vector3<f32>,
    target: Vector3<f32>,
    up: Vector3<f32>,
}

/// Orbiting viewpoint with lazily cached view and projection matrices.
///
/// Geometry setters mark the view matrix dirty, projection setters mark the
/// projection dirty; the getters recompute on read. `reset` restores the
/// position, target and up vector captured at construction.
///
/// Callers must keep `position != target`; the view direction is undefined
/// otherwise.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vector3<f32>,
    target: Vector3<f32>,
    up: Vector3<f32>,
    projection: ProjectionKind,
    /// Vertical field of view in degrees
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    bounds: CameraBounds,
    initial: InitialView,

    view_matrix: Cell<Matrix4<f32>>,
    projection_matrix: Cell<Matrix4<f32>>,
    view_dirty: Cell<bool>,
    projection_dirty: Cell<bool>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 0.0, 5.0), Vector3::zero(), Vector3::unit_y())
    }
}

impl Camera {
    /// Creates a perspective camera (45 degrees, aspect 1, clip 0.1..1000).
    ///
    /// A zero `up` vector is replaced by +Y.
    pub fn new(position: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Self {
        let up = if up.magnitude2() > 0.0 {
            up.normalize()
        } else {
            Vector3::unit_y()
        };

        Self {
            position,
            target,
            up,
            projection: ProjectionKind::Perspective,
            fov: 45.0,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            bounds: CameraBounds::default(),
            initial: InitialView {
                position,
                target,
                up,
            },
            view_matrix: Cell::new(Matrix4::identity()),
            projection_matrix: Cell::new(Matrix4::identity()),
            view_dirty: Cell::new(true),
            projection_dirty: Cell::new(true),
        }
    }

    pub fn with_bounds(mut self, bounds: CameraBounds) -> Self {
        self.bounds = bounds;
        self
    }

    // Geometry

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn target(&self) -> Vector3<f32> {
        self.target
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn bounds(&self) -> &CameraBounds {
        &self.bounds
    }

    pub fn set_bounds(&mut self, bounds: CameraBounds) {
        self.bounds = bounds;
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.invalidate_view();
    }

    pub fn set_target(&mut self, target: Vector3<f32>) {
        self.target = target;
        self.invalidate_view();
    }

    pub fn set_up_vector(&mut self, up: Vector3<f32>) -> Result<()> {
        if up.magnitude2() <= f32::EPSILON * f32::EPSILON || !up.magnitude2().is_finite() {
            return Err(ViewerError::InvalidCamera(format!(
                "up vector must be non-zero, got {:?}",
                up
            )));
        }
        self.up = up.normalize();
        self.invalidate_view();
        Ok(())
    }

    pub fn distance(&self) -> f32 {
        (self.target - self.position).magnitude()
    }

    /// Unit vector from position towards target
    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.position).normalize()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(self.up).normalize()
    }

    // Projection

    pub fn projection_kind(&self) -> ProjectionKind {
        self.projection
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    pub fn near_plane(&self) -> f32 {
        self.near
    }

    pub fn far_plane(&self) -> f32 {
        self.far
    }

    pub fn set_projection_kind(&mut self, kind: ProjectionKind) {
        self.projection = kind;
        self.invalidate_projection();
    }

    /// Vertical field of view in degrees, exclusive range (0, 180)
    pub fn set_fov(&mut self, fov: f32) -> Result<()> {
        if !(fov > 0.0 && fov < 180.0) {
            return Err(ViewerError::InvalidCamera(format!(
                "field of view must be within (0, 180) degrees, got {}",
                fov
            )));
        }
        self.fov = fov;
        self.invalidate_projection();
        Ok(())
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) -> Result<()> {
        if !(aspect > 0.0 && aspect.is_finite()) {
            return Err(ViewerError::InvalidCamera(format!(
                "aspect ratio must be positive, got {}",
                aspect
            )));
        }
        self.aspect = aspect;
        self.invalidate_projection();
        Ok(())
    }

    pub fn set_near_plane(&mut self, near: f32) -> Result<()> {
        self.set_clip_planes(near, self.far)
    }

    pub fn set_far_plane(&mut self, far: f32) -> Result<()> {
        self.set_clip_planes(self.near, far)
    }

    /// Sets both clip distances; requires `0 < near < far`
    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> Result<()> {
        if !(near > 0.0 && near < far && far.is_finite()) {
            return Err(ViewerError::InvalidCamera(format!(
                "clip planes must satisfy 0 < near < far, got near={} far={}",
                near, far
            )));
        }
        self.near = near;
        self.far = far;
        self.invalidate_projection();
        Ok(())
    }

    // Navigation

    /// Rotates the camera around the target.
    ///
    /// `dx` decreases the azimuth and `dy` increases the polar angle, which
    /// is clamped away from the poles. Distance is unchanged.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        let distance = self.distance();
        let direction = (self.position - self.target).normalize();

        let mut theta = direction.x.atan2(direction.z);
        let mut phi = direction.y.clamp(-1.0, 1.0).acos();

        theta -= dx * self.bounds.orbit_sensitivity;
        phi += dy * self.bounds.orbit_sensitivity;

        let margin = self.bounds.polar_margin;
        phi = phi.clamp(margin, std::f32::consts::PI - margin);

        let offset = Vector3::new(
            distance * phi.sin() * theta.sin(),
            distance * phi.cos(),
            distance * phi.sin() * theta.cos(),
        );
        self.position = self.target + offset;
        self.invalidate_view();
    }

    /// Moves position and target together in the view plane.
    ///
    /// The step scales with distance so panning feels the same at any zoom.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let scale = self.distance() * self.bounds.pan_factor;
        let offset = self.right() * (-dx * scale) + self.up * (dy * scale);

        self.position += offset;
        self.target += offset;
        self.invalidate_view();
    }

    /// Positive `delta` moves towards the target, negative moves away
    pub fn zoom(&mut self, delta: f32) {
        let distance = self.distance() * (1.0 - delta * self.bounds.zoom_speed);
        self.set_distance(distance);
    }

    /// Places the camera at `distance` from the target along the current
    /// direction, never closer than the configured minimum
    pub fn set_distance(&mut self, distance: f32) {
        let distance = if distance.is_finite() {
            distance.max(self.bounds.min_distance)
        } else {
            self.bounds.min_distance
        };
        let direction = (self.position - self.target).normalize();
        self.position = self.target + direction * distance;
        self.invalidate_view();
    }

    /// Targets `center` and backs off until a sphere of `radius` fills the
    /// vertical field of view
    pub fn fit_to_sphere(&mut self, center: Vector3<f32>, radius: f32) {
        let direction = (self.position - self.target).normalize();
        let half_fov = Deg(self.fov * 0.5);
        let distance = radius.max(0.0) / Rad::from(half_fov).0.sin();

        self.target = center;
        self.position = center + direction;
        self.set_distance(distance);
    }

    /// Restores position, target and up vector from construction
    pub fn reset(&mut self) {
        self.position = self.initial.position;
        self.target = self.initial.target;
        self.up = self.initial.up;
        self.invalidate_view();
    }

    // Matrices

    pub fn view_matrix(&self) -> Matrix4<f32> {
        if self.view_dirty.get() {
            let view = Matrix4::look_at_rh(
                Point3::from_vec(self.position),
                Point3::from_vec(self.target),
                self.up,
            );
            self.view_matrix.set(view);
            self.view_dirty.set(false);
        }
        self.view_matrix.get()
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        if self.projection_dirty.get() {
            let projection = match self.projection {
                ProjectionKind::Perspective => {
                    perspective(Deg(self.fov), self.aspect, self.near, self.far)
                }
                ProjectionKind::Orthographic => {
                    let half_height = self.far * Rad::from(Deg(self.fov * 0.5)).0.tan();
                    let half_width = half_height * self.aspect;
                    ortho(
                        -half_width,
                        half_width,
                        -half_height,
                        half_height,
                        self.near,
                        self.far,
                    )
                }
            };
            self.projection_matrix.set(OPENGL_TO_WGPU_MATRIX * projection);
            self.projection_dirty.set(false);
        }
        self.projection_matrix.get()
    }

    pub fn view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn is_view_dirty(&self) -> bool {
        self.view_dirty.get()
    }

    pub fn is_projection_dirty(&self) -> bool {
        self.projection_dirty.get()
    }

    fn invalidate_view(&self) {
        self.view_dirty.set(true);
    }

    fn invalidate_projection(&self) {
        self.projection_dirty.set(true);
    }
}
