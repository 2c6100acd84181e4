//! Orbit-style camera navigation.
//!
//! The controller keeps the camera on a sphere around `target`:
//! - drag input rotates (azimuth `theta` around +Y, polar `phi` from +Y)
//! - wheel input dollies in/out within `[min_distance, max_distance]`
//!
//! Input only accumulates deltas; [`OrbitControls::update`] applies them to the
//! camera once per frame. With damping enabled, the deltas decay geometrically
//! instead of being consumed in one frame, which gives the "glide" after a drag.

use std::f32::consts::PI;

use glam::Vec3;

use super::Camera3D;

/// Keep `phi` away from the poles so the view basis never degenerates.
const POLE_EPS: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,

    pub enable_rotate: bool,
    pub enable_zoom: bool,

    pub enable_damping: bool,
    pub damping_factor: f32,

    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,

    /// Radians of azimuth per viewport-height of horizontal drag is `2*pi*rotate_speed`.
    pub rotate_speed: f32,
    /// Dolly factor per wheel step is `zoom_scale^steps`.
    pub zoom_scale: f32,

    delta_theta: f32,
    delta_phi: f32,
    dolly: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            enable_rotate: true,
            enable_zoom: true,
            enable_damping: false,
            damping_factor: 0.05,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            rotate_speed: 1.0,
            zoom_scale: 0.95,
            delta_theta: 0.0,
            delta_phi: 0.0,
            dolly: 1.0,
        }
    }
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    /// Rotate-only controls: zoom disabled.
    pub fn rotate_only(target: Vec3) -> Self {
        Self {
            enable_zoom: false,
            ..Self::new(target)
        }
    }

    /// Queue a rotation from a pointer drag of `(dx, dy)` pixels.
    pub fn rotate(&mut self, dx_px: f32, dy_px: f32, viewport_height_px: f32) {
        if !self.enable_rotate {
            return;
        }
        let h = viewport_height_px.max(1.0);
        self.delta_theta -= 2.0 * PI * dx_px / h * self.rotate_speed;
        self.delta_phi -= 2.0 * PI * dy_px / h * self.rotate_speed;
    }

    /// Queue a dolly from wheel input. Positive `steps` move closer.
    pub fn zoom(&mut self, steps: f32) {
        if !self.enable_zoom {
            return;
        }
        self.dolly *= self.zoom_scale.powf(steps);
    }

    /// Apply queued input to `camera`. Returns `true` if the camera moved.
    pub fn update(&mut self, camera: &mut Camera3D) -> bool {
        let offset = camera.position - self.target;
        let mut radius = offset.length();
        let (mut theta, mut phi) = if radius > 0.0 {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, PI * 0.5)
        };

        let k = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        theta += self.delta_theta * k;
        phi += self.delta_phi * k;
        phi = phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(POLE_EPS, PI - POLE_EPS);

        radius = (radius * self.dolly).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let new_offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );

        let before = camera.position;
        camera.position = self.target + new_offset;
        camera.target = self.target;

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.dolly = 1.0;

        (camera.position - before).length_squared() > 1e-8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(position: Vec3) -> Camera3D {
        Camera3D {
            position,
            ..Default::default()
        }
    }

    #[test]
    fn zoom_is_clamped_to_distance_range() {
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.min_distance = 2.0;
        controls.max_distance = 20.0;
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 5.0));

        controls.zoom(200.0);
        controls.update(&mut cam);
        assert!((cam.distance_to_target() - 2.0).abs() < 1e-4);

        controls.zoom(-400.0);
        controls.update(&mut cam);
        assert!((cam.distance_to_target() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn rotate_only_ignores_zoom() {
        let mut controls = OrbitControls::rotate_only(Vec3::ZERO);
        let mut cam = camera_at(Vec3::new(0.0, 1.0, 3.0));
        let dist = cam.distance_to_target();

        controls.zoom(10.0);
        controls.update(&mut cam);

        assert!((cam.distance_to_target() - dist).abs() < 1e-5);
        assert_eq!(controls.target, Vec3::ZERO);
    }

    #[test]
    fn polar_angle_cap_keeps_camera_above_ground() {
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.max_polar_angle = PI / 1.7;
        let mut cam = camera_at(Vec3::new(0.0, 2.0, 4.0));

        // Drag far downwards: camera would swing under the floor without the cap.
        controls.rotate(0.0, -5000.0, 600.0);
        controls.update(&mut cam);

        let phi = (cam.position.y / cam.distance_to_target()).acos();
        assert!(phi <= PI / 1.7 + 1e-4);
    }

    #[test]
    fn damping_decays_queued_rotation() {
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.enable_damping = true;
        controls.damping_factor = 0.1;
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 5.0));

        controls.rotate(100.0, 0.0, 500.0);
        let first = cam.position;
        assert!(controls.update(&mut cam));
        let first_step = (cam.position - first).length();

        let before = cam.position;
        assert!(controls.update(&mut cam));
        assert!((cam.position - before).length() < first_step);

        for _ in 0..500 {
            controls.update(&mut cam);
        }
        assert!(!controls.update(&mut cam));
        assert!((cam.distance_to_target() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn update_without_input_keeps_camera_still() {
        let mut controls = OrbitControls::new(Vec3::new(0.0, 1.0, 0.0));
        let mut cam = camera_at(Vec3::new(3.0, 2.0, 4.0));
        cam.target = controls.target;
        assert!(!controls.update(&mut cam));
    }
}
