// camera.rs — 球心透视相机与屏幕射线

use crate::orientation::OrientationState;
use bytemuck::{Pod, Zeroable};
use glam::{DMat4, DVec3, DVec4};

pub const NEAR: f64 = 0.1;
pub const FAR: f64 = 1000.0;

// look_at 在天顶/天底处退化，视图矩阵只用这个安全范围
const SAFE_THETA: f64 = 89.9 * std::f64::consts::PI / 180.0;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// A ray in world space. `direction` is unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Nearest non-negative hit distance against a sphere, if any.
    /// When the origin is inside the sphere this is the exit point.
    pub fn intersect_sphere(&self, center: DVec3, radius: f64) -> Option<f64> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let near = -b - sqrt_d;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + sqrt_d;
        (far >= 0.0).then_some(far)
    }
}

/// Perspective camera fixed at the sphere centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub orientation: OrientationState,
    pub aspect: f64,
}

impl Camera {
    pub fn new(orientation: OrientationState, width: u32, height: u32) -> Self {
        let mut camera = Self {
            orientation,
            aspect: 1.0,
        };
        camera.update_aspect(width, height);
        camera
    }

    /// Zero-sized viewports keep the previous aspect ratio.
    pub fn update_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f64 / height as f64;
        }
    }

    fn look_direction(&self) -> DVec3 {
        let theta = self.orientation.theta.clamp(-SAFE_THETA, SAFE_THETA);
        crate::orientation::camera_direction_from(self.orientation.phi, theta)
    }

    pub fn view_matrix(&self) -> DMat4 {
        DMat4::look_at_rh(DVec3::ZERO, self.look_direction(), DVec3::Y)
    }

    pub fn projection_matrix(&self) -> DMat4 {
        DMat4::perspective_rh(self.orientation.fov.to_radians(), self.aspect, NEAR, FAR)
    }

    pub fn uniform(&self) -> CameraUniform {
        let view_proj = self.projection_matrix() * self.view_matrix();
        CameraUniform {
            view_proj: view_proj.as_mat4().to_cols_array_2d(),
        }
    }

    /// Ray through a pixel of a `width` × `height` viewport.
    pub fn screen_to_ray(&self, screen_x: f64, screen_y: f64, width: f64, height: f64) -> Ray {
        let ndc_x = (2.0 * screen_x / width) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen_y / height);
        self.ndc_to_ray(ndc_x, ndc_y)
    }

    pub fn ndc_to_ray(&self, ndc_x: f64, ndc_y: f64) -> Ray {
        let inv_proj = self.projection_matrix().inverse();
        let inv_view = self.view_matrix().inverse();

        // wgpu 深度范围 [0, 1]
        let near_view = inv_proj * DVec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far_view = inv_proj * DVec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let near_view = near_view.truncate() / near_view.w;
        let far_view = far_view.truncate() / far_view.w;

        let near_world = (inv_view * near_view.extend(1.0)).truncate();
        let far_world = (inv_view * far_view.extend(1.0)).truncate();

        Ray::new(near_world, far_world - near_world)
    }

    /// Projects a world point to pixel coordinates; `None` when it is behind the camera.
    pub fn world_to_screen(&self, point: DVec3, width: f64, height: f64) -> Option<(f64, f64)> {
        let clip = self.projection_matrix() * self.view_matrix() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn test_centre_ray_follows_orientation() {
        let mut orientation = OrientationState::default();
        let camera = Camera::new(orientation, 800, 600);
        let ray = camera.screen_to_ray(400.0, 300.0, 800.0, 600.0);
        assert!((ray.direction - DVec3::X).length() < EPS);

        orientation.phi = 1.0;
        orientation.theta = 0.3;
        let camera = Camera::new(orientation, 800, 600);
        let ray = camera.screen_to_ray(400.0, 300.0, 800.0, 600.0);
        assert!((ray.direction - orientation.direction()).length() < EPS);
    }

    #[test]
    fn test_screen_right_is_increasing_azimuth() {
        let camera = Camera::new(OrientationState::default(), 800, 600);
        let ray = camera.screen_to_ray(700.0, 300.0, 800.0, 600.0);
        assert!(ray.direction.z > 0.0);
        let ray = camera.screen_to_ray(400.0, 50.0, 800.0, 600.0);
        assert!(ray.direction.y > 0.0);
    }

    #[test]
    fn test_world_to_screen_inverts_ray() {
        let camera = Camera::new(OrientationState::default(), 1024, 512);
        let ray = camera.screen_to_ray(300.0, 200.0, 1024.0, 512.0);
        let (x, y) = camera.world_to_screen(ray.at(250.0), 1024.0, 512.0).unwrap();
        assert!((x - 300.0).abs() < 1e-3);
        assert!((y - 200.0).abs() < 1e-3);
        assert!(camera.world_to_screen(-DVec3::X * 100.0, 1024.0, 512.0).is_none());
    }

    #[test]
    fn test_zero_viewport_keeps_aspect() {
        let mut camera = Camera::new(OrientationState::default(), 1600, 900);
        camera.update_aspect(0, 900);
        assert!((camera.aspect - 16.0 / 9.0).abs() < EPS);
    }

    #[test]
    fn test_view_matrix_finite_at_pole() {
        let orientation = OrientationState {
            theta: std::f64::consts::FRAC_PI_2,
            ..Default::default()
        };
        let camera = Camera::new(orientation, 800, 600);
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn test_ray_exits_sphere_from_inside() {
        let ray = Ray::new(DVec3::new(0.1, 0.0, 0.0), DVec3::X);
        let t = ray.intersect_sphere(DVec3::ZERO, 500.0).unwrap();
        assert!((ray.at(t).length() - 500.0).abs() < 1e-9);

        let miss = Ray::new(DVec3::ZERO, DVec3::Y);
        assert!(miss.intersect_sphere(DVec3::new(100.0, 0.0, 0.0), 10.0).is_none());
        let behind = Ray::new(DVec3::ZERO, -DVec3::X);
        assert!(behind.intersect_sphere(DVec3::new(100.0, 0.0, 0.0), 10.0).is_none());
    }
}
