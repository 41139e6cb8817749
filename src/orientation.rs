// orientation.rs — 视角参数与球面坐标换算
//
// phi   = azimuth (horizontal), unbounded
// theta = elevation (vertical), clamped to [-π/2, π/2]
// fov   = vertical field of view in degrees
//
// Equirectangular percentages: x% runs left → right over phi ∈ [-π, π],
// y% runs top → bottom over theta ∈ [π/2, -π/2].

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

pub const DEFAULT_DRAG_SENSITIVITY: f64 = 0.005;
pub const DEFAULT_ZOOM_SPEED: f64 = 0.05;
pub const DEFAULT_FOV: f64 = 75.0;
pub const MIN_FOV: f64 = 30.0;
pub const MAX_FOV: f64 = 120.0;

/// Camera look direction for the given angles (unit length).
pub fn camera_direction_from(phi: f64, theta: f64) -> DVec3 {
    DVec3::new(phi.cos() * theta.cos(), theta.sin(), phi.sin() * theta.cos())
}

/// Drag right turns the view left, drag down tilts it up (street-view style).
pub fn apply_drag(phi: f64, theta: f64, delta_x: f64, delta_y: f64, sensitivity: f64) -> (f64, f64) {
    let phi = phi - delta_x * sensitivity;
    let theta = (theta + delta_y * sensitivity).clamp(-FRAC_PI_2, FRAC_PI_2);
    (phi, theta)
}

/// Positive wheel delta (scroll down) zooms out.
pub fn apply_zoom(fov: f64, wheel_delta: f64, zoom_speed: f64, min: f64, max: f64) -> f64 {
    (fov + wheel_delta * zoom_speed).clamp(min, max)
}

/// Unit sphere point → equirectangular percentages.
///
/// At the poles (`y = ±1`) the azimuth is undefined and `x%` comes out as 50.
pub fn sphere_to_2d(x: f64, y: f64, z: f64) -> (f64, f64) {
    let phi = z.atan2(x);
    let theta = y.clamp(-1.0, 1.0).asin();
    let x_percent = (phi + PI) / (2.0 * PI) * 100.0;
    let y_percent = (FRAC_PI_2 - theta) / PI * 100.0;
    (x_percent, y_percent)
}

/// Equirectangular percentages → unit sphere point. Inverse of [`sphere_to_2d`].
pub fn two_d_to_sphere(x_percent: f64, y_percent: f64) -> DVec3 {
    let phi = x_percent / 100.0 * 2.0 * PI - PI;
    let theta = FRAC_PI_2 - y_percent / 100.0 * PI;
    camera_direction_from(phi, theta)
}

/// Per-viewer camera orientation. Transient, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationState {
    pub phi: f64,
    pub theta: f64,
    pub fov: f64,
}

impl Default for OrientationState {
    fn default() -> Self {
        Self {
            phi: 0.0,
            theta: 0.0,
            fov: DEFAULT_FOV,
        }
    }
}

impl OrientationState {
    pub fn with_fov(fov: f64) -> Self {
        Self {
            fov,
            ..Self::default()
        }
    }

    pub fn direction(&self) -> DVec3 {
        camera_direction_from(self.phi, self.theta)
    }

    pub fn drag(&mut self, delta_x: f64, delta_y: f64, sensitivity: f64) {
        (self.phi, self.theta) = apply_drag(self.phi, self.theta, delta_x, delta_y, sensitivity);
    }

    pub fn zoom(&mut self, wheel_delta: f64, zoom_speed: f64, min: f64, max: f64) {
        self.fov = apply_zoom(self.fov, wheel_delta, zoom_speed, min, max);
    }

    /// Forward (+X), level, default zoom.
    pub fn reset(&mut self, fov: f64) {
        *self = Self::with_fov(fov);
    }
}

/// Canonical hotspot anchor: a point on the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphericalPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SphericalPoint {
    /// Normalizes `v`; a zero vector maps to the forward direction.
    pub fn from_vec(v: DVec3) -> Self {
        let n = v.try_normalize().unwrap_or(DVec3::X);
        Self {
            x: n.x,
            y: n.y,
            z: n.z,
        }
    }

    pub fn to_vec(self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }
}

/// Percent-of-image position used by 2D authoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPercent {
    pub x: f64,
    pub y: f64,
}

impl PlanarPercent {
    /// Keeps both percentages inside the image.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 100.0),
            y: self.y.clamp(0.0, 100.0),
        }
    }
}

/// Where a hotspot sits. The variant is always explicit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HotspotPosition {
    Spherical(SphericalPoint),
    Planar(PlanarPercent),
}

impl HotspotPosition {
    pub fn to_spherical(self) -> SphericalPoint {
        match self {
            HotspotPosition::Spherical(p) => p,
            HotspotPosition::Planar(p) => SphericalPoint::from_vec(two_d_to_sphere(p.x, p.y)),
        }
    }

    pub fn to_planar(self) -> PlanarPercent {
        match self {
            HotspotPosition::Spherical(p) => {
                let (x, y) = sphere_to_2d(p.x, p.y, p.z);
                PlanarPercent { x, y }
            }
            HotspotPosition::Planar(p) => p,
        }
    }

    pub fn anchor(self) -> DVec3 {
        self.to_spherical().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_vec_close(a: DVec3, b: DVec3) {
        assert!((a - b).length() < EPS, "{a:?} != {b:?}");
    }

    #[test]
    fn test_direction_forward_and_up() {
        assert_vec_close(camera_direction_from(0.0, 0.0), DVec3::X);
        assert_vec_close(camera_direction_from(0.0, FRAC_PI_2), DVec3::Y);
        assert_vec_close(camera_direction_from(FRAC_PI_2, 0.0), DVec3::Z);
    }

    #[test]
    fn test_drag_sign_convention() {
        // Dragging right turns left (phi decreases), dragging down looks up.
        let (phi, theta) = apply_drag(0.0, 0.0, 100.0, 40.0, DEFAULT_DRAG_SENSITIVITY);
        assert!((phi - -0.5).abs() < EPS);
        assert!((theta - 0.2).abs() < EPS);
    }

    #[test]
    fn test_theta_clamped_over_drag_sequence() {
        let mut state = OrientationState::default();
        let deltas = [5000.0, -12000.0, 300.0, 99999.0, -7.0, -99999.0, 0.5];
        for (i, dy) in deltas.iter().enumerate() {
            state.drag(i as f64 * 13.0, *dy, DEFAULT_DRAG_SENSITIVITY);
            assert!(state.theta >= -FRAC_PI_2 && state.theta <= FRAC_PI_2);
        }
        assert_eq!(state.theta, -FRAC_PI_2 + 0.5 * DEFAULT_DRAG_SENSITIVITY);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut fov = DEFAULT_FOV;
        for delta in [1000.0, 1000.0, -5000.0, 250.0, -10.0] {
            fov = apply_zoom(fov, delta, DEFAULT_ZOOM_SPEED, MIN_FOV, MAX_FOV);
            assert!((MIN_FOV..=MAX_FOV).contains(&fov));
        }
        assert_eq!(apply_zoom(100.0, 1000.0, DEFAULT_ZOOM_SPEED, MIN_FOV, MAX_FOV), MAX_FOV);
        assert_eq!(apply_zoom(75.0, 100.0, DEFAULT_ZOOM_SPEED, MIN_FOV, MAX_FOV), 80.0);
    }

    #[test]
    fn test_round_trip_away_from_poles() {
        for i in 0..36 {
            for j in 1..18 {
                let phi = -PI + i as f64 * (2.0 * PI / 36.0) + 0.01;
                let theta = -FRAC_PI_2 + j as f64 * (PI / 18.0);
                let p = camera_direction_from(phi, theta);
                let (xp, yp) = sphere_to_2d(p.x, p.y, p.z);
                assert_vec_close(two_d_to_sphere(xp, yp), p);
            }
        }
    }

    #[test]
    fn test_pole_singularity() {
        // Azimuth collapses at the pole; the point itself still round-trips.
        let (xp, yp) = sphere_to_2d(0.0, 1.0, 0.0);
        assert_eq!(xp, 50.0);
        assert_eq!(yp, 0.0);
        assert_vec_close(two_d_to_sphere(xp, yp), DVec3::Y);
    }

    #[test]
    fn test_image_centre_is_forward() {
        assert_eq!(sphere_to_2d(1.0, 0.0, 0.0), (50.0, 50.0));
        assert_vec_close(two_d_to_sphere(50.0, 50.0), DVec3::X);
    }

    #[test]
    fn test_position_variants_convert() {
        let planar = HotspotPosition::Planar(PlanarPercent { x: 25.0, y: 40.0 });
        let spherical = HotspotPosition::Spherical(planar.to_spherical());
        let back = spherical.to_planar();
        assert!((back.x - 25.0).abs() < EPS);
        assert!((back.y - 40.0).abs() < EPS);
        assert!((planar.anchor().length() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_reset_restores_forward_view() {
        let mut state = OrientationState::default();
        state.drag(300.0, -200.0, DEFAULT_DRAG_SENSITIVITY);
        state.zoom(200.0, DEFAULT_ZOOM_SPEED, MIN_FOV, MAX_FOV);
        state.reset(DEFAULT_FOV);
        assert_eq!(state, OrientationState::default());
        assert_vec_close(state.direction(), DVec3::X);
    }
}
