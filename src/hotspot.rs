// hotspot.rs — 热点：射线拾取、创建/删除、标记动画
//
// Marker sizes are in units of a 500-radius background sphere and scale
// with the configured radius.

use crate::camera::Ray;
use crate::error::ViewerError;
use crate::orientation::{HotspotPosition, SphericalPoint};
use crate::tour::{new_hotspot_id, Hotspot, MAX_HOTSPOTS_PER_SCENE};
use bytemuck::{Pod, Zeroable};
use glam::{DVec3, Mat4, Quat, Vec3};

const REFERENCE_RADIUS: f64 = 500.0;
const MARKER_SPHERE_RADIUS: f64 = 12.0;
const RING_INNER_RADIUS: f64 = 15.0;
const RING_OUTER_RADIUS: f64 = 20.0;
const MARKER_COLOR: [f32; 3] = [0.0, 1.0, 1.0];

/// Per-instance marker data uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MarkerInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl MarkerInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        2 => Float32x4, 3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MarkerInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Marker instances for one frame, split by mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerFrame {
    pub spheres: Vec<MarkerInstance>,
    pub rings: Vec<MarkerInstance>,
}

/// Marker geometry derived from the background sphere radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerGeometry {
    pub sphere_radius: f64,
    pub render_radius: f64,
}

impl MarkerGeometry {
    pub fn new(sphere_radius: f64, render_ratio: f64) -> Self {
        Self {
            sphere_radius,
            render_radius: sphere_radius * render_ratio,
        }
    }

    fn scale(&self) -> f64 {
        self.sphere_radius / REFERENCE_RADIUS
    }

    pub fn marker_radius(&self) -> f64 {
        MARKER_SPHERE_RADIUS * self.scale()
    }

    pub fn ring_radii(&self) -> (f64, f64) {
        (RING_INNER_RADIUS * self.scale(), RING_OUTER_RADIUS * self.scale())
    }

    /// Picking radius around a marker centre.
    pub fn hit_radius(&self) -> f64 {
        RING_OUTER_RADIUS * self.scale()
    }

    pub fn marker_center(&self, anchor: DVec3) -> DVec3 {
        anchor * self.render_radius
    }
}

/// Working set of hotspots for the scene on screen.
pub struct HotspotEngine {
    hotspots: Vec<Hotspot>,
    geometry: MarkerGeometry,
}

impl HotspotEngine {
    pub fn new(geometry: MarkerGeometry) -> Self {
        Self {
            hotspots: Vec::new(),
            geometry,
        }
    }

    pub fn geometry(&self) -> MarkerGeometry {
        self.geometry
    }

    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    pub fn len(&self) -> usize {
        self.hotspots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hotspots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.hotspots.len() >= MAX_HOTSPOTS_PER_SCENE
    }

    /// Replaces the set (new scene or host-side edit). Not capped: the
    /// limit applies at creation time only.
    pub fn set_hotspots(&mut self, hotspots: Vec<Hotspot>) {
        self.hotspots = hotspots;
    }

    /// Where a ray leaves the background sphere, as a unit anchor.
    pub fn hit_test_sphere(&self, ray: &Ray, sphere_radius: f64) -> Option<DVec3> {
        let t = ray.intersect_sphere(DVec3::ZERO, sphere_radius)?;
        ray.at(t).try_normalize()
    }

    pub fn create_at(
        &mut self,
        point: DVec3,
        target_panorama_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Hotspot, ViewerError> {
        let position = HotspotPosition::Spherical(SphericalPoint::from_vec(point));
        self.create(position, target_panorama_id, title, description)
    }

    /// Like [`HotspotEngine::create_at`], keeping the position form as given
    /// (planar positions come from the flat editor).
    pub fn create(
        &mut self,
        position: HotspotPosition,
        target_panorama_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Hotspot, ViewerError> {
        if self.is_full() {
            return Err(ViewerError::TooManyHotspots {
                max: MAX_HOTSPOTS_PER_SCENE,
            });
        }
        let hotspot = Hotspot {
            id: new_hotspot_id(),
            position,
            title,
            target_panorama_id: target_panorama_id.to_string(),
            description,
        };
        self.hotspots.push(hotspot.clone());
        Ok(hotspot)
    }

    /// Removes by id. Missing ids are tolerated but logged.
    pub fn delete_by_id(&mut self, hotspot_id: &str) -> bool {
        let before = self.hotspots.len();
        self.hotspots.retain(|h| h.id != hotspot_id);
        let removed = self.hotspots.len() != before;
        if !removed {
            log::warn!("delete of unknown hotspot {hotspot_id}");
        }
        removed
    }

    /// Nearest marker hit by the ray.
    pub fn hit_test_hotspots(&self, ray: &Ray) -> Option<&Hotspot> {
        let radius = self.geometry.hit_radius();
        self.hotspots
            .iter()
            .filter_map(|h| {
                let center = self.geometry.marker_center(h.anchor());
                ray.intersect_sphere(center, radius).map(|t| (t, h))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, h)| h)
    }

    /// Animated marker transforms at `seconds` since the viewer started.
    pub fn marker_frame(&self, seconds: f64) -> MarkerFrame {
        let t = seconds * 2.0;
        let ring_alpha = (0.3 + 0.3 * (t * 3.0).sin()) as f32;
        let pulse = (1.0 + 0.1 * (t * 2.0).sin()) as f32;
        let marker_radius = self.geometry.marker_radius() as f32;

        let mut frame = MarkerFrame::default();
        for h in &self.hotspots {
            let anchor = h.anchor();
            let center = self.geometry.marker_center(anchor).as_vec3();
            // 圆环朝向球心
            let facing = Quat::from_rotation_arc(Vec3::Z, -anchor.as_vec3());
            let spin = Quat::from_rotation_z(t as f32);

            frame.spheres.push(MarkerInstance {
                model: Mat4::from_scale_rotation_translation(
                    Vec3::splat(marker_radius * pulse),
                    facing,
                    center,
                )
                .to_cols_array_2d(),
                color: [MARKER_COLOR[0], MARKER_COLOR[1], MARKER_COLOR[2], 0.9],
            });
            frame.rings.push(MarkerInstance {
                model: Mat4::from_scale_rotation_translation(Vec3::ONE, facing * spin, center)
                    .to_cols_array_2d(),
                color: [MARKER_COLOR[0], MARKER_COLOR[1], MARKER_COLOR[2], ring_alpha],
            });
        }
        frame
    }
}
