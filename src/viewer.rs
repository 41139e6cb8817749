// viewer.rs — 可嵌入的全景查看器组件
//
// One viewer instance owns one render surface, one camera and one hotspot
// working set. The host forwards window input and drains events:
//
//   pointer/touch → GestureController ─ drag → OrientationState → camera
//                                     └ tap  → edit: place hotspot
//                                              view: navigate via hotspot
//
// Nothing is shared between viewer instances.

use crate::camera::Camera;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::gesture::{GestureController, GestureOutcome, PointerId};
use crate::hotspot::{HotspotEngine, MarkerFrame, MarkerGeometry};
use crate::loader::{LoadOutcome, TextureLoader};
use crate::orientation::{HotspotPosition, OrientationState, PlanarPercent, SphericalPoint};
use crate::tour::{Hotspot, TargetOption};
use glam::DVec2;
use image::RgbaImage;
use std::collections::VecDeque;
use std::time::Instant;

/// What the viewer draws into. Implemented by the wgpu renderer.
pub trait RenderSurface {
    fn set_camera(&mut self, camera: &Camera);
    /// Replaces the panorama texture in place.
    fn set_panorama(&mut self, image: &RgbaImage);
    fn set_markers(&mut self, frame: &MarkerFrame);
    fn resize(&mut self, width: u32, height: u32);
    /// Frees GPU resources. Called at most once.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// Taps follow hotspots.
    #[default]
    View,
    /// Taps place new hotspots.
    Edit,
}

/// Inputs from the embedding host.
#[derive(Debug, Clone, Default)]
pub struct ViewerProps {
    pub image_url: String,
    pub hotspots: Vec<Hotspot>,
    pub mode: InteractionMode,
    pub available_targets: Vec<TargetOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// Edit-mode tap landed on the sphere; the host should ask for a target
    /// and call [`PanoramaViewer::confirm_hotspot`] or `cancel_hotspot`.
    HotspotPlacementRequested { anchor: SphericalPoint },
    HotspotCreated(Hotspot),
    HotspotDeleted(String),
    Navigate(String),
    LoadingStateChanged(bool),
    Error(ViewerError),
}

pub struct PanoramaViewer<S: RenderSurface> {
    surface: Option<S>,
    config: ViewerConfig,
    camera: Camera,
    viewport: (u32, u32),
    gestures: GestureController,
    hotspots: HotspotEngine,
    mode: InteractionMode,
    available_targets: Vec<TargetOption>,
    pending: Option<HotspotPosition>,
    loader: TextureLoader,
    image_url: String,
    loading: bool,
    events: VecDeque<ViewerEvent>,
    started_at: Instant,
}

impl<S: RenderSurface> PanoramaViewer<S> {
    pub fn new(surface: S, props: ViewerProps, config: ViewerConfig, width: u32, height: u32) -> Self {
        let geometry = MarkerGeometry::new(config.sphere_radius, config.marker_radius_ratio);
        let mut hotspots = HotspotEngine::new(geometry);
        hotspots.set_hotspots(props.hotspots);

        let mut viewer = Self {
            surface: Some(surface),
            camera: Camera::new(OrientationState::with_fov(config.default_fov), width, height),
            viewport: (width, height),
            gestures: GestureController::new(config.tap_threshold(), config.controls_reveal_delay()),
            hotspots,
            mode: props.mode,
            available_targets: props.available_targets,
            pending: None,
            loader: TextureLoader::new(),
            image_url: String::new(),
            loading: false,
            events: VecDeque::new(),
            started_at: Instant::now(),
            config,
        };
        if !props.image_url.is_empty() {
            viewer.load_panorama(&props.image_url);
        }
        viewer
    }

    // ---- lifecycle ----

    pub fn is_disposed(&self) -> bool {
        self.surface.is_none()
    }

    /// Releases the surface. Safe to call more than once; input after this
    /// point is ignored.
    pub fn dispose(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            surface.release();
            self.pending = None;
            if self.loader.is_pending() {
                log::debug!("dropping in-flight load of {}", self.image_url);
            }
            self.set_loading(false);
            log::info!("viewer disposed");
        }
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    // ---- props ----

    /// Starts loading a panorama. The previous texture stays on screen until
    /// the new one is decoded; if several loads overlap, the last one wins.
    /// A different image drops any pending placement.
    pub fn load_panorama(&mut self, url: &str) {
        if self.is_disposed() {
            return;
        }
        if self.image_url != url {
            self.pending = None;
        }
        self.image_url = url.to_string();
        self.loader.request(url);
        self.set_loading(true);
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    /// Replaces the working set. A pending placement belongs to the old set
    /// and is dropped.
    pub fn set_hotspots(&mut self, hotspots: Vec<Hotspot>) {
        self.pending = None;
        self.hotspots.set_hotspots(hotspots);
    }

    pub fn hotspots(&self) -> &[Hotspot] {
        self.hotspots.hotspots()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.pending = None;
        let (min, max) = self.fov_limits();
        self.camera.orientation.fov = self.camera.orientation.fov.clamp(min, max);
        log::debug!("viewer mode {mode:?}");
    }

    pub fn set_available_targets(&mut self, targets: Vec<TargetOption>) {
        self.available_targets = targets;
    }

    pub fn available_targets(&self) -> &[TargetOption] {
        &self.available_targets
    }

    // ---- state ----

    pub fn orientation(&self) -> OrientationState {
        self.camera.orientation
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Position of the placement awaiting confirmation, in the form it was
    /// made (3D tap or flat editor).
    pub fn pending_position(&self) -> Option<HotspotPosition> {
        self.pending
    }

    pub fn controls_visible(&self, now: Instant) -> bool {
        self.gestures.controls_visible(now)
    }

    pub fn fov_limits(&self) -> (f64, f64) {
        match self.mode {
            InteractionMode::Edit => (self.config.edit_min_fov, self.config.max_fov),
            InteractionMode::View => (self.config.min_fov, self.config.max_fov),
        }
    }

    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        self.events.drain(..).collect()
    }

    // ---- input ----

    pub fn pointer_pressed(&mut self, pointer: PointerId, position: DVec2, now: Instant) {
        if self.is_disposed() {
            return;
        }
        self.gestures.press(pointer, position, now);
    }

    pub fn pointer_moved(&mut self, pointer: PointerId, position: DVec2) {
        if self.is_disposed() {
            return;
        }
        if let Some(delta) = self.gestures.move_to(pointer, position) {
            self.camera
                .orientation
                .drag(delta.x, delta.y, self.config.drag_sensitivity);
        }
    }

    pub fn pointer_released(&mut self, pointer: PointerId, position: DVec2, now: Instant) {
        if self.is_disposed() {
            return;
        }
        if let GestureOutcome::Tap { position } = self.gestures.release(pointer, position, now) {
            self.handle_tap(position);
        }
    }

    pub fn pointer_cancelled(&mut self, pointer: PointerId, now: Instant) {
        self.gestures.cancel(pointer, now);
    }

    /// Abandons whatever gesture is in progress, whichever pointer owns it.
    pub fn cancel_gesture(&mut self, now: Instant) {
        if let Some(pointer) = self.gestures.active_pointer() {
            self.gestures.cancel(pointer, now);
        }
    }

    /// Positive delta (scroll down) zooms out.
    pub fn wheel(&mut self, delta: f64) {
        if self.is_disposed() {
            return;
        }
        let (min, max) = self.fov_limits();
        self.camera
            .orientation
            .zoom(delta, self.config.zoom_speed, min, max);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        self.camera.update_aspect(width, height);
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height);
        }
    }

    /// Host-triggered: look straight ahead at the default zoom.
    pub fn reset_view(&mut self) {
        let fov = self.config.default_fov;
        self.camera.orientation.reset(fov);
    }

    fn handle_tap(&mut self, position: DVec2) {
        let (w, h) = self.viewport;
        let ray = self
            .camera
            .screen_to_ray(position.x, position.y, w as f64, h as f64);

        match self.mode {
            InteractionMode::Edit => {
                if self.hotspots.is_full() {
                    self.report_full();
                    return;
                }
                let Some(anchor) = self.hotspots.hit_test_sphere(&ray, self.config.sphere_radius) else {
                    log::debug!("tap missed the panorama sphere");
                    return;
                };
                self.request_placement(HotspotPosition::Spherical(SphericalPoint::from_vec(anchor)));
            }
            InteractionMode::View => {
                if let Some(hotspot) = self.hotspots.hit_test_hotspots(&ray) {
                    log::info!(
                        "hotspot {} -> {}",
                        hotspot.display_title(),
                        hotspot.target_panorama_id
                    );
                    self.events
                        .push_back(ViewerEvent::Navigate(hotspot.target_panorama_id.clone()));
                }
            }
        }
    }

    // ---- authoring ----

    fn report_full(&mut self) {
        self.events.push_back(ViewerEvent::Error(ViewerError::TooManyHotspots {
            max: crate::tour::MAX_HOTSPOTS_PER_SCENE,
        }));
    }

    fn request_placement(&mut self, position: HotspotPosition) {
        self.pending = Some(position);
        self.events.push_back(ViewerEvent::HotspotPlacementRequested {
            anchor: position.to_spherical(),
        });
    }

    /// Flat-editor click at `point` percent of the equirectangular image.
    /// Same rules as an edit-mode tap; the hotspot keeps its planar form.
    pub fn place_planar(&mut self, point: PlanarPercent) {
        if self.is_disposed() {
            return;
        }
        if self.mode != InteractionMode::Edit {
            log::debug!("ignoring planar placement outside edit mode");
            return;
        }
        if self.hotspots.is_full() {
            self.report_full();
            return;
        }
        self.request_placement(HotspotPosition::Planar(point.clamped()));
    }

    /// Completes a pending placement. Blank title falls back to
    /// "Hotspot N", blank description to none.
    pub fn confirm_hotspot(
        &mut self,
        target_panorama_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Hotspot, ViewerError> {
        if self.is_disposed() {
            return Err(ViewerError::Disposed);
        }
        let position = self.pending.ok_or(ViewerError::NoPendingPlacement)?;
        if !self.available_targets.is_empty()
            && !self.available_targets.iter().any(|t| t.id == target_panorama_id)
        {
            return Err(ViewerError::DanglingHotspotTarget(target_panorama_id.to_string()));
        }

        let title = non_blank(title).unwrap_or_else(|| format!("Hotspot {}", self.hotspots.len() + 1));
        let description = non_blank(description);

        let created = self
            .hotspots
            .create(position, target_panorama_id, Some(title), description);
        self.pending = None;
        let hotspot = created?;
        log::info!("created hotspot {} -> {}", hotspot.id, target_panorama_id);
        self.events.push_back(ViewerEvent::HotspotCreated(hotspot.clone()));
        Ok(hotspot)
    }

    pub fn cancel_hotspot(&mut self) {
        self.pending = None;
    }

    pub fn delete_hotspot(&mut self, hotspot_id: &str) {
        if self.hotspots.delete_by_id(hotspot_id) {
            self.events
                .push_back(ViewerEvent::HotspotDeleted(hotspot_id.to_string()));
        }
    }

    /// Screen positions (physical pixels) of the markers in front of the
    /// camera, for title labels.
    pub fn hotspot_screen_positions(&self) -> Vec<(&Hotspot, DVec2)> {
        let (w, h) = self.viewport;
        let geometry = self.hotspots.geometry();
        self.hotspots
            .hotspots()
            .iter()
            .filter_map(|hotspot| {
                let center = geometry.marker_center(hotspot.anchor());
                self.camera
                    .world_to_screen(center, w as f64, h as f64)
                    .map(|(x, y)| (hotspot, DVec2::new(x, y)))
            })
            .collect()
    }

    // ---- frame ----

    /// Called once per frame before drawing.
    pub fn update(&mut self, now: Instant) {
        if self.is_disposed() {
            return;
        }
        if let Some(outcome) = self.loader.poll() {
            self.apply_load(outcome);
        }

        let seconds = now.saturating_duration_since(self.started_at).as_secs_f64();
        let markers = self.hotspots.marker_frame(seconds);
        if let Some(surface) = self.surface.as_mut() {
            surface.set_camera(&self.camera);
            surface.set_markers(&markers);
        }
    }

    fn apply_load(&mut self, outcome: LoadOutcome) {
        match outcome.result {
            Ok(image) => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.set_panorama(&image);
                }
            }
            Err(e) => {
                log::warn!("{e}");
                self.events.push_back(ViewerEvent::Error(e));
            }
        }
        self.set_loading(false);
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.events.push_back(ViewerEvent::LoadingStateChanged(loading));
        }
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

impl<S: RenderSurface> Drop for PanoramaViewer<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::{Scene, Tour};
    use image::Rgba;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Default)]
    struct Record {
        cameras: usize,
        panoramas: Vec<(u32, u32)>,
        markers: usize,
        sizes: Vec<(u32, u32)>,
        releases: usize,
    }

    #[derive(Default, Clone)]
    struct RecordingSurface(Rc<RefCell<Record>>);

    impl RenderSurface for RecordingSurface {
        fn set_camera(&mut self, _camera: &Camera) {
            self.0.borrow_mut().cameras += 1;
        }
        fn set_panorama(&mut self, image: &RgbaImage) {
            self.0.borrow_mut().panoramas.push(image.dimensions());
        }
        fn set_markers(&mut self, frame: &MarkerFrame) {
            self.0.borrow_mut().markers = frame.spheres.len();
        }
        fn resize(&mut self, width: u32, height: u32) {
            self.0.borrow_mut().sizes.push((width, height));
        }
        fn release(&mut self) {
            self.0.borrow_mut().releases += 1;
        }
    }

    const CENTER: DVec2 = DVec2::new(400.0, 300.0);

    fn viewer(props: ViewerProps) -> (PanoramaViewer<RecordingSurface>, RecordingSurface) {
        let surface = RecordingSurface::default();
        let v = PanoramaViewer::new(surface.clone(), props, ViewerConfig::default(), 800, 600);
        (v, surface)
    }

    fn tap(v: &mut PanoramaViewer<RecordingSurface>, at: DVec2) {
        let t0 = Instant::now();
        v.pointer_pressed(PointerId::Mouse, at, t0);
        v.pointer_released(PointerId::Mouse, at, t0 + Duration::from_millis(50));
    }

    fn drag(v: &mut PanoramaViewer<RecordingSurface>, from: DVec2, by: DVec2) {
        let t0 = Instant::now();
        v.pointer_pressed(PointerId::Mouse, from, t0);
        v.pointer_moved(PointerId::Mouse, from + by);
        v.pointer_released(PointerId::Mouse, from + by, t0 + Duration::from_millis(400));
    }

    fn wait_until_loaded(v: &mut PanoramaViewer<RecordingSurface>) -> Vec<ViewerEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut events = Vec::new();
        while v.is_loading() {
            assert!(Instant::now() < deadline, "load did not finish");
            std::thread::sleep(Duration::from_millis(5));
            v.update(Instant::now());
            events.extend(v.drain_events());
        }
        events
    }

    #[test]
    fn test_author_then_navigate() {
        let mut tour = Tour::new("t", "T", "");
        let a = tour.add_scene(Scene::new("A", "")).id.clone();
        let b = tour.add_scene(Scene::new("B", "")).id.clone();

        let (mut v, _) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            available_targets: tour.targets_for(&a),
            ..Default::default()
        });

        tap(&mut v, CENTER);
        let events = v.drain_events();
        assert!(matches!(events[..], [ViewerEvent::HotspotPlacementRequested { .. }]));
        let anchor = v.pending_position().unwrap().anchor();
        assert!((anchor - glam::DVec3::X).length() < 1e-6);

        let created = v.confirm_hotspot(&b, None, None).unwrap();
        assert_eq!(created.title.as_deref(), Some("Hotspot 1"));
        assert_eq!(v.drain_events(), vec![ViewerEvent::HotspotCreated(created.clone())]);
        tour.scene_mut(&a).unwrap().add_hotspot(created).unwrap();

        let scene_a = tour.scene(&a).unwrap();
        assert_eq!(scene_a.hotspots.len(), 1);
        assert_eq!(scene_a.hotspots[0].target_panorama_id, b);

        v.set_mode(InteractionMode::View);
        v.set_hotspots(scene_a.hotspots.clone());
        tap(&mut v, CENTER);
        let navigations: Vec<_> = v
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, ViewerEvent::Navigate(_)))
            .collect();
        assert_eq!(navigations, vec![ViewerEvent::Navigate(b.clone())]);
    }

    #[test]
    fn test_view_mode_tap_on_empty_sky_does_nothing() {
        let (mut v, _) = viewer(ViewerProps::default());
        tap(&mut v, CENTER);
        assert!(v.drain_events().is_empty());
        assert!(v.pending_position().is_none());
    }

    #[test]
    fn test_drag_does_not_place_hotspot() {
        let (mut v, _) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            ..Default::default()
        });
        let t0 = Instant::now();
        v.pointer_pressed(PointerId::Mouse, CENTER, t0);
        v.pointer_moved(PointerId::Mouse, CENTER + DVec2::new(4.0, 0.0));
        v.pointer_released(PointerId::Mouse, CENTER + DVec2::new(4.0, 0.0), t0 + Duration::from_millis(50));
        assert!(v.drain_events().is_empty());
        assert!((v.orientation().phi - -0.02).abs() < 1e-9);
    }

    #[test]
    fn test_tap_on_full_scene_reports_cap() {
        let mut engine = HotspotEngine::new(MarkerGeometry::new(500.0, 0.96));
        for i in 0..4 {
            engine
                .create_at(glam::DVec3::new(0.0, 1.0, i as f64), "b", None, None)
                .unwrap();
        }
        let (mut v, _) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            hotspots: engine.hotspots().to_vec(),
            ..Default::default()
        });
        tap(&mut v, CENTER);
        assert_eq!(
            v.drain_events(),
            vec![ViewerEvent::Error(ViewerError::TooManyHotspots { max: 4 })]
        );
        assert!(v.pending_position().is_none());
        assert_eq!(v.hotspots().len(), 4);
    }

    #[test]
    fn test_confirm_rejects_unknown_target() {
        let (mut v, _) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            available_targets: vec![TargetOption {
                id: "scene-b".into(),
                title: "B".into(),
            }],
            ..Default::default()
        });
        assert_eq!(v.confirm_hotspot("scene-b", None, None).unwrap_err(), ViewerError::NoPendingPlacement);

        tap(&mut v, CENTER);
        v.drain_events();
        assert_eq!(
            v.confirm_hotspot("scene-gone", None, None).unwrap_err(),
            ViewerError::DanglingHotspotTarget("scene-gone".into())
        );
        // Still pending; a valid target succeeds.
        let h = v.confirm_hotspot("scene-b", Some("  Lobby ".into()), Some("   ".into())).unwrap();
        assert_eq!(h.title.as_deref(), Some("Lobby"));
        assert_eq!(h.description, None);
    }

    #[test]
    fn test_scene_change_drops_pending_placement() {
        let mut tour = Tour::new("t", "T", "");
        let a = tour.add_scene(Scene::new("A", "/x/a.jpg")).id.clone();
        let b = tour.add_scene(Scene::new("B", "/x/b.jpg")).id.clone();
        let (mut v, _) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            available_targets: tour.targets_for(&a),
            ..Default::default()
        });

        tap(&mut v, CENTER);
        assert!(v.pending_position().is_some());
        v.set_available_targets(tour.targets_for(&b));
        v.set_hotspots(Vec::new());
        v.load_panorama("/x/b.jpg");
        assert!(v.pending_position().is_none());
        assert_eq!(v.confirm_hotspot(&a, None, None).unwrap_err(), ViewerError::NoPendingPlacement);

        // A different image alone also drops it; reloading the same one keeps it.
        tap(&mut v, CENTER);
        v.load_panorama("/x/a.jpg");
        assert!(v.pending_position().is_none());
        tap(&mut v, CENTER);
        v.load_panorama("/x/a.jpg");
        assert!(v.pending_position().is_some());
    }

    #[test]
    fn test_description_is_stored() {
        let (mut v, _) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            ..Default::default()
        });
        tap(&mut v, CENTER);
        let h = v
            .confirm_hotspot("scene-b", None, Some(" Stairs to the roof ".into()))
            .unwrap();
        assert_eq!(h.title.as_deref(), Some("Hotspot 1"));
        assert_eq!(h.description.as_deref(), Some("Stairs to the roof"));
        assert_eq!(v.hotspots()[0].description.as_deref(), Some("Stairs to the roof"));
    }

    #[test]
    fn test_planar_placement() {
        let (mut v, _) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            ..Default::default()
        });
        v.place_planar(PlanarPercent { x: 75.0, y: 50.0 });
        let events = v.drain_events();
        let [ViewerEvent::HotspotPlacementRequested { anchor }] = events[..] else {
            panic!("unexpected events {events:?}");
        };
        let expected = crate::orientation::two_d_to_sphere(75.0, 50.0);
        assert!((anchor.to_vec() - expected).length() < 1e-9);

        let h = v.confirm_hotspot("scene-b", None, None).unwrap();
        assert_eq!(h.title.as_deref(), Some("Hotspot 1"));
        assert_eq!(h.position, HotspotPosition::Planar(PlanarPercent { x: 75.0, y: 50.0 }));

        // Out-of-image clicks are clamped to the border.
        v.place_planar(PlanarPercent { x: 130.0, y: -5.0 });
        assert_eq!(
            v.pending_position(),
            Some(HotspotPosition::Planar(PlanarPercent { x: 100.0, y: 0.0 }))
        );
        assert_eq!(
            v.confirm_hotspot("scene-b", None, None).unwrap().title.as_deref(),
            Some("Hotspot 2")
        );
    }

    #[test]
    fn test_planar_placement_respects_cap_and_mode() {
        let (mut v, _) = viewer(ViewerProps::default());
        v.place_planar(PlanarPercent { x: 50.0, y: 50.0 });
        assert!(v.pending_position().is_none());
        assert!(v.drain_events().is_empty());

        v.set_mode(InteractionMode::Edit);
        for i in 0..4 {
            v.place_planar(PlanarPercent { x: 10.0 * i as f64, y: 50.0 });
            v.confirm_hotspot("scene-b", None, None).unwrap();
        }
        v.drain_events();
        v.place_planar(PlanarPercent { x: 90.0, y: 50.0 });
        assert_eq!(
            v.drain_events(),
            vec![ViewerEvent::Error(ViewerError::TooManyHotspots { max: 4 })]
        );
        assert!(v.pending_position().is_none());
    }

    #[test]
    fn test_delete_emits_once() {
        let (mut v, _) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            ..Default::default()
        });
        tap(&mut v, CENTER);
        let h = v.confirm_hotspot("scene-b", None, None).unwrap();
        v.drain_events();

        v.delete_hotspot(&h.id);
        v.delete_hotspot(&h.id);
        assert_eq!(v.drain_events(), vec![ViewerEvent::HotspotDeleted(h.id)]);
    }

    #[test]
    fn test_wheel_respects_mode_limits() {
        let (mut v, _) = viewer(ViewerProps::default());
        v.wheel(-10_000.0);
        assert_eq!(v.orientation().fov, 30.0);
        v.set_mode(InteractionMode::Edit);
        v.wheel(-10_000.0);
        assert_eq!(v.orientation().fov, 10.0);
        v.set_mode(InteractionMode::View);
        assert_eq!(v.orientation().fov, 30.0);
        v.wheel(10_000.0);
        assert_eq!(v.orientation().fov, 120.0);
    }

    #[test]
    fn test_reset_view() {
        let (mut v, _) = viewer(ViewerProps::default());
        drag(&mut v, CENTER, DVec2::new(120.0, -60.0));
        v.wheel(300.0);
        v.reset_view();
        assert_eq!(v.orientation(), OrientationState::default());
    }

    #[test]
    fn test_failed_load_keeps_viewer_interactive() {
        let (mut v, surface) = viewer(ViewerProps {
            image_url: "/nonexistent/missing-panorama.jpg".into(),
            ..Default::default()
        });
        assert!(v.is_loading());
        assert_eq!(v.drain_events(), vec![ViewerEvent::LoadingStateChanged(true)]);

        let events = wait_until_loaded(&mut v);
        assert!(events.contains(&ViewerEvent::LoadingStateChanged(false)));
        assert!(events
            .iter()
            .any(|e| matches!(e, ViewerEvent::Error(ViewerError::TextureLoadFailed { .. }))));
        assert!(surface.0.borrow().panoramas.is_empty());

        let before = v.orientation();
        drag(&mut v, CENTER, DVec2::new(50.0, 20.0));
        v.update(Instant::now());
        assert_ne!(v.orientation(), before);
        assert!(surface.0.borrow().cameras > 0);
    }

    #[test]
    fn test_http_404_reports_error_and_stops_loading() {
        let url = crate::loader::test_support::serve_not_found();
        let (mut v, surface) = viewer(ViewerProps::default());
        v.load_panorama(&url);
        assert_eq!(v.drain_events(), vec![ViewerEvent::LoadingStateChanged(true)]);

        let events = wait_until_loaded(&mut v);
        assert_eq!(events.last(), Some(&ViewerEvent::LoadingStateChanged(false)));
        assert!(events.iter().any(|e| matches!(
            e,
            ViewerEvent::Error(ViewerError::TextureLoadFailed { url: failed, .. }) if *failed == url
        )));
        assert!(surface.0.borrow().panoramas.is_empty());
    }

    #[test]
    fn test_successful_load_sets_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pano.png");
        RgbaImage::from_pixel(16, 8, Rgba([200, 100, 50, 255])).save(&path).unwrap();

        let (mut v, surface) = viewer(ViewerProps::default());
        v.load_panorama(path.to_str().unwrap());
        assert_eq!(v.drain_events(), vec![ViewerEvent::LoadingStateChanged(true)]);
        let events = wait_until_loaded(&mut v);
        assert_eq!(events, vec![ViewerEvent::LoadingStateChanged(false)]);
        assert_eq!(surface.0.borrow().panoramas, vec![(16, 8)]);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (mut v, surface) = viewer(ViewerProps::default());
        v.dispose();
        v.dispose();
        assert!(v.is_disposed());
        assert_eq!(surface.0.borrow().releases, 1);

        // Input after disposal is ignored.
        drag(&mut v, CENTER, DVec2::new(80.0, 0.0));
        assert_eq!(v.orientation().phi, 0.0);
        drop(v);
        assert_eq!(surface.0.borrow().releases, 1);
    }

    #[test]
    fn test_dispose_during_load_clears_loading() {
        let (mut v, _) = viewer(ViewerProps {
            image_url: "/nonexistent/slow-panorama.jpg".into(),
            ..Default::default()
        });
        assert!(v.is_loading());
        v.dispose();
        assert!(!v.is_loading());
        assert_eq!(
            v.drain_events(),
            vec![
                ViewerEvent::LoadingStateChanged(true),
                ViewerEvent::LoadingStateChanged(false)
            ]
        );
        // The late result is never applied.
        std::thread::sleep(Duration::from_millis(50));
        v.update(Instant::now());
        assert!(v.drain_events().is_empty());
    }

    #[test]
    fn test_focus_loss_cancels_touch_gesture() {
        let (mut v, _) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            ..Default::default()
        });
        let touch = PointerId::Touch(7);
        let t0 = Instant::now();
        v.pointer_pressed(touch, CENTER, t0);
        v.cancel_gesture(t0 + Duration::from_millis(10));
        v.pointer_released(touch, CENTER, t0 + Duration::from_millis(20));
        assert!(v.drain_events().is_empty());
        assert!(v.pending_position().is_none());

        // The next gesture starts normally.
        tap(&mut v, CENTER);
        assert!(v.pending_position().is_some());
    }

    #[test]
    fn test_hotspot_screen_positions() {
        let (mut v, _) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            ..Default::default()
        });
        tap(&mut v, CENTER);
        let ahead = v.confirm_hotspot("scene-b", None, None).unwrap();
        v.place_planar(PlanarPercent { x: 0.0, y: 50.0 });
        v.confirm_hotspot("scene-b", None, None).unwrap();

        // Only the marker in front of the camera is projected.
        let labels = v.hotspot_screen_positions();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].0.id, ahead.id);
        assert!((labels[0].1 - CENTER).length() < 1e-6);
    }

    #[test]
    fn test_drop_releases_surface() {
        let (v, surface) = viewer(ViewerProps::default());
        drop(v);
        assert_eq!(surface.0.borrow().releases, 1);
    }

    #[test]
    fn test_update_pushes_markers_and_resize_reaches_surface() {
        let (mut v, surface) = viewer(ViewerProps {
            mode: InteractionMode::Edit,
            ..Default::default()
        });
        tap(&mut v, CENTER);
        v.confirm_hotspot("b", None, None).unwrap();
        v.update(Instant::now());
        assert_eq!(surface.0.borrow().markers, 1);

        v.resize(1024, 512);
        v.resize(0, 512);
        assert_eq!(surface.0.borrow().sizes, vec![(1024, 512)]);
        assert!((v.camera().aspect - 2.0).abs() < 1e-12);
    }
}
