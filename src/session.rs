// session.rs — 漫游播放：当前场景与热点跳转

use crate::error::ViewerError;
use crate::tour::{HotspotEdit, Scene, TargetOption, Tour};

/// Walks a tour scene by scene.
#[derive(Debug, Clone)]
pub struct TourSession {
    tour: Tour,
    current_scene_id: String,
}

impl TourSession {
    /// Starts at the tour's starting scene (empty id for an empty tour).
    pub fn new(tour: Tour) -> Self {
        let current_scene_id = tour
            .starting_scene()
            .or_else(|| tour.scenes.first())
            .map(|s| s.id.clone())
            .unwrap_or_default();
        Self {
            tour,
            current_scene_id,
        }
    }

    pub fn tour(&self) -> &Tour {
        &self.tour
    }

    /// Mutable access for authoring. The current scene is re-validated on
    /// the next [`TourSession::sync`].
    pub fn tour_mut(&mut self) -> &mut Tour {
        &mut self.tour
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.tour.scene(&self.current_scene_id)
    }

    pub fn current_scene_mut(&mut self) -> Option<&mut Scene> {
        self.tour.scene_mut(&self.current_scene_id)
    }

    pub fn current_scene_id(&self) -> &str {
        &self.current_scene_id
    }

    /// Follows a hotspot target. A dangling target is a no-op plus a warning.
    pub fn navigate(&mut self, target_panorama_id: &str) -> Result<&Scene, ViewerError> {
        if !self.tour.contains_scene(target_panorama_id) {
            log::warn!(
                "ignoring navigation from {} to missing scene {}",
                self.current_scene_id,
                target_panorama_id
            );
            return Err(ViewerError::DanglingHotspotTarget(target_panorama_id.to_string()));
        }
        log::info!("navigating {} -> {}", self.current_scene_id, target_panorama_id);
        self.current_scene_id = target_panorama_id.to_string();
        self.tour
            .scene(target_panorama_id)
            .ok_or_else(|| ViewerError::SceneNotFound(target_panorama_id.to_string()))
    }

    /// Direct selection (scene list), not hotspot navigation.
    pub fn select(&mut self, scene_id: &str) -> Result<&Scene, ViewerError> {
        if !self.tour.contains_scene(scene_id) {
            return Err(ViewerError::SceneNotFound(scene_id.to_string()));
        }
        self.current_scene_id = scene_id.to_string();
        self.tour
            .scene(scene_id)
            .ok_or_else(|| ViewerError::SceneNotFound(scene_id.to_string()))
    }

    /// Falls back to the starting scene if the current one was removed.
    /// Returns `true` when the current scene changed.
    pub fn sync(&mut self) -> bool {
        if self.tour.contains_scene(&self.current_scene_id) {
            return false;
        }
        let next = self
            .tour
            .starting_scene()
            .or_else(|| self.tour.scenes.first())
            .map(|s| s.id.clone())
            .unwrap_or_default();
        let changed = next != self.current_scene_id;
        self.current_scene_id = next;
        changed
    }

    pub fn available_targets(&self) -> Vec<TargetOption> {
        self.tour.targets_for(&self.current_scene_id)
    }

    /// Applies a metadata edit to a hotspot of the current scene. The new
    /// target must be another scene of the tour.
    pub fn edit_hotspot(&mut self, hotspot_id: &str, edit: &HotspotEdit) -> Result<&Scene, ViewerError> {
        let target = edit.target_panorama_id.as_str();
        if target == self.current_scene_id || !self.tour.contains_scene(target) {
            return Err(ViewerError::DanglingHotspotTarget(target.to_string()));
        }
        let scene_id = self.current_scene_id.clone();
        let scene = self
            .tour
            .scene_mut(&scene_id)
            .ok_or_else(|| ViewerError::SceneNotFound(scene_id.clone()))?;
        let hotspot = scene
            .hotspot_mut(hotspot_id)
            .ok_or_else(|| ViewerError::HotspotNotFound(hotspot_id.to_string()))?;
        edit.apply_to(hotspot);
        log::info!("edited hotspot {hotspot_id} in {scene_id}");
        Ok(scene)
    }
}
