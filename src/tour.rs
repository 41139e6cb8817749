// tour.rs — 全景漫游数据模型 (Tour / Scene / Hotspot)
//
// Persisted layout:
// { id, title, description,
//   scenes: [{ id, panoramaId, title, image,
//              hotspots: [{ id, x, y, z, title, description, targetPanorama }] }],
//   startingScene }
//
// A hotspot record without `z` is a planar (percent) hotspot from 2D
// authoring. Records are always written back in the 3D form.

use crate::error::ViewerError;
use crate::orientation::{HotspotPosition, PlanarPercent, SphericalPoint};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hard cap, checked when a hotspot is created.
pub const MAX_HOTSPOTS_PER_SCENE: usize = 4;

pub fn new_hotspot_id() -> String {
    format!("hotspot-{}", uuid::Uuid::new_v4())
}

pub fn new_scene_id() -> String {
    format!("scene-{}", uuid::Uuid::new_v4())
}

pub fn new_tour_id() -> String {
    format!("tour-{}", uuid::Uuid::new_v4())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HotspotRecord", into = "HotspotRecord")]
pub struct Hotspot {
    pub id: String,
    pub position: HotspotPosition,
    pub title: Option<String>,
    pub target_panorama_id: String,
    pub description: Option<String>,
}

impl Hotspot {
    pub fn anchor(&self) -> glam::DVec3 {
        self.position.anchor()
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotspotRecord {
    id: String,
    x: f64,
    y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    z: Option<f64>,
    #[serde(default)]
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    target_panorama: String,
}

impl From<HotspotRecord> for Hotspot {
    fn from(r: HotspotRecord) -> Self {
        let position = match r.z {
            Some(z) => HotspotPosition::Spherical(SphericalPoint::from_vec(glam::DVec3::new(r.x, r.y, z))),
            None => HotspotPosition::Planar(PlanarPercent { x: r.x, y: r.y }),
        };
        Self {
            id: r.id,
            position,
            title: Some(r.title).filter(|t| !t.is_empty()),
            target_panorama_id: r.target_panorama,
            description: r.description,
        }
    }
}

impl From<Hotspot> for HotspotRecord {
    fn from(h: Hotspot) -> Self {
        let p = h.position.to_spherical();
        Self {
            id: h.id,
            x: p.x,
            y: p.y,
            z: Some(p.z),
            title: h.title.unwrap_or_default(),
            description: h.description,
            target_panorama: h.target_panorama_id,
        }
    }
}

/// Metadata edit for an existing hotspot. Blank title or description clears
/// the field; the position never changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HotspotEdit {
    pub title: String,
    pub target_panorama_id: String,
    pub description: String,
}

impl HotspotEdit {
    /// Form contents for `hotspot`.
    pub fn from_hotspot(hotspot: &Hotspot) -> Self {
        Self {
            title: hotspot.title.clone().unwrap_or_default(),
            target_panorama_id: hotspot.target_panorama_id.clone(),
            description: hotspot.description.clone().unwrap_or_default(),
        }
    }

    pub fn apply_to(&self, hotspot: &mut Hotspot) {
        let trimmed = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        hotspot.title = trimmed(&self.title);
        hotspot.description = trimmed(&self.description);
        hotspot.target_panorama_id = self.target_panorama_id.clone();
    }
}

/// One panorama inside a tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub panorama_id: String,
    pub title: String,
    /// Image URL or path of the equirectangular panorama.
    #[serde(rename = "image")]
    pub image_url: String,
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
}

impl Scene {
    pub fn new(title: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            id: new_scene_id(),
            panorama_id: String::new(),
            title: title.into(),
            image_url: image_url.into(),
            hotspots: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.hotspots.len() >= MAX_HOTSPOTS_PER_SCENE
    }

    /// Appends a hotspot, refusing once the scene holds the maximum.
    pub fn add_hotspot(&mut self, hotspot: Hotspot) -> Result<&Hotspot, ViewerError> {
        if self.is_full() {
            return Err(ViewerError::TooManyHotspots {
                max: MAX_HOTSPOTS_PER_SCENE,
            });
        }
        self.hotspots.push(hotspot);
        Ok(&self.hotspots[self.hotspots.len() - 1])
    }

    /// Returns `false` when no hotspot had that id.
    pub fn remove_hotspot(&mut self, hotspot_id: &str) -> bool {
        let before = self.hotspots.len();
        self.hotspots.retain(|h| h.id != hotspot_id);
        self.hotspots.len() != before
    }

    pub fn hotspot_mut(&mut self, hotspot_id: &str) -> Option<&mut Hotspot> {
        self.hotspots.iter_mut().find(|h| h.id == hotspot_id)
    }
}

/// `{id, title}` pair offered as a hotspot destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOption {
    pub id: String,
    pub title: String,
}

/// A hotspot whose target is not (or no longer) a scene of the tour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingHotspot {
    pub scene_id: String,
    pub hotspot_id: String,
    pub target_panorama_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(rename = "startingScene", default)]
    pub starting_scene_id: String,
}

impl Tour {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            scenes: Vec::new(),
            starting_scene_id: String::new(),
        }
    }

    /// The first scene added becomes the starting scene.
    pub fn add_scene(&mut self, scene: Scene) -> &Scene {
        if self.starting_scene_id.is_empty() {
            self.starting_scene_id = scene.id.clone();
        }
        self.scenes.push(scene);
        &self.scenes[self.scenes.len() - 1]
    }

    /// Removes a scene and keeps `starting_scene_id` valid.
    ///
    /// Hotspots in other scenes that pointed at the removed scene are left in
    /// place and returned as dangling; navigating through them is a no-op.
    pub fn remove_scene(&mut self, scene_id: &str) -> Option<(Scene, Vec<DanglingHotspot>)> {
        let index = self.scenes.iter().position(|s| s.id == scene_id)?;
        let removed = self.scenes.remove(index);

        if self.starting_scene_id == removed.id {
            self.starting_scene_id = self.scenes.first().map(|s| s.id.clone()).unwrap_or_default();
        }

        let orphaned: Vec<DanglingHotspot> = self
            .dangling_hotspots()
            .into_iter()
            .filter(|d| d.target_panorama_id == removed.id)
            .collect();
        for d in &orphaned {
            log::warn!(
                "hotspot {} in scene {} now points at removed scene {}",
                d.hotspot_id,
                d.scene_id,
                d.target_panorama_id
            );
        }

        Some((removed, orphaned))
    }

    pub fn scene(&self, scene_id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == scene_id)
    }

    pub fn scene_mut(&mut self, scene_id: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.id == scene_id)
    }

    pub fn contains_scene(&self, scene_id: &str) -> bool {
        self.scene(scene_id).is_some()
    }

    pub fn starting_scene(&self) -> Option<&Scene> {
        self.scene(&self.starting_scene_id)
    }

    pub fn set_starting_scene(&mut self, scene_id: &str) -> Result<(), ViewerError> {
        if !self.contains_scene(scene_id) {
            return Err(ViewerError::SceneNotFound(scene_id.to_string()));
        }
        self.starting_scene_id = scene_id.to_string();
        Ok(())
    }

    /// Destinations offered while authoring on `scene_id`: every other scene.
    pub fn targets_for(&self, scene_id: &str) -> Vec<TargetOption> {
        self.scenes
            .iter()
            .filter(|s| s.id != scene_id)
            .map(|s| TargetOption {
                id: s.id.clone(),
                title: s.title.clone(),
            })
            .collect()
    }

    pub fn dangling_hotspots(&self) -> Vec<DanglingHotspot> {
        self.scenes
            .iter()
            .flat_map(|scene| {
                scene
                    .hotspots
                    .iter()
                    .filter(|h| !self.contains_scene(&h.target_panorama_id))
                    .map(|h| DanglingHotspot {
                        scene_id: scene.id.clone(),
                        hotspot_id: h.id.clone(),
                        target_panorama_id: h.target_panorama_id.clone(),
                    })
            })
            .collect()
    }

    pub fn from_json(text: &str) -> Result<Self, ViewerError> {
        let mut tour: Tour = serde_json::from_str(text)?;
        if !tour.scenes.is_empty() && !tour.contains_scene(&tour.starting_scene_id) {
            log::warn!(
                "tour {} has invalid starting scene '{}', using the first scene",
                tour.id,
                tour.starting_scene_id
            );
            tour.starting_scene_id = tour.scenes[0].id.clone();
        }
        Ok(tour)
    }

    pub fn to_json(&self) -> Result<String, ViewerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let text = std::fs::read_to_string(path).map_err(|e| ViewerError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ViewerError> {
        std::fs::write(path, self.to_json()?).map_err(|e| ViewerError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotspot(target: &str) -> Hotspot {
        Hotspot {
            id: new_hotspot_id(),
            position: HotspotPosition::Spherical(SphericalPoint { x: 1.0, y: 0.0, z: 0.0 }),
            title: None,
            target_panorama_id: target.to_string(),
            description: None,
        }
    }

    fn tour_with(titles: &[&str]) -> Tour {
        let mut tour = Tour::new("t1", "Museum", "");
        for title in titles {
            tour.add_scene(Scene::new(*title, format!("{title}.jpg")));
        }
        tour
    }

    #[test]
    fn test_first_scene_becomes_start() {
        let tour = tour_with(&["A", "B"]);
        assert_eq!(tour.starting_scene().unwrap().title, "A");
    }

    #[test]
    fn test_removing_start_scene_promotes_first_remaining() {
        let mut tour = tour_with(&["A", "B", "C"]);
        let a = tour.scenes[0].id.clone();
        let b = tour.scenes[1].id.clone();
        tour.remove_scene(&a).unwrap();
        assert_eq!(tour.starting_scene_id, b);

        // Removing a non-start scene keeps the start.
        let c = tour.scenes[1].id.clone();
        tour.remove_scene(&c).unwrap();
        assert_eq!(tour.starting_scene_id, b);

        tour.remove_scene(&b).unwrap();
        assert_eq!(tour.starting_scene_id, "");
        assert!(tour.remove_scene(&b).is_none());
    }

    #[test]
    fn test_hotspot_cap() {
        let mut scene = Scene::new("A", "a.jpg");
        for _ in 0..MAX_HOTSPOTS_PER_SCENE {
            scene.add_hotspot(hotspot("b")).unwrap();
        }
        let err = scene.add_hotspot(hotspot("b")).unwrap_err();
        assert_eq!(err, ViewerError::TooManyHotspots { max: 4 });
        assert_eq!(scene.hotspots.len(), 4);
    }

    #[test]
    fn test_edit_changes_metadata_only() {
        let mut scene = Scene::new("A", "a.jpg");
        let original = hotspot("scene-b");
        scene.add_hotspot(original.clone()).unwrap();

        let mut edit = HotspotEdit::from_hotspot(&original);
        edit.title = " Kitchen ".into();
        edit.description = "Through the hall".into();
        edit.target_panorama_id = "scene-c".into();
        edit.apply_to(scene.hotspot_mut(&original.id).unwrap());

        let edited = &scene.hotspots[0];
        assert_eq!(edited.title.as_deref(), Some("Kitchen"));
        assert_eq!(edited.description.as_deref(), Some("Through the hall"));
        assert_eq!(edited.target_panorama_id, "scene-c");
        assert_eq!(edited.position, original.position);
        assert!(scene.hotspot_mut("hotspot-missing").is_none());
    }

    #[test]
    fn test_remove_hotspot_is_idempotent() {
        let mut scene = Scene::new("A", "a.jpg");
        let id = scene.add_hotspot(hotspot("b")).unwrap().id.clone();
        assert!(scene.remove_hotspot(&id));
        assert!(!scene.remove_hotspot(&id));
        assert!(scene.hotspots.is_empty());
    }

    #[test]
    fn test_scene_removal_reports_orphans() {
        let mut tour = tour_with(&["A", "B"]);
        let a = tour.scenes[0].id.clone();
        let b = tour.scenes[1].id.clone();
        let hotspot_id = tour.scene_mut(&a).unwrap().add_hotspot(hotspot(&b)).unwrap().id.clone();

        let (_, orphaned) = tour.remove_scene(&b).unwrap();
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].hotspot_id, hotspot_id);
        // The hotspot stays; it is just dangling now.
        assert_eq!(tour.scene(&a).unwrap().hotspots.len(), 1);
        assert_eq!(tour.dangling_hotspots(), orphaned);
    }

    #[test]
    fn test_targets_exclude_current_scene() {
        let tour = tour_with(&["A", "B", "C"]);
        let targets = tour.targets_for(&tour.scenes[1].id);
        let titles: Vec<&str> = targets.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["A", "C"]);
    }

    #[test]
    fn test_json_shape() {
        let mut tour = tour_with(&["A", "B"]);
        let b = tour.scenes[1].id.clone();
        let mut h = hotspot(&b);
        h.title = Some("Door".into());
        tour.scenes[0].add_hotspot(h).unwrap();

        let value: serde_json::Value = serde_json::from_str(&tour.to_json().unwrap()).unwrap();
        assert_eq!(value["startingScene"], tour.scenes[0].id.as_str());
        let scene = &value["scenes"][0];
        assert_eq!(scene["image"], "A.jpg");
        assert!(scene.get("panoramaId").is_some());
        let hs = &scene["hotspots"][0];
        assert_eq!(hs["targetPanorama"], b.as_str());
        assert_eq!(hs["title"], "Door");
        assert_eq!(hs["x"], 1.0);
        assert_eq!(hs["z"], 0.0);
        assert!(hs.get("description").is_none());

        let back = Tour::from_json(&tour.to_json().unwrap()).unwrap();
        assert_eq!(back, tour);
    }

    #[test]
    fn test_planar_record_is_tagged_by_missing_z() {
        let json = r#"{
            "id": "t", "title": "T", "description": "",
            "scenes": [{ "id": "s1", "panoramaId": "p1", "title": "S", "image": "s.jpg",
                "hotspots": [{ "id": "h1", "x": 75.0, "y": 50.0, "title": "", "targetPanorama": "s1" }] }],
            "startingScene": "s1"
        }"#;
        let tour = Tour::from_json(json).unwrap();
        let h = &tour.scenes[0].hotspots[0];
        assert_eq!(h.position, HotspotPosition::Planar(PlanarPercent { x: 75.0, y: 50.0 }));
        assert_eq!(h.title, None);
        // x = 75% is a quarter turn to the right of straight ahead.
        assert!((h.anchor() - glam::DVec3::Z).length() < 1e-9);

        // Written back in the 3D form.
        let value: serde_json::Value = serde_json::from_str(&tour.to_json().unwrap()).unwrap();
        let z = value["scenes"][0]["hotspots"][0]["z"].as_f64().unwrap();
        assert!((z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_starting_scene_repaired_on_load() {
        let json = r#"{ "id": "t", "title": "T",
            "scenes": [{ "id": "s1", "title": "S", "image": "s.jpg" }],
            "startingScene": "gone" }"#;
        let tour = Tour::from_json(json).unwrap();
        assert_eq!(tour.starting_scene_id, "s1");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tour.json");
        let tour = tour_with(&["A"]);
        tour.save(&path).unwrap();
        assert_eq!(Tour::load(&path).unwrap(), tour);

        let missing = Tour::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ViewerError::Io { .. }));
    }
}
