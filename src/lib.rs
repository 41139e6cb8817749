// lib.rs — panotour：360° 全景漫游查看器与热点编辑引擎

pub mod camera;
pub mod config;
pub mod error;
pub mod gesture;
pub mod hotspot;
pub mod loader;
pub mod mesh;
pub mod orientation;
pub mod renderer;
pub mod session;
pub mod tour;
pub mod viewer;

pub use config::{LaunchOptions, ViewerConfig};
pub use error::ViewerError;
pub use orientation::{HotspotPosition, OrientationState, PlanarPercent, SphericalPoint};
pub use session::TourSession;
pub use tour::{Hotspot, HotspotEdit, Scene, TargetOption, Tour, MAX_HOTSPOTS_PER_SCENE};
pub use viewer::{InteractionMode, PanoramaViewer, RenderSurface, ViewerEvent, ViewerProps};
