// loader.rs — 后台加载全景图
//
// Each request decodes on its own thread and reports back over a channel.
// Requests are numbered; only the newest request's result is delivered,
// so a slow earlier load can never replace a newer texture.

use crate::error::ViewerError;
use image::io::Reader as ImageReader;
use image::{GenericImageView, RgbaImage};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

/// Upper bound on a downloaded panorama.
const MAX_DOWNLOAD_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Http(String),
    File(PathBuf),
}

impl ImageSource {
    pub fn parse(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ImageSource::Http(url.to_string())
        } else if let Some(path) = url.strip_prefix("file://") {
            ImageSource::File(PathBuf::from(path))
        } else {
            ImageSource::File(PathBuf::from(url))
        }
    }
}

/// Fetches and decodes an image synchronously.
pub fn load_image(url: &str) -> Result<RgbaImage, ViewerError> {
    let failed = |reason: String| ViewerError::TextureLoadFailed {
        url: url.to_string(),
        reason,
    };

    let img = match ImageSource::parse(url) {
        ImageSource::File(path) => {
            let file = File::open(&path).map_err(|e| failed(e.to_string()))?;
            ImageReader::new(BufReader::new(file))
                .with_guessed_format()
                .map_err(image::ImageError::IoError)
                .and_then(|mut r| {
                    r.no_limits();
                    r.decode()
                })
        }
        ImageSource::Http(url) => {
            let response = ureq::get(&url)
                .header("User-Agent", concat!("panotour/", env!("CARGO_PKG_VERSION")))
                .call()
                .map_err(|e| failed(e.to_string()))?;
            let bytes = response
                .into_body()
                .into_with_config()
                .limit(MAX_DOWNLOAD_BYTES)
                .read_to_vec()
                .map_err(|e| failed(e.to_string()))?;
            ImageReader::new(Cursor::new(bytes))
                .with_guessed_format()
                .map_err(image::ImageError::IoError)
                .and_then(|mut r| {
                    r.no_limits();
                    r.decode()
                })
        }
    }
    .map_err(|e| failed(e.to_string()))?;

    let (w, h) = img.dimensions();
    log::info!("decoded {url}: {w}x{h}");
    Ok(img.to_rgba8())
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: u64,
    pub url: String,
    pub result: Result<RgbaImage, ViewerError>,
}

pub struct TextureLoader {
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    latest: u64,
    resolved: u64,
}

impl Default for TextureLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureLoader {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            latest: 0,
            resolved: 0,
        }
    }

    /// Starts loading `url` in the background. Supersedes earlier requests.
    pub fn request(&mut self, url: &str) -> u64 {
        self.latest += 1;
        let generation = self.latest;
        let url = url.to_string();
        let tx = self.tx.clone();

        log::info!("loading panorama #{generation} from {url}");
        thread::spawn(move || {
            let result = load_image(&url);
            if tx.send(LoadOutcome { generation, url, result }).is_err() {
                log::debug!("viewer gone before load #{generation} finished");
            }
        });
        generation
    }

    pub fn is_pending(&self) -> bool {
        self.resolved < self.latest
    }

    /// Result of the newest request, once it arrives. Stale results are
    /// dropped on the way.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let mut current = None;
        while let Ok(outcome) = self.rx.try_recv() {
            if outcome.generation == self.latest {
                self.resolved = outcome.generation;
                current = Some(outcome);
            } else {
                log::debug!(
                    "dropping stale load #{} ({}), newest is #{}",
                    outcome.generation,
                    outcome.url,
                    self.latest
                );
            }
        }
        current
    }
}
