//! The active image and the decode requests that replace it.
//!
//! Decoding happens on a worker thread so the UI never blocks, but the
//! result is only installed from `poll`, on the UI thread. Every request
//! gets a sequence id; a result that is not from the latest request is
//! dropped, so a slow first upload can never overwrite a later one.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

use image::DynamicImage;

use crate::error::DecodeError;
use crate::render::Backdrop;

/// The image shipped with the binary, shown until the user uploads one.
pub const BUNDLED_IMAGE: &[u8] = include_bytes!("../assets/example-img.png");

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Bundled,
    File(PathBuf),
}

impl ImageSource {
    pub fn label(&self) -> String {
        match self {
            ImageSource::Bundled => "bundled example".to_string(),
            ImageSource::File(path) => path.display().to_string(),
        }
    }
}

/// Why an image is being loaded. Uploads clear existing annotations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadKind {
    Initial,
    Upload,
}

pub struct LoadedImage {
    pub label: String,
    /// Size of the decoded file, before stretching.
    pub width: u32,
    pub height: u32,
    pub backdrop: Backdrop,
}

#[derive(Debug)]
pub enum LayerEvent {
    Installed {
        seq: u64,
        kind: LoadKind,
        label: String,
    },
    Failed {
        seq: u64,
        kind: LoadKind,
        label: String,
        error: DecodeError,
    },
    /// A newer request was issued before this one finished.
    Discarded { seq: u64, label: String },
}

struct Decoded {
    seq: u64,
    kind: LoadKind,
    label: String,
    outcome: Result<LoadedImage, DecodeError>,
}

pub struct ImageLayer {
    active: Option<LoadedImage>,
    surface_size: (u32, u32),
    latest_seq: u64,
    in_flight: usize,
    revision: u64,
    tx: Sender<Decoded>,
    rx: Receiver<Decoded>,
}

impl ImageLayer {
    pub fn new(surface_width: u32, surface_height: u32) -> Self {
        let (tx, rx) = channel();
        Self {
            active: None,
            surface_size: (surface_width, surface_height),
            latest_seq: 0,
            in_flight: 0,
            revision: 0,
            tx,
            rx,
        }
    }

    pub fn active(&self) -> Option<&LoadedImage> {
        self.active.as_ref()
    }

    pub fn backdrop(&self) -> Option<&Backdrop> {
        self.active.as_ref().map(|img| &img.backdrop)
    }

    pub fn is_loaded(&self) -> bool {
        self.active.is_some()
    }

    /// Requests whose result has not been seen by `poll` yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Bumped each time a new image is installed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Starts decoding `source` in the background and returns the request's
    /// sequence id. `notify` runs on the worker once the result is queued.
    pub fn request<F>(&mut self, source: ImageSource, kind: LoadKind, notify: F) -> u64
    where
        F: FnOnce() + Send + 'static,
    {
        self.latest_seq += 1;
        self.in_flight += 1;
        let seq = self.latest_seq;
        let (width, height) = self.surface_size;
        let tx = self.tx.clone();
        log::info!("decoding {} (request {seq})", source.label());

        std::thread::spawn(move || {
            let label = source.label();
            let outcome = decode(&source, width, height);
            // The receiver only goes away with the layer itself.
            let _ = tx.send(Decoded {
                seq,
                kind,
                label,
                outcome,
            });
            notify();
        });
        seq
    }

    /// Installs finished decodes. Must be called from the thread that owns
    /// the layer; never blocks.
    pub fn poll(&mut self) -> Vec<LayerEvent> {
        let mut events = Vec::new();
        while let Ok(done) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            events.push(self.accept(done));
        }
        events
    }

    fn accept(&mut self, done: Decoded) -> LayerEvent {
        let Decoded {
            seq,
            kind,
            label,
            outcome,
        } = done;

        if seq != self.latest_seq {
            log::warn!(
                "dropping stale decode of {label} (request {seq}, latest is {})",
                self.latest_seq
            );
            return LayerEvent::Discarded { seq, label };
        }

        match outcome {
            Ok(image) => {
                log::info!(
                    "installed {label} ({}x{}) as the active image",
                    image.width,
                    image.height
                );
                self.active = Some(image);
                self.revision += 1;
                LayerEvent::Installed { seq, kind, label }
            }
            Err(error) => {
                log::error!("failed to load {label}: {error}");
                LayerEvent::Failed {
                    seq,
                    kind,
                    label,
                    error,
                }
            }
        }
    }
}

fn decode(source: &ImageSource, width: u32, height: u32) -> Result<LoadedImage, DecodeError> {
    let image: DynamicImage = match source {
        ImageSource::Bundled => image::load_from_memory(BUNDLED_IMAGE)?,
        ImageSource::File(path) => {
            let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
                path: path.clone(),
                source,
            })?;
            image::load_from_memory(&bytes)?
        }
    };
    let backdrop = Backdrop::fit(&image, width, height)?;
    Ok(LoadedImage {
        label: source.label(),
        width: image.width(),
        height: image.height(),
        backdrop,
    })
}
