//! Glues the image layer to the annotation store.

use std::path::PathBuf;

use egui::{Pos2, Rect, Vec2};

use crate::image_layer::{ImageLayer, ImageSource, LayerEvent, LoadKind};
use crate::input;
use crate::model::Color;
use crate::render::{self, Style, Surface};
use crate::store::AnnotationStore;

pub struct Session {
    pub store: AnnotationStore,
    pub layer: ImageLayer,
    style: Style,
}

impl Session {
    pub fn new(surface_size: (u32, u32), style: Style, default_color: Color) -> Self {
        Self {
            store: AnnotationStore::new(default_color),
            layer: ImageLayer::new(surface_size.0, surface_size.1),
            style,
        }
    }

    pub fn load_default<F>(&mut self, source: ImageSource, notify: F) -> u64
    where
        F: FnOnce() + Send + 'static,
    {
        self.layer.request(source, LoadKind::Initial, notify)
    }

    pub fn upload<F>(&mut self, path: PathBuf, notify: F) -> u64
    where
        F: FnOnce() + Send + 'static,
    {
        self.layer
            .request(ImageSource::File(path), LoadKind::Upload, notify)
    }

    /// Installs finished decodes. A freshly uploaded image discards the
    /// annotations drawn over the previous one.
    pub fn pump(&mut self) -> Vec<LayerEvent> {
        let events = self.layer.poll();
        for event in &events {
            if let LayerEvent::Installed {
                kind: LoadKind::Upload,
                ..
            } = event
            {
                self.store.reset();
            }
        }
        events
    }

    pub fn click(&mut self, pointer: Pos2, displayed: Rect, logical: Vec2) -> bool {
        input::handle_click(
            &mut self.store,
            self.layer.is_loaded(),
            pointer,
            displayed,
            logical,
        )
    }

    /// Changes whenever a re-render would produce different pixels.
    pub fn revision(&self) -> (u64, u64) {
        (self.store.revision(), self.layer.revision())
    }

    pub fn render_into(&self, surface: &mut Surface) {
        render::render(
            surface,
            self.layer.backdrop(),
            self.store.finalized(),
            self.store.current(),
            &self.style,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_layer::tests::write_png;
    use crate::model::Point;
    use egui::{pos2, vec2};
    use std::time::{Duration, Instant};

    fn pump_until_idle(session: &mut Session) -> Vec<LayerEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut events = Vec::new();
        while session.layer.in_flight() > 0 {
            assert!(Instant::now() < deadline, "decode did not finish");
            events.extend(session.pump());
            std::thread::sleep(Duration::from_millis(5));
        }
        events
    }

    fn loaded_session() -> Session {
        let mut session = Session::new((100, 50), Style::default(), Color::DEFAULT);
        session.load_default(ImageSource::Bundled, || {});
        pump_until_idle(&mut session);
        assert!(session.layer.is_loaded());
        session
    }

    #[test]
    fn initial_load_keeps_annotations() {
        let mut session = Session::new((100, 50), Style::default(), Color::DEFAULT);
        session.store.add_point(Point::new(1.0, 1.0));
        session.load_default(ImageSource::Bundled, || {});
        let events = pump_until_idle(&mut session);

        assert!(matches!(
            events.as_slice(),
            [LayerEvent::Installed {
                kind: LoadKind::Initial,
                ..
            }]
        ));
        assert_eq!(session.store.current().points.len(), 1);
    }

    #[test]
    fn upload_resets_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "new.png", 16, 8);

        let mut session = loaded_session();
        let full = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 50.0));
        session.click(pos2(10.0, 10.0), full, full.size());
        session.store.commit_current();
        session.store.set_color(Color::rgb(0, 255, 0));
        session.click(pos2(20.0, 20.0), full, full.size());
        let before = session.revision();

        session.upload(path.clone(), || {});
        pump_until_idle(&mut session);

        assert!(session.store.finalized().is_empty());
        assert!(session.store.current().is_empty());
        assert_eq!(session.store.current().color, Color::DEFAULT);
        assert_eq!(
            session.layer.active().unwrap().label,
            path.display().to_string()
        );
        assert_ne!(session.revision(), before);
    }

    #[test]
    fn failed_upload_keeps_image_and_annotations() {
        let mut session = loaded_session();
        let full = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 50.0));
        session.click(pos2(10.0, 10.0), full, full.size());

        session.upload(PathBuf::from("/nonexistent/upload.png"), || {});
        let events = pump_until_idle(&mut session);

        assert!(matches!(events.as_slice(), [LayerEvent::Failed { .. }]));
        assert!(session.layer.is_loaded());
        assert_eq!(session.store.current().points.len(), 1);
    }

    #[test]
    fn revision_tracks_render_relevant_changes() {
        let mut session = loaded_session();
        let start = session.revision();
        session.store.commit_current();
        assert_eq!(session.revision(), start);

        let full = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 50.0));
        session.click(pos2(1.0, 1.0), full, full.size());
        assert_ne!(session.revision(), start);
    }
}
