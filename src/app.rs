//! The eframe window: toolbar, surface view and status line.

use std::path::PathBuf;

use eframe::egui;

use crate::config::Config;
use crate::error::SurfaceError;
use crate::export;
use crate::image_layer::{ImageSource, LayerEvent};
use crate::input;
use crate::model::Color;
use crate::render::Surface;
use crate::session::Session;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff"];

/// Everything decided before the window opens.
pub struct AppOptions {
    pub config: Config,
    pub default_image: ImageSource,
    /// When set, exports go straight here instead of through a dialog.
    pub export_path: Option<PathBuf>,
}

enum Status {
    Info(String),
    Error(String),
}

// ── Surface cache ───────────────────────────────────────────────────────────

/// Keeps the rendered surface and the on-screen texture in step with the
/// session. Both track their own revision, so rendering for an export does
/// not swallow the texture upload.
struct SurfaceCache {
    surface: Surface,
    rendered: Option<(u64, u64)>,
    uploaded: Option<(u64, u64)>,
}

impl SurfaceCache {
    fn new(surface: Surface) -> Self {
        Self {
            surface,
            rendered: None,
            uploaded: None,
        }
    }

    /// Re-renders the surface if the session changed since the last pass.
    fn refresh(&mut self, session: &Session) {
        let revision = session.revision();
        if self.rendered == Some(revision) {
            return;
        }
        session.render_into(&mut self.surface);
        self.rendered = Some(revision);
    }

    /// Pixels the texture has not seen yet.
    fn pending_upload(&mut self) -> Option<egui::ColorImage> {
        if self.uploaded == self.rendered {
            return None;
        }
        self.uploaded = self.rendered;
        Some(self.surface.to_color_image())
    }
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct AnnotateApp {
    session: Session,
    cache: SurfaceCache,
    texture: Option<egui::TextureHandle>,
    export_path: Option<PathBuf>,
    export_file_name: String,
    status: Option<Status>,
}

impl AnnotateApp {
    pub fn new(ctx: &egui::Context, options: AppOptions) -> Result<Self, SurfaceError> {
        let AppOptions {
            config,
            default_image,
            export_path,
        } = options;
        let surface = Surface::new(config.surface.width, config.surface.height)?;
        let mut session = Session::new(
            (config.surface.width, config.surface.height),
            config.style.to_style(),
            config.style.default_color,
        );

        let repaint = ctx.clone();
        session.load_default(default_image, move || repaint.request_repaint());

        Ok(Self {
            session,
            cache: SurfaceCache::new(surface),
            texture: None,
            export_path,
            export_file_name: config.export.file_name,
            status: None,
        })
    }

    fn apply_layer_events(&mut self) {
        for event in self.session.pump() {
            match event {
                LayerEvent::Installed { label, .. } => {
                    self.status = Some(Status::Info(format!("Loaded {label}")));
                }
                LayerEvent::Failed { label, error, .. } => {
                    self.status = Some(Status::Error(format!("Could not load {label}: {error}")));
                }
                LayerEvent::Discarded { .. } => {}
            }
        }
    }

    fn refresh_texture(&mut self, ctx: &egui::Context) {
        self.cache.refresh(&self.session);
        let Some(image) = self.cache.pending_upload() else {
            return;
        };
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("surface", image, egui::TextureOptions::LINEAR));
            }
        }
    }

    fn pick_upload(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        self.status = Some(Status::Info(format!("Loading {}…", path.display())));
        let repaint = ctx.clone();
        self.session.upload(path, move || repaint.request_repaint());
    }

    fn export(&mut self) {
        self.cache.refresh(&self.session);
        let target = match &self.export_path {
            Some(path) => Some(path.clone()),
            None => rfd::FileDialog::new()
                .set_file_name(&self.export_file_name)
                .add_filter("PNG", &["png"])
                .save_file(),
        };
        let Some(path) = target else {
            return;
        };
        self.status = Some(match export::save_png(&self.cache.surface, &path) {
            Ok(()) => Status::Info(format!("Exported to {}", path.display())),
            Err(err) => {
                log::error!("{err}");
                Status::Error(err.to_string())
            }
        });
    }

    fn commit(&mut self) {
        if self.session.store.commit_current() {
            let count = self.session.store.finalized().len();
            self.status = Some(Status::Info(format!("Drawing {count} added")));
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if !self.session.layer.is_loaded() {
            return;
        }
        let (commit, export, reset) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Enter),
                i.modifiers.command && i.key_pressed(egui::Key::S),
                i.modifiers.command && i.key_pressed(egui::Key::R),
            )
        });
        if commit {
            self.commit();
        }
        if reset {
            self.session.store.reset();
        }
        if export {
            self.export();
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            if ui.button("Upload Image").clicked() {
                self.pick_upload(ctx);
            }
            if !self.session.layer.is_loaded() {
                return;
            }

            ui.separator();
            if ui.button("Add Drawing").clicked() {
                self.commit();
            }

            ui.separator();
            let mut rgb = self.session.store.current().color.to_rgb_array();
            if ui.color_edit_button_srgb(&mut rgb).changed() {
                self.session.store.set_color(Color::from_rgb_array(rgb));
            }
            ui.label("Drawing Color");

            ui.separator();
            if ui.button("Export Image").clicked() {
                self.export();
            }

            if self.session.store.has_content() {
                ui.separator();
                if ui.button("Reset Drawing").clicked() {
                    self.session.store.reset();
                }
            }
        });
    }

    fn status_line(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let store = &self.session.store;
            ui.label(format!(
                "{} drawings, {} points, color {}",
                store.finalized().len(),
                store.point_count(),
                store.current().color
            ));
            if let Some(image) = self.session.layer.active() {
                ui.separator();
                ui.label(format!("{} ({}x{})", image.label, image.width, image.height));
            }
            match &self.status {
                Some(Status::Info(msg)) => {
                    ui.separator();
                    ui.label(msg);
                }
                Some(Status::Error(msg)) => {
                    ui.separator();
                    ui.colored_label(egui::Color32::from_rgb(220, 50, 50), msg);
                }
                None => {}
            }
        });
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for AnnotateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_layer_events();
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui, ctx);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.status_line(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let logical = self.cache.surface.size();
            let displayed = input::display_rect(ui.available_rect_before_wrap(), logical);
            let response = ui.allocate_rect(displayed, egui::Sense::click());

            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.session.click(pos, displayed, logical);
                }
            }

            self.refresh_texture(ctx);

            let painter = ui.painter();
            painter.rect_filled(displayed, 12.0, egui::Color32::from_gray(40));
            if let Some(ref tex) = self.texture {
                painter.image(
                    tex.id(),
                    displayed,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            painter.rect_stroke(
                displayed,
                12.0,
                egui::Stroke::new(2.0, egui::Color32::BLACK),
                egui::StrokeKind::Outside,
            );

            if !self.session.layer.is_loaded() {
                let text = if self.session.layer.in_flight() > 0 {
                    "Loading image…"
                } else {
                    "No image loaded"
                };
                painter.text(
                    displayed.center(),
                    egui::Align2::CENTER_CENTER,
                    text,
                    egui::FontId::proportional(18.0),
                    egui::Color32::LIGHT_GRAY,
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;
    use crate::render::Style;

    fn cache_and_session() -> (SurfaceCache, Session) {
        let surface = Surface::new(40, 20).unwrap();
        let session = Session::new((40, 20), Style::default(), Color::DEFAULT);
        (SurfaceCache::new(surface), session)
    }

    #[test]
    fn first_refresh_produces_an_upload() {
        let (mut cache, session) = cache_and_session();
        cache.refresh(&session);
        let image = cache.pending_upload().unwrap();
        assert_eq!(image.size, [40, 20]);
        assert!(cache.pending_upload().is_none());
    }

    #[test]
    fn unchanged_session_needs_no_upload() {
        let (mut cache, session) = cache_and_session();
        cache.refresh(&session);
        cache.pending_upload();
        cache.refresh(&session);
        assert!(cache.pending_upload().is_none());
    }

    #[test]
    fn export_refresh_still_reaches_the_texture() {
        let (mut cache, mut session) = cache_and_session();
        cache.refresh(&session);
        cache.pending_upload();

        session.store.add_point(Point::new(10.0, 10.0));
        // Export renders first, then the frame refreshes the texture.
        cache.refresh(&session);
        cache.refresh(&session);

        let image = cache.pending_upload().expect("edit must reach the texture");
        assert_eq!(image.pixels[10 * 40 + 10], egui::Color32::from_rgb(0xff, 0x9a, 0x00));
    }
}
