//! Rasterizes the image and annotations onto the fixed-size surface.
//!
//! Everything is redrawn from scratch on each call; the output depends only
//! on the arguments, so two calls with equal inputs give equal pixels.

use image::{imageops::FilterType, DynamicImage, RgbaImage};
use tiny_skia::{
    ColorU8, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::error::SurfaceError;
use crate::model::{Annotation, Color, Point};

/// Line width and marker size used for every annotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub stroke_width: f32,
    pub marker_radius: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke_width: 3.0,
            marker_radius: 3.0,
        }
    }
}

// ── Backdrop ────────────────────────────────────────────────────────────────

/// An image already stretched to exactly the surface size.
#[derive(Clone)]
pub struct Backdrop {
    pixmap: Pixmap,
}

impl Backdrop {
    /// Stretches `image` to `width`x`height`. Aspect ratio is not kept.
    pub fn fit(image: &DynamicImage, width: u32, height: u32) -> Result<Self, SurfaceError> {
        let mut pixmap = Pixmap::new(width, height)
            .ok_or(SurfaceError::InvalidSize { width, height })?;
        let scaled = image
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgba8();
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(scaled.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }
}

// ── Surface ─────────────────────────────────────────────────────────────────

/// The drawing region everything is composited into.
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        let pixmap = Pixmap::new(width, height)
            .ok_or(SurfaceError::InvalidSize { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Logical size, as used by the input mapping.
    pub fn size(&self) -> egui::Vec2 {
        egui::vec2(self.width() as f32, self.height() as f32)
    }

    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    pub fn draw_backdrop(&mut self, backdrop: &Backdrop) {
        self.pixmap.draw_pixmap(
            0,
            0,
            backdrop.pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    /// Strokes the closed outline through `points`. Nothing is drawn for
    /// fewer than two points.
    pub fn stroke_polygon(&mut self, points: &[Point], width: f32, color: Color) {
        let edges = outline_edges(points);
        let Some((first, _)) = edges.first() else {
            return;
        };

        let mut pb = PathBuilder::new();
        pb.move_to(first.x, first.y);
        for (_, to) in &edges {
            pb.line_to(to.x, to.y);
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let stroke = Stroke {
            width,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
    }

    pub fn fill_circle(&mut self, center: Point, radius: f32, color: Color) {
        if let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) {
            self.pixmap.fill_path(
                &path,
                &paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    /// Premultiplied RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Straight-alpha copy of the current pixels.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width(), self.height());
        for (dst, src) in out.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    pub fn to_color_image(&self) -> egui::ColorImage {
        egui::ColorImage::from_rgba_premultiplied(
            [self.width() as usize, self.height() as usize],
            self.pixmap.data(),
        )
    }
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

// ── Drawing ─────────────────────────────────────────────────────────────────

/// Edges of the closed polygon through `points`: each consecutive pair,
/// then last back to first. Empty for fewer than two points.
pub fn outline_edges(points: &[Point]) -> Vec<(Point, Point)> {
    if points.len() < 2 {
        return Vec::new();
    }
    let mut edges: Vec<(Point, Point)> = points.windows(2).map(|w| (w[0], w[1])).collect();
    edges.push((points[points.len() - 1], points[0]));
    edges
}

fn draw_annotation(surface: &mut Surface, annotation: &Annotation, style: &Style) {
    surface.stroke_polygon(&annotation.points, style.stroke_width, annotation.color);
    for &p in &annotation.points {
        surface.fill_circle(p, style.marker_radius, annotation.color);
    }
}

/// Redraws the whole surface: backdrop, finalized annotations in order,
/// then the current annotation on top.
pub fn render(
    surface: &mut Surface,
    backdrop: Option<&Backdrop>,
    finalized: &[Annotation],
    current: &Annotation,
    style: &Style,
) {
    surface.clear();
    if let Some(backdrop) = backdrop {
        surface.draw_backdrop(backdrop);
    }
    for annotation in finalized {
        draw_annotation(surface, annotation, style);
    }
    draw_annotation(surface, current, style);
    log::debug!(
        "rendered {} finalized annotations, current has {} points",
        finalized.len(),
        current.points.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);
    const GREEN: Color = Color::rgb(0, 255, 0);

    fn annotation(points: &[(f32, f32)], color: Color) -> Annotation {
        Annotation {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            color,
        }
    }

    fn pixel(surface: &Surface, x: u32, y: u32) -> [u8; 4] {
        surface.to_rgba_image().get_pixel(x, y).0
    }

    fn painted(surface: &Surface) -> Vec<(u32, u32)> {
        surface
            .to_rgba_image()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] != 0)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn edges_close_the_polygon() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        let c = Point::new(10.0, 10.0);

        assert!(outline_edges(&[]).is_empty());
        assert!(outline_edges(&[a]).is_empty());
        assert_eq!(outline_edges(&[a, b]), vec![(a, b), (b, a)]);
        assert_eq!(outline_edges(&[a, b, c]), vec![(a, b), (b, c), (c, a)]);
    }

    #[test]
    fn blank_render_is_transparent() {
        let mut surface = Surface::new(40, 20).unwrap();
        render(&mut surface, None, &[], &Annotation::empty(RED), &Style::default());
        assert!(surface.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn single_point_draws_only_a_marker() {
        let mut surface = Surface::new(100, 100).unwrap();
        let current = annotation(&[(50.0, 50.0)], RED);
        render(&mut surface, None, &[], &current, &Style::default());

        assert_eq!(pixel(&surface, 50, 50), [255, 0, 0, 255]);
        let touched = painted(&surface);
        assert!(!touched.is_empty());
        for (x, y) in touched {
            let dx = x as f32 + 0.5 - 50.0;
            let dy = y as f32 + 0.5 - 50.0;
            assert!((dx * dx + dy * dy).sqrt() <= 4.5, "stray pixel at ({x}, {y})");
        }
    }

    #[test]
    fn two_points_draw_a_segment_between_them() {
        let mut surface = Surface::new(100, 100).unwrap();
        let current = annotation(&[(10.0, 50.5), (90.0, 50.5)], GREEN);
        render(&mut surface, None, &[], &current, &Style::default());

        assert_eq!(pixel(&surface, 50, 50), [0, 255, 0, 255]);
        assert_eq!(pixel(&surface, 50, 10)[3], 0);
    }

    #[test]
    fn current_is_drawn_over_finalized() {
        let mut surface = Surface::new(200, 200).unwrap();
        let finalized = [annotation(&[(100.0, 100.0)], GREEN)];
        let current = annotation(&[(100.0, 100.0)], RED);
        render(&mut surface, None, &finalized, &current, &Style::default());

        assert_eq!(pixel(&surface, 100, 100), [255, 0, 0, 255]);
    }

    #[test]
    fn later_finalized_occlude_earlier() {
        let mut surface = Surface::new(200, 200).unwrap();
        let finalized = [
            annotation(&[(100.0, 100.0)], RED),
            annotation(&[(100.0, 100.0)], GREEN),
        ];
        render(&mut surface, None, &finalized, &Annotation::empty(RED), &Style::default());

        assert_eq!(pixel(&surface, 100, 100), [0, 255, 0, 255]);
    }

    #[test]
    fn render_is_deterministic() {
        let mut img = RgbaImage::new(8, 8);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = image::Rgba([(x * 30) as u8, (y * 30) as u8, 100, 255]);
        }
        let backdrop = Backdrop::fit(&DynamicImage::ImageRgba8(img), 120, 60).unwrap();
        let finalized = [annotation(&[(5.0, 5.0), (100.0, 8.0), (60.0, 55.0)], RED)];
        let current = annotation(&[(20.0, 20.0), (30.5, 40.25)], GREEN);
        let style = Style::default();

        let mut a = Surface::new(120, 60).unwrap();
        let mut b = Surface::new(120, 60).unwrap();
        render(&mut a, Some(&backdrop), &finalized, &current, &style);
        render(&mut b, Some(&backdrop), &finalized, &current, &style);
        assert_eq!(a.data(), b.data());

        render(&mut a, Some(&backdrop), &finalized, &current, &style);
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn backdrop_is_stretched_to_fill() {
        let mut img = RgbaImage::new(4, 2);
        for (x, _, p) in img.enumerate_pixels_mut() {
            *p = if x < 2 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            };
        }
        let backdrop = Backdrop::fit(&DynamicImage::ImageRgba8(img), 1000, 500).unwrap();
        assert_eq!((backdrop.width(), backdrop.height()), (1000, 500));

        let mut surface = Surface::new(1000, 500).unwrap();
        render(&mut surface, Some(&backdrop), &[], &Annotation::empty(RED), &Style::default());

        let left = pixel(&surface, 10, 250);
        let right = pixel(&surface, 990, 250);
        assert!(left[0] > 250 && left[2] < 5, "left was {left:?}");
        assert!(right[2] > 250 && right[0] < 5, "right was {right:?}");
        assert!(pixel(&surface, 0, 0)[3] > 250);
        assert!(pixel(&surface, 999, 499)[3] > 250);
    }

    #[test]
    fn out_of_bounds_points_are_clipped() {
        let mut surface = Surface::new(50, 50).unwrap();
        let current = annotation(&[(-100.0, 25.0), (500.0, 25.0)], RED);
        render(&mut surface, None, &[], &current, &Style::default());

        for x in 0..50 {
            assert_eq!(pixel(&surface, x, 25), [255, 0, 0, 255], "row 25 at x={x}");
        }
        assert_eq!(pixel(&surface, 25, 5)[3], 0);
        for (x, y) in painted(&surface) {
            assert!((23..=26).contains(&y), "stray pixel at ({x}, {y})");
        }
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert_eq!(
            Surface::new(0, 10).err(),
            Some(SurfaceError::InvalidSize { width: 0, height: 10 })
        );
    }
}
