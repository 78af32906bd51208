//! Finalized annotations plus the one being built.

use crate::model::{Annotation, Color, Point};

pub struct AnnotationStore {
    finalized: Vec<Annotation>,
    current: Annotation,
    default_color: Color,
    revision: u64,
}

impl AnnotationStore {
    pub fn new(default_color: Color) -> Self {
        Self {
            finalized: Vec::new(),
            current: Annotation::empty(default_color),
            default_color,
            revision: 0,
        }
    }

    pub fn finalized(&self) -> &[Annotation] {
        &self.finalized
    }

    pub fn current(&self) -> &Annotation {
        &self.current
    }

    /// Bumped on every mutation that changes what would be rendered.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_content(&self) -> bool {
        !self.finalized.is_empty() || !self.current.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.finalized.iter().map(|a| a.points.len()).sum::<usize>() + self.current.points.len()
    }

    /// Points outside the surface are kept; the renderer clips them.
    pub fn add_point(&mut self, p: Point) {
        self.current.points.push(p);
        self.revision += 1;
        log::debug!(
            "point ({:.1}, {:.1}) added, current has {}",
            p.x,
            p.y,
            self.current.points.len()
        );
    }

    /// Moves the current annotation into the finalized list. Returns false
    /// and changes nothing when the current annotation has no points.
    pub fn commit_current(&mut self) -> bool {
        if self.current.is_empty() {
            return false;
        }
        let next = Annotation::empty(self.current.color);
        let done = std::mem::replace(&mut self.current, next);
        log::debug!(
            "committed annotation #{} with {} points in {}",
            self.finalized.len() + 1,
            done.points.len(),
            done.color
        );
        self.finalized.push(done);
        self.revision += 1;
        true
    }

    /// Only the current annotation changes color; finalized ones keep
    /// the color they were committed with.
    pub fn set_color(&mut self, color: Color) {
        if self.current.color == color {
            return;
        }
        self.current.color = color;
        self.revision += 1;
    }

    /// Drops everything and goes back to the default color.
    pub fn reset(&mut self) {
        self.finalized.clear();
        self.current = Annotation::empty(self.default_color);
        self.revision += 1;
        log::debug!("annotations reset");
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(Color::DEFAULT)
    }
}
