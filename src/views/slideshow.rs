//! Paging over the most recent photos.

use crate::{errors::AlbumError, models::photo::Photo};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Loading,
    Failed(String),
    Loaded(Vec<Photo>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next,
    Previous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slideshow {
    phase: Phase,
    index: usize,
}

/// What the client draws.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlideshowRender {
    Loading,
    Error {
        message: String,
    },
    Empty,
    Ready {
        index: usize,
        total: usize,
        photo: Photo,
        controls_enabled: bool,
    },
}

impl Default for Slideshow {
    fn default() -> Self {
        Self::new()
    }
}

impl Slideshow {
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
            index: 0,
        }
    }

    pub fn with_photos(photos: Vec<Photo>) -> Self {
        Self {
            phase: Phase::Loaded(photos),
            index: 0,
        }
    }

    /// Settle from a fetch. Errors keep the shown message generic; the cause
    /// is logged by the caller.
    pub fn load(&mut self, result: Result<Vec<Photo>, AlbumError>) {
        self.index = 0;
        self.phase = match result {
            Ok(photos) => Phase::Loaded(photos),
            Err(_) => Phase::Failed("Failed to load photos. Please try again.".into()),
        };
    }

    fn len(&self) -> usize {
        match &self.phase {
            Phase::Loaded(photos) => photos.len(),
            _ => 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Jump to `index`, wrapping around the sequence.
    pub fn seek(&mut self, index: usize) {
        let len = self.len();
        self.index = if len == 0 { 0 } else { index % len };
    }

    pub fn controls_enabled(&self) -> bool {
        self.len() > 1
    }

    pub fn next(&mut self) {
        if self.controls_enabled() {
            self.index = (self.index + 1) % self.len();
        }
    }

    pub fn previous(&mut self) {
        if self.controls_enabled() {
            let len = self.len();
            self.index = (self.index + len - 1) % len;
        }
    }

    pub fn step(&mut self, step: Step) {
        match step {
            Step::Next => self.next(),
            Step::Previous => self.previous(),
        }
    }

    pub fn current(&self) -> Option<&Photo> {
        match &self.phase {
            Phase::Loaded(photos) => photos.get(self.index),
            _ => None,
        }
    }

    pub fn render(&self) -> SlideshowRender {
        match &self.phase {
            Phase::Loading => SlideshowRender::Loading,
            Phase::Failed(message) => SlideshowRender::Error {
                message: message.clone(),
            },
            Phase::Loaded(_) => match self.current() {
                None => SlideshowRender::Empty,
                Some(photo) => SlideshowRender::Ready {
                    index: self.index,
                    total: self.len(),
                    photo: photo.clone(),
                    controls_enabled: self.controls_enabled(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RemoteError;
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    fn photos(n: usize) -> Vec<Photo> {
        (0..n)
            .map(|i| Photo {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                url: format!("{i}.png"),
                caption: None,
                album_id: None,
                created_at: Utc::now(),
            })
            .collect()
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(7)]
    #[case(10)]
    fn full_cycle_returns_to_start(#[case] len: usize) {
        let mut show = Slideshow::with_photos(photos(len));
        for _ in 0..len {
            show.next();
        }
        assert_eq!(show.index(), 0);
    }

    #[rstest]
    #[case(2)]
    #[case(5)]
    fn previous_from_start_wraps_to_last(#[case] len: usize) {
        let mut show = Slideshow::with_photos(photos(len));
        show.previous();
        assert_eq!(show.index(), len - 1);
    }

    #[test]
    fn single_photo_disables_controls() {
        let mut show = Slideshow::with_photos(photos(1));
        assert!(!show.controls_enabled());
        show.step(Step::Previous);
        assert_eq!(show.index(), 0);
    }

    #[test]
    fn seek_wraps() {
        let mut show = Slideshow::with_photos(photos(3));
        show.seek(4);
        assert_eq!(show.current().map(|p| p.url.as_str()), Some("1.png"));
    }

    #[test]
    fn render_states_are_distinct() {
        let mut show = Slideshow::new();
        assert_eq!(show.render(), SlideshowRender::Loading);

        show.load(Ok(Vec::new()));
        assert_eq!(show.render(), SlideshowRender::Empty);

        show.load(Err(RemoteError::Record("timeout".into()).into()));
        assert!(matches!(show.render(), SlideshowRender::Error { .. }));

        show.load(Ok(photos(2)));
        assert!(matches!(
            show.render(),
            SlideshowRender::Ready { index: 0, total: 2, controls_enabled: true, .. }
        ));
    }
}
