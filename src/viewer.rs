//! Interactive annotation without a window.
//!
//! The viewer shows one spectral channel at a time and remembers the last
//! clicked pixel. Its state is a small immutable value; every interaction is
//! a pure transition to the next state, so the click contract can be tested
//! and scripted without a display.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::GrayImage;

use crate::catalog::location_of;
use crate::data::{Cube, LoaderError, LoaderRegistry};
use crate::model::{AnnotationType, BodyPart, Coordinate, PatientId, wavelength_of};
use crate::spectral::{ExtractError, SpectralWindow};
use crate::store::{AnnotationLog, LogEntry, StoreError};

/// An interaction delivered by the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    /// Slider moved to a channel.
    SelectBand(usize),
    /// Pixel clicked.
    Click(Coordinate),
    /// Forget the last click.
    ClearClick,
}

/// What the viewer currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerState {
    pub band_count: usize,
    pub current_band: usize,
    pub last_click: Option<Coordinate>,
}

impl ViewerState {
    /// Initial state: first channel, nothing clicked.
    pub fn new(band_count: usize) -> Self {
        Self {
            band_count,
            current_band: 0,
            last_click: None,
        }
    }

    /// State after `event`.
    pub fn apply(self, event: ViewerEvent) -> Self {
        match event {
            ViewerEvent::SelectBand(band) => Self {
                current_band: band.min(self.band_count.saturating_sub(1)),
                ..self
            },
            ViewerEvent::Click(coordinate) => Self {
                last_click: Some(coordinate),
                ..self
            },
            ViewerEvent::ClearClick => Self {
                last_click: None,
                ..self
            },
        }
    }

    /// Window title for the current channel.
    pub fn title(&self) -> String {
        match wavelength_of(self.current_band) {
            Some(nm) => format!("Peak wavelength {} nm", nm),
            None => format!("Channel {}", self.current_band),
        }
    }
}

/// The capability the annotator needs from a GUI.
pub trait AnnotationDisplay {
    /// Show `cube` and return the most recently clicked pixel, if any.
    fn display(&mut self, cube: &Cube, wavelengths: &[u32]) -> Option<Coordinate>;
}

/// A display that replays a fixed list of interactions.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDisplay {
    events: VecDeque<ViewerEvent>,
    last_state: Option<ViewerState>,
}

impl ScriptedDisplay {
    pub fn new(events: impl IntoIterator<Item = ViewerEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            last_state: None,
        }
    }

    /// State reached at the end of the last `display` call.
    pub fn last_state(&self) -> Option<ViewerState> {
        self.last_state
    }
}

impl AnnotationDisplay for ScriptedDisplay {
    fn display(&mut self, cube: &Cube, wavelengths: &[u32]) -> Option<Coordinate> {
        let mut state = ViewerState::new(cube.band_count());
        log::debug!(
            "Displaying {}x{} cube over {} wavelengths",
            cube.width(),
            cube.height(),
            wavelengths.len()
        );

        while let Some(event) = self.events.pop_front() {
            state = state.apply(event);
            log::trace!("{:?} -> {}", event, state.title());
        }

        self.last_state = Some(state);
        state.last_click
    }
}

/// Render one channel as an 8-bit grayscale image, stretched to its min/max.
///
/// Returns `None` if the band does not exist.
pub fn render_band(cube: &Cube, band: usize) -> Option<GrayImage> {
    let view = cube.band(band)?;
    let (height, width) = view.dim();

    let (min, max) = view
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = if max > min { max - min } else { 1.0 };

    Some(GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let v = view[[y as usize, x as usize]];
        let level = if v.is_finite() && min.is_finite() {
            ((v - min) / span * 255.0).round().clamp(0.0, 255.0) as u8
        } else {
            0
        };
        image::Luma([level])
    }))
}

/// Errors of an interactive annotation session.
#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    #[error("Failed to open measurement: {0}")]
    Load(#[from] LoaderError),

    #[error("Cannot derive patient/body part from {0:?}")]
    UnknownLocation(PathBuf),

    #[error("Rejected click: {0}")]
    OutOfBounds(#[from] ExtractError),

    #[error("Failed to save annotation: {0}")]
    Store(#[from] StoreError),

    #[error("Band {band} out of range ({band_count} bands)")]
    BandOutOfRange { band: usize, band_count: usize },

    #[error("Failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

/// One opened measurement being annotated.
pub struct Annotator {
    path: PathBuf,
    patient_id: PatientId,
    body_part: BodyPart,
    cube: Cube,
    log: AnnotationLog,
}

impl Annotator {
    /// Open a measurement for annotation.
    ///
    /// Patient and body part are the names of the file's two parent
    /// directories.
    pub fn open(
        registry: &LoaderRegistry,
        path: &Path,
        log: AnnotationLog,
    ) -> Result<Self, AnnotatorError> {
        let (patient_id, body_part) =
            location_of(path).ok_or_else(|| AnnotatorError::UnknownLocation(path.to_path_buf()))?;
        let cube = registry.load_cube(path)?;

        log::info!(
            "Annotating {:?} ({} / {}, shape {:?})",
            path,
            patient_id,
            body_part,
            cube.shape()
        );

        Ok(Self {
            path: path.to_path_buf(),
            patient_id,
            body_part,
            cube,
            log,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cube(&self) -> &Cube {
        &self.cube
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn body_part(&self) -> &BodyPart {
        &self.body_part
    }

    /// Show the measurement and return the clicked pixel, if any.
    pub fn select_point(&self, display: &mut dyn AnnotationDisplay) -> Option<Coordinate> {
        display.display(&self.cube, &crate::model::wavelengths())
    }

    /// Save a confirmed point. Returns the log file written.
    ///
    /// Clicks outside the image are rejected and nothing is written.
    pub fn confirm(
        &self,
        annotation_type: AnnotationType,
        click: Coordinate,
    ) -> Result<PathBuf, AnnotatorError> {
        SpectralWindow::clamped(click, 1, self.cube.height(), self.cube.width())?;

        let entry = LogEntry {
            image_path: self.path.clone(),
            coordinates: click,
            annotation_type,
            body_part: self.body_part.clone(),
            patient_id: self.patient_id.clone(),
        };
        Ok(self.log.append(&entry)?)
    }

    /// Write the given channel as a PNG.
    pub fn save_band_png(&self, band: usize, out: &Path) -> Result<(), AnnotatorError> {
        let img = render_band(&self.cube, band).ok_or(AnnotatorError::BandOutOfRange {
            band,
            band_count: self.cube.band_count(),
        })?;
        img.save(out)?;
        log::info!("Wrote band {} preview to {:?}", band, out);
        Ok(())
    }
}

/// Open several measurements, reporting and skipping those that fail to load.
pub fn open_all(
    registry: &LoaderRegistry,
    paths: &[PathBuf],
    log: &AnnotationLog,
) -> Vec<Annotator> {
    paths
        .iter()
        .filter_map(|path| match Annotator::open(registry, path, log.clone()) {
            Ok(annotator) => Some(annotator),
            Err(e) => {
                log::error!("Skipping {:?}: {}", path, e);
                None
            }
        })
        .collect()
}
