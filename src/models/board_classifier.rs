//! ONNX board classifier.
//!
//! Wraps a small image classification network whose output vector has one
//! entry per board class (see [`AnnotationKind::from_class_id`]). The label
//! is the argmax of the raw output and the confidence is the raw maximum;
//! no softmax is applied.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::RgbImage;
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::core::config::{ClassifierConfig, ConfigValidator, OrtSessionConfig};
use crate::core::errors::{BoardScanError, BoardScanResult, ProcessingStage};
use crate::core::inference::load_session;
use crate::core::traits::RegionClassifier;
use crate::domain::{AnnotationKind, Classification};
use crate::processors::{aspect_fit_and_pad, to_nchw};

/// Index and value of the largest finite entry of `scores`.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best, (index, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((index, score)),
        })
}

/// Fixed set of exclusive slots shared by concurrent callers.
struct SessionPool<T> {
    slots: Vec<Mutex<T>>,
    next: AtomicUsize,
}

impl<T> SessionPool<T> {
    /// `slots` must not be empty.
    fn new(slots: Vec<T>) -> Self {
        Self {
            slots: slots.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Locks the first free slot, or waits for the next one in rotation.
    fn acquire(&self) -> MutexGuard<'_, T> {
        if let Some(guard) = self.slots.iter().find_map(|slot| slot.try_lock()) {
            return guard;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        self.slots[index].lock()
    }
}

/// Board classifier backed by ONNX Runtime sessions.
///
/// Running a session needs exclusive access. With one session (the default)
/// the crops of a page are classified one after another on whichever rayon
/// worker holds it; [`OnnxBoardClassifierBuilder::sessions`] loads more
/// copies of the model so that many crops run at once.
pub struct OnnxBoardClassifier {
    sessions: SessionPool<Session>,
    config: ClassifierConfig,
}

impl std::fmt::Debug for OnnxBoardClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxBoardClassifier")
            .field("config", &self.config)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl OnnxBoardClassifier {
    pub fn builder() -> OnnxBoardClassifierBuilder {
        OnnxBoardClassifierBuilder::default()
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    fn infer(&self, image: &RgbImage) -> BoardScanResult<Vec<f32>> {
        let padded = aspect_fit_and_pad(image, self.config.input_size, self.config.pad_color)?;
        let input = to_nchw(&padded);
        let tensor = TensorRef::from_array_view(input.view())?;

        let mut session = self.sessions.acquire();
        let outputs = session.run(ort::inputs![tensor]).map_err(|e| {
            BoardScanError::inference_error(&self.config.model_name, "session run failed", e)
        })?;
        let (_, scores) = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            BoardScanError::inference_error(&self.config.model_name, "unexpected output tensor", e)
        })?;
        Ok(scores.to_vec())
    }
}

impl RegionClassifier for OnnxBoardClassifier {
    fn classify(&self, image: &RgbImage) -> BoardScanResult<Classification> {
        let scores = self.infer(image)?;
        let (class_id, confidence) = argmax(&scores).ok_or_else(|| {
            BoardScanError::adapter_execution_error(
                &self.config.model_name,
                ProcessingStage::Classification,
                BoardScanError::invalid_input("classifier returned no scores"),
            )
        })?;

        let kind = AnnotationKind::from_class_id(class_id);
        debug!("{} p={:.3}", kind, confidence);
        Ok(Classification::new(kind, confidence))
    }
}

/// Builder for [`OnnxBoardClassifier`].
#[derive(Debug)]
pub struct OnnxBoardClassifierBuilder {
    config: ClassifierConfig,
    session_config: Option<OrtSessionConfig>,
    sessions: usize,
}

impl Default for OnnxBoardClassifierBuilder {
    fn default() -> Self {
        Self {
            config: ClassifierConfig::default(),
            session_config: None,
            sessions: 1,
        }
    }
}

impl OnnxBoardClassifierBuilder {
    pub fn config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    /// ONNX Runtime settings (threads, execution providers).
    pub fn session_config(mut self, session_config: OrtSessionConfig) -> Self {
        self.session_config = Some(session_config);
        self
    }

    /// Number of model copies that may run concurrently. At least one.
    pub fn sessions(mut self, sessions: usize) -> Self {
        self.sessions = sessions.max(1);
        self
    }

    /// Loads the model at `model_path`.
    pub fn build(self, model_path: impl AsRef<Path>) -> BoardScanResult<OnnxBoardClassifier> {
        self.config.validate()?;
        let model_path = model_path.as_ref();
        let sessions = (0..self.sessions)
            .map(|_| load_session(model_path, self.session_config.as_ref()))
            .collect::<BoardScanResult<Vec<_>>>()?;
        debug!("Loaded {} with {} sessions", model_path.display(), sessions.len());
        Ok(OnnxBoardClassifier {
            sessions: SessionPool::new(sessions),
            config: self.config,
        })
    }
}
