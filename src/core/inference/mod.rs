//! ONNX Runtime session loading.

mod ort_infer_config;

use std::path::Path;

use ort::session::Session;
use tracing::{debug, info};

use crate::core::config::OrtSessionConfig;
use crate::core::errors::{BoardScanError, BoardScanResult};

/// Loads an ONNX model into a new session, applying `config` when given.
///
/// A missing or unreadable model is reported as [`BoardScanError::ModelLoad`].
pub fn load_session(
    model_path: impl AsRef<Path>,
    config: Option<&OrtSessionConfig>,
) -> BoardScanResult<Session> {
    let model_path = model_path.as_ref();
    let display_path = model_path.display().to_string();

    if !model_path.is_file() {
        return Err(BoardScanError::model_load_error(
            display_path,
            "file not found",
            Some("pass the bundled classifier with --model or BOARDSCAN_MODEL"),
            None,
        ));
    }

    info!("Loading ONNX model from {}", display_path);

    let mut builder = Session::builder()?;
    if let Some(cfg) = config {
        builder = ort_infer_config::apply_ort_config(builder, cfg)?;
    }

    let session = builder.commit_from_file(model_path).map_err(|e| {
        BoardScanError::model_load_error(
            display_path.clone(),
            "onnx runtime rejected the model",
            None,
            Some(Box::new(e)),
        )
    })?;

    debug!(
        inputs = session.inputs.len(),
        outputs = session.outputs.len(),
        "Model loaded"
    );
    Ok(session)
}
