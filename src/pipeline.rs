use crate::error::OcrError;
use crate::llm_client::{LlmClient, ModelResult};
use crate::session::SessionState;
use crate::upload::UploadedImage;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub filename: String,
    pub result: ModelResult,
    /// True when the result came from the session and no backend call was made.
    pub cached: bool,
}

/// Run one upload through the session: show it as the preview, reuse the
/// cached result when the filename matches, otherwise ask the backend once.
///
/// On backend failure the error is recorded for inline display and the
/// previous result stays in place.
pub async fn analyze_upload(
    session: &mut SessionState,
    image: UploadedImage,
    client: &LlmClient,
) -> Result<Analysis, OcrError> {
    let filename = image.filename.clone();

    if session.last_uploaded_filename.as_deref() == Some(filename.as_str()) {
        if let Some(result) = &session.ocr_result {
            info!("'{}' already analyzed in this session, reusing result", filename);
            let result = result.clone();
            session.image = Some(image);
            session.last_error = None;
            return Ok(Analysis {
                filename,
                result,
                cached: true,
            });
        }
    }

    let outcome = client.transcribe(&image).await;
    session.image = Some(image);

    match outcome {
        Ok(result) => {
            session.ocr_result = Some(result.clone());
            session.last_uploaded_filename = Some(filename.clone());
            session.last_error = None;
            Ok(Analysis {
                filename,
                result,
                cached: false,
            })
        }
        Err(e) => {
            warn!("Analysis of '{}' failed: {}", filename, e);
            session.last_error = Some(e.to_string());
            Err(e)
        }
    }
}

/// Record an upload that never reached the backend.
pub fn reject_upload(session: &mut SessionState, error: &OcrError) {
    warn!("Upload rejected: {}", error);
    session.last_error = Some(error.to_string());
}
