use thiserror::Error;

/// Substring the image provider puts in its message when the daily quota is gone.
const QUOTA_EXCEEDED_MARKER: &str = "quota exceeded";

/// Failures of calls to the generative APIs, classified so callers can decide
/// whether to block the current step or fall back to placeholder text.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key configured. Raised before any network attempt.
    #[error("API Key is required.")]
    MissingApiKey,

    /// A step was started before the choices it builds on were made.
    #[error("{0}")]
    MissingInput(String),

    /// Provider or network failure.
    #[error("{0}")]
    Transport(String),

    /// Provider rejected the call because the quota is used up.
    #[error("{0}")]
    QuotaExceeded(String),

    /// The model answered with nothing at all.
    #[error("AI returned an empty response")]
    EmptyResponse,

    /// The model answered, but not in the shape we asked for.
    #[error("AI returned invalid data format: {reason}")]
    MalformedGeneration { reason: String, raw: String },
}

impl GenerationError {
    /// Turns an opaque client error into a classified one. Errors that are
    /// already classified pass through; anything else is a transport error,
    /// unless its message carries the quota marker.
    pub fn classify(err: anyhow::Error) -> Self {
        match err.downcast::<GenerationError>() {
            Ok(classified) => classified,
            Err(other) => {
                let message = format!("{:#}", other);
                if is_quota_message(&message) {
                    GenerationError::QuotaExceeded(message)
                } else {
                    GenerationError::Transport(message)
                }
            }
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            GenerationError::QuotaExceeded(_) => true,
            GenerationError::Transport(message) => is_quota_message(message),
            _ => false,
        }
    }

    /// Text safe to show to the user. Never includes raw model output.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::MissingApiKey => {
                "Please set your API Key in the settings before generating content.".to_string()
            }
            GenerationError::MissingInput(message) | GenerationError::Transport(message) => message.clone(),
            GenerationError::QuotaExceeded(_) => {
                "You have reached your daily image generation quota. You can continue without a cover image."
                    .to_string()
            }
            GenerationError::EmptyResponse => "AI returned an empty response. Please try again.".to_string(),
            GenerationError::MalformedGeneration { .. } => {
                "AI returned invalid data format. Please try again.".to_string()
            }
        }
    }
}

pub fn is_quota_message(message: &str) -> bool {
    message.to_lowercase().contains(QUOTA_EXCEEDED_MARKER)
}
