use trainer_core::TrainerError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: reqwest::StatusCode, url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Trainer(#[from] TrainerError),
}

impl From<ClientError> for TrainerError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Trainer(inner) => inner,
            other => TrainerError::Fetch(other.to_string()),
        }
    }
}
