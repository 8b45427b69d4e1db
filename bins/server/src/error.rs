#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("metrics: {0}")]
    Metrics(String),

    #[error("{0}")]
    Serve(#[from] user_api_server::ServeError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
