use thiserror::Error;

/// Run-level errors. Stage failures (search, generation, delivery) are
/// recovered in place and reported through typed outcomes instead.
#[derive(Error, Debug)]
pub enum BriefingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
