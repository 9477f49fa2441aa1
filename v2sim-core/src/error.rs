use thiserror::Error;

/// Errors raised while building a simulation.
///
/// The daily tick itself never fails; these only come from loading and setup.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unknown {kind} '{identifier}'")]
    UnknownIdentifier {
        kind: &'static str,
        identifier: String,
    },

    #[error("Duplicate {kind} '{identifier}'")]
    DuplicateIdentifier {
        kind: &'static str,
        identifier: String,
    },

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
