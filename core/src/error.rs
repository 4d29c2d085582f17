use thiserror::Error;

/// Input rejected before any computation or persistence happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter valid numeric Age, Weight (kg) and Height (cm).")]
    InvalidMeasurements,

    #[error("Unknown goal '{0}'. Use maintain, cut, or bulk")]
    UnknownGoal(String),

    #[error("Unknown sex '{0}'. Use male or female")]
    UnknownSex(String),
}

/// Failure talking to the remote plan service. Never fatal: callers fall
/// back to the local store.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not reach server: {0}")]
    Transport(String),

    #[error("invalid server response: {0}")]
    InvalidResponse(&'static str),
}
