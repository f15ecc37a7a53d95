use crate::framing::FrameKind;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A frame matched both magics but is too short to hold its mandatory fields.
    #[error("malformed {kind:?} frame: got {actual} bytes, need at least {minimum}")]
    MalformedFrame {
        kind: FrameKind,
        actual: usize,
        minimum: usize,
    },

    #[error("unrecognized frame kind")]
    UnrecognizedFrame,

    /// Internal invariant violated; indicates a logic defect, not stream noise.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The byte source failed and the producer stopped reading.
    #[error("transport failed: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
