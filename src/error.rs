use santiago::lexer::LexerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("circular ref involving {0}")]
    CircularRef(String),

    #[error("Invalid cell name: {0}")]
    InvalidCellName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short machine-readable code, as reported on the command line.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "SYNTAX",
            Self::CircularRef(_) => "CIRCULAR_REF",
            Self::InvalidCellName(_) => "INVALID_CELL",
            Self::Io(_) => "IO",
            Self::Json(_) => "JSON",
        }
    }
}

impl From<LexerError> for Error {
    fn from(err: LexerError) -> Self {
        Self::Syntax(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
