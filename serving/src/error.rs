use std::{error::Error, fmt};

pub type Result<T> = std::result::Result<T, SmokeErr>;

#[derive(Debug)]
pub enum SmokeErr {
    /// The http client couldn't be built.
    Client(reqwest::Error),
}

impl fmt::Display for SmokeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(e) => write!(f, "failed to build http client: {e}"),
        }
    }
}

impl Error for SmokeErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Client(e) => Some(e),
        }
    }
}

impl From<reqwest::Error> for SmokeErr {
    fn from(e: reqwest::Error) -> Self {
        Self::Client(e)
    }
}
