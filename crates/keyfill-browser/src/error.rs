use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("CDP error: {0}")]
    Cdp(String),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

// At the autofill seam every browser-side failure means the routine did not run.
impl From<Error> for keyfill_autofill::Error {
    fn from(err: Error) -> Self {
        keyfill_autofill::Error::InjectionFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
