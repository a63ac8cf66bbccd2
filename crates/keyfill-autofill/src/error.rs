use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No active tab found")]
    NoActiveTab,

    #[error("Autofill failed: {0}")]
    InjectionFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
