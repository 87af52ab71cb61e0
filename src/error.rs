#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid framer config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
