use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("path has no file name to derive an output name from: {}", .0.display())]
    NoFileStem(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
