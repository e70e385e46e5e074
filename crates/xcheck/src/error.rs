use std::path::PathBuf;

use thiserror::Error;

/// Oracle and CLI errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("runtime error: {0}")]
    Runtime(#[from] xcheck_runtime::RuntimeError),
    #[error("session file error: {0}")]
    Codec(#[from] xcheck_runtime::CodecError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("site map line {line}: {message}")]
    SiteMap { line: usize, message: String },
    #[error("no counterpart for {}", .0.display())]
    MissingPair(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
