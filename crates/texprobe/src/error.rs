use std::{io, path::PathBuf};

/// Probe related errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("image error: {0}")]
    Image(#[from] image::error::ImageError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("no compatible gpu adapter found")]
    NoAdapter,

    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("texture rejected: {0}")]
    TextureRejected(String),

    #[error("texture copy rejected: {0}")]
    CopyRejected(String),

    #[error("unsupported texture format {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),

    #[error("buffer map failed: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    /// The gpu dropped a completion callback without calling it. Should
    /// only happen if the device was lost.
    #[error("completion signal dropped before firing")]
    SignalDropped,

    #[error("image has no pixels")]
    EmptyImage,

    #[error("preview surface {0} does not exist")]
    MissingPreviewSurface(PathBuf),

    #[error("generic error: {0}")]
    Generic(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
