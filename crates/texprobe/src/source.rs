use std::{fmt, path::PathBuf};

use tokio::sync::oneshot;
use tracing::debug;
use url::Url;

use crate::{Bitmap, Error, Result};

/// Where the probe image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(Url),
    Path(PathBuf),

    /// A synthetic single-color bitmap. Skips fetching and decoding.
    Solid {
        width: u32,
        height: u32,
        rgba: [u8; 4],
    },
}

impl ImageSource {
    /// `http(s)://...` is a url, `solid:WxH:r,g,b,a` is a synthetic
    /// bitmap, anything else is a local path.
    pub fn parse(s: &str) -> Result<Self> {
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(ImageSource::Url(Url::parse(s)?));
        }

        if let Some(spec) = s.strip_prefix("solid:") {
            return parse_solid(spec)
                .ok_or_else(|| Error::Generic(format!("bad solid source '{s}'")));
        }

        Ok(ImageSource::Path(PathBuf::from(s)))
    }
}

fn parse_solid(spec: &str) -> Option<ImageSource> {
    let (size, color) = spec.split_once(':')?;
    let (w, h) = size.split_once('x')?;
    let width = w.parse().ok()?;
    let height = h.parse().ok()?;

    let channels: Vec<u8> = color
        .split(',')
        .map(|c| c.trim().parse())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    let rgba: [u8; 4] = channels.try_into().ok()?;

    Some(ImageSource::Solid {
        width,
        height,
        rgba,
    })
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Url(url) => write!(f, "{url}"),
            ImageSource::Path(path) => write!(f, "{}", path.display()),
            ImageSource::Solid {
                width,
                height,
                rgba: [r, g, b, a],
            } => write!(f, "solid:{width}x{height}:{r},{g},{b},{a}"),
        }
    }
}

pub async fn fetch_bytes(source: &ImageSource) -> Result<Vec<u8>> {
    match source {
        ImageSource::Url(url) => fetch_url(url).await,
        ImageSource::Path(path) => Ok(tokio::fs::read(path).await?),
        ImageSource::Solid { .. } => Err(Error::Generic(format!(
            "{source} is synthetic and has no bytes to fetch"
        ))),
    }
}

async fn fetch_url(url: &Url) -> Result<Vec<u8>> {
    let (sender, receiver) = oneshot::channel();

    let on_done = move |response: std::result::Result<ehttp::Response, String>| {
        let handle = response.map_err(Error::Fetch).and_then(|resp| {
            if !resp.ok {
                return Err(Error::Fetch(format!(
                    "bad http response: {} {}",
                    resp.status, resp.status_text
                )));
            }

            Ok(resp.bytes)
        });

        let _ = sender.send(handle);
    };

    let request = ehttp::Request::get(url);
    ehttp::fetch(request, on_done);

    receiver.await.map_err(|_| Error::SignalDropped)?
}

/// Fetch and decode `source` into a bitmap.
pub async fn load_bitmap(source: &ImageSource) -> Result<Bitmap> {
    if let ImageSource::Solid {
        width,
        height,
        rgba,
    } = source
    {
        return Bitmap::solid(*width, *height, *rgba);
    }

    let bytes = fetch_bytes(source).await?;
    debug!("fetched {} bytes from {source}", bytes.len());

    let bitmap = Bitmap::decode(&bytes)?;
    debug!("decoded {source} to {}x{}", bitmap.width, bitmap.height);

    Ok(bitmap)
}
