use std::collections::BTreeSet;
use std::path::PathBuf;

use texprobe::{ImageSource, PreviewSurface, TextureOptions, DEFAULT_PIXELS};
use tracing::error;

pub const DEFAULT_SOURCE: &str = "bird.jpg";

/// The preview png lands in the working directory unless told otherwise.
pub const DEFAULT_PREVIEW_DIR: &str = ".";

pub struct Args {
    pub source: String,
    pub pixels: u32,
    pub runs: u32,
    pub format: Option<wgpu::TextureFormat>,
    pub label: Option<String>,
    pub preview: Option<PathBuf>,
    pub logdir: Option<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            pixels: DEFAULT_PIXELS,
            runs: 1,
            format: None,
            label: None,
            preview: Some(PathBuf::from(DEFAULT_PREVIEW_DIR)),
            logdir: None,
        }
    }
}

pub fn parse_format(name: &str) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as F;

    match name {
        "rgba8unorm" => Some(F::Rgba8Unorm),
        "rgba8unorm-srgb" => Some(F::Rgba8UnormSrgb),
        "bgra8unorm" => Some(F::Bgra8Unorm),
        "bgra8unorm-srgb" => Some(F::Bgra8UnormSrgb),
        _ => None,
    }
}

impl Args {
    // parse arguments, return set of unrecognized args. args[0] is the
    // program name
    pub fn parse(args: &[String]) -> (Self, BTreeSet<String>) {
        let mut unrecognized_args = BTreeSet::new();
        let mut res = Args::default();
        let mut have_source = false;

        let mut i = 1;
        let len = args.len();
        while i < len {
            let arg = &args[i];

            if arg == "--pixels" || arg == "-p" {
                i += 1;
                let Some(n) = args.get(i) else {
                    error!("pixels argument missing?");
                    continue;
                };
                match n.parse() {
                    Ok(n) => res.pixels = n,
                    Err(err) => error!("failed to parse pixels '{n}': {err}"),
                }
            } else if arg == "--runs" || arg == "-n" {
                i += 1;
                let Some(n) = args.get(i) else {
                    error!("runs argument missing?");
                    continue;
                };
                match n.parse() {
                    Ok(n) => res.runs = n,
                    Err(err) => error!("failed to parse runs '{n}': {err}"),
                }
            } else if arg == "--format" {
                i += 1;
                let Some(name) = args.get(i) else {
                    error!("format argument missing?");
                    continue;
                };
                if let Some(format) = parse_format(name) {
                    res.format = Some(format);
                } else {
                    error!(
                        "unknown format '{name}'. Try rgba8unorm, rgba8unorm-srgb, bgra8unorm or bgra8unorm-srgb."
                    );
                }
            } else if arg == "--label" {
                i += 1;
                let Some(label) = args.get(i) else {
                    error!("label argument missing?");
                    continue;
                };
                res.label = Some(label.clone());
            } else if arg == "--preview" {
                i += 1;
                let Some(dir) = args.get(i) else {
                    error!("preview argument missing?");
                    continue;
                };
                res.preview = Some(PathBuf::from(dir));
            } else if arg == "--no-preview" {
                res.preview = None;
            } else if arg == "--logdir" {
                i += 1;
                let Some(dir) = args.get(i) else {
                    error!("logdir argument missing?");
                    continue;
                };
                res.logdir = Some(PathBuf::from(dir));
            } else if !arg.starts_with('-') && !have_source {
                res.source = arg.clone();
                have_source = true;
            } else {
                unrecognized_args.insert(arg.clone());
            }

            i += 1;
        }

        (res, unrecognized_args)
    }

    /// Find `--logdir` without logging anything, so the subscriber can be
    /// installed before [`Args::parse`] reports bad values.
    pub fn logdir(args: &[String]) -> Option<PathBuf> {
        let pos = args.iter().skip(1).position(|arg| arg == "--logdir")?;
        args.get(pos + 2).map(PathBuf::from)
    }

    pub fn image_source(&self) -> texprobe::Result<ImageSource> {
        ImageSource::parse(&self.source)
    }

    pub fn texture_options(&self) -> TextureOptions {
        TextureOptions {
            format: self.format,
            usage: None,
            label: self.label.clone(),
        }
    }

    pub fn preview_surface(&self) -> Option<PreviewSurface> {
        self.preview.as_ref().map(PreviewSurface::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("texprobe")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults() {
        let (parsed, unknown) = Args::parse(&args(&[]));
        assert_eq!(parsed.source, DEFAULT_SOURCE);
        assert_eq!(parsed.pixels, 3);
        assert_eq!(parsed.runs, 1);
        assert_eq!(parsed.format, None);
        assert_eq!(
            parsed.preview_surface().unwrap().path(),
            PathBuf::from("./show-test.png")
        );
        assert!(unknown.is_empty());
    }

    #[test]
    fn all_flags() {
        let (parsed, unknown) = Args::parse(&args(&[
            "https://example.com/bird.jpg",
            "--pixels",
            "5",
            "-n",
            "10",
            "--format",
            "rgba8unorm-srgb",
            "--label",
            "bird",
            "--preview",
            "/tmp/preview",
            "--logdir",
            "/tmp/logs",
        ]));

        assert!(unknown.is_empty());
        assert_eq!(parsed.source, "https://example.com/bird.jpg");
        assert_eq!(parsed.pixels, 5);
        assert_eq!(parsed.runs, 10);
        assert_eq!(parsed.format, Some(wgpu::TextureFormat::Rgba8UnormSrgb));
        assert_eq!(parsed.logdir, Some(PathBuf::from("/tmp/logs")));

        let options = parsed.texture_options();
        assert_eq!(options.label.as_deref(), Some("bird"));
        assert_eq!(options.usage, None);
        assert_eq!(
            parsed.preview_surface().unwrap().path(),
            PathBuf::from("/tmp/preview/show-test.png")
        );
    }

    #[test]
    fn bad_values_keep_defaults() {
        let (parsed, unknown) = Args::parse(&args(&["--pixels", "lots", "--format", "r8unorm"]));
        assert!(unknown.is_empty());
        assert_eq!(parsed.pixels, 3);
        assert_eq!(parsed.format, None);
    }

    #[test]
    fn unknown_args_are_collected() {
        let (parsed, unknown) = Args::parse(&args(&["a.png", "b.png", "--fast"]));
        assert_eq!(parsed.source, "a.png");
        assert_eq!(
            unknown.into_iter().collect::<Vec<_>>(),
            vec!["--fast".to_string(), "b.png".to_string()]
        );
    }

    #[test]
    fn missing_value_at_end() {
        let (parsed, unknown) = Args::parse(&args(&["--runs"]));
        assert_eq!(parsed.runs, 1);
        assert!(unknown.is_empty());
    }

    #[test]
    fn no_preview_turns_the_side_effect_off() {
        let (parsed, unknown) = Args::parse(&args(&["--no-preview"]));
        assert!(unknown.is_empty());
        assert!(parsed.preview_surface().is_none());

        let (parsed, _) = Args::parse(&args(&["--no-preview", "--preview", "out"]));
        assert_eq!(
            parsed.preview_surface().unwrap().path(),
            PathBuf::from("out/show-test.png")
        );
    }

    #[test]
    fn logdir_is_found_before_parsing() {
        let list = args(&["bird.png", "--pixels", "lots", "--logdir", "/tmp/logs"]);
        assert_eq!(Args::logdir(&list), Some(PathBuf::from("/tmp/logs")));
        assert_eq!(Args::logdir(&args(&["--logdir"])), None);
        assert_eq!(Args::logdir(&args(&["bird.png"])), None);
    }

    struct ErrorCount(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for ErrorCount {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn parse_errors_reach_the_installed_subscriber() {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCount(count.clone()));

        let (parsed, _) = tracing::subscriber::with_default(subscriber, || {
            Args::parse(&args(&["--pixels", "lots"]))
        });

        assert_eq!(parsed.pixels, 3);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
