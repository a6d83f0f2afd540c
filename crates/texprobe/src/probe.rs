use tracing::info;

use crate::{
    print::{is_blank, print_texture},
    upload::{texture_from_source, TextureOptions},
    Gpu, ImageSource, PreviewSurface, Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub run: u32,
    pub bytes: Vec<u8>,
    pub blank: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub outcomes: Vec<ProbeOutcome>,
}

impl ProbeReport {
    pub fn push(&mut self, run: u32, bytes: Vec<u8>) {
        let blank = is_blank(&bytes);
        self.outcomes.push(ProbeOutcome { run, bytes, blank });
    }

    pub fn blank_runs(&self) -> usize {
        self.outcomes.iter().filter(|o| o.blank).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} runs read back blank pixels",
            self.blank_runs(),
            self.outcomes.len()
        )
    }
}

/// Upload `source` into a fresh texture and print its leading pixels,
/// `runs` times in a row. The first failing run ends the probe.
pub async fn run_probe(
    gpu: &Gpu,
    source: &ImageSource,
    options: &TextureOptions,
    preview: Option<&PreviewSurface>,
    pixels: u32,
    runs: u32,
) -> Result<ProbeReport> {
    let mut report = ProbeReport::default();

    for run in 0..runs {
        let texture = texture_from_source(gpu, source, options, preview).await?;
        let bytes = print_texture(&gpu.device, &gpu.queue, &texture, pixels).await?;
        report.push(run, bytes);
    }

    info!("{}", report.summary());
    Ok(report)
}
