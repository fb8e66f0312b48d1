use std::io::IsTerminal;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ProgressType {
    /// Pick `ProgressBar` when stderr is a terminal, `TextUpdates` otherwise
    #[default]
    Auto,
    /// Animated progress bar
    ProgressBar,
    /// Periodic text lines, appropriate for logging
    TextUpdates,
}

impl ProgressType {
    fn resolve(self) -> Self {
        match self {
            ProgressType::Auto => {
                if std::io::stderr().is_terminal() {
                    ProgressType::ProgressBar
                } else {
                    ProgressType::TextUpdates
                }
            }
            other => other,
        }
    }

    fn default_delay(self) -> std::time::Duration {
        match self {
            ProgressType::TextUpdates => std::time::Duration::from_secs(10),
            _ => std::time::Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgressSettings {
    pub progress_type: ProgressType,
    /// Delay between updates, `None` picks a default based on the progress type
    pub progress_delay: Option<std::time::Duration>,
}

impl ProgressSettings {
    /// Build settings from command line values; `delay` takes durations like "200ms" or "5min"
    pub fn from_args(
        progress_type: Option<ProgressType>,
        delay: Option<&str>,
    ) -> anyhow::Result<Self> {
        use anyhow::Context as _;
        let progress_delay = delay
            .map(humantime::parse_duration)
            .transpose()
            .context("invalid progress delay")?;
        Ok(Self {
            progress_type: progress_type.unwrap_or_default(),
            progress_delay,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Display {
    Hidden,
    Bar,
    Text,
}

/// Byte-level progress of a single transfer.
///
/// Built with a total-size hint which is only used to compute percentage and ETA; the actual
/// number of bytes may end up being different. Clones share the same counter.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    bar: indicatif::ProgressBar,
    display: Display,
    delay: std::time::Duration,
    last_report: std::sync::Arc<std::sync::Mutex<std::time::Instant>>,
}

impl TransferProgress {
    #[must_use]
    pub fn new(total: u64, settings: Option<&ProgressSettings>) -> Self {
        let bar = indicatif::ProgressBar::with_draw_target(
            Some(total),
            indicatif::ProgressDrawTarget::hidden(),
        );
        let Some(settings) = settings else {
            return Self::with_display(bar, Display::Hidden, std::time::Duration::ZERO);
        };
        let progress_type = settings.progress_type.resolve();
        let delay = settings
            .progress_delay
            .unwrap_or_else(|| progress_type.default_delay());
        let display = match progress_type {
            ProgressType::TextUpdates => Display::Text,
            _ => {
                let style = indicatif::ProgressStyle::with_template(BAR_TEMPLATE)
                    .map(|style| style.progress_chars("=>-"))
                    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
                bar.set_style(style);
                Display::Bar
            }
        };
        Self::with_display(bar, display, delay)
    }

    /// Progress that counts bytes but never draws anything
    #[must_use]
    pub fn hidden(total: u64) -> Self {
        Self::new(total, None)
    }

    fn with_display(
        bar: indicatif::ProgressBar,
        display: Display,
        delay: std::time::Duration,
    ) -> Self {
        Self {
            bar,
            display,
            delay,
            last_report: std::sync::Arc::new(std::sync::Mutex::new(std::time::Instant::now())),
        }
    }

    pub fn start(&self) {
        self.bar.reset_elapsed();
        self.bar.reset_eta();
        if self.display == Display::Bar {
            let hz = (1.0 / self.delay.as_secs_f64().max(f64::EPSILON)).clamp(1.0, 20.0);
            self.bar
                .set_draw_target(indicatif::ProgressDrawTarget::stderr_with_hz(hz as u8));
        }
        if let Ok(mut last_report) = self.last_report.lock() {
            *last_report = std::time::Instant::now();
        }
    }

    pub fn inc(&self, bytes: u64) {
        self.bar.inc(bytes);
        if self.display != Display::Text {
            return;
        }
        let Ok(mut last_report) = self.last_report.lock() else {
            return;
        };
        if last_report.elapsed() >= self.delay {
            *last_report = std::time::Instant::now();
            eprintln!("{}", self.status_line());
        }
    }

    pub fn finish(&self) {
        match self.display {
            Display::Text => eprintln!("{}", self.status_line()),
            Display::Bar | Display::Hidden => {}
        }
        self.bar.finish();
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.bar.length().unwrap_or_default()
    }

    #[must_use]
    pub fn status_line(&self) -> String {
        let position = self.position();
        let total = self.total();
        let elapsed = self.bar.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            position as f64 / elapsed
        } else {
            0.0
        };
        let percent = if total > 0 {
            format!("{:.1}%", position as f64 * 100.0 / total as f64)
        } else {
            "n/a".to_string()
        };
        format!(
            "copied: {} / {} ({}), {}/s",
            bytesize::ByteSize(position),
            bytesize::ByteSize(total),
            percent,
            bytesize::ByteSize(rate as u64),
        )
    }

    /// Wrap a reader so that every byte read through it advances this progress
    pub fn wrap<R>(&self, inner: R) -> ProgressReader<R> {
        ProgressReader {
            inner,
            progress: self.clone(),
        }
    }
}

/// Pass-through reader reporting bytes read to a [`TransferProgress`].
///
/// Data is never altered and the reader never blocks beyond what the inner reader does.
#[derive(Debug)]
pub struct ProgressReader<R> {
    inner: R,
    progress: TransferProgress,
}

impl<R> ProgressReader<R> {
    pub fn progress(&self) -> &TransferProgress {
        &self.progress
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let read = buf.filled().len() - before;
            if read > 0 {
                self.progress.inc(read as u64);
            }
        }
        poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn reader_passes_bytes_through() -> Result<(), anyhow::Error> {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let progress = TransferProgress::hidden(data.len() as u64);
        progress.start();
        let mut reader = progress.wrap(&data[..]);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await?;
        progress.finish();
        assert_eq!(out, data);
        assert_eq!(progress.position(), data.len() as u64);
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn size_hint_does_not_limit_reads() -> Result<(), anyhow::Error> {
        let data = vec![7u8; 4096];
        let progress = TransferProgress::hidden(10);
        let mut reader = progress.wrap(&data[..]);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await?;
        assert_eq!(out.len(), 4096);
        assert_eq!(reader.progress().position(), 4096);
        assert_eq!(reader.progress().total(), 10);
        Ok(())
    }

    #[test]
    fn clones_share_counter() {
        let progress = TransferProgress::hidden(100);
        let other = progress.clone();
        other.inc(40);
        progress.inc(2);
        assert_eq!(progress.position(), 42);
    }

    #[test]
    fn status_line_reports_percentage() {
        let progress = TransferProgress::hidden(200);
        progress.inc(50);
        let line = progress.status_line();
        assert!(line.contains("25.0%"), "{line}");
    }

    #[test]
    fn status_line_without_total() {
        let progress = TransferProgress::hidden(0);
        progress.inc(5);
        assert!(progress.status_line().contains("n/a"));
    }

    #[test]
    fn explicit_types_resolve_to_themselves() {
        assert_eq!(
            ProgressType::TextUpdates.resolve(),
            ProgressType::TextUpdates
        );
        assert_eq!(
            ProgressType::ProgressBar.resolve(),
            ProgressType::ProgressBar
        );
        assert_ne!(ProgressType::Auto.resolve(), ProgressType::Auto);
    }

    #[test]
    fn text_updates_use_custom_delay() {
        let settings = ProgressSettings {
            progress_type: ProgressType::TextUpdates,
            progress_delay: Some(std::time::Duration::from_secs(3600)),
        };
        let progress = TransferProgress::new(10, Some(&settings));
        assert_eq!(progress.display, Display::Text);
        assert_eq!(progress.delay, std::time::Duration::from_secs(3600));
        progress.inc(3);
        assert_eq!(progress.position(), 3);
    }

    #[test]
    fn settings_from_args_parse_human_durations() -> Result<(), anyhow::Error> {
        let settings = ProgressSettings::from_args(None, Some("1min 30s"))?;
        assert_eq!(settings.progress_type, ProgressType::Auto);
        assert_eq!(
            settings.progress_delay,
            Some(std::time::Duration::from_secs(90))
        );
        let settings = ProgressSettings::from_args(Some(ProgressType::ProgressBar), None)?;
        assert_eq!(settings.progress_type, ProgressType::ProgressBar);
        assert!(settings.progress_delay.is_none());
        assert!(ProgressSettings::from_args(None, Some("soon")).is_err());
        Ok(())
    }
}
