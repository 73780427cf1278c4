//! Progress bars that share stderr with log output.
//!
//! Log lines are routed through the same `MultiProgress` as the bars, so a line
//! printed mid-run appears above the bar instead of tearing it. When the bars are
//! hidden (stderr is not a terminal) lines go straight to stderr.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

/// New bar attached to the shared stderr target
pub fn add_progress_bar(len: u64) -> ProgressBar {
    multi_progress().add(ProgressBar::new(len))
}

/// `MakeWriter` for tracing-subscriber that prints through the progress bars
#[derive(Default, Clone)]
pub struct LogWriterFactory;

enum LineSink {
    Bars(MultiProgress),
    Direct(Box<dyn Write + Send>),
}

/// Buffers partial writes and emits whole lines
pub struct LogWriter {
    pending: String,
    sink: LineSink,
}

impl LogWriter {
    /// Print through `mp`, or into `fallback` when `mp` cannot draw
    pub fn for_target(mp: &MultiProgress, fallback: Box<dyn Write + Send>) -> Self {
        let sink = if mp.is_hidden() {
            LineSink::Direct(fallback)
        } else {
            LineSink::Bars(mp.clone())
        };
        Self {
            pending: String::new(),
            sink,
        }
    }

    fn emit_line(&mut self, end: usize) {
        let line = self.pending[..end].trim_end_matches('\r');
        match &mut self.sink {
            LineSink::Bars(mp) => {
                let _ = mp.println(line);
            }
            LineSink::Direct(out) => {
                let _ = writeln!(out, "{}", line);
            }
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.push_str(&String::from_utf8_lossy(buf));

        while let Some(end) = self.pending.find('\n') {
            self.emit_line(end);
            self.pending.drain(..=end);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            self.emit_line(self.pending.len());
            self.pending.clear();
        }
        if let LineSink::Direct(out) = &mut self.sink {
            out.flush()?;
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter::for_target(multi_progress(), Box::new(io::stderr()))
    }
}
