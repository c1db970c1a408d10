//! Line-oriented progress and summaries for both subcommands.
mod lines;


use std::io::{IsTerminal, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crossterm::{
    cursor, queue,
    style::Print,
    terminal::{Clear, ClearType},
};

use crate::benchmark::{BenchmarkConfig, BenchmarkEvent, BenchmarkEventKind};
use crate::models::{BenchmarkSummary, TestSummary};
use crate::tester::{TestEvent, TestEventKind};

use lines::{Line, Segment, render};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdout,
    Stderr,
}

/// Prints run progress. Shared across benchmark workers, so every method
/// takes `&self`.
pub(crate) struct Console {
    color: bool,
    verbose: bool,
    stream: Stream,
    /// Transient status lines are redrawn in place on an interactive stderr.
    live: bool,
    phase_started: Mutex<Instant>,
}

impl Console {
    pub(crate) fn new(no_color: bool, verbose: bool, stream: Stream) -> Self {
        let interactive = match stream {
            Stream::Stdout => std::io::stdout().is_terminal(),
            Stream::Stderr => std::io::stderr().is_terminal(),
        };
        Self {
            color: !no_color && interactive,
            verbose,
            stream,
            live: std::io::stderr().is_terminal(),
            phase_started: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn on_test_event(&self, event: &TestEvent<'_>) {
        match event.kind {
            TestEventKind::Starting => {
                let line = lines::test_running(event.operation, event.index, event.total);
                if self.live {
                    self.status(&line);
                } else {
                    self.print(&line);
                }
            }
            TestEventKind::Completed => {
                self.clear_status();
                if let Some(result) = event.result {
                    self.print_all(&lines::test_completed(
                        result,
                        event.index,
                        event.total,
                        self.verbose,
                    ));
                }
            }
        }
    }

    pub(crate) fn print_test_summary(&self, summary: &TestSummary) {
        self.print_all(&lines::test_summary(summary));
    }

    pub(crate) fn print_benchmark_configuration(&self, config: &BenchmarkConfig, endpoints: usize) {
        self.print_all(&lines::benchmark_configuration(config, endpoints));
    }

    pub(crate) fn on_benchmark_event(&self, event: &BenchmarkEvent<'_>) {
        match event.kind {
            BenchmarkEventKind::WarmupStarting => {
                self.restart_phase();
                if self.live {
                    self.status(&lines::warmup_status(event));
                } else {
                    self.print(&lines::warmup_starting(event));
                }
            }
            BenchmarkEventKind::WarmupProgress => {
                if self.live {
                    self.status(&lines::warmup_status(event));
                }
            }
            BenchmarkEventKind::WarmupCompleted => {
                self.clear_status();
                self.print(&lines::warmup_completed(event, self.phase_elapsed()));
            }
            BenchmarkEventKind::BenchmarkStarting => {
                self.restart_phase();
                if self.live {
                    self.status(&lines::benchmark_status(event));
                } else {
                    self.print(&lines::benchmark_starting(event));
                }
            }
            BenchmarkEventKind::BenchmarkProgress => {
                if self.live {
                    self.status(&lines::benchmark_status(event));
                }
            }
            BenchmarkEventKind::BenchmarkCompleted => {
                self.clear_status();
                if let Some(result) = event.result {
                    self.print_all(&lines::benchmark_completed(
                        result,
                        event.index,
                        event.total,
                        self.phase_elapsed(),
                        self.verbose,
                    ));
                }
            }
        }
    }

    pub(crate) fn print_benchmark_summary(&self, summary: &BenchmarkSummary) {
        self.print_all(&lines::benchmark_summary(summary, self.verbose));
    }

    pub(crate) fn note(&self, text: &str) {
        self.print(&[Segment::plain(text)]);
    }

    fn restart_phase(&self) {
        *self.phase_started.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn phase_elapsed(&self) -> std::time::Duration {
        self.phase_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    fn print_all(&self, lines: &[Line]) {
        for line in lines {
            self.print(line);
        }
    }

    fn print(&self, line: &[Segment]) {
        let text = render(line, self.color);
        let written = match self.stream {
            Stream::Stdout => writeln!(std::io::stdout().lock(), "{}", text),
            Stream::Stderr => writeln!(std::io::stderr().lock(), "{}", text),
        };
        drop(written);
    }

    /// Redraws the transient status line on stderr.
    fn status(&self, line: &[Segment]) {
        let text = render(line, self.color);
        let mut out = std::io::stderr().lock();
        let drawn = queue!(
            out,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(text)
        )
        .and_then(|()| out.flush());
        drop(drawn);
    }

    fn clear_status(&self) {
        if !self.live {
            return;
        }
        let mut out = std::io::stderr().lock();
        let cleared = queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))
            .and_then(|()| out.flush());
        drop(cleared);
    }
}
