// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event sinks that write explorer events to an output stream.

use crate::output::{StderrStyles, StdoutStyles};
use clap::ValueEnum;
use elm_test_runner::{
    reporter::{EventSink, ExplorerEvent},
    runner::RunStats,
    tree::{ID_SEPARATOR, ROOT_ID},
};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// The format events are written in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    /// Indented, human-readable output.
    #[default]
    Human,

    /// One JSON object per line.
    Json,
}

impl MessageFormat {
    pub(crate) fn make_sink<'a, W: Write + 'a>(
        self,
        writer: W,
        styles: StdoutStyles,
        verbose: bool,
    ) -> Box<dyn FinishableSink + 'a> {
        match self {
            Self::Human => Box::new(HumanSink::new(writer, styles, verbose)),
            Self::Json => Box::new(JsonLinesSink::new(writer)),
        }
    }
}

/// An [`EventSink`] that writes to an output stream.
///
/// Write errors can't be returned from [`EventSink::emit`], so the first one is kept and returned
/// by [`finish`](Self::finish). Later events are dropped.
pub(crate) trait FinishableSink: EventSink {
    /// Flushes the output, returning the first error encountered.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Writes each event as a line of JSON.
pub(crate) struct JsonLinesSink<W> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> JsonLinesSink<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: ExplorerEvent) {
        if self.error.is_some() {
            return;
        }
        let res = serde_json::to_writer(&mut self.writer, &event)
            .map_err(io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        if let Err(error) = res {
            self.error = Some(error);
        }
    }
}

impl<W: Write> FinishableSink for JsonLinesSink<W> {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        match self.error.take() {
            Some(error) => Err(error),
            None => self.writer.flush(),
        }
    }
}

/// Writes events as an indented tree.
///
/// Source locations are only written if `verbose` is set.
pub(crate) struct HumanSink<W> {
    writer: W,
    styles: StdoutStyles,
    verbose: bool,
    depth: usize,
    error: Option<io::Error>,
}

impl<W: Write> HumanSink<W> {
    pub(crate) fn new(writer: W, styles: StdoutStyles, verbose: bool) -> Self {
        Self {
            writer,
            styles,
            verbose,
            depth: 0,
            error: None,
        }
    }

    fn write_event(&mut self, event: &ExplorerEvent) -> io::Result<()> {
        match event {
            ExplorerEvent::SuiteStarted { id } => {
                if id != ROOT_ID {
                    let indent = self.indent();
                    let label = self.display_name(id);
                    writeln!(self.writer, "{indent}{}", label.style(self.styles.suite))?;
                    self.depth += 1;
                }
            }
            ExplorerEvent::SuiteFinished { id } => {
                if id != ROOT_ID {
                    self.depth = self.depth.saturating_sub(1);
                }
            }
            ExplorerEvent::TestStarted { .. } => {}
            ExplorerEvent::TestPassed { id, message } => {
                self.write_test("PASS", self.styles.pass, id, message)?;
            }
            ExplorerEvent::TestFailed { id, message } => {
                self.write_test("FAIL", self.styles.fail, id, message)?;
            }
            ExplorerEvent::TestSkipped { id, message } => {
                self.write_test("TODO", self.styles.skip, id, message)?;
            }
            ExplorerEvent::TestLocated { id, file, line } => {
                if self.verbose {
                    // Lines are zero-based in events, one-based for humans.
                    let location = format!("{id} at {file}:{}", line + 1);
                    writeln!(self.writer, "{}", location.style(self.styles.dimmed))?;
                }
            }
        }
        Ok(())
    }

    fn write_test(
        &mut self,
        status: &str,
        style: owo_colors::Style,
        id: &str,
        message: &str,
    ) -> io::Result<()> {
        let indent = self.indent();
        let label = self.display_name(id);
        writeln!(self.writer, "{indent}{} {label}", status.style(style))?;
        for line in message.lines() {
            writeln!(self.writer, "{indent}    {line}")?;
        }
        Ok(())
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }

    /// Inside a suite, the label is enough. Outside of one, the full path is shown.
    fn display_name<'a>(&self, id: &'a str) -> &'a str {
        if self.depth > 0 {
            id.rsplit(ID_SEPARATOR).next().unwrap_or(id)
        } else {
            id.strip_prefix(ROOT_ID)
                .and_then(|rest| rest.strip_prefix(ID_SEPARATOR))
                .unwrap_or(id)
        }
    }
}

impl<W: Write> EventSink for HumanSink<W> {
    fn emit(&mut self, event: ExplorerEvent) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self.write_event(&event) {
            self.error = Some(error);
        }
    }
}

impl<W: Write> FinishableSink for HumanSink<W> {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        match self.error.take() {
            Some(error) => Err(error),
            None => self.writer.flush(),
        }
    }
}

/// Writes a one-line summary of a run.
pub(crate) fn write_summary(
    mut writer: impl Write,
    stats: &RunStats,
    located: usize,
    styles: &StderrStyles,
) -> io::Result<()> {
    let summary_style = if stats.failed > 0 {
        styles.fail
    } else if stats.todo > 0 {
        styles.skip
    } else {
        styles.pass
    };
    writeln!(
        writer,
        "{:>12} {} tests: {} passed, {} failed, {} todo ({} located)",
        "Summary".style(summary_style),
        stats.total().style(styles.bold),
        stats.passed.style(styles.pass),
        stats.failed.style(styles.fail),
        stats.todo.style(styles.skip),
        located,
    )?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn events() -> Vec<ExplorerEvent> {
        vec![
            ExplorerEvent::SuiteStarted {
                id: "root".to_owned(),
            },
            ExplorerEvent::SuiteStarted {
                id: "root/Calc".to_owned(),
            },
            ExplorerEvent::TestStarted {
                id: "root/Calc/adds".to_owned(),
            },
            ExplorerEvent::TestPassed {
                id: "root/Calc/adds".to_owned(),
                message: String::new(),
            },
            ExplorerEvent::TestStarted {
                id: "root/Calc/subtracts".to_owned(),
            },
            ExplorerEvent::TestFailed {
                id: "root/Calc/subtracts".to_owned(),
                message: "Expect.equal\nExpected: 1\nActual:   2".to_owned(),
            },
            ExplorerEvent::SuiteFinished {
                id: "root/Calc".to_owned(),
            },
            ExplorerEvent::SuiteFinished {
                id: "root".to_owned(),
            },
            ExplorerEvent::TestLocated {
                id: "root/Calc/adds".to_owned(),
                file: "/w/tests/Calc.elm".into(),
                line: 9,
            },
        ]
    }

    fn write_all(sink: &mut dyn EventSink) {
        for event in events() {
            sink.emit(event);
        }
    }

    #[test]
    fn human_output() {
        let mut buf = Vec::new();
        let mut sink = HumanSink::new(&mut buf, StdoutStyles::default(), true);
        write_all(&mut sink);
        Box::new(sink).finish().expect("writing to a Vec succeeds");

        let expected = indoc! {"
            Calc
              PASS adds
              FAIL subtracts
                  Expect.equal
                  Expected: 1
                  Actual:   2
            root/Calc/adds at /w/tests/Calc.elm:10
        "};
        assert_eq!(String::from_utf8(buf).expect("output is UTF-8"), expected);
    }

    #[test]
    fn human_output_without_suites() {
        let mut buf = Vec::new();
        let mut sink = HumanSink::new(&mut buf, StdoutStyles::default(), false);
        sink.emit(ExplorerEvent::TestSkipped {
            id: "root/Calc/later".to_owned(),
            message: String::new(),
        });
        sink.emit(ExplorerEvent::TestLocated {
            id: "root/Calc/later".to_owned(),
            file: "/w/tests/Calc.elm".into(),
            line: 3,
        });
        Box::new(sink).finish().expect("writing to a Vec succeeds");
        assert_eq!(
            String::from_utf8(buf).expect("output is UTF-8"),
            "TODO Calc/later\n"
        );
    }

    #[test]
    fn json_output() {
        let mut buf = Vec::new();
        let mut sink = JsonLinesSink::new(&mut buf);
        write_all(&mut sink);
        Box::new(sink).finish().expect("writing to a Vec succeeds");

        let output = String::from_utf8(buf).expect("output is UTF-8");
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), events().len());
        assert_eq!(lines[0], r#"{"type":"suite-started","id":"root"}"#);
        assert_eq!(
            lines[8],
            r#"{"type":"test-located","id":"root/Calc/adds","file":"/w/tests/Calc.elm","line":9}"#
        );
    }

    #[test]
    fn write_errors_are_kept() {
        struct FailingWriter;

        impl Write for FailingWriter {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut sink = JsonLinesSink::new(FailingWriter);
        write_all(&mut sink);
        let error = Box::new(sink).finish().expect_err("write fails");
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn summary() {
        let mut buf = Vec::new();
        let stats = RunStats {
            passed: 1,
            failed: 1,
            todo: 1,
        };
        write_summary(&mut buf, &stats, 2, &StderrStyles::default()).expect("summary written");
        assert_eq!(
            String::from_utf8(buf).expect("output is UTF-8"),
            "     Summary 3 tests: 1 passed, 1 failed, 1 todo (2 located)\n"
        );
    }
}
