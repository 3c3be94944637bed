// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running elm-test as a child process.
//!
//! Flags passed to elm-test come from an [`ArgsBuilder`]: the runner doesn't construct them
//! itself. Output is read through a [`LineBuffer`], since the child may write partial lines.

use crate::{
    config::ExplorerConfig,
    errors::{RunError, RunPhase},
};
use bstr::ByteSlice;
use bytes::BytesMut;
use camino::{Utf8Path, Utf8PathBuf};
use std::{fmt, io, process::ExitStatus, process::Stdio, sync::Arc};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

/// Paths to the binaries used to run tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElmBinaries {
    /// The elm-test binary.
    pub elm_test: Utf8PathBuf,

    /// The Elm compiler.
    pub elm: Utf8PathBuf,

    /// The constraint solver, if configured.
    pub elm_json: Option<Utf8PathBuf>,
}

impl ElmBinaries {
    /// Locates the binaries named in the config.
    ///
    /// Names that contain a path separator are used verbatim. Other names are looked up in
    /// `node_modules/.bin` under the workspace root, falling back to the bare name (which is then
    /// resolved through `PATH` when spawned).
    pub fn locate(config: &ExplorerConfig) -> Self {
        let root = config.workspace_root();
        let binaries = config.binaries();
        Self {
            elm_test: locate_binary(root, &binaries.elm_test),
            elm: locate_binary(root, &binaries.elm),
            elm_json: binaries
                .elm_json
                .as_deref()
                .map(|name| locate_binary(root, name)),
        }
    }
}

fn locate_binary(workspace_root: &Utf8Path, name: &str) -> Utf8PathBuf {
    let path = Utf8Path::new(name);
    if path.is_absolute() || path.components().count() > 1 {
        return path.to_owned();
    }

    let bin_dir = workspace_root.join("node_modules").join(".bin");
    let candidates = if cfg!(windows) {
        vec![bin_dir.join(format!("{name}.cmd")), bin_dir.join(name)]
    } else {
        vec![bin_dir.join(name)]
    };
    match candidates.into_iter().find(|candidate| candidate.is_file()) {
        Some(local) => {
            debug!("using local binary {local} for `{name}`");
            local
        }
        None => path.to_owned(),
    }
}

/// Builds command lines for elm-test.
///
/// Both methods return a full command line: the program followed by its arguments. `files` is
/// `None` to run every test, or the subset of test files to run.
pub trait ArgsBuilder: fmt::Debug + Send + Sync {
    /// Returns the command line for the initial compile check.
    ///
    /// An exit code of [`ElmTestExitCode::BUILD_FAILED`](elm_test_metadata::ElmTestExitCode::BUILD_FAILED)
    /// from this command fails the run.
    fn build_args(&self, binaries: &ElmBinaries, files: Option<&[Utf8PathBuf]>) -> Vec<String>;

    /// Returns the command line for the run that reports results as JSON lines.
    fn report_args(&self, binaries: &ElmBinaries, files: Option<&[Utf8PathBuf]>) -> Vec<String>;
}

/// The [`ArgsBuilder`] for the `elm-test` npm package.
///
/// * compile check: `elm-test make --compiler <elm> [files]`
/// * report run: `elm-test --compiler <elm> --report json [files]`
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultArgsBuilder;

impl DefaultArgsBuilder {
    fn push_files(args: &mut Vec<String>, files: Option<&[Utf8PathBuf]>) {
        args.extend(files.unwrap_or_default().iter().map(|f| f.to_string()));
    }
}

impl ArgsBuilder for DefaultArgsBuilder {
    fn build_args(&self, binaries: &ElmBinaries, files: Option<&[Utf8PathBuf]>) -> Vec<String> {
        let mut args = vec![
            binaries.elm_test.to_string(),
            "make".to_owned(),
            "--compiler".to_owned(),
            binaries.elm.to_string(),
        ];
        Self::push_files(&mut args, files);
        args
    }

    fn report_args(&self, binaries: &ElmBinaries, files: Option<&[Utf8PathBuf]>) -> Vec<String> {
        let mut args = vec![
            binaries.elm_test.to_string(),
            "--compiler".to_owned(),
            binaries.elm.to_string(),
            "--report".to_owned(),
            "json".to_owned(),
        ];
        Self::push_files(&mut args, files);
        args
    }
}

/// Splits a stream of bytes, delivered in arbitrary chunks, into lines.
///
/// Lines are returned in the order they arrived, without their terminators (`\n` or `\r\n`).
/// Invalid UTF-8 is replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    /// Creates a new, empty buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(CHUNK_SIZE),
        }
    }

    /// Appends a chunk of output.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Removes and returns the next complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        let newline = self.buf.find_byte(b'\n')?;
        let line = self.buf.split_to(newline + 1);
        Some(decode_line(&line[..newline]))
    }

    /// Removes and returns every complete line.
    pub fn lines(&mut self) -> impl Iterator<Item = String> + '_ {
        std::iter::from_fn(move || self.next_line())
    }

    /// Consumes the buffer, returning the final unterminated line if there is one.
    pub fn finish(self) -> Option<String> {
        (!self.buf.is_empty()).then(|| decode_line(&self.buf))
    }
}

fn decode_line(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// The size of each buffered reader's buffer.
///
/// This size is not totally arbitrary, but rather the (normal) page size on most systems.
const CHUNK_SIZE: usize = 4 * 1024;

/// A `BufReader` over an `AsyncRead` that tracks whether it is done.
struct FusedBufReader<R> {
    reader: BufReader<R>,
    done: bool,
}

impl<R: AsyncRead + Unpin> FusedBufReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(CHUNK_SIZE, reader),
            done: false,
        }
    }

    /// Reads the next chunk of output into `acc`. This is cancel-safe.
    async fn fill_buf(&mut self, acc: &mut LineBuffer) -> Result<(), io::Error> {
        if self.done {
            return Ok(());
        }

        match self.reader.fill_buf().await {
            Ok(buf) => {
                acc.push(buf);
                if buf.is_empty() {
                    self.done = true;
                }
                let len = buf.len();
                self.reader.consume(len);
                Ok(())
            }
            Err(error) => {
                self.done = true;
                Err(error)
            }
        }
    }
}

fn is_done_opt<R: AsyncRead + Unpin>(reader: &Option<FusedBufReader<R>>) -> bool {
    reader.as_ref().is_none_or(|r| r.done)
}

async fn fill_buf_opt<R: AsyncRead + Unpin>(
    reader: Option<&mut FusedBufReader<R>>,
    acc: &mut LineBuffer,
) -> Result<(), io::Error> {
    match reader {
        Some(reader) => reader.fill_buf(acc).await,
        None => Ok(()),
    }
}

/// A line of output from a child process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Runs `argv` in `cwd`, calling `on_line` with each line of output as it arrives.
///
/// Lines from each stream are delivered in order. Returns the exit status once both streams
/// have closed and the process has exited.
pub(crate) async fn run_streaming(
    phase: RunPhase,
    argv: &[String],
    cwd: &Utf8Path,
    mut on_line: impl FnMut(OutputLine),
) -> Result<ExitStatus, RunError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(RunError::spawn(
            phase,
            argv.iter().map(String::as_str),
            io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
        ));
    };

    debug!("for the {phase}, running `{}`", shell_words::join(argv));
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let mut child = cmd
        .spawn()
        .map_err(|error| RunError::spawn(phase, argv.iter().map(String::as_str), error))?;

    let mut stdout = child.stdout.take().map(FusedBufReader::new);
    let mut stderr = child.stderr.take().map(FusedBufReader::new);
    let mut stdout_acc = LineBuffer::new();
    let mut stderr_acc = LineBuffer::new();

    loop {
        tokio::select! {
            res = fill_buf_opt(stdout.as_mut(), &mut stdout_acc), if !is_done_opt(&stdout) => {
                res.map_err(|error| RunError::ReadOutput {
                    phase,
                    stream: "stdout",
                    error: Arc::new(error),
                })?;
                stdout_acc.lines().for_each(|line| on_line(OutputLine::Stdout(line)));
            }
            res = fill_buf_opt(stderr.as_mut(), &mut stderr_acc), if !is_done_opt(&stderr) => {
                if let Err(error) = res {
                    warn!("for the {phase}, reading stderr failed: {error}");
                }
                stderr_acc.lines().for_each(|line| on_line(OutputLine::Stderr(line)));
            }
            // Both streams are closed.
            else => break,
        }
    }

    if let Some(line) = stdout_acc.finish() {
        on_line(OutputLine::Stdout(line));
    }
    if let Some(line) = stderr_acc.finish() {
        on_line(OutputLine::Stderr(line));
    }

    child.wait().await.map_err(|error| RunError::Wait {
        phase,
        error: Arc::new(error),
    })
}
