// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
    reporter::{MessageFormat, write_summary},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use elm_test_metadata::ElmTestExitCode;
use elm_test_runner::{
    config::ExplorerConfig,
    reporter::{emit_source_locations, emit_test_events, emit_tree_events},
    runner::{ResultIndex, RunAccumulator, RunKind, RunStats, TestRunnerBuilder},
    tree::SuiteTree,
};
use std::io::Read;
use tracing::{debug, info};

/// Runs elm-test and reports results as test explorer events.
///
/// Events describe the suite tree, the result of each test and where each test is defined. They
/// are written to stdout, either for humans or as JSON lines for an editor integration.
#[derive(Debug, Parser)]
#[command(version, name = "elm-test-explorer", styles = clap_styles::style())]
pub struct ElmTestExplorerApp {
    /// Workspace root [default: current directory]
    #[arg(long, global = true, value_name = "DIR")]
    workspace_root: Option<Utf8PathBuf>,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl ElmTestExplorerApp {
    /// Initializes logging and colors, and returns the resulting output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the exit code.
    pub fn exec(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let workspace_root = match self.workspace_root {
            Some(root) => root,
            None => current_dir()?,
        };
        if !workspace_root.is_dir() {
            return Err(ExpectedError::workspace_root_invalid(workspace_root));
        }
        let config = self.config_opts.make_config(&workspace_root)?;

        match self.command {
            Command::Run(opts) => opts.exec(config, output, output_writer),
            Command::Replay(opts) => opts.exec(config, output, output_writer),
        }
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let dir = std::env::current_dir().map_err(ExpectedError::current_dir_failed)?;
    Utf8PathBuf::try_from(dir).map_err(|err| ExpectedError::current_dir_failed(err.into_io_error()))
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: workspace-root/.config/elm-test-explorer.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, workspace_root: &Utf8Path) -> Result<ExplorerConfig> {
        Ok(ExplorerConfig::from_sources(
            workspace_root,
            self.config_file.as_deref(),
        )?)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run tests and report the results
    Run(RunOpts),

    /// Report results from a saved `elm-test --report json` stream
    ///
    /// No processes are spawned: the tree is built from the saved output.
    Replay(ReplayOpts),
}

#[derive(Debug, Args)]
struct ReporterOpts {
    /// Format to write events in
    #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
    message_format: MessageFormat,
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Only run tests in this file (can be repeated)
    #[arg(long = "file", value_name = "PATH")]
    files: Vec<Utf8PathBuf>,

    /// Only run this test or suite (can be repeated)
    #[arg(long = "id", value_name = "TEST_ID", conflicts_with = "files")]
    ids: Vec<String>,

    #[command(flatten)]
    reporter_opts: ReporterOpts,
}

impl RunOpts {
    fn exec(
        self,
        config: ExplorerConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let workspace_root = config.workspace_root().to_owned();
        let files: Vec<_> = self
            .files
            .iter()
            .map(|file| workspace_root.join(file))
            .collect();

        let mut runner = TestRunnerBuilder::default().build(config);
        let runtime = make_runtime()?;

        let mut sink = self.reporter_opts.message_format.make_sink(
            output_writer.stdout_writer(),
            output.stdout_styles(),
            output.verbose,
        );

        let (stats, located) = runtime.block_on(async {
            let selected = if !self.ids.is_empty() {
                Some(runner.run_selected(&self.ids).await?)
            } else if !files.is_empty() {
                runner.run_some(files).await?;
                None
            } else {
                runner.run_all().await?;
                None
            };

            let empty = SuiteTree::new();
            let tree = runner.loaded_tree().unwrap_or(&empty);
            let results = runner.results();
            let stats = match &selected {
                Some(ids) => {
                    emit_test_events(ids, results, &mut *sink);
                    RunStats::for_ids(ids, results)
                }
                None => {
                    emit_tree_events(tree.root(), results, &mut *sink);
                    RunStats::from_results(results)
                }
            };
            let located = emit_source_locations(tree, results, &mut *sink).await;
            Ok::<_, ExpectedError>((stats, located))
        })?;
        sink.finish().map_err(ExpectedError::write_event_error)?;

        write_summary_and_exit(&stats, located, output, output_writer)
    }
}

#[derive(Debug, Args)]
struct ReplayOpts {
    /// Saved output of `elm-test --report json`, or `-` for standard input
    #[arg(value_name = "PATH", default_value = "-")]
    input: Utf8PathBuf,

    #[command(flatten)]
    reporter_opts: ReporterOpts,
}

impl ReplayOpts {
    fn exec(
        self,
        config: ExplorerConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let report = self.read_input()?;

        let mut accumulator = RunAccumulator::new(config);
        accumulator.start(RunKind::All);
        for line in report.lines() {
            accumulator.accept_line(line);
        }
        accumulator.finish();
        let empty = SuiteTree::new();
        let tree = accumulator.loaded().unwrap_or(&empty);
        let results: &ResultIndex = accumulator.results();
        info!("replayed {} tests from {}", tree.test_count(), self.input);

        let runtime = make_runtime()?;
        let mut sink = self.reporter_opts.message_format.make_sink(
            output_writer.stdout_writer(),
            output.stdout_styles(),
            output.verbose,
        );
        emit_tree_events(tree.root(), results, &mut *sink);
        let located = runtime.block_on(emit_source_locations(tree, results, &mut *sink));
        sink.finish().map_err(ExpectedError::write_event_error)?;

        let stats = RunStats::from_results(results);
        write_summary_and_exit(&stats, located, output, output_writer)
    }

    fn read_input(&self) -> Result<String> {
        let mut report = String::new();
        let res = if self.input == "-" {
            debug!("reading saved report from standard input");
            std::io::stdin().read_to_string(&mut report)
        } else {
            debug!("reading saved report from {}", self.input);
            std::fs::File::open(&self.input).and_then(|mut f| f.read_to_string(&mut report))
        };
        res.map_err(|err| ExpectedError::report_read_error(&self.input, err))?;
        Ok(report)
    }
}

fn make_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("elm-test-explorer-worker")
        .build()
        .map_err(ExpectedError::runtime_create_error)
}

fn write_summary_and_exit(
    stats: &RunStats,
    located: usize,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    write_summary(
        output_writer.stderr_writer(),
        stats,
        located,
        &output.stderr_styles(),
    )
    .map_err(ExpectedError::write_event_error)?;

    if stats.is_success() {
        Ok(ElmTestExitCode::OK)
    } else {
        Err(ExpectedError::test_run_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    static REPORT: &str = indoc! {r#"
        {"event":"runStart","testCount":"2"}
        {"event":"testCompleted","status":"pass","labels":["Calc","adds"],"failures":[]}
        {"event":"testCompleted","status":"todo","labels":["Calc","later"],"failures":[]}
        {"event":"runComplete","passed":"1","failed":"0"}
    "#};

    fn workspace(report: &str) -> Utf8TempDir {
        let dir = camino_tempfile::tempdir().expect("created temp dir");
        std::fs::write(dir.path().join("report.jsonl"), report).expect("wrote report");
        std::fs::create_dir_all(dir.path().join("tests")).expect("created tests dir");
        std::fs::write(
            dir.path().join("tests/Calc.elm"),
            indoc! {r#"
                module Calc exposing (suite)

                suite =
                    describe "Calc"
                        [ test "adds" <| \_ -> Expect.pass
                        , todo "later"
                        ]
            "#},
        )
        .expect("wrote test source");
        dir
    }

    fn replay(dir: &Utf8TempDir, format: &str) -> (Result<i32>, String, String) {
        let app = ElmTestExplorerApp::try_parse_from([
            "elm-test-explorer",
            "--workspace-root",
            dir.path().as_str(),
            "--color",
            "never",
            "replay",
            dir.path().join("report.jsonl").as_str(),
            "--message-format",
            format,
        ])
        .expect("arguments are valid");
        let output = app.init_output();
        let mut output_writer = OutputWriter::Test {
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let res = app.exec(output, &mut output_writer);
        let OutputWriter::Test { stdout, stderr } = output_writer else {
            unreachable!("test writer was used");
        };
        (
            res,
            String::from_utf8(stdout).expect("stdout is UTF-8"),
            String::from_utf8(stderr).expect("stderr is UTF-8"),
        )
    }

    #[test]
    fn replay_json() {
        let dir = workspace(REPORT);
        let (res, stdout, stderr) = replay(&dir, "json");

        let err = res.expect_err("a todo test fails the run");
        assert_eq!(err.process_exit_code(), ElmTestExitCode::TESTS_FAILED);

        let events: Vec<serde_json::Value> = stdout
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line is JSON"))
            .collect();
        let types: Vec<_> = events
            .iter()
            .map(|event| event["type"].as_str().expect("type is a string"))
            .collect();
        assert_eq!(
            types,
            [
                "suite-started",
                "suite-started",
                "test-started",
                "test-passed",
                "test-started",
                "test-skipped",
                "suite-finished",
                "suite-finished",
                "test-located",
                "test-located",
            ]
        );
        assert_eq!(events[8]["id"], "root/Calc/adds");
        assert_eq!(events[8]["line"], 4);
        assert_eq!(
            stderr,
            "     Summary 2 tests: 1 passed, 0 failed, 1 todo (2 located)\n"
        );
    }

    #[test]
    fn replay_human() {
        let report = r#"{"event":"testCompleted","status":"pass","labels":["Calc","adds"]}"#;
        let dir = workspace(report);
        let (res, stdout, _) = replay(&dir, "human");

        assert_eq!(res.expect("all tests passed"), ElmTestExitCode::OK);
        assert_eq!(stdout, "Calc\n  PASS adds\n");
    }

    #[test]
    fn missing_workspace_root() {
        let app = ElmTestExplorerApp::try_parse_from([
            "elm-test-explorer",
            "--workspace-root",
            "/nonexistent/elm-test-explorer-workspace",
            "replay",
        ])
        .expect("arguments are valid");
        let output = app.init_output();
        let err = app
            .exec(output, &mut OutputWriter::default())
            .expect_err("workspace root doesn't exist");
        assert!(
            matches!(err, ExpectedError::WorkspaceRootInvalid { .. }),
            "error: {err:?}"
        );
    }

    #[test]
    fn ids_conflict_with_files() {
        let res = ElmTestExplorerApp::try_parse_from([
            "elm-test-explorer",
            "run",
            "--file",
            "tests/Calc.elm",
            "--id",
            "root/Calc",
        ]);
        assert!(res.is_err(), "--file and --id conflict");
    }
}
