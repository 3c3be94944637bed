// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use elm_test_runner::{
    config::ExplorerConfig,
    runner::{TestRunner, TestRunnerBuilder},
    test_command::{ArgsBuilder, ElmBinaries},
};
use indoc::indoc;

/// Output of a run of every test in the fixture workspace.
pub(crate) static ALL_REPORT: &str = indoc! {r#"
    Compiling > Starting tests
    {"event":"runStart","testCount":"3","fuzzRuns":"100","initialSeed":"1234","paths":["tests/Calc.elm","tests/Other.elm"]}
    debug: 1
    {"event":"testCompleted","status":"pass","labels":["Calc","Calc","adds"],"failures":[],"duration":"1"}
    {"event":"testCompleted","status":"fail","labels":["Calc","Calc","subtracts"],"failures":[{"given":null,"message":"Expect.equal","reason":{"type":"Equality","data":{"expected":"1","actual":"2","comparison":"Expect.equal"}}}],"duration":"2"}
    {"event":"testCompleted","status":"todo","labels":["Other","later"],"failures":[]}
    {"event":"runComplete","passed":"1","failed":"1","duration":"10","autoFail":null}
"#};

/// Output of a run of a single file, after `subtracts` was fixed.
pub(crate) static PARTIAL_REPORT: &str = indoc! {r#"
    {"event":"runStart","testCount":"1"}
    {"event":"testCompleted","status":"pass","labels":["Calc","Calc","subtracts"],"failures":[]}
    {"event":"runComplete","passed":"1","failed":"0"}
"#};

pub(crate) static CALC_SOURCE: &str = indoc! {r#"
    module Calc exposing (suite)

    import Expect
    import Test exposing (..)


    suite : Test
    suite =
        describe "Calc"
            [ test "adds" <| \_ -> Expect.equal 2 (1 + 1)
            , test "subtracts" <| \_ -> Expect.equal 1 (3 - 1)
            ]
"#};

/// Prints the full report when run without files, and the partial report otherwise.
pub(crate) static REPORT_SCRIPT: &str =
    r#"if [ "$#" -eq 0 ]; then cat all.jsonl; else cat partial.jsonl; fi; exit 2"#;

/// Runs shell scripts instead of elm-test.
///
/// Each script is run with `sh -c`, with the selected files as positional arguments.
#[derive(Clone, Debug)]
pub(crate) struct ShArgsBuilder {
    pub(crate) build: String,
    pub(crate) report: String,
}

impl ShArgsBuilder {
    pub(crate) fn new(build: &str, report: &str) -> Self {
        Self {
            build: build.to_owned(),
            report: report.to_owned(),
        }
    }

    fn sh_args(script: &str, files: Option<&[Utf8PathBuf]>) -> Vec<String> {
        let mut args = vec![
            "sh".to_owned(),
            "-c".to_owned(),
            script.to_owned(),
            "sh".to_owned(),
        ];
        args.extend(files.unwrap_or_default().iter().map(ToString::to_string));
        args
    }
}

impl ArgsBuilder for ShArgsBuilder {
    fn build_args(&self, _binaries: &ElmBinaries, files: Option<&[Utf8PathBuf]>) -> Vec<String> {
        Self::sh_args(&self.build, files)
    }

    fn report_args(&self, _binaries: &ElmBinaries, files: Option<&[Utf8PathBuf]>) -> Vec<String> {
        Self::sh_args(&self.report, files)
    }
}

/// A temporary workspace with report fixtures and test sources.
pub(crate) struct TempWorkspace {
    dir: Utf8TempDir,
}

impl TempWorkspace {
    pub(crate) fn new() -> Self {
        let dir = camino_tempfile::tempdir().expect("created temp dir");
        let workspace = Self { dir };
        workspace.write("all.jsonl", ALL_REPORT);
        workspace.write("partial.jsonl", PARTIAL_REPORT);
        workspace.write("tests/Calc.elm", CALC_SOURCE);
        workspace
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        self.dir.path()
    }

    pub(crate) fn write(&self, path: &str, contents: &str) {
        let path = self.root().join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("created parent dir");
        }
        std::fs::write(&path, contents).expect("wrote fixture file");
    }

    pub(crate) fn config(&self) -> ExplorerConfig {
        ExplorerConfig::default_config(self.root())
    }

    pub(crate) fn runner(&self, args_builder: impl ArgsBuilder + 'static) -> TestRunner {
        self.runner_with_config(self.config(), args_builder)
    }

    pub(crate) fn runner_with_config(
        &self,
        config: ExplorerConfig,
        args_builder: impl ArgsBuilder + 'static,
    ) -> TestRunner {
        let mut builder = TestRunnerBuilder::default();
        builder
            .set_binaries(ElmBinaries {
                elm_test: "elm-test".into(),
                elm: "elm".into(),
                elm_json: None,
            })
            .set_args_builder(args_builder);
        builder.build(config)
    }
}
