// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino::Utf8PathBuf;
use elm_test_metadata::TestStatus;
use elm_test_runner::{
    errors::{RunError, RunPhase},
    message::build_message,
    reporter::{ExplorerEvent, emit_source_locations, emit_test_events, emit_tree_events},
    runner::{PromotionPolicy, RunStats},
    test_command::{ArgsBuilder, ElmBinaries},
    tree::NodeRef,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn build_failure_rejects_run() {
    let workspace = TempWorkspace::new();
    let mut runner = workspace.runner(ShArgsBuilder::new(
        "echo 'CalcTest.elm: TYPE MISMATCH' >&2; exit 1",
        REPORT_SCRIPT,
    ));

    let error = runner.run_all().await.expect_err("build fails");
    assert!(error.is_build_failure());
    assert!(
        error.to_string().starts_with("elm-test failed."),
        "error: {error}"
    );
    let RunError::BuildFailed { stderr, .. } = &error else {
        panic!("expected BuildFailed, found {error:?}");
    };
    assert_eq!(stderr, "CalcTest.elm: TYPE MISMATCH\n");
    assert!(runner.loaded_tree().is_none(), "no tree is produced");
}

#[tokio::test]
async fn spawn_failure() {
    #[derive(Debug)]
    struct MissingProgram;

    impl ArgsBuilder for MissingProgram {
        fn build_args(&self, _: &ElmBinaries, _: Option<&[Utf8PathBuf]>) -> Vec<String> {
            vec!["/nonexistent/elm-test".to_owned(), "make".to_owned()]
        }

        fn report_args(&self, _: &ElmBinaries, _: Option<&[Utf8PathBuf]>) -> Vec<String> {
            vec!["/nonexistent/elm-test".to_owned()]
        }
    }

    let workspace = TempWorkspace::new();
    let mut runner = workspace.runner(MissingProgram);
    let error = runner.run_all().await.expect_err("spawn fails");
    assert!(
        matches!(
            error,
            RunError::Spawn {
                phase: RunPhase::Build,
                ..
            }
        ),
        "error: {error:?}"
    );
}

#[tokio::test]
async fn run_all_builds_tree() {
    let workspace = TempWorkspace::new();
    let mut runner = workspace.runner(ShArgsBuilder::new("exit 0", REPORT_SCRIPT));

    let tree = runner.run_all().await.expect("run succeeds");
    assert_eq!(tree.test_count(), 3);
    let Some(NodeRef::Test(adds)) = tree.find("root/Calc/Calc/adds") else {
        panic!("adds is a test");
    };
    assert_eq!(
        adds.file.as_deref(),
        Some(workspace.root().join("tests/Calc.elm").as_path())
    );
    assert_eq!(adds.description.as_deref(), Some("1 ms"));
    let Some(NodeRef::Test(later)) = tree.find("root/Other/later") else {
        panic!("later is a test");
    };
    assert_eq!(later.skipped, Some(true));

    let results = runner.results();
    assert_eq!(
        results["root/Calc/Calc/adds"].messages,
        ["Compiling > Starting tests", "debug: 1"]
    );
    assert_eq!(
        build_message(&results["root/Calc/Calc/subtracts"]),
        "Expect.equal\nExpected: 1\nActual:   2"
    );
    assert_eq!(
        RunStats::from_results(results),
        RunStats {
            passed: 1,
            failed: 1,
            todo: 1,
        }
    );

    let tree = runner.loaded_tree().expect("tree is loaded");
    let mut events = Vec::new();
    emit_tree_events(tree.root(), runner.results(), &mut events);
    let terminal: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ExplorerEvent::TestPassed { id, .. } => Some(("passed", id.as_str())),
            ExplorerEvent::TestFailed { id, .. } => Some(("failed", id.as_str())),
            ExplorerEvent::TestSkipped { id, .. } => Some(("skipped", id.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(
        terminal,
        [
            ("passed", "root/Calc/Calc/adds"),
            ("failed", "root/Calc/Calc/subtracts"),
            ("skipped", "root/Other/later"),
        ]
    );
    assert_eq!(events.first().map(ExplorerEvent::id), Some("root"));
    assert_eq!(events.last().map(ExplorerEvent::id), Some("root"));

    // tests/Other.elm doesn't exist, so only the Calc tests are located.
    let mut events = Vec::new();
    let emitted = emit_source_locations(tree, runner.results(), &mut events).await;
    assert_eq!(emitted, 2);
    let calc = workspace.root().join("tests/Calc.elm");
    assert_eq!(
        events,
        [
            ExplorerEvent::TestLocated {
                id: "root/Calc/Calc/adds".to_owned(),
                file: calc.clone(),
                line: 9,
            },
            ExplorerEvent::TestLocated {
                id: "root/Calc/Calc/subtracts".to_owned(),
                file: calc,
                line: 10,
            },
        ]
    );
}

#[tokio::test]
async fn partial_run_keeps_prior_results() {
    let workspace = TempWorkspace::new();
    let mut runner = workspace.runner(ShArgsBuilder::new("exit 0", REPORT_SCRIPT));
    runner.run_all().await.expect("full run succeeds");

    let calc = workspace.root().join("tests/Calc.elm");
    let tree = runner.run_some(vec![calc]).await.expect("partial run succeeds");
    assert_eq!(tree.test_count(), 3, "loaded tree is kept");

    let results = runner.results();
    assert_eq!(results["root/Calc/Calc/subtracts"].status, TestStatus::Pass);
    assert_eq!(results["root/Calc/Calc/adds"].status, TestStatus::Pass);
    assert_eq!(results["root/Other/later"].status, TestStatus::Todo);

    // Replaying a single test reports its new state.
    let mut events = Vec::new();
    emit_test_events(["root/Calc/Calc/subtracts"], results, &mut events);
    assert_eq!(
        events,
        [
            ExplorerEvent::TestStarted {
                id: "root/Calc/Calc/subtracts".to_owned(),
            },
            ExplorerEvent::TestPassed {
                id: "root/Calc/Calc/subtracts".to_owned(),
                message: String::new(),
            },
        ]
    );
}

#[tokio::test]
async fn full_runs_replace_tree() {
    let workspace = TempWorkspace::new();
    let mut config = workspace.config();
    config.set_promotion(PromotionPolicy::FullRuns);
    let mut runner =
        workspace.runner_with_config(config, ShArgsBuilder::new("exit 0", REPORT_SCRIPT));
    runner.run_all().await.expect("first run succeeds");

    // The Other module was removed.
    workspace.write(
        "all.jsonl",
        r#"{"event":"testCompleted","status":"pass","labels":["Calc","Calc","adds"]}"#,
    );
    let tree = runner.run_all().await.expect("second run succeeds");
    assert_eq!(tree.test_count(), 1);
    assert!(tree.find("root/Other").is_none());
    assert_eq!(runner.results().len(), 1);
}

#[tokio::test]
async fn run_selected_loads_tree_first() {
    let workspace = TempWorkspace::new();
    let mut runner = workspace.runner(ShArgsBuilder::new("exit 0", REPORT_SCRIPT));

    let ids = runner
        .run_selected(["root/Calc"])
        .await
        .expect("run succeeds");
    assert_eq!(ids, ["root/Calc/Calc/adds", "root/Calc/Calc/subtracts"]);
    assert!(runner.loaded_tree().is_some());

    let ids = runner
        .run_selected(["root/Calc/Calc/subtracts", "root/Unknown"])
        .await
        .expect("run succeeds");
    assert_eq!(ids, ["root/Calc/Calc/subtracts"]);
    assert_eq!(
        runner.results()["root/Calc/Calc/subtracts"].status,
        TestStatus::Pass
    );
}

#[tokio::test]
async fn partial_lines_are_joined() {
    let workspace = TempWorkspace::new();
    let report = r#"
        printf '%s' 'log: {"event":"testCompleted",'
        printf '\n%s' '{"event":"testCompleted","status":"pass",'
        sleep 0.1
        printf '%s\r\n' '"labels":["Split","first"]}'
        printf '%s' '{"event":"testCompleted","status":"fail","labels":["Split","last"]}'
    "#;
    let mut runner = workspace.runner(ShArgsBuilder::new("exit 0", report));

    let tree = runner.run_all().await.expect("run succeeds");
    assert_eq!(tree.test_count(), 2);
    let results = runner.results();
    assert_eq!(
        results["root/Split/first"].messages,
        [r#"log: {"event":"testCompleted","#]
    );
    assert_eq!(results["root/Split/last"].status, TestStatus::Fail);
}

#[tokio::test]
async fn killed_run_resolves_with_partial_tree() {
    let workspace = TempWorkspace::new();
    let report = r#"head -n 4 all.jsonl; kill -KILL $$"#;
    let mut runner = workspace.runner(ShArgsBuilder::new("exit 0", report));

    let tree = runner.run_all().await.expect("run resolves");
    assert_eq!(tree.test_count(), 1);
    assert!(tree.find("root/Calc/Calc/adds").is_some());
}

#[tokio::test]
async fn report_stderr_is_only_logged() {
    let workspace = TempWorkspace::new();
    let report = r#"
        echo '{"event":"testCompleted","status":"pass","labels":["Stderr","hidden"]}' >&2
        echo 'warning: stderr log line' >&2
        sleep 0.1
        cat all.jsonl
        exit 3
    "#;
    let mut runner = workspace.runner(ShArgsBuilder::new("exit 0", report));

    let tree = runner.run_all().await.expect("unexpected exit code still resolves");
    assert_eq!(tree.test_count(), 3);
    assert!(tree.find("root/Stderr/hidden").is_none());
    assert!(tree.find("root/Stderr").is_none());

    let results = runner.results();
    assert!(!results.contains_key("root/Stderr/hidden"));
    assert_eq!(
        results["root/Calc/Calc/adds"].messages,
        ["Compiling > Starting tests", "debug: 1"]
    );
    for (id, result) in results {
        let leaked = result
            .messages
            .iter()
            .any(|message| message.contains("Stderr") || message.contains("stderr log line"));
        assert!(!leaked, "stderr leaked into messages for {id}: {:?}", result.messages);
    }
}
