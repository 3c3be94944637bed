// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A single line of `elm-test --report json` output, decoded.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedLine {
    /// The line was a recognized event.
    Event(TestEvent),

    /// The line was not a recognized event.
    ///
    /// This is usually output logged by the code under test. The line is kept verbatim.
    Diagnostic(String),
}

/// Parses one line of `elm-test --report json` output.
///
/// This never fails: anything that isn't a recognized event is returned as
/// [`ParsedLine::Diagnostic`], so no output is ever dropped.
pub fn parse_line(line: &str) -> ParsedLine {
    let json = line.strip_suffix('\r').unwrap_or(line);
    if !json.trim_start().starts_with('{') {
        return ParsedLine::Diagnostic(line.to_owned());
    }

    match serde_json::from_str::<TestEvent>(json) {
        // A completed test must be placed somewhere in the tree.
        Ok(TestEvent::TestCompleted(result)) if result.labels.is_empty() => {
            ParsedLine::Diagnostic(line.to_owned())
        }
        Ok(event) => ParsedLine::Event(event),
        Err(_) => ParsedLine::Diagnostic(line.to_owned()),
    }
}

/// An event reported by elm-test.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TestEvent {
    /// The test run started.
    RunStart(RunStart),

    /// A single test finished.
    TestCompleted(TestResult),

    /// The test run finished.
    RunComplete(RunComplete),
}

/// Metadata reported at the start of a run.
///
/// Every field is optional and decoded leniently: elm-test prints most numbers as strings.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunStart {
    /// The number of tests elm-test is about to run.
    #[serde(default, deserialize_with = "lenient_count")]
    pub test_count: Option<u64>,

    /// The number of fuzz runs per fuzz test.
    #[serde(default, deserialize_with = "lenient_count")]
    pub fuzz_runs: Option<u64>,

    /// The seed the run was started with.
    #[serde(default, deserialize_with = "lenient_string")]
    pub initial_seed: Option<String>,

    /// The test files included in the run.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub paths: Vec<String>,
}

/// Summary reported at the end of a run.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunComplete {
    /// The number of passed tests.
    #[serde(default, deserialize_with = "lenient_count")]
    pub passed: Option<u64>,

    /// The number of failed tests.
    #[serde(default, deserialize_with = "lenient_count")]
    pub failed: Option<u64>,

    /// The total duration of the run, in milliseconds.
    #[serde(default, deserialize_with = "lenient_count")]
    pub duration: Option<u64>,

    /// The reason the whole run was failed even though every test passed, if any (for example
    /// `Test.only` being used).
    #[serde(default, deserialize_with = "lenient_string")]
    pub auto_fail: Option<String>,
}

/// The outcome of a single completed test.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TestResult {
    /// The label path of the test: the module name first, the test name last.
    ///
    /// Never empty for results returned by [`parse_line`].
    pub labels: Vec<String>,

    /// The status of the test.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: TestStatus,

    /// Details for each failed expectation.
    #[serde(default, deserialize_with = "lenient_failures")]
    pub failures: Vec<Failure>,

    /// Diagnostic lines printed before this result arrived.
    ///
    /// This is never read from the wire: it is filled in when the result is accepted into a run.
    #[serde(skip)]
    pub messages: Vec<String>,

    /// How long the test took, in milliseconds.
    #[serde(rename = "duration", default, deserialize_with = "lenient_count")]
    pub duration_ms: Option<u64>,
}

impl TestResult {
    /// Creates a new result with no failures or messages.
    pub fn new(labels: impl IntoIterator<Item = impl Into<String>>, status: TestStatus) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            status,
            failures: Vec::new(),
            messages: Vec::new(),
            duration_ms: None,
        }
    }

    /// Returns the name of the module this test is defined in.
    pub fn module_name(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }
}

/// The status of a completed test.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TestStatus {
    /// The test passed.
    Pass,

    /// The test is a `Test.todo` placeholder.
    Todo,

    /// The test failed.
    ///
    /// Unrecognized and missing statuses are treated as failures.
    #[default]
    #[serde(other)]
    Fail,
}

/// A single failed expectation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Failure {
    /// The human-readable failure message.
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,

    /// The input a fuzz test failed on, if this is a fuzz test.
    #[serde(default, deserialize_with = "lenient_string")]
    pub given: Option<String>,

    /// Structured information about the failure.
    #[serde(default)]
    pub reason: Option<FailureReason>,
}

/// Structured information about a failure.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct FailureReason {
    /// The elm-test reason tag, for example `custom` or `Equality`.
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,

    /// The payload of the reason.
    #[serde(default)]
    pub data: FailureData,
}

/// The payload of a [`FailureReason`].
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FailureData {
    /// A comparison between an expected and an actual value.
    Comparison(Comparison),

    /// A plain message.
    Message(String),

    /// Any other payload, kept as is.
    Opaque(Value),
}

impl Default for FailureData {
    fn default() -> Self {
        Self::Opaque(Value::Null)
    }
}

/// A failed comparison, such as the one produced by `Expect.equal`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Comparison {
    /// The expected value.
    pub expected: Value,

    /// The actual value.
    pub actual: Value,

    /// The kind of comparison, for example `Expect.equal`.
    pub comparison: String,
}

// ---
// Lenient decoders
// ---

fn lenient_status<'de, D>(deserializer: D) -> Result<TestStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(_) => TestStatus::deserialize(value).unwrap_or_default(),
        _ => TestStatus::Fail,
    })
}

/// A failure that doesn't decode is kept as an empty failure, so the result still counts it.
fn lenient_failures<'de, D>(deserializer: D) -> Result<Vec<Failure>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(values) => values
            .into_iter()
            .map(|v| Failure::deserialize(v).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(values) => values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
