// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Renders a test result into a human-readable message.

use elm_test_metadata::{Comparison, Failure, FailureData, TestResult};
use serde_json::Value;

/// Builds the message shown for a test result.
///
/// The message consists of the diagnostic lines logged before the result arrived, followed by a
/// block for each failure. A result with no messages and no failures produces an empty string.
pub fn build_message(result: &TestResult) -> String {
    let mut lines: Vec<String> = result.messages.clone();
    for failure in &result.failures {
        push_failure(&mut lines, failure);
    }
    lines.join("\n")
}

fn push_failure(lines: &mut Vec<String>, failure: &Failure) {
    if let Some(given) = &failure.given {
        lines.push(format!("Given {given}"));
    }

    let data = failure.reason.as_ref().map(|reason| &reason.data);
    match (data, &failure.message) {
        (Some(FailureData::Comparison(comparison)), _) => push_comparison(lines, comparison),
        (_, Some(message)) => lines.push(message.clone()),
        (Some(FailureData::Message(message)), None) => lines.push(message.clone()),
        (Some(FailureData::Opaque(_)), None) | (None, None) => {}
    }
}

fn push_comparison(lines: &mut Vec<String>, comparison: &Comparison) {
    lines.push(comparison.comparison.clone());
    lines.push(format!("Expected: {}", render_value(&comparison.expected)));
    lines.push(format!("Actual:   {}", render_value(&comparison.actual)));
}

/// Renders a value: strings as they are, anything else pretty-printed as JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
