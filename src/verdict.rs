use serde::{Deserialize, Serialize};

/// One test case submitted with an execution request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    /// Caller-owned flag; the engine passes it through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            hidden: None,
        }
    }
}

/// Verdict for one test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub test_index: usize,
    pub passed: bool,
    pub expected_output: String,
    pub actual_output: Option<String>,
    /// Diagnostic distinguishing wrong answer, timeout and runtime error.
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// The complete, ordered verdict set for one execution request.
///
/// `success` is false only for request-level failures (unsupported language,
/// workspace I/O); individual test failures never flip it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub passed: usize,
    pub total: usize,
    pub results: Vec<TestResult>,
    pub error: Option<String>,
}

impl ExecutionReport {
    /// Report for a failure that aborted the request before any test ran.
    pub fn systemic_failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            passed: 0,
            total: 0,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Aggregate per-test verdicts, preserving their index order.
    ///
    /// Zero test cases is vacuous success.
    pub fn from_results(results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            success: true,
            passed,
            total: results.len(),
            results,
            error: None,
        }
    }
}

/// Exact-equality comparison after trimming leading/trailing whitespace.
/// No numeric or semantic normalization.
pub fn outputs_match(expected: &str, actual: &str) -> bool {
    expected.trim() == actual.trim()
}
