use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::SandboxConfig;
use crate::container::runtime::{ContainerRuntime, UnitSpec, MOUNT_TARGET};
use crate::language::LanguageProfile;
use crate::verdict::{outputs_match, TestCase, TestResult};
use crate::workspace::Workspace;

/// Name of the execution unit for one test case. Deterministic over
/// `(execution_id, test_index)`; concurrent requests are partitioned by
/// execution id, so names never collide across requests.
pub fn unit_name(execution_id: &str, test_index: usize) -> String {
    format!("judgebox-{execution_id}-{test_index}")
}

/// Run one test case in its own execution unit and turn every outcome into
/// a verdict.
///
/// This function is stateless and reentrant. It never propagates an error:
/// timeout, crash, launch failure and wrong output are all data inside the
/// returned [`TestResult`], so one bad test case cannot abort the batch.
/// The unit is torn down on every path; a teardown failure is logged and
/// does not alter the already-computed verdict.
pub async fn run_test_case(
    runtime: &dyn ContainerRuntime,
    workspace: &Workspace,
    profile: &LanguageProfile,
    execution_id: &str,
    test_index: usize,
    test: &TestCase,
    config: &SandboxConfig,
) -> TestResult {
    let name = unit_name(execution_id, test_index);
    let expected = test.expected_output.trim().to_string();
    let deadline = profile
        .timeout()
        .unwrap_or(Duration::from_secs(config.default_timeout_seconds));

    let source_path = format!("{MOUNT_TARGET}/{}", profile.source_file_name());
    let spec = UnitSpec {
        name: name.clone(),
        image: profile.image.clone(),
        argv: profile.command.resolve(&source_path),
        workspace_dir: workspace.dir().to_path_buf(),
        limits: config.limits.clone(),
        max_output_bytes: config.max_output_bytes,
    };

    let started = Instant::now();

    let stdin = match workspace.read_input(test_index).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // Inputs are written before any unit starts, so this is a host
            // fault; contain it as a per-test runtime error.
            warn!("Failed to read input for test {}: {}", test_index, e);
            return TestResult {
                test_index,
                passed: false,
                expected_output: expected,
                actual_output: None,
                error: Some(e.to_string()),
                duration_ms: started.elapsed().as_millis() as u64,
            };
        }
    };

    debug!(
        "Running test {} of execution {} in unit {}",
        test_index, execution_id, name
    );

    let outcome = timeout(deadline, runtime.run_unit(&spec, &stdin)).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    // Teardown runs unconditionally: success, failure, timeout, or an error
    // while launching. Exceeding the deadline drops the run future, so the
    // forced removal below is what actually kills a hung unit.
    if let Err(e) = runtime.remove_unit(&name).await {
        warn!("Failed to remove execution unit {}: {}", name, e);
    }

    match outcome {
        Ok(Ok(output)) => {
            let actual = output.stdout.trim().to_string();
            let stderr = output.stderr.trim().to_string();
            let passed = output.exit_code == 0 && outputs_match(&expected, &actual);

            let error = if passed {
                None
            } else if output.exit_code != 0 {
                Some(if stderr.is_empty() {
                    format!("exited with code {}", output.exit_code)
                } else {
                    stderr
                })
            } else if stderr.is_empty() {
                None
            } else {
                Some(stderr)
            };

            TestResult {
                test_index,
                passed,
                expected_output: expected,
                actual_output: Some(actual),
                error,
                duration_ms,
            }
        }
        Ok(Err(e)) => {
            warn!("Execution unit {} failed: {}", name, e);
            TestResult {
                test_index,
                passed: false,
                expected_output: expected,
                actual_output: None,
                error: Some(e.to_string()),
                duration_ms,
            }
        }
        Err(_) => {
            debug!("Execution unit {} exceeded deadline {:?}", name, deadline);
            TestResult {
                test_index,
                passed: false,
                expected_output: expected,
                actual_output: None,
                error: Some(format!("timeout after {}s", deadline.as_secs())),
                duration_ms,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_name_partitions_by_execution_and_index() {
        assert_eq!(unit_name("abc", 0), "judgebox-abc-0");
        assert_ne!(unit_name("abc", 0), unit_name("abc", 1));
        assert_ne!(unit_name("abc", 0), unit_name("abd", 0));
    }
}
