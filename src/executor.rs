use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::container::runner::run_test_case;
use crate::container::{ContainerRuntime, DockerRuntime};
use crate::error::{JudgeError, Result};
use crate::language::{LanguageProfile, LanguageRegistry};
use crate::verdict::{ExecutionReport, TestCase};
use crate::workspace::Workspace;

/// Orchestrates one execution request end to end: validation, workspace
/// setup, per-test execution, aggregation, cleanup.
///
/// Stateless across calls; all per-call state is ephemeral and destroyed
/// before [`Executor::execute`] returns.
pub struct Executor {
    runtime: Arc<dyn ContainerRuntime>,
    registry: LanguageRegistry,
    config: Config,
}

impl Executor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, registry: LanguageRegistry, config: Config) -> Self {
        Self {
            runtime,
            registry,
            config,
        }
    }

    /// Executor over the local Docker daemon, with the language table built
    /// from the configuration's `[languages]` entries over the builtins.
    pub async fn with_docker(config: Config) -> Result<Self> {
        let runtime = DockerRuntime::connect().await?;
        let registry = LanguageRegistry::with_overrides(config.languages.clone());
        Ok(Self::new(Arc::new(runtime), registry, config))
    }

    /// Run the submission against every test case and return the complete,
    /// ordered verdict set.
    ///
    /// Never fails at the call boundary: systemic failures (unsupported
    /// language, workspace I/O) come back as `success: false` with an empty
    /// result list, and per-test failures are contained in their own
    /// [`TestResult`](crate::verdict::TestResult).
    pub async fn execute(
        &self,
        source_code: &str,
        language_id: &str,
        test_cases: &[TestCase],
    ) -> ExecutionReport {
        match self.try_execute(source_code, language_id, test_cases).await {
            Ok(report) => report,
            Err(e) => {
                error!("Execution request aborted: {}", e);
                ExecutionReport::systemic_failure(e.to_string())
            }
        }
    }

    async fn try_execute(
        &self,
        source_code: &str,
        language_id: &str,
        test_cases: &[TestCase],
    ) -> Result<ExecutionReport> {
        // Validate before any workspace exists: an unsupported language must
        // never touch the filesystem.
        let profile = self
            .registry
            .lookup(language_id)
            .ok_or_else(|| JudgeError::UnsupportedLanguage(language_id.to_string()))?;

        let execution_id = Uuid::new_v4().to_string();
        info!(
            "Executing {} submission {} against {} test case(s)",
            language_id,
            execution_id,
            test_cases.len()
        );

        let workspace = Workspace::create(&self.config.sandbox.workspace_root, &execution_id).await?;

        let outcome = self
            .run_all(&workspace, profile, &execution_id, source_code, test_cases)
            .await;

        // Cleanup runs exactly once per request, whatever preceded it. A
        // failure here is operational: logged, never a verdict change.
        if let Err(e) = workspace.destroy().await {
            warn!("Workspace cleanup failed for execution {}: {}", execution_id, e);
        }

        outcome
    }

    async fn run_all(
        &self,
        workspace: &Workspace,
        profile: &LanguageProfile,
        execution_id: &str,
        source_code: &str,
        test_cases: &[TestCase],
    ) -> Result<ExecutionReport> {
        workspace.write_source(source_code, profile).await?;
        for (index, test) in test_cases.iter().enumerate() {
            workspace.write_input(index, &test.input).await?;
        }

        // Bounded worker pool over the test cases. `buffered` caps how many
        // units run at once and yields results in input order, so verdicts
        // are index-ordered regardless of completion order. A cap of 1 is
        // the sequential reference behavior.
        let concurrency = self.config.sandbox.max_concurrency.max(1);
        let results = stream::iter(test_cases.iter().enumerate().map(|(index, test)| {
            run_test_case(
                self.runtime.as_ref(),
                workspace,
                profile,
                execution_id,
                index,
                test,
                &self.config.sandbox,
            )
        }))
        .buffered(concurrency)
        .collect::<Vec<_>>()
        .await;

        Ok(ExecutionReport::from_results(results))
    }
}
