// ABOUTME: Pipeline orchestration: preflight, then each selected step in order.
// ABOUTME: Stops at the first failing step; warnings are collected into the run report.

mod overrides;

pub use overrides::{OverrideError, Overrides};

use snafu::{ResultExt, Snafu};

use crate::config::{Settings, Vars};
use crate::diagnostics::{Diagnostics, Warning};
use crate::output::Output;
use crate::provider::{ProviderError, Provider};
use crate::state::{StateKey, StateStore};
use crate::steps::{self, Step, StepContext, StepError};

/// Errors that end a pipeline run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    #[snafu(display("cannot run here: {source}"))]
    Unsupported { source: ProviderError },

    #[snafu(display("step '{step}' failed: {source}"))]
    StepFailed { step: String, source: StepError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// The provider cannot be driven from this process; nothing ran.
    Unsupported,
    /// A step failed; earlier steps' effects remain.
    StepFailed,
}

impl PipelineError {
    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            PipelineError::Unsupported { .. } => PipelineErrorKind::Unsupported,
            PipelineError::StepFailed { .. } => PipelineErrorKind::StepFailed,
        }
    }

    /// Name of the failed step, if a step failed.
    pub fn step(&self) -> Option<&str> {
        match self {
            PipelineError::StepFailed { step, .. } => Some(step),
            PipelineError::Unsupported { .. } => None,
        }
    }

    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            PipelineError::StepFailed { source, .. } => Some(source),
            PipelineError::Unsupported { .. } => None,
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps_run: Vec<&'static str>,
    pub steps_skipped: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// Ordered list of steps to execute.
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
    unknown: Vec<String>,
}

impl Pipeline {
    /// Resolve the configured step names. Unknown names are remembered and skipped.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::from_names(settings.steps.iter().map(String::as_str))
    }

    pub fn from_names<'n>(names: impl IntoIterator<Item = &'n str>) -> Self {
        let mut steps = Vec::new();
        let mut unknown = Vec::new();
        for name in names {
            match steps::by_name(name) {
                Some(step) => steps.push(step),
                None => unknown.push(name.to_string()),
            }
        }
        Self { steps, unknown }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub async fn run(
        &self,
        settings: &Settings,
        vars: &mut Vars,
        store: &mut StateStore,
        provider: &dyn Provider,
        output: &Output,
    ) -> Result<RunReport, PipelineError> {
        provider.preflight().await.context(UnsupportedSnafu)?;

        let mut diag = Diagnostics::default();
        for name in &self.unknown {
            diag.warn(Warning::unknown_step(name));
        }
        let mut shown = flush_warnings(&diag, 0, output);

        let mut report = RunReport {
            steps_skipped: self.unknown.clone(),
            ..RunReport::default()
        };

        tracing::info!(
            "running steps {:?} in {} mode",
            self.step_names(),
            settings.action_mode
        );

        for step in &self.steps {
            // Steps after the first read the project recorded by earlier ones.
            if let Some(project) = vars.get(StateKey::ProjectId.as_str()) {
                provider.use_project(project);
            }

            output.progress(&format!("==> {}", step.name()));
            let mut ctx = StepContext {
                settings,
                vars: &mut *vars,
                store: &mut *store,
                provider,
                output,
                diag: &mut diag,
            };
            let result = step.run(&mut ctx).await;
            shown = flush_warnings(&diag, shown, output);
            result.context(StepFailedSnafu { step: step.name() })?;

            report.steps_run.push(step.name());
        }

        report.warnings = diag.into_warnings();
        Ok(report)
    }
}

/// Print warnings recorded since the last flush; returns the new count.
fn flush_warnings(diag: &Diagnostics, shown: usize, output: &Output) -> usize {
    for warning in &diag.warnings()[shown..] {
        output.warning(&warning.message);
    }
    diag.warnings().len()
}
