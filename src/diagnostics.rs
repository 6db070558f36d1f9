// ABOUTME: Diagnostics accumulator for non-fatal warnings during deployment.
// ABOUTME: Collects warnings that shouldn't fail a deployment but should be shown to users.

use crate::deploy::Plan;

/// Collects non-fatal warnings during deployment operations.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Record the warnings a prepared plan carries.
    pub fn record_plan(&mut self, plan: &Plan) {
        for key in &plan.ignored {
            self.warn(Warning::ignored_variable(key));
        }
        for id in &plan.unused {
            self.warn(Warning::unused_variable(id));
        }
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A supplied value no declaration asks for.
    pub fn ignored_variable(key: &str) -> Self {
        Self {
            kind: WarningKind::IgnoredVariable,
            message: format!("value for {} ignored: the template does not declare it", key),
        }
    }

    /// A declared variable no service refers to.
    pub fn unused_variable(id: &str) -> Self {
        Self {
            kind: WarningKind::UnusedVariable,
            message: format!("variable {} is declared but not used by any service", id),
        }
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Supplied value was dropped.
    IgnoredVariable,
    /// Declared variable was never substituted.
    UnusedVariable,
}
