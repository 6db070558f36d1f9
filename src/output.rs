// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::api::AppListing;
use crate::deploy::DeploymentState;
use crate::template::ResolvedServiceSpec;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
#[derive(Debug, Clone)]
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a non-fatal warning (suppressed in quiet mode).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit(&JsonEvent {
                event: "warning",
                message,
                duration_secs: None,
            }),
        }
    }

    /// Emit a deployment snapshot as a JSON line (json mode only).
    pub fn state(&self, state: &DeploymentState) {
        if self.mode != OutputMode::Json {
            return;
        }
        let event = StateEvent {
            event: "state",
            state,
        };
        if let Ok(json) = serde_json::to_string(&event) {
            println!("{json}");
        }
    }

    /// List resolved services: one line each, or a single JSON event.
    pub fn services(&self, services: &[ResolvedServiceSpec]) {
        match self.mode {
            OutputMode::Normal => {
                for spec in services {
                    let web = match spec.container_http_port {
                        Some(port) if spec.expose_as_web_app => format!(", http {}", port),
                        _ if spec.expose_as_web_app => ", http 80".to_string(),
                        _ => String::new(),
                    };
                    println!(
                        "  {} ({}, {} env, {} port(s), {} volume(s){})",
                        spec.name,
                        spec.image,
                        spec.environment.len(),
                        spec.ports.len(),
                        spec.volumes.len(),
                        web
                    );
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = ServicesEvent {
                    event: "services",
                    services,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// List repository apps: one line each, or a single JSON event.
    pub fn apps(&self, apps: &[AppListing]) {
        match self.mode {
            OutputMode::Normal => {
                for app in apps {
                    match (&app.display_name, &app.description) {
                        (_, Some(description)) => println!("  {}: {}", app.name, description),
                        (Some(display_name), None) => println!("  {} ({})", app.name, display_name),
                        (None, None) => println!("  {}", app.name),
                    }
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = AppsEvent {
                    event: "apps",
                    apps,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => self.emit(&JsonEvent {
                event: "success",
                message,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    fn emit(&self, event: &JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            println!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct ServicesEvent<'a> {
    event: &'a str,
    services: &'a [ResolvedServiceSpec],
}

#[derive(Serialize)]
struct StateEvent<'a> {
    event: &'a str,
    state: &'a DeploymentState,
}

#[derive(Serialize)]
struct AppsEvent<'a> {
    event: &'a str,
    apps: &'a [AppListing],
}
