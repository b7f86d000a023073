use std::path::Path;

use pipetop_core::api::{ApiError, CrmApi};
use pipetop_core::config::{Config, ConfigError};

use crate::client::HttpApi;

#[derive(Debug)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub hint: Option<String>,
}

impl Check {
    fn ok(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
            hint: None,
        }
    }

    fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

pub async fn run_doctor(backend_override: Option<String>) -> Result<(), String> {
    println!("Pipetop Doctor\n");
    println!("Checking environment...\n");

    let mut failed = 0usize;

    // === Environment Checks ===
    println!("Environment:");

    let term = check_terminal();
    print_check(&term);
    failed += usize::from(!term.passed);

    println!();

    // === Config Checks ===
    let mut config: Option<Config> = None;
    match find_config() {
        Some(path) => {
            println!("Configuration: {}", path.display());
            for check in check_config(&path, &mut config) {
                print_check(&check);
                failed += usize::from(!check.passed);
            }
        }
        None => {
            println!("Configuration: not found (defaults apply)");
            println!("  Run `pipetop init` to create one");
        }
    }

    println!();

    // === Backend Checks ===
    let base_url = match backend_override {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => config.unwrap_or_default().effective_base_url(),
    };
    println!("Backend: {}", base_url);

    let backend = check_backend(&base_url).await;
    print_check(&backend);
    failed += usize::from(!backend.passed);

    println!();

    if failed == 0 {
        println!("All checks passed!");
        Ok(())
    } else {
        Err(format!("{} check(s) failed", failed))
    }
}

fn print_check(check: &Check) {
    let icon = if check.passed { "✓" } else { "✗" };
    let color = if check.passed { "\x1b[32m" } else { "\x1b[31m" };
    let reset = "\x1b[0m";

    println!(
        "  {}{}{} {}: {}",
        color, icon, reset, check.name, check.message
    );

    if let Some(hint) = &check.hint {
        println!("    └─ {}", hint);
    }
}

fn check_terminal() -> Check {
    match std::env::var("TERM") {
        Ok(term) if term != "dumb" => Check::ok("terminal", term),
        Ok(_) => Check::fail("terminal", "TERM=dumb")
            .with_hint("Use a terminal emulator with cursor addressing for the TUI"),
        Err(_) => Check::fail("terminal", "TERM is not set")
            .with_hint("Set TERM (e.g. xterm-256color) for the TUI"),
    }
}

fn find_config() -> Option<std::path::PathBuf> {
    let cwd = std::env::current_dir().ok()?;

    for name in &["pipetop.yml", "pipetop.yaml", ".pipetop.yml", ".pipetop.yaml"] {
        let path = cwd.join(name);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

fn check_config(path: &Path, out: &mut Option<Config>) -> Vec<Check> {
    match Config::load(path) {
        Ok(config) => {
            let checks = vec![
                Check::ok("config", "parsed"),
                Check::ok("base_url", config.backend.base_url.clone()),
            ];
            *out = Some(config);
            checks
        }
        Err(ConfigError::InvalidBaseUrl { url }) => vec![
            Check::ok("config", "parsed"),
            Check::fail("base_url", format!("'{}' is not usable", url))
                .with_hint("Use http://host:port or https://host:port"),
        ],
        Err(e) => vec![
            Check::fail("config", e.to_string())
                .with_hint("Fix the YAML or regenerate with `pipetop init --yes`"),
        ],
    }
}

/// One real round trip against the API, so decode and status problems
/// show up here and not only in the TUI.
async fn check_backend(base_url: &str) -> Check {
    let api = HttpApi::new(base_url);
    match api.fetch_summary().await {
        Ok(summary) => Check::ok(
            "backend",
            format!(
                "GET /api/dashboard ok ({} leads, {} deals)",
                summary.cards.total_leads, summary.cards.total_deals
            ),
        ),
        Err(e @ ApiError::Transport { .. }) => Check::fail("backend", e.to_string())
            .with_hint("Start the CRM backend or point --backend at it"),
        Err(e @ ApiError::Status { .. }) => Check::fail("backend", e.to_string())
            .with_hint("The server is up but refused /api/dashboard; check the URL"),
        Err(e @ ApiError::Decode { .. }) => Check::fail("backend", e.to_string())
            .with_hint("The URL answers, but not with the CRM API; check base_url"),
    }
}
