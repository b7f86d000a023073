//! `pipetop init` command - probes for a backend and generates pipetop.yml

use std::fs;
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::time::Duration;

/// Result of probing the local machine for a CRM backend
#[derive(Debug, Default)]
pub struct ScanResult {
    pub project_name: Option<String>,
    pub backend_url: Option<String>,
}

/// Run the init command
pub fn run_init(yes: bool) -> Result<(), String> {
    let cwd =
        std::env::current_dir().map_err(|e| format!("Failed to get current directory: {}", e))?;

    // Check if config already exists
    let config_names = ["pipetop.yml", "pipetop.yaml", ".pipetop.yml", ".pipetop.yaml"];
    for name in &config_names {
        let path = cwd.join(name);
        if path.exists() {
            if !yes {
                return Err(format!(
                    "Config file {} already exists. Use --yes to overwrite.",
                    path.display()
                ));
            }
            println!("Overwriting existing config: {}", path.display());
        }
    }

    println!("Scanning for a backend...\n");

    let result = scan(&cwd);

    match &result.backend_url {
        Some(url) => println!("  Found something listening at {}\n", url),
        None => println!("  No running backend found; defaulting to http://localhost:8000\n"),
    }

    // Generate YAML
    let yaml = generate_yaml(&result);

    // Write to file
    let output_path = cwd.join("pipetop.yml");
    fs::write(&output_path, &yaml).map_err(|e| format!("Failed to write config: {}", e))?;

    println!("Created: {}\n", output_path.display());
    println!("Next steps:");
    println!("  1. Review and customize pipetop.yml");
    println!("  2. Run `pipetop doctor` to verify the backend is reachable");
    println!("  3. Run `pipetop` to open the dashboard");

    Ok(())
}

fn scan(dir: &Path) -> ScanResult {
    ScanResult {
        project_name: detect_project_name(dir),
        backend_url: probe_backend(),
    }
}

/// Try the ports CRM backends commonly run on and keep the first one
/// with a listener behind it.
fn probe_backend() -> Option<String> {
    for port in [8000u16, 3000, 5000, 8080] {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        if TcpStream::connect_timeout(&addr, Duration::from_millis(300)).is_ok() {
            return Some(format!("http://localhost:{}", port));
        }
    }
    None
}

fn detect_project_name(dir: &Path) -> Option<String> {
    // Try package.json
    let pkg_json = dir.join("package.json");
    if pkg_json.exists() {
        if let Ok(content) = fs::read_to_string(&pkg_json) {
            if let Some(name) = extract_json_string(&content, "name") {
                return Some(name);
            }
        }
    }

    // Try Cargo.toml
    let cargo_toml = dir.join("Cargo.toml");
    if cargo_toml.exists() {
        if let Ok(content) = fs::read_to_string(&cargo_toml) {
            if let Some(name) = extract_toml_package_name(&content) {
                return Some(name);
            }
        }
    }

    // Fall back to directory name
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
}

// Helper functions for parsing

fn extract_json_string(content: &str, key: &str) -> Option<String> {
    let pattern = format!("\"{}\"", key);
    let idx = content.find(&pattern)?;
    let rest = &content[idx + pattern.len()..];
    let rest = rest.trim_start().strip_prefix(':')?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn extract_toml_package_name(content: &str) -> Option<String> {
    let mut in_package = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed == "[package]" {
            in_package = true;
            continue;
        }
        if trimmed.starts_with('[') && in_package {
            break;
        }
        if in_package && trimmed.starts_with("name") {
            let value = trimmed.split('=').nth(1)?.trim();
            let value = value.trim_matches('"').trim_matches('\'');
            return Some(value.to_string());
        }
    }
    None
}

/// Generate YAML configuration from scan results
fn generate_yaml(result: &ScanResult) -> String {
    let mut yaml = String::new();

    yaml.push_str("# Pipetop Configuration\n");
    yaml.push_str("# Generated by `pipetop init`\n\n");

    if let Some(name) = &result.project_name {
        yaml.push_str(&format!("name: {}\n\n", name));
    }

    yaml.push_str("backend:\n");
    let url = result
        .backend_url
        .as_deref()
        .unwrap_or("http://localhost:8000");
    yaml.push_str(&format!("  base_url: {}\n", url));
    yaml.push_str("  # Overridden by PIPETOP_BACKEND_URL or --backend\n");

    yaml
}
