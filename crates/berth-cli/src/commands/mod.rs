pub mod check_config;
pub mod completions;
pub mod doctor;
pub mod hash;
pub mod man_pages;
pub mod plan;
pub mod presets;
pub mod resolve;

use berth_schema::{ResolutionResult, ResolverSpec};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_PLAN_ERROR: u8 = 3;

/// Message prefixes `main` maps to exit codes.
pub const CONFIG_ERROR_PREFIX: &str = "configuration error:";
pub const TOOL_ERROR_PREFIX: &str = "invalid tool requirements:";
pub const PLAN_ERROR_PREFIX: &str = "plan error:";

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn result_state(result: &ResolutionResult) -> &'static str {
    if result.satisfied {
        "satisfied"
    } else if result.error.is_some() {
        "failed"
    } else {
        "unsatisfied"
    }
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "satisfied" | "pass" => Style::new().green().apply_to(state).to_string(),
        "unsatisfied" | "warn" => Style::new().yellow().apply_to(state).to_string(),
        "failed" | "fail" => Style::new().red().bold().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

/// The resolver chain selected by `--config`, `--preset`, or the user's
/// default configuration, in that order.
pub fn load_spec(config: Option<&Path>, preset: Option<&str>) -> Result<ResolverSpec, String> {
    let spec = match (config, preset) {
        (Some(path), _) => ResolverSpec::load(path),
        (None, Some(name)) => ResolverSpec::preset(name),
        (None, None) => ResolverSpec::load_default(),
    };
    spec.map_err(|e| format!("{CONFIG_ERROR_PREFIX} {e}"))
}
