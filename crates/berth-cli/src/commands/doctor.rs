use super::{colorize_state, json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use berth_core::ResolutionEngine;
use berth_registry::LookupConfig;
use berth_resolvers::check_container_runtimes;
use berth_schema::{default_config_path, ResolverSpec, CONFIG_ENV};
use serde::Serialize;

pub fn run(json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_config(&mut checks, &mut all_pass);
    check_host_tools(&mut checks);
    check_lookup(&mut checks);

    print_results(&checks, all_pass, json_output)
}

fn check_config(checks: &mut Vec<Check>, all_pass: &mut bool) {
    let location = match std::env::var(CONFIG_ENV) {
        Ok(path) => format!("{path} (from {CONFIG_ENV})"),
        Err(_) => match default_config_path() {
            Ok(path) if path.is_file() => path.display().to_string(),
            Ok(_) => "built-in default chain".to_owned(),
            Err(e) => e.to_string(),
        },
    };

    match ResolverSpec::load_default() {
        Ok(spec) => {
            checks.push(Check::pass(
                "config",
                &format!("Configuration valid: {location}"),
            ));
            for status in ResolutionEngine::new(&spec).status() {
                if status.available {
                    checks.push(Check::pass(
                        "resolver",
                        &format!("Resolver {} ({}) ready", status.name, status.resolver_type),
                    ));
                } else {
                    checks.push(Check::warn(
                        "resolver",
                        &format!(
                            "Resolver {} ({}) has nothing to resolve from",
                            status.name, status.resolver_type
                        ),
                    ));
                }
            }
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "config",
                &format!("Configuration invalid ({location}): {e}"),
            ));
        }
    }
}

fn check_host_tools(checks: &mut Vec<Check>) {
    for tool in check_container_runtimes() {
        match &tool.path {
            Some(path) => checks.push(Check::pass(
                "host_tool",
                &format!("{} found at {}", tool.name, path.display()),
            )),
            None => checks.push(Check::warn(
                "host_tool",
                &format!("{} not found (install: {})", tool.name, tool.install_hint),
            )),
        }
    }
}

fn check_lookup(checks: &mut Vec<Check>) {
    match LookupConfig::load_default() {
        Ok(config) => checks.push(Check::info(
            "lookup",
            &format!("Repository metadata from {}", config.url),
        )),
        Err(_) => checks.push(Check::info(
            "lookup",
            "No lookup config (plan needs --registry or --tool-shed)",
        )),
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks,
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("Berth Doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks {}.", colorize_state("pass"));
        } else {
            println!("Some checks {}. See above for details.", colorize_state("fail"));
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

#[derive(Serialize)]
struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
