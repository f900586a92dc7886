use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS, PLAN_ERROR_PREFIX};
use berth_core::{build_plan, PlanOptions};
use berth_registry::{HttpLookup, LookupConfig, MetadataLookup, Registry};
use berth_schema::{InstallationPlan, RepositoryKey};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Where repository metadata comes from.
pub enum Source<'a> {
    Registry(&'a Path),
    ToolShed { url: &'a str, token: Option<&'a str> },
    Default,
}

fn make_lookup(source: &Source<'_>) -> Result<Box<dyn MetadataLookup>, String> {
    let lookup: Box<dyn MetadataLookup> = match source {
        Source::Registry(path) => {
            debug!("reading repository metadata from {}", path.display());
            Box::new(
                Registry::load(path)
                    .map_err(|e| format!("failed to load registry {}: {e}", path.display()))?,
            )
        }
        Source::ToolShed { url, token } => {
            debug!("querying repository metadata from {url}");
            let mut config = LookupConfig::new(url);
            if let Some(token) = token {
                config = config.with_token(token);
            }
            Box::new(HttpLookup::new(config))
        }
        Source::Default => {
            let config = LookupConfig::load_default()
                .map_err(|e| format!("no --registry or --tool-shed and no lookup config: {e}"))?;
            Box::new(HttpLookup::new(config))
        }
    };
    Ok(lookup)
}

pub fn run(
    root: &str,
    source: &Source<'_>,
    options: PlanOptions,
    output: Option<&Path>,
    cancel: &CancellationToken,
    json: bool,
) -> Result<u8, String> {
    let root: RepositoryKey = root
        .parse()
        .map_err(|e| format!("invalid repository key '{root}': {e}"))?;
    let lookup = make_lookup(source)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;

    let pb = if json {
        None
    } else {
        Some(spinner(&format!("planning {root}...")))
    };
    let result = runtime.block_on(build_plan(&root, lookup.as_ref(), options, cancel));
    // Blocking lookups still in flight after cancellation are abandoned.
    runtime.shutdown_background();
    let plan = match result {
        Ok(plan) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("planned {} repositories", plan.steps.len()));
            }
            plan
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "planning failed");
            }
            return Err(format!("{PLAN_ERROR_PREFIX} {e}"));
        }
    };

    if let Some(path) = output {
        plan.write_to_file(path)
            .map_err(|e| format!("failed to write plan: {e}"))?;
    }

    if json {
        println!("{}", json_pretty(&plan)?);
    } else {
        print_plan(&plan);
        if let Some(path) = output {
            println!("plan written to {}", path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}

fn print_plan(plan: &InstallationPlan) {
    for (i, step) in plan.steps.iter().enumerate() {
        let prior = if step.prior_installation_required {
            " (prior)"
        } else {
            ""
        };
        println!("{:>3}. {}{prior}", i + 1, step.key);
        if let Some(reason) = &step.failure {
            println!("     ✗ {reason}");
        }
    }
    if plan.is_partial() {
        println!(
            "warning: {} repositories have unknown dependencies",
            plan.failures().count()
        );
    }
}
