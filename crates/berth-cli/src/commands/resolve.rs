use super::{
    colorize_state, json_pretty, result_state, EXIT_FAILURE, EXIT_SUCCESS, TOOL_ERROR_PREFIX,
};
use berth_core::ResolutionEngine;
use berth_schema::{parse_tool_file, ContainerType, ResolverSpec};
use std::path::Path;

pub fn run(
    tool_file: &Path,
    spec: &ResolverSpec,
    container_types: &[ContainerType],
    json: bool,
) -> Result<u8, String> {
    let tool = parse_tool_file(tool_file).map_err(|e| format!("{TOOL_ERROR_PREFIX} {e}"))?;
    let engine = ResolutionEngine::new(spec);
    let results = engine
        .resolve_tool(&tool, container_types)
        .map_err(|e| format!("{TOOL_ERROR_PREFIX} {e}"))?;

    if json {
        let payload = serde_json::json!({
            "tool_id": tool.id,
            "results": results,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("tool {}", tool.id);
        for result in &results {
            let state = result_state(result);
            let resolver = result.resolver_name.as_deref().unwrap_or("-");
            println!(
                "  {:<36} {:<12} {:<14} {}",
                result.requirement.to_string(),
                colorize_state(state),
                resolver,
                result.summary()
            );
        }
    }

    let failed = results.iter().any(|r| r.error.is_some());
    Ok(if failed { EXIT_FAILURE } else { EXIT_SUCCESS })
}
