use super::{json_pretty, CONFIG_ERROR_PREFIX, EXIT_SUCCESS};
use berth_core::ResolutionEngine;
use berth_schema::ResolverSpec;
use std::path::Path;

/// Validate a configuration file without resolving anything.
pub fn run(path: &Path, json: bool) -> Result<u8, String> {
    let spec = ResolverSpec::load(path).map_err(|e| format!("{CONFIG_ERROR_PREFIX} {e}"))?;
    let status = ResolutionEngine::new(&spec).status();

    if json {
        let payload = serde_json::json!({
            "path": path,
            "valid": true,
            "resolvers": status,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{}: {} resolvers", path.display(), status.len());
        for (i, s) in status.iter().enumerate() {
            let note = if s.available { "" } else { " (unavailable)" };
            println!("  {i}. {} [{}]{note}", s.name, s.resolver_type);
        }
    }
    Ok(EXIT_SUCCESS)
}
