use super::{json_pretty, EXIT_SUCCESS};
use berth_schema::{image_name, HashVersion, PackageTarget};

/// Print the mulled image name for `specs` (`name[=version[=build]]`).
pub fn run(
    specs: &[String],
    version: HashVersion,
    image_build: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let targets = specs
        .iter()
        .map(|s| s.parse::<PackageTarget>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    let name = image_name(&targets, version, image_build).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "targets": targets,
            "hash_version": version,
            "image": name,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{name}");
    }
    Ok(EXIT_SUCCESS)
}
