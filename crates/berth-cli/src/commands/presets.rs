use super::{json_pretty, EXIT_SUCCESS};
use berth_schema::{list_presets, DEFAULT_PRESET};

pub fn run(json: bool) -> Result<u8, String> {
    let presets = list_presets();
    if json {
        println!("{}", json_pretty(&presets)?);
    } else {
        for preset in presets {
            let marker = if preset.name == DEFAULT_PRESET { "*" } else { " " };
            println!("{marker} {:<16} {}", preset.name, preset.description);
        }
    }
    Ok(EXIT_SUCCESS)
}
