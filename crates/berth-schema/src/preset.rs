use serde::Serialize;

pub const DEFAULT_PRESET: &str = "default";

/// A built-in resolver chain, stored as configuration file text.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub config: &'static str,
}

pub const BUILTIN_PRESETS: &[Preset] = &[
    Preset {
        name: "default",
        description: "Declared container images first, then mulled images from quay.io/biocontainers",
        config: r#"[[resolvers]]
type = "explicit"

[[resolvers]]
type = "mulled"
"#,
    },
    Preset {
        name: "explicit",
        description: "Only container images the tool declares itself",
        config: r#"[[resolvers]]
type = "explicit"
"#,
    },
    Preset {
        name: "legacy-mulled",
        description: "Declared images, then mulled-v1 names for multi-package tools",
        config: r#"[[resolvers]]
type = "explicit"

[[resolvers]]
type = "mulled"
hash_version = "v1"
"#,
    },
];

pub fn get_preset(name: &str) -> Option<&'static Preset> {
    BUILTIN_PRESETS.iter().find(|p| p.name == name)
}

pub fn list_presets() -> &'static [Preset] {
    BUILTIN_PRESETS
}
