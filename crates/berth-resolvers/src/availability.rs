use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A host tool that resolved descriptors are meant to be used with.
#[derive(Debug, Clone, Serialize)]
pub struct HostTool {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
    /// Location on `PATH`, if found.
    pub path: Option<PathBuf>,
}

impl HostTool {
    pub fn found(&self) -> bool {
        self.path.is_some()
    }
}

impl fmt::Display for HostTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "  + {}: {} ({})", self.name, self.purpose, path.display()),
            None => write!(
                f,
                "  - {}: {} (install: {})",
                self.name, self.purpose, self.install_hint
            ),
        }
    }
}

/// Look up the first of `candidates` on `PATH`.
fn find_command(candidates: &[&str]) -> Option<PathBuf> {
    candidates.iter().find_map(|c| which::which(c).ok())
}

/// Report which container runtimes and environment managers are installed.
pub fn check_container_runtimes() -> Vec<HostTool> {
    vec![
        HostTool {
            name: "docker",
            purpose: "running Docker container descriptors",
            install_hint: "https://docs.docker.com/engine/install/ (or podman with docker shim)",
            path: find_command(&["docker", "podman"]),
        },
        HostTool {
            name: "singularity",
            purpose: "running Singularity container descriptors",
            install_hint: "install apptainer or singularity-ce from your distribution",
            path: find_command(&["singularity", "apptainer"]),
        },
        HostTool {
            name: "conda",
            purpose: "creating environments for the conda resolver",
            install_hint: "install miniforge, micromamba or conda",
            path: find_command(&["conda", "mamba", "micromamba"]),
        },
    ]
}

/// Format the tools that were not found into a user-facing message.
pub fn format_missing(tools: &[HostTool]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing host tools:\n");
    for t in tools.iter().filter(|t| !t.found()) {
        let _ = writeln!(msg, "{t}");
    }
    msg.push_str("\nResolution still works; these are only needed to use the results.");
    msg
}
