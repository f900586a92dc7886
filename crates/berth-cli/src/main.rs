mod commands;

use berth_core::{install_signal_handler, PlanOptions, DEFAULT_CONCURRENCY};
use berth_schema::{ContainerType, HashVersion};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{
    CONFIG_ERROR_PREFIX, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_PLAN_ERROR, PLAN_ERROR_PREFIX,
    TOOL_ERROR_PREFIX,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(
    name = "berth",
    version,
    about = "Resolve tool requirements to containers and plan repository installs"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a tool's requirements through the resolver chain.
    Resolve {
        /// Path to the tool requirements TOML file.
        tool: PathBuf,
        /// Resolver configuration file (defaults to $BERTH_CONFIG or ~/.config/berth/berth.toml).
        #[arg(long, conflicts_with = "preset")]
        config: Option<PathBuf>,
        /// Use a built-in resolver chain instead of a configuration file.
        #[arg(long)]
        preset: Option<String>,
        /// Also request a container of this type (repeatable).
        #[arg(long = "container-type", value_name = "TYPE")]
        container_types: Vec<ContainerType>,
    },
    /// Build an installation plan for a repository and its dependencies.
    Plan {
        /// Repository key: <tool_shed>/repos/<owner>/<name>/<changeset_revision>.
        root: String,
        /// Read repository metadata from a JSON registry file.
        #[arg(long, conflicts_with = "tool_shed")]
        registry: Option<PathBuf>,
        /// Query repository metadata from a tool shed.
        #[arg(long)]
        tool_shed: Option<String>,
        /// Bearer token for --tool-shed.
        #[arg(long, requires = "tool_shed")]
        token: Option<String>,
        /// Maximum metadata lookups in flight.
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
        /// Keep repositories with failed lookups as marked leaves.
        #[arg(long, default_value_t = false)]
        allow_partial: bool,
        /// Write the plan to this TOML file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the mulled image name for a set of packages.
    Hash {
        /// Packages as name[=version[=build]].
        #[arg(required = true)]
        targets: Vec<String>,
        /// Use the legacy v1 hash scheme.
        #[arg(long, default_value_t = false)]
        v1: bool,
        /// Image build tag appended to the name.
        #[arg(long)]
        build: Option<String>,
    },
    /// Validate a resolver configuration file.
    CheckConfig {
        /// Path to the configuration file.
        path: PathBuf,
    },
    /// List built-in resolver chain presets.
    Presets,
    /// Run diagnostic checks on configuration and host tools.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BERTH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    install_signal_handler(cancel.clone());
    let json_output = cli.json;

    let result = match cli.command {
        Commands::Resolve {
            tool,
            config,
            preset,
            container_types,
        } => commands::load_spec(config.as_deref(), preset.as_deref())
            .and_then(|spec| commands::resolve::run(&tool, &spec, &container_types, json_output)),
        Commands::Plan {
            root,
            registry,
            tool_shed,
            token,
            concurrency,
            allow_partial,
            output,
        } => {
            let source = match (&registry, &tool_shed) {
                (Some(path), _) => commands::plan::Source::Registry(path),
                (None, Some(url)) => commands::plan::Source::ToolShed {
                    url,
                    token: token.as_deref(),
                },
                (None, None) => commands::plan::Source::Default,
            };
            commands::plan::run(
                &root,
                &source,
                PlanOptions {
                    concurrency,
                    allow_partial,
                },
                output.as_deref(),
                &cancel,
                json_output,
            )
        }
        Commands::Hash { targets, v1, build } => {
            let version = if v1 { HashVersion::V1 } else { HashVersion::V2 };
            commands::hash::run(&targets, version, build.as_deref(), json_output)
        }
        Commands::CheckConfig { path } => commands::check_config::run(&path, json_output),
        Commands::Presets => commands::presets::run(json_output),
        Commands::Doctor => commands::doctor::run(json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with(CONFIG_ERROR_PREFIX) || msg.starts_with(TOOL_ERROR_PREFIX)
            {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with(PLAN_ERROR_PREFIX) {
                EXIT_PLAN_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
