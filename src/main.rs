//! Stackplan CLI entrypoint.
//!
//! This is the main entrypoint for the stackplan command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use stackplan::backend::DryRunBackend;
use stackplan::cli::{Cli, Commands, OutputFormatter};
use stackplan::config::{
    DeploymentDescriptor, DescriptorLoader, DescriptorValidator, PlannerSettings,
    find_descriptor_file,
};
use stackplan::error::{ConfigError, Result, StackPlanError};
use stackplan::planner::{PlanExecutor, Planner};

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => {
            cmd_validate(cli.descriptor.as_ref(), warnings, &formatter)
        }
        Commands::Plan { detailed } => cmd_plan(cli.descriptor.as_ref(), detailed, &formatter),
        Commands::Apply {
            yes,
            continue_on_error,
        } => cmd_apply(cli.descriptor.as_ref(), yes, continue_on_error, &formatter).await,
    }
}

/// Writes a starter descriptor.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing stackplan descriptor in: {}", path.display());

    let descriptor_path = path.join("deploy.json");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && descriptor_path.exists() {
        eprintln!("Descriptor already exists: {}", descriptor_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&descriptor_path, include_str!("../templates/deploy.json"))?;
    eprintln!("Created: {}", descriptor_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.lines().any(|line| line.trim() == ".env") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# stackplan\n.env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nDescriptor initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and set the masters principal ARN");
    eprintln!("  2. Edit deploy.json to declare your functions, tables and cluster");
    eprintln!("  3. Run 'stackplan validate' to check the descriptor");
    eprintln!("  4. Run 'stackplan plan' to see the provisioning order");

    Ok(())
}

/// Validates a descriptor.
fn cmd_validate(
    descriptor_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (descriptor_file, descriptor) = load_descriptor(descriptor_path)?;
    info!("Validating descriptor: {}", descriptor_file.display());

    let validator = DescriptorValidator::new();
    let result = validator.check(&descriptor);
    emit(&formatter.format_validation(&result, show_warnings))?;

    if !result.is_valid() {
        return Err(StackPlanError::Config(ConfigError::validation_general(
            format!("{} validation error(s)", result.error_count()),
        )));
    }

    eprintln!("\nDescriptor summary:");
    eprintln!("  Lambdas: {}", descriptor.lambdas.len());
    eprintln!(
        "  Tables: {} ({} with TTL)",
        descriptor.tables.len(),
        descriptor.ttl_table_count()
    );
    eprintln!("  Network: {}", descriptor.vpc.as_ref().map_or("none", |v| v.name.as_str()));
    eprintln!("  Cluster: {}", descriptor.eks.as_ref().map_or("none", |c| c.name.as_str()));

    Ok(())
}

/// Shows the deployment plan.
fn cmd_plan(
    descriptor_path: Option<&PathBuf>,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_, descriptor) = load_descriptor(descriptor_path)?;
    let planner = Planner::new(PlannerSettings::from_env()?)?;
    let plan = planner.plan(&descriptor)?;

    emit(&formatter.format_plan(&plan, detailed))
}

/// Applies the deployment plan through the dry-run backend.
async fn cmd_apply(
    descriptor_path: Option<&PathBuf>,
    auto_approve: bool,
    continue_on_error: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_, descriptor) = load_descriptor(descriptor_path)?;
    let planner = Planner::new(PlannerSettings::from_env()?)?;
    let plan = planner.plan(&descriptor)?;

    if plan.is_empty() {
        eprintln!("{}", formatter.success("Nothing to provision."));
        return Ok(());
    }

    eprintln!("{}", formatter.format_plan(&plan, false));

    if !auto_approve {
        eprint!("Do you want to apply this plan? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(());
        }
    }

    let backend = DryRunBackend::new();
    let executor = PlanExecutor::new(&backend).with_continue_on_error(continue_on_error);
    let result = executor.execute(&plan).await?;

    emit(&formatter.format_execution(&result))?;

    if result.success {
        Ok(())
    } else {
        Err(StackPlanError::internal(format!("Apply incomplete: {result}")))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the descriptor file path.
fn resolve_descriptor_path(descriptor_path: Option<&PathBuf>) -> Result<PathBuf> {
    descriptor_path.map_or_else(|| find_descriptor_file("."), |path| Ok(path.clone()))
}

/// Loads `.env` next to the descriptor, then the descriptor itself.
fn load_descriptor(
    descriptor_path: Option<&PathBuf>,
) -> Result<(PathBuf, DeploymentDescriptor)> {
    let descriptor_file = resolve_descriptor_path(descriptor_path)?;
    debug!("Loading descriptor from: {}", descriptor_file.display());

    let loader = DescriptorLoader::new().with_base_path(
        descriptor_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new(".")),
    );
    loader.load_dotenv()?;

    let descriptor = loader.load(&descriptor_file)?;
    Ok((descriptor_file, descriptor))
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}
