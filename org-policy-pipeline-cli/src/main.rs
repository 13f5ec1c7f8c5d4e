use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};

use org_policy_pipeline_assembly::providers::{
    load_environments, load_management_records, write_json_atomically,
};
use org_policy_pipeline_assembly::{
    validate_records, PipelineConfig, PolicyKind, PolicyPipelineService, SecurityGate,
};

#[derive(Parser, Debug)]
#[command(
    name = "org-policy-pipeline",
    author,
    version,
    about = "Assemble, optimize and validate AWS Organizations SCPs and RCPs"
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct RepositoryArgs {
    /// Policy family to process: scp or rcp
    #[arg(long = "policy-type")]
    policy_type: PolicyKind,

    /// Root of the policy repository
    #[arg(long, default_value = ".")]
    repository_root: PathBuf,

    /// Environment table (defaults to <root>/environments/environments.json)
    #[arg(long)]
    environments_file: Option<PathBuf>,
}

impl RepositoryArgs {
    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::for_repository(&self.repository_root, self.policy_type);
        if let Some(path) = &self.environments_file {
            config.environments_file.clone_from(path);
        }
        config
    }

    fn environments_dir(&self) -> PathBuf {
        self.repository_root.join("environments")
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the policy attachments file from the management records
    Process {
        #[command(flatten)]
        repository: RepositoryArgs,

        /// Management file (defaults to <root>/<kind>-management/<kind>-management.json)
        #[arg(long)]
        management_file: Option<PathBuf>,

        /// Guardrails folder (defaults to <root>/<kind>-management/guardrails)
        #[arg(long)]
        guardrails_dir: Option<PathBuf>,

        /// Standalone policies folder (defaults to <root>/<kind>-management/policies)
        #[arg(long)]
        policies_dir: Option<PathBuf>,

        /// Output file (defaults to <root>/terraform/<kind>s.json)
        #[arg(long)]
        output_file: Option<PathBuf>,

        /// Finding types that fail the run
        #[arg(long, env = "SECURITY_GATE", value_delimiter = ',')]
        security_gate: Vec<String>,

        /// Also write a JSON summary of the run
        #[arg(long)]
        summary_file: Option<PathBuf>,
    },

    /// Generate an environment table from the policies attached in the organization
    Environments {
        #[command(flatten)]
        repository: RepositoryArgs,

        /// Output file (defaults to <root>/environments/environments-<kind>-based.json)
        #[arg(long)]
        output_file: Option<PathBuf>,
    },

    /// Check that an existing policy is attached to every target of an environment
    Coverage {
        #[command(flatten)]
        repository: RepositoryArgs,

        /// Name of the existing policy
        #[arg(long)]
        policy_name: String,

        /// Environment ID to check
        #[arg(long = "env-id")]
        env_id: String,
    },

    /// Report how many policy slots every environment target uses
    Capacity {
        #[command(flatten)]
        repository: RepositoryArgs,

        /// Output file (defaults to <root>/environments/environments-<kind>-slots.json)
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_target(false)
        .init();
}

async fn process(
    mut config: PipelineConfig,
    security_gate: Vec<String>,
    summary_file: Option<PathBuf>,
) -> Result<ExitCode> {
    if !security_gate.is_empty() {
        config.security_gate = SecurityGate::new(&security_gate);
    }

    // Fail on unusable management files before any AWS client is created.
    let records = load_management_records(&config.management_file)
        .await
        .context("Failed to load management records")?;
    validate_records(&records).context("Management records are invalid")?;

    let service = PolicyPipelineService::new().await;
    let summary = service
        .run(&config)
        .await
        .with_context(|| format!("Failed to process {} policies", config.kind))?;

    if let Some(path) = summary_file {
        write_json_atomically(&path, &summary, true).context("Failed to write run summary")?;
        info!("Run summary written to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

async fn generate_environments(kind: PolicyKind, output_file: &Path) -> Result<ExitCode> {
    let service = PolicyPipelineService::new().await;
    let environments = service
        .generate_environments(kind)
        .await
        .context("Failed to generate environments")?;

    write_json_atomically(output_file, &environments, true)
        .context("Failed to write environment table")?;
    info!(
        "Wrote {} environments to {}",
        environments.len(),
        output_file.display()
    );
    Ok(ExitCode::SUCCESS)
}

async fn check_coverage(config: &PipelineConfig, policy_name: &str, env_id: &str) -> Result<ExitCode> {
    let environments = load_environments(&config.environments_file)
        .await
        .context("Failed to load environments")?;

    let service = PolicyPipelineService::new().await;
    let report = service
        .check_coverage(config.kind, policy_name, env_id, &environments)
        .await
        .context("Coverage check failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.is_fully_covered() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("{} of {} targets are not covered", report.missing.len(), report.total);
        Ok(ExitCode::FAILURE)
    }
}

async fn capacity_report(config: &PipelineConfig, output_file: &Path) -> Result<ExitCode> {
    let environments = load_environments(&config.environments_file)
        .await
        .context("Failed to load environments")?;

    let service = PolicyPipelineService::new().await;
    let report = service
        .capacity_report(config.kind, &environments)
        .await
        .context("Capacity report failed")?;

    write_json_atomically(output_file, &report, true).context("Failed to write capacity report")?;
    info!("Capacity report written to {}", output_file.display());
    Ok(ExitCode::SUCCESS)
}

async fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Process {
            repository,
            management_file,
            guardrails_dir,
            policies_dir,
            output_file,
            security_gate,
            summary_file,
        } => {
            let mut config = repository.config();
            if let Some(path) = management_file {
                config.management_file = path;
            }
            if let Some(path) = guardrails_dir {
                config.guardrails_dir = path;
            }
            if let Some(path) = policies_dir {
                config.policies_dir = path;
            }
            if let Some(path) = output_file {
                config.output_file = path;
            }
            process(config, security_gate, summary_file).await
        }
        Commands::Environments {
            repository,
            output_file,
        } => {
            let kind = repository.policy_type;
            let output_file = output_file.unwrap_or_else(|| {
                repository
                    .environments_dir()
                    .join(format!("environments-{}-based.json", kind.as_str()))
            });
            generate_environments(kind, &output_file).await
        }
        Commands::Coverage {
            repository,
            policy_name,
            env_id,
        } => check_coverage(&repository.config(), &policy_name, &env_id).await,
        Commands::Capacity {
            repository,
            output_file,
        } => {
            let config = repository.config();
            let output_file = output_file.unwrap_or_else(|| {
                repository
                    .environments_dir()
                    .join(format!("environments-{}-slots.json", config.kind.as_str()))
            });
            capacity_report(&config, &output_file).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
