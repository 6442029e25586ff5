use clap::{Parser, Subcommand};
use formreg_core::config::{registry_path_from_env_value, validation_mode_from_env_value};
use formreg_core::constants::{REGISTRY_PATH_ENV, VALIDATION_MODE_ENV};
use formreg_core::derive::derive_all;
use formreg_core::responses::{check_responses, load_responses};
use formreg_core::validation::has_errors;
use formreg_core::{CoreConfig, MergeReport, RegistryService, ValidationMode};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "formreg")]
#[command(about = "Form registry maintenance CLI")]
struct Cli {
    /// Registry file (overrides FORMREG_REGISTRY_PATH)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Log candidate validation errors instead of rejecting the merge
    #[arg(long, global = true)]
    permissive: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all forms
    List,
    /// Print one form as JSON
    Show {
        /// Form identifier
        form_id: String,
    },
    /// Validate every stored form
    Validate,
    /// Merge candidate forms from a JSON or YAML file
    Merge {
        /// Candidate list (.json, .yaml or .yml)
        candidates: PathBuf,
    },
    /// Merge the built-in assessment forms
    Seed,
    /// Run a form's auto-calculations on a responses file
    Derive {
        /// Form identifier
        form_id: String,
        /// JSON object of responses keyed by field key
        responses: PathBuf,
    },
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let directive = if verbose {
        "formreg_core=debug"
    } else {
        "formreg_core=warn"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<CoreConfig> {
    let registry_path = match &cli.registry {
        Some(path) => path.clone(),
        None => registry_path_from_env_value(std::env::var(REGISTRY_PATH_ENV).ok()),
    };
    let validation_mode = if cli.permissive {
        ValidationMode::Permissive
    } else {
        validation_mode_from_env_value(std::env::var(VALIDATION_MODE_ENV).ok())?
    };

    Ok(CoreConfig::new(registry_path, validation_mode)?)
}

fn print_report(report: &MergeReport) {
    for outcome in &report.outcomes {
        println!("{}", outcome);
    }
    println!(
        "Added {}, skipped {}. Total forms: {}",
        report.added_count(),
        report.skipped_count(),
        report.total_forms
    );
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = resolve_config(&cli)?;
    let service = RegistryService::new(config);

    match cli.command {
        Some(Commands::List) => {
            let registry = service.load()?;
            if registry.is_empty() {
                println!("No forms found.");
            } else {
                for stored in registry.iter() {
                    println!(
                        "{}: {} ({} fields)",
                        stored.form_id(),
                        stored.title(),
                        stored.field_count()
                    );
                }
            }
        }
        Some(Commands::Show { form_id }) => {
            let stored = service.form(&form_id)?;
            println!("{}", serde_json::to_string_pretty(stored.raw())?);
        }
        Some(Commands::Validate) => {
            let issues = service.validate_registry()?;
            for issue in &issues {
                println!("{}", issue);
            }
            if has_errors(&issues) {
                return Ok(ExitCode::FAILURE);
            }
            println!("Registry OK ({} issue(s))", issues.len());
        }
        Some(Commands::Merge { candidates }) => {
            let report = service.merge_file(&candidates)?;
            print_report(&report);
        }
        Some(Commands::Seed) => {
            let report = service.seed_builtin()?;
            print_report(&report);
        }
        Some(Commands::Derive { form_id, responses }) => {
            let stored = service.form(&form_id)?;
            let Some(form) = stored.definition() else {
                anyhow::bail!(
                    "{} cannot be used: {}",
                    form_id,
                    stored.schema_error().unwrap_or("not a valid form definition")
                );
            };
            let responses = load_responses(&responses)?;

            for issue in check_responses(form, &responses) {
                println!("! {}", issue);
            }
            for derivation in derive_all(form, &responses) {
                println!("{} = {}", derivation.name, derivation.value);
            }
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Error initialising logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
