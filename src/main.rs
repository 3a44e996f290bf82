use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use tracing::info;
use turnover_dashboard::backend::{poll_training_status, HttpBackend};
use turnover_dashboard::config::{Config, ConfigOverrides};
use turnover_dashboard::employee::EmployeeForm;
use turnover_dashboard::metrics::summary::sort_by_severity;
use turnover_dashboard::metrics::{DashboardSummary, FeatureImportanceRow, PredictionSummary};
use turnover_dashboard::output::json::render_json;
use turnover_dashboard::output::table::{
    render_dashboard_table, render_dataset_table, render_failure, render_features_table,
    render_predictions_table, render_training_ack_table, render_training_status_table,
};
use turnover_dashboard::server::run_server;
use turnover_dashboard::telemetry;
use turnover_dashboard::types::{
    DashboardMetrics, FeatureImportance, GeneratedDataset, SampleDataRequest,
    TrainingAcknowledgment, TrainingStatus, TurnoverPrediction,
};
use turnover_dashboard::view::{Failure, ViewOrchestrator, ViewState};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "turnover-dashboard",
    about = "Employee turnover risk dashboard client"
)]
struct Cli {
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Prediction backend base URL.
    #[arg(short, long, global = true)]
    backend: Option<String>,
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone, Default)]
struct FeatureArgs {
    #[arg(long = "employee-id")]
    employee_id: Option<i64>,
    #[arg(long)]
    age: Option<i64>,
    #[arg(long = "tenure-months")]
    tenure_months: Option<i64>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    level: Option<String>,
    #[arg(long = "salary-band")]
    salary_band: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    promoted: Option<bool>,
    #[arg(long = "salary-increase")]
    salary_increase_pct: Option<f64>,
    #[arg(long = "manager-changed")]
    manager_changed: Option<bool>,
    #[arg(long)]
    trainings: Option<i64>,
    #[arg(long)]
    performance: Option<f64>,
    #[arg(long)]
    engagement: Option<f64>,
    #[arg(long)]
    satisfaction: Option<f64>,
    #[arg(long)]
    recognition: Option<f64>,
    #[arg(long)]
    growth: Option<f64>,
    #[arg(long = "manager-relationship")]
    manager_relationship: Option<f64>,
    #[arg(long = "work-life-balance")]
    work_life_balance: Option<f64>,
}

impl From<FeatureArgs> for EmployeeForm {
    fn from(value: FeatureArgs) -> Self {
        Self {
            employee_id: value.employee_id,
            age: value.age,
            tenure_months: value.tenure_months,
            department: value.department,
            level: value.level,
            salary_band: value.salary_band,
            location: value.location,
            was_promoted: value.promoted,
            salary_increase_pct: value.salary_increase_pct,
            manager_changed: value.manager_changed,
            training_count: value.trainings,
            performance_rating: value.performance,
            engagement: value.engagement,
            satisfaction: value.satisfaction,
            recognition: value.recognition,
            growth: value.growth,
            manager_relationship: value.manager_relationship,
            work_life_balance: value.work_life_balance,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Predict turnover risk for one employee.
    Predict {
        /// JSON file holding the form; flags override its fields.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Start from the pre-filled sample form.
        #[arg(long)]
        sample: bool,
        #[command(flatten)]
        features: FeatureArgs,
    },
    /// Predict a JSON array of employee forms in one request.
    Batch {
        #[arg(long)]
        input: PathBuf,
    },
    Dashboard,
    Features {
        #[arg(long)]
        top: Option<u32>,
    },
    Train {
        #[arg(long)]
        employees: Option<u32>,
        #[arg(long)]
        months: Option<u32>,
        /// Train from a CSV on the backend instead of synthetic data.
        #[arg(long)]
        filepath: Option<String>,
        /// Poll the training status until it settles.
        #[arg(long)]
        wait: bool,
    },
    Status,
    Generate {
        #[arg(long, default_value_t = 500)]
        employees: u32,
        #[arg(long, default_value_t = 12)]
        months: u32,
    },
    Health,
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        backend_url: cli.backend.clone(),
        log_level: cli.log_level.clone(),
    });
    telemetry::init(&config.logging.level)?;

    match &cli.command {
        Commands::Config { init, show } => {
            handle_config_command(*init, *show, &config, &config_path)?;
        }
        Commands::Serve { host, port } => {
            let host = host.clone().unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let bind = format!("{host}:{port}");
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            run_server(config, addr).await?;
        }
        Commands::Predict {
            input,
            sample,
            features,
        } => {
            let views = connect(&config)?;
            let base = match input {
                Some(path) => read_json::<EmployeeForm>(path)?,
                None if *sample => EmployeeForm::sample(),
                None => EmployeeForm::default(),
            };
            let form = base.merge(features.clone().into());
            let prediction = settle(views.predict(&form).await)?;
            print_predictions(&[prediction], cli.output)?;
        }
        Commands::Batch { input } => {
            let views = connect(&config)?;
            let forms = read_json::<Vec<EmployeeForm>>(input)?;
            info!(employees = forms.len(), "requesting batch prediction");
            let mut predictions = settle(views.predict_batch(&forms).await)?;
            sort_by_severity(&mut predictions);
            print_predictions(&predictions, cli.output)?;
        }
        Commands::Dashboard => {
            let views = connect(&config)?;
            let metrics = settle(views.load_dashboard().await)?;
            print_dashboard(&metrics, cli.output)?;
        }
        Commands::Features { top } => {
            let views = connect(&config)?;
            let top_n = top.unwrap_or(config.analytics.top_n);
            let entries = settle(views.load_feature_importance(top_n).await)?;
            print_features(&entries, cli.output)?;
        }
        Commands::Train {
            employees,
            months,
            filepath,
            wait,
        } => {
            let views = connect(&config)?;
            let mut options = config.training.options();
            if let Some(count) = employees {
                options.employee_count = *count;
            }
            if let Some(count) = months {
                options.month_count = *count;
            }
            if let Some(path) = filepath {
                options.use_synthetic = false;
                options.filepath = Some(path.clone());
            }
            let ack = settle(views.submit_training(&options).await)?;
            print_training_ack(&ack, cli.output)?;
            if *wait {
                let status = poll_training_status(
                    views.backend(),
                    config.training.poll_interval(),
                    config.training.max_polls,
                )
                .await
                .map_err(|e| anyhow!(render_failure(&Failure::from(&e))))?;
                print_training_status(&status, cli.output)?;
            }
        }
        Commands::Status => {
            let views = connect(&config)?;
            let status = settle(views.refresh_training_status().await)?;
            print_training_status(&status, cli.output)?;
        }
        Commands::Generate { employees, months } => {
            let views = connect(&config)?;
            let request = SampleDataRequest {
                employee_count: *employees,
                month_count: *months,
            };
            let dataset = views
                .backend()
                .generate_sample_data(&request)
                .await
                .map_err(|e| anyhow!(render_failure(&Failure::from(&e))))?;
            print_dataset(&dataset, cli.output)?;
        }
        Commands::Health => {
            let views = connect(&config)?;
            let health = views
                .backend()
                .health_check()
                .await
                .map_err(|e| anyhow!(render_failure(&Failure::from(&e))))?;
            match cli.output {
                OutputFormat::Table => println!("{}", health.status),
                OutputFormat::Json => println!("{}", render_json(&health)?),
            }
        }
    }

    Ok(())
}

fn connect(config: &Config) -> Result<ViewOrchestrator> {
    let backend = HttpBackend::new(&config.backend).context("failed building backend client")?;
    info!(backend = backend.base_url(), "using prediction backend");
    Ok(ViewOrchestrator::new(Arc::new(backend)))
}

fn handle_config_command(
    init: bool,
    show: bool,
    config: &Config,
    config_path: &Path,
) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading input: {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed parsing JSON: {}", path.display()))
}

/// Unwraps a settled screen, turning a failure into its display text.
fn settle<T>(state: ViewState<T>) -> Result<T> {
    match state {
        ViewState::Success { data } => Ok(data),
        ViewState::Failed { failure } => Err(anyhow!(render_failure(&failure))),
        ViewState::Idle | ViewState::Loading => Err(anyhow!("operation did not settle")),
    }
}

fn print_predictions(predictions: &[TurnoverPrediction], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let rows = predictions
                .iter()
                .map(PredictionSummary::from_prediction)
                .collect::<Vec<_>>();
            println!("{}", render_predictions_table(&rows));
        }
        OutputFormat::Json => println!("{}", render_json(predictions)?),
    }
    Ok(())
}

fn print_dashboard(metrics: &DashboardMetrics, format: OutputFormat) -> Result<()> {
    let summary = DashboardSummary::from_metrics(metrics);
    match format {
        OutputFormat::Table => println!("{}", render_dashboard_table(&summary)),
        OutputFormat::Json => println!("{}", render_json(&summary)?),
    }
    Ok(())
}

fn print_features(entries: &[FeatureImportance], format: OutputFormat) -> Result<()> {
    let rows = FeatureImportanceRow::from_entries(entries);
    match format {
        OutputFormat::Table => println!("{}", render_features_table(&rows)),
        OutputFormat::Json => println!("{}", render_json(&rows)?),
    }
    Ok(())
}

fn print_training_ack(ack: &TrainingAcknowledgment, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_training_ack_table(ack)),
        OutputFormat::Json => println!("{}", render_json(ack)?),
    }
    Ok(())
}

fn print_training_status(status: &TrainingStatus, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_training_status_table(status)),
        OutputFormat::Json => println!("{}", render_json(status)?),
    }
    Ok(())
}

fn print_dataset(dataset: &GeneratedDataset, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_dataset_table(dataset)),
        OutputFormat::Json => println!("{}", render_json(dataset)?),
    }
    Ok(())
}
