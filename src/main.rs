use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::error;

use medicare_facilities::app::export_use_case::{ExportSummary, ExportUseCase};
use medicare_facilities::config::Config;
use medicare_facilities::infra::{GeoPackageImporter, ReqwestProviderSource};
use medicare_facilities::observability::init_logging;
use medicare_facilities::FacilityKind;

#[derive(Parser)]
#[command(name = "medicare_facilities")]
#[command(about = "Export Medicare hospitals and nursing homes to CSV and GeoPackage points")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FacilityArg {
    Hospitals,
    NursingHomes,
    All,
}

impl FacilityArg {
    fn kinds(self) -> Vec<FacilityKind> {
        match self {
            FacilityArg::Hospitals => vec![FacilityKind::Hospital],
            FacilityArg::NursingHomes => vec![FacilityKind::NursingHome],
            FacilityArg::All => FacilityKind::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every state, write the CSV(s) and build the GeoPackage
    Run {
        #[arg(long, value_enum, default_value_t = FacilityArg::All)]
        facility: FacilityArg,
        /// Comma-separated state codes (default: all 50)
        #[arg(long)]
        states: Option<String>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Stop after writing the CSV(s)
        #[arg(long)]
        skip_import: bool,
    },
    /// Fetch every state and write the CSV(s) only
    Export {
        #[arg(long, value_enum, default_value_t = FacilityArg::All)]
        facility: FacilityArg,
        #[arg(long)]
        states: Option<String>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Rebuild the GeoPackage from CSV(s) already on disk
    Import {
        #[arg(long, value_enum, default_value_t = FacilityArg::All)]
        facility: FacilityArg,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the configured state list
    States,
}

fn load_config(
    path: Option<&std::path::Path>,
    output_dir: Option<PathBuf>,
    states: Option<String>,
) -> anyhow::Result<Config> {
    Config::resolve(path, output_dir.map(|p| p.display().to_string()), states)
        .context("loading configuration")
}

fn build_use_case(config: Config, with_import: bool) -> anyhow::Result<ExportUseCase> {
    let source = ReqwestProviderSource::new(&config.http).context("building HTTP client")?;
    let importer =
        GeoPackageImporter::new(&config.output.directory, &config.output.database_name);
    let use_case = ExportUseCase::new(Box::new(source), config);
    Ok(if with_import {
        use_case.with_importer(Box::new(importer))
    } else {
        use_case
    })
}

fn print_summary(summary: &ExportSummary) {
    for result in &summary.pipelines {
        println!("\n📊 {} export:", result.kind);
        println!("   States: {}", result.states.len());
        println!("   Records: {}", result.total_records);
        println!("   Rows written: {}", result.csv.rows_written);
        println!("   Rows dropped: {}", result.csv.rows_dropped);
        println!("   Output file: {}", result.csv.path.display());
        for dropped in &result.csv.dropped {
            println!("   - dropped {} ({}): {}", dropped.id, dropped.state, dropped.reason);
        }
    }
    for import in &summary.imports {
        println!(
            "\n🗺️  {} layer: {} features ({} skipped) in {}",
            import.layer_name,
            import.features,
            import.skipped,
            import.database.display()
        );
    }
    println!("\n⏱️  Elapsed time: {}", summary.elapsed);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = init_logging();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            facility,
            states,
            output_dir,
            skip_import,
        } => {
            let config = load_config(config_path, output_dir, states)?;
            let use_case = build_use_case(config, !skip_import)?;
            let summary = use_case.run(&facility.kinds()).await.map_err(|e| {
                error!("Run failed: {}", e);
                e
            })?;
            print_summary(&summary);
        }
        Commands::Export {
            facility,
            states,
            output_dir,
        } => {
            let config = load_config(config_path, output_dir, states)?;
            let use_case = build_use_case(config, false)?;
            let summary = use_case.run(&facility.kinds()).await.map_err(|e| {
                error!("Export failed: {}", e);
                e
            })?;
            print_summary(&summary);
        }
        Commands::Import {
            facility,
            output_dir,
        } => {
            let config = load_config(config_path, output_dir, None)?;
            let use_case = build_use_case(config, true)?;
            let reports = use_case.import_existing(&facility.kinds())?;
            for report in reports {
                println!(
                    "🗺️  {} layer: {} features ({} skipped) in {}",
                    report.layer_name,
                    report.features,
                    report.skipped,
                    report.database.display()
                );
            }
        }
        Commands::States => {
            let config = load_config(config_path, None, None)?;
            for position in config.state_list()?.iter() {
                println!("{:>2}. {}", position.number, position.code);
            }
        }
    }
    Ok(())
}
