use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wigmetrics::metrics::display::{self, group_cards, Status};
use wigmetrics::{
    Database, JsonDirSource, MeasureNode, RefreshStatus, TimeWindow, WigMetrics, WindowKind,
};

#[derive(Parser)]
#[command(name = "wigmetrics", about = "LAG/LEAD plan metrics CLI")]
struct Cli {
    /// Database path (default: ~/.wigmetrics/wigmetrics.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct WindowArgs {
    /// Window: all, 2025-03, 2025-01,2025-02, Q1, 2025-Q2, 2025-01..2025-06
    #[arg(long, short)]
    window: Option<String>,
    /// Use the current month/quarter/year-to-date instead of --window
    #[arg(long, value_name = "KIND", conflicts_with = "window")]
    period: Option<String>,
}

impl WindowArgs {
    fn resolve(&self) -> anyhow::Result<TimeWindow> {
        if let Some(kind) = &self.period {
            let kind = WindowKind::parse(kind)?;
            return Ok(TimeWindow::default_for(
                kind,
                chrono::Local::now().date_naive(),
            ));
        }
        Ok(TimeWindow::parse(self.window.as_deref().unwrap_or("all"))?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Import a sheet from a JSON file of row arrays
    Import {
        /// Sheet key (department code)
        key: String,
        /// JSON file: [[cell, ...], ...]
        file: PathBuf,
        /// Display name for the department
        #[arg(long)]
        name: Option<String>,
    },
    /// Refresh cached sheets from a directory of <key>.json files
    Refresh {
        /// Sheet keys
        #[arg(required = true)]
        keys: Vec<String>,
        /// Directory holding the upstream files
        #[arg(long)]
        from: PathBuf,
        /// Refresh even when the cache is fresh
        #[arg(long)]
        force: bool,
    },
    /// Show a sheet's measure cards
    Measures {
        key: String,
        #[command(flatten)]
        window: WindowArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the LEAD measures under one LAG card
    Leads {
        key: String,
        /// Card id, e.g. lag_3 or lag_3_average
        lag_id: String,
        #[command(flatten)]
        window: WindowArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Health score per department
    Health {
        #[arg(required = true)]
        keys: Vec<String>,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// All departments' cards, prefixed with the department name
    Overview {
        #[arg(required = true)]
        keys: Vec<String>,
        #[command(flatten)]
        window: WindowArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage cached sheets
    Sheets {
        #[command(subcommand)]
        action: SheetsAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum SheetsAction {
    /// List cached sheets
    List,
    /// Remove a cached sheet
    Remove { key: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => Database::open_at(path).await?,
        None => Database::open().await?,
    };
    let app = WigMetrics::open(db).await?;

    match cli.command {
        Commands::Import { key, file, name } => {
            let text = std::fs::read_to_string(&file)?;
            let rows = wigmetrics::source::rows_from_json(&key, &text)?;
            let count = rows.len();
            app.import_rows(&key, name.as_deref(), rows).await?;
            println!("Imported {count} rows into '{key}'.");
        }
        Commands::Refresh { keys, from, force } => {
            let upstream = JsonDirSource::new(from);
            let reports = app.refresh(&upstream, &keys, force).await;
            let mut failed = 0;
            for report in &reports {
                match report.status {
                    RefreshStatus::Refreshed => {
                        println!("{}: refreshed ({} rows)", report.key, report.rows)
                    }
                    RefreshStatus::Fresh => {
                        println!("{}: fresh ({} rows cached)", report.key, report.rows)
                    }
                    RefreshStatus::Failed => {
                        failed += 1;
                        println!(
                            "{}: FAILED {}",
                            report.key,
                            report.error.as_deref().unwrap_or("")
                        );
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} of {} sheets failed to refresh", reports.len());
            }
        }
        Commands::Measures { key, window, json } => {
            let window = window.resolve()?;
            let measures = app.measures(&key, &window).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&measures)?);
            } else {
                println!("{key} ({window})");
                print_cards(&measures);
            }
        }
        Commands::Leads {
            key,
            lag_id,
            window,
            json,
        } => {
            let window = window.resolve()?;
            let leads = app.leads(&key, &lag_id, &window).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&leads)?);
            } else if leads.is_empty() {
                println!("No LEAD measures under {lag_id}.");
            } else {
                print_cards(&leads);
            }
        }
        Commands::Health { keys, window } => {
            let window = window.resolve()?;
            for summary in app.overview(&keys, &window).await? {
                println!(
                    "{:<30} {:>4}%  ({} cards)",
                    summary.display_name,
                    summary.health,
                    summary.measures.len()
                );
            }
        }
        Commands::Overview { keys, window, json } => {
            let window = window.resolve()?;
            if json {
                let overview = app.overview(&keys, &window).await?;
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                let measures = app.all_measures(&keys, &window).await?;
                println!("Overview ({window})");
                print_cards(&measures);
            }
        }
        Commands::Sheets { action } => match action {
            SheetsAction::List => {
                let sheets = app.list_sheets().await?;
                if sheets.is_empty() {
                    println!("No sheets cached.");
                }
                for s in sheets {
                    println!(
                        "{:<16} {:<30} {:>5} rows  fetched {}",
                        s.key,
                        s.display_name.as_deref().unwrap_or("-"),
                        s.row_count,
                        s.fetched_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
            SheetsAction::Remove { key } => {
                app.remove_sheet(&key).await?;
                println!("Removed '{key}'.");
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Get { key } => match app.config_get(&key).await? {
                Some(v) => println!("{key} = {v}"),
                None => println!("{key} is not set"),
            },
            ConfigAction::Set { key, value } => {
                app.config_set(&key, &value).await?;
                println!("Config updated.");
            }
            ConfigAction::List => {
                let items = app.config_list().await?;
                if items.is_empty() {
                    println!("No configuration set.");
                } else {
                    for (k, v) in items {
                        println!("{k} = {v}");
                    }
                }
            }
        },
    }

    Ok(())
}

fn format_trend(trend: f64) -> String {
    if trend == 0.0 {
        String::new()
    } else {
        format!("{trend:+.2}pp")
    }
}

fn print_card(node: &MeasureNode, indent: &str) {
    let status = Status::of(node);
    let rate = if node.target == 0.0 {
        "-".to_string()
    } else {
        format!("{:.0}%", display::achievement_rate(node))
    };
    println!(
        "{indent}{:<40} {:>10.2} / {:<10.2} {:>6}  {:<18} {}",
        node.name,
        node.value,
        node.target,
        rate,
        status.label(),
        format_trend(node.trend)
    );
}

fn print_cards(nodes: &[MeasureNode]) {
    if nodes.is_empty() {
        println!("No LAG measures found.");
        return;
    }
    for group in group_cards(nodes) {
        print_card(&group.average, "");
        for indicator in &group.indicators {
            print_card(indicator, "    ");
        }
        if let Some(pct) = group.avg_indicator_percentage {
            println!("    indicators average {pct:.0}%");
        }
        if group.average.has_leads() {
            println!("    {} lead measure(s): {}", group.average.leads.len(), group.average.id);
        }
    }
}
