use fred_analyst::{export, init_tracing, AppConfig, Orchestrator, Query};
use tracing::info;

/// One-shot query from the command line: `fred-analyst [--csv] <question...>`
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("warn");

    let mut csv = false;
    let words: Vec<String> = std::env::args()
        .skip(1)
        .filter(|arg| {
            if arg == "--csv" {
                csv = true;
                false
            } else {
                true
            }
        })
        .collect();

    let Some(query) = Query::parse(&words.join(" ")) else {
        eprintln!("usage: fred-analyst [--csv] <question>");
        std::process::exit(2);
    };

    let config = AppConfig::from_env()?;
    let orchestrator = Orchestrator::from_config(&config)?;

    info!(query = %query.as_str(), "Running query");

    match orchestrator.run(&query).await {
        Ok(response) => {
            if csv {
                print!("{}", export::to_csv(&response.series)?);
                return Ok(());
            }

            let series = &response.series;
            println!("\n=== {} ({}) ===", series.title, series.series_id);
            if let (Some(first), Some(latest)) = (series.first(), series.latest()) {
                println!(
                    "{} observations, {} to {}; latest {} {}",
                    series.observations.len(),
                    first.date,
                    latest.date,
                    latest.value,
                    series.units
                );
            }
            println!("\n{}", response.insight.text);
            println!("\nSource: {}", response.source_url);
            println!(
                "Trace: {}",
                response
                    .trace
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(" → ")
            );
            Ok(())
        }
        Err(failure) => {
            eprintln!("{}", failure.refusal.as_deref().unwrap_or(&failure.error.user_message()));
            eprintln!("({})", failure.error.kind());
            Err(Box::new(failure.error) as Box<dyn std::error::Error>)
        }
    }
}
