use std::{env, io::Write};

use futures::stream::{self, StreamExt};
use serde_json::json;
use tracing::{Instrument, debug, info, span};
use tracing_subscriber::EnvFilter;
use world_time::{Config, LocationQuery, TimeService};

// Queries from one input line that may be in flight at the same time
const CONCURRENT_QUERIES: usize = 3;

/// Initializes tracing, builds the time service from `WORLD_TIME_*` variables and
/// either answers the query given on the command line (`world-time <country> [city...]`)
/// or reads `country, city` queries from stdin until the user sends `exit`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let service = TimeService::from_config(&config)?;

    let args: Vec<String> = env::args().skip(1).collect();
    if let Some((country, city)) = args.split_first() {
        let query = LocationQuery::new(country.as_str(), city.join(" "));
        println!("{}", answer(&service, query).await?);
        return Ok(());
    }

    info!("Send `country, city` (or just `country`) to get its current time; separate several with `;`");
    info!("Send `exit` to stop");

    let mut buffer = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        buffer.clear();
        if std::io::stdin().read_line(&mut buffer)? == 0 {
            break;
        }

        let line = buffer.trim_start_matches('>').trim();
        if line == "exit" {
            info!("User wants to exit");
            break;
        }

        let queries = parse_line(line);
        if queries.is_empty() {
            continue;
        }

        // resolve the queries concurrently but print them in input order
        let answers: Vec<Result<String, serde_json::Error>> = stream::iter(queries)
            .map(|query| answer(&service, query))
            .buffered(CONCURRENT_QUERIES)
            .collect()
            .await;

        for answer in answers {
            println!("{}", answer?);
        }
    }

    Ok(())
}

/// Splits `America, New York; Europe` into one query per `;`-separated item.
fn parse_line(line: &str) -> Vec<LocationQuery> {
    line.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once(',') {
            Some((country, city)) => LocationQuery::new(country.trim(), city.trim()),
            None => LocationQuery::new(item, ""),
        })
        .collect()
}

/// Resolves one query and renders the answer, or the classified error, as JSON.
async fn answer(service: &TimeService, query: LocationQuery) -> Result<String, serde_json::Error> {
    let span = span!(
        tracing::Level::INFO,
        "resolve",
        country = query.country.trim(),
        city = query.city.trim()
    );

    async move {
        let result = match query.validate() {
            Ok(()) => {
                let outcome = service.current_time(&query).await;
                debug!("Resolution finished after {} upstream attempts", outcome.attempts);
                outcome.result
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(time_answer) => serde_json::to_string_pretty(&time_answer),
            Err(err) => serde_json::to_string_pretty(&json!({
                "error": err.kind(),
                "status": err.status_code(),
                "message": err.to_string(),
            })),
        }
    }
    .instrument(span)
    .await
}
