//! Command implementations

use std::time::Duration;

use anyhow::Result;
use tailtrade_core::api::{SelectRequest, SelectResponse, Strategy};
use tailtrade_core::{ApiClient, StreamOutcome};

use crate::cli::{Cli, Command, SchedulerAction};
use crate::output::{self, ConsoleSink};

pub async fn run(cli: Cli) -> Result<()> {
    let mut client = ApiClient::new(&cli.base_url);
    let login = client.login(&cli.username, &cli.password).await?;
    output::log_line(&format!("logged in, welcome {}", login.display_name()));

    let timeout = Duration::from_secs(cli.timeout_secs);
    match cli.command {
        Command::Update {
            top_n,
            run_strategies,
        } => update(&client, top_n, run_strategies, timeout).await,
        Command::Select { strategy, params } => {
            select(&client, strategy.into(), &params.into_request()).await
        }
        Command::Concepts { top_n } => concepts(&client, top_n).await,
        Command::Results => results(&client).await,
        Command::Scheduler { action } => scheduler(&client, action).await,
        Command::ClearCache => clear_cache(&client).await,
    }
}

async fn update(
    client: &ApiClient,
    top_n: u32,
    run_strategies: bool,
    timeout: Duration,
) -> Result<()> {
    output::log_line(&format!("updating stock data (top {top_n})..."));

    let session = client
        .open_update_stream(top_n, timeout, ConsoleSink::default())
        .await?;
    let outcome = session.wait().await?;
    tracing::debug!("update stream closed: {outcome:?}");

    if outcome == StreamOutcome::Success && run_strategies {
        output::log_line("data update complete, running all selection strategies...");
        let request = SelectRequest::default();
        let runs = client
            .run_all_strategies(&request, Duration::from_secs(1))
            .await;
        for (strategy, result) in runs {
            match result {
                Ok(response) => report_selection(strategy, &response),
                Err(e) => output::log_line(&format!("{strategy} selection failed: {e}")),
            }
        }
    }
    Ok(())
}

async fn select(client: &ApiClient, strategy: Strategy, request: &SelectRequest) -> Result<()> {
    output::log_line(&format!(
        "running {} selection (preset {}, limit {})...",
        strategy, request.preset, request.limit
    ));
    let response = client.select(strategy, request).await?;
    report_selection(strategy, &response);
    Ok(())
}

fn report_selection(strategy: Strategy, response: &SelectResponse) {
    if !response.success {
        output::log_line(&format!(
            "{strategy} selection failed: {}",
            response.message
        ));
        if let Some(error) = &response.error {
            output::log_line(error);
        }
        return;
    }

    output::log_line(&format!(
        "{strategy} selection returned {} stocks",
        response.data.len()
    ));
    output::print_stocks(&response.data);

    if let Some(log) = &response.log {
        let lines: Vec<&str> = log.lines().filter(|l| !l.trim().is_empty()).collect();
        for line in lines.iter().take(3) {
            output::log_line(&format!("  {}", line.trim()));
        }
        if lines.len() > 3 {
            output::log_line(&format!("  ... ({} more log lines)", lines.len() - 3));
        }
    }
}

async fn concepts(client: &ApiClient, top_n: u32) -> Result<()> {
    output::log_line(&format!("fetching top {top_n} concepts..."));
    let response = client.top_concepts(top_n).await?;

    if !response.success || response.data.is_empty() {
        output::log_line(&response.message);
        return Ok(());
    }

    output::log_line(&format!(
        "{} (updated {})",
        response.message,
        response.update_time.as_deref().unwrap_or("-")
    ));
    output::print_concepts(&response.data);
    Ok(())
}

async fn results(client: &ApiClient) -> Result<()> {
    let response = client.strategy_results().await?;
    let data = match response.data {
        Some(data) if response.success => data,
        _ => {
            output::log_line("no stored selection results");
            return Ok(());
        }
    };

    let mut total = 0;
    for strategy in Strategy::ALL {
        if let Some(slot) = data.get(strategy) {
            if !slot.data.is_empty() {
                output::log_line(&format!("{} results: {} stocks", strategy, slot.count));
                output::print_stocks(&slot.data);
                total += slot.data.len();
            }
        }
    }
    if total == 0 {
        output::log_line("no stored selection results");
    }
    Ok(())
}

async fn scheduler(client: &ApiClient, action: SchedulerAction) -> Result<()> {
    match action {
        SchedulerAction::Status => {
            let status = client.scheduler_status().await?;
            if status.running {
                output::log_line("scheduler: running");
                if let Some(next_run) = &status.next_run {
                    output::log_line(&format!("next run: {}", format_next_run(next_run)));
                }
            } else {
                output::log_line("scheduler: stopped");
            }
        }
        SchedulerAction::Start { cron } => {
            let ack = client.start_scheduler(cron).await?;
            output::log_line(&ack.message);
        }
        SchedulerAction::Stop => {
            let ack = client.stop_scheduler().await?;
            output::log_line(&ack.message);
        }
        SchedulerAction::Logs { lines } => {
            let logs = client.scheduler_logs(lines).await?;
            for line in &logs.logs {
                println!("{line}");
            }
        }
    }
    Ok(())
}

async fn clear_cache(client: &ApiClient) -> Result<()> {
    output::log_line("clearing server cache...");
    let ack = client.clear_cache().await?;
    if ack.success {
        output::log_line(&ack.message);
    } else {
        output::log_line(&format!("cache clear failed: {}", ack.message));
    }
    Ok(())
}

fn format_next_run(raw: &str) -> String {
    // The server reports ISO timestamps; fall back to the raw string.
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}
