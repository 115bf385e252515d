//! Terminal output: the scrolling log panel and result tables

use chrono::Local;
use tailtrade_core::api::{ConceptRow, StockRow};
use tailtrade_core::{ClientError, EventSink};

/// Print one timestamped log line.
pub fn log_line(message: &str) {
    println!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
}

/// Sink that prints stream events as numbered log lines.
#[derive(Default)]
pub struct ConsoleSink {
    log_count: usize,
}

#[async_trait::async_trait]
impl EventSink for ConsoleSink {
    async fn on_start(&mut self, message: &str) {
        log_line(message);
    }

    async fn on_log(&mut self, message: &str) {
        self.log_count += 1;
        log_line(&format!("[{}] {}", self.log_count, message));
    }

    async fn on_success(&mut self, message: &str) {
        log_line(message);
    }

    async fn on_error(&mut self, message: &str) {
        log_line(&format!("job failed: {message}"));
    }

    async fn on_parse_error(&mut self, _line: &str, error: &serde_json::Error) {
        log_line(&format!("unparseable log record: {error}"));
    }

    async fn on_stream_end(&mut self) {
        log_line("stream ended");
    }

    async fn on_stream_error(&mut self, error: &ClientError) {
        log_line(&format!("stream failed: {error}"));
    }
}

/// Render selected stocks as the result table.
pub fn print_stocks(rows: &[StockRow]) {
    if rows.is_empty() {
        println!("  (no stocks)");
        return;
    }
    println!(
        "  {:<10} {:<14} {:>10} {:>8}  {}",
        "code", "name", "score", "risk", "action"
    );
    for row in rows {
        println!(
            "  {:<10} {:<14} {:>10} {:>8}  {}",
            row.code(),
            row.name(),
            format_score(&row.score()),
            format_number(&row.risk()),
            row.action()
        );
    }
}

/// Render the top-concepts ranking.
pub fn print_concepts(rows: &[ConceptRow]) {
    println!("  {:>4}  {:<20} {:>6}  {}", "rank", "concept", "heat", "change");
    for row in rows {
        println!(
            "  {:>4}  {:<20} {:>6}  {}",
            row.rank, row.concept, row.heat_score, row.change_pct
        );
    }
}

fn format_score(raw: &str) -> String {
    match raw.parse::<f64>() {
        Ok(v) => format!("{v:.2}%"),
        Err(_) => raw.to_string(),
    }
}

fn format_number(raw: &str) -> String {
    match raw.parse::<f64>() {
        Ok(v) => format!("{v:.2}"),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_scores_get_percent_suffix() {
        assert_eq!(format_score("72.5"), "72.50%");
        assert_eq!(format_score("88"), "88.00%");
    }

    #[test]
    fn test_non_numeric_columns_pass_through() {
        assert_eq!(format_score("-"), "-");
        assert_eq!(format_number("低"), "低");
        assert_eq!(format_number("3.14159"), "3.14");
    }
}
