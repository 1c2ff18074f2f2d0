//! salescope-cli — terminal frontend for the Salescope analytics HTTP API
//!
//! # Subcommands
//! - `ask <question> [-s <session>] [--json]` — run one Ask question
//! - `turns [-s <session>] [--json]`          — show the conversation log
//! - `clear [-s <session>]`                   — clear the conversation
//! - `refresh`                                — drop every cached report
//! - `status`                                 — show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8770";
const DEFAULT_SESSION: &str = "cli";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "salescope-cli",
    version,
    about = "Salescope sales analytics — Ask assistant CLI"
)]
struct Cli {
    /// Salescope HTTP server URL (overrides SALESCOPE_HTTP_URL env var)
    #[arg(long, env = "SALESCOPE_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ask a question about the sales data in natural language
    Ask {
        /// The question text
        question: String,

        /// Session key the turn is recorded under
        #[arg(short = 's', long, default_value = DEFAULT_SESSION)]
        session: String,

        /// Output the raw assistant turn as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the conversation log for a session
    Turns {
        /// Session key to read
        #[arg(short = 's', long, default_value = DEFAULT_SESSION)]
        session: String,

        /// Output the raw turns as JSON
        #[arg(long)]
        json: bool,
    },

    /// Clear the conversation log for a session
    Clear {
        /// Session key to clear
        #[arg(short = 's', long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Drop every cached report (the "Refresh Data" action)
    Refresh,

    /// Show Salescope server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TurnDto {
    pub role: String,
    pub content: String,
    pub generated_sql: Option<String>,
    pub result: Option<ResultDto>,
    pub error: Option<TurnErrorDto>,
}

#[derive(Debug, Deserialize)]
pub struct TurnErrorDto {
    pub stage: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ColumnDto {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ResultDto {
    pub columns: Vec<ColumnDto>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct AskResponse {
    pub turn: TurnDto,
}

#[derive(Debug, Deserialize)]
pub struct TurnsResponse {
    pub session: String,
    pub turns: Vec<TurnDto>,
    pub count: usize,
}

// ============================================================================
// Rendering
// ============================================================================

/// Render one cell for table output.
pub fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a result as a simple aligned text table.
pub fn render_result_table(result: &ResultDto) -> String {
    if result.columns.is_empty() {
        return "(no data)".to_string();
    }

    let headers: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let mut out = String::new();
    for (i, header) in headers.iter().enumerate() {
        out.push_str(&format!("{:<width$}  ", header, width = widths[i]));
    }
    out.push('\n');
    for (i, _) in headers.iter().enumerate() {
        out.push_str(&"-".repeat(widths[i]));
        out.push_str("  ");
    }
    out.push('\n');
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            let width = widths.get(i).copied().unwrap_or(0);
            out.push_str(&format!("{:<width$}  ", cell, width = width));
        }
        out.push('\n');
    }

    out
}

fn print_turn(turn: &TurnDto) {
    println!("{}", turn.content);

    if let Some(error) = &turn.error {
        println!("  ({} error: {})", error.stage, error.message);
    }
    if let Some(sql) = &turn.generated_sql {
        println!("\nSQL:");
        for line in sql.lines() {
            println!("  {}", line);
        }
    }
    if let Some(result) = &turn.result {
        println!("\n{}", render_result_table(result));
        println!("{} row(s)", result.row_count);
    }
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn http_client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()?)
}

fn send_or_exit(
    request: reqwest::blocking::RequestBuilder,
    url: &str,
) -> reqwest::blocking::Response {
    match request.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("salescope-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    }
}

fn fail_on_error_status(resp: reqwest::blocking::Response) -> reqwest::blocking::Response {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("salescope-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }
    resp
}

fn do_ask(server: &str, session: &str, question: &str, json_output: bool) -> anyhow::Result<()> {
    let client = http_client()?;
    let url = format!("{}/ask", server);
    let body = serde_json::json!({
        "session": session,
        "question": question,
    });

    let resp = fail_on_error_status(send_or_exit(client.post(&url).json(&body), &url));

    if json_output {
        let raw: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&raw["turn"])?);
        return Ok(());
    }

    let ask_resp: AskResponse = match resp.json() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("salescope-cli: failed to parse ask response: {}", e);
            std::process::exit(1);
        }
    };

    print_turn(&ask_resp.turn);
    Ok(())
}

fn do_turns(server: &str, session: &str, json_output: bool) -> anyhow::Result<()> {
    let client = http_client()?;
    let url = format!("{}/session/{}", server, session);

    let resp = fail_on_error_status(send_or_exit(client.get(&url), &url));

    if json_output {
        let raw: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&raw["turns"])?);
        return Ok(());
    }

    let turns_resp: TurnsResponse = match resp.json() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("salescope-cli: failed to parse turns response: {}", e);
            std::process::exit(1);
        }
    };

    if turns_resp.turns.is_empty() {
        println!("No turns in session '{}'", turns_resp.session);
        return Ok(());
    }

    for turn in &turns_resp.turns {
        println!("[{}]", turn.role);
        print_turn(turn);
        println!();
    }
    println!("{} turn(s)", turns_resp.count);
    Ok(())
}

fn do_clear(server: &str, session: &str) -> anyhow::Result<()> {
    let client = http_client()?;
    let url = format!("{}/session/{}", server, session);

    let resp = fail_on_error_status(send_or_exit(client.delete(&url), &url));

    let body: serde_json::Value = resp.json().unwrap_or_default();
    if body["cleared"].as_bool().unwrap_or(false) {
        println!("Session '{}' cleared", session);
    } else {
        println!("Session '{}' was already empty", session);
    }
    Ok(())
}

fn do_refresh(server: &str) -> anyhow::Result<()> {
    let client = http_client()?;
    let url = format!("{}/cache/refresh", server);

    fail_on_error_status(send_or_exit(client.post(&url), &url));
    println!("Report cache cleared");
    Ok(())
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/health", server);
    let resp = client.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!(
                "Salescope server: {}",
                body["status"].as_str().unwrap_or("unknown")
            );
            println!("Version:          {}", body["version"].as_str().unwrap_or("?"));
            println!(
                "PostgreSQL:       {}",
                body["postgresql"].as_str().unwrap_or("?")
            );
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("salescope-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("salescope-cli: cannot reach {} — {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Ask {
            question,
            session,
            json,
        } => do_ask(&server, &session, &question, json),
        Commands::Turns { session, json } => do_turns(&server, &session, json),
        Commands::Clear { session } => do_clear(&server, &session),
        Commands::Refresh => do_refresh(&server),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("salescope-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn result_dto(columns: &[&str], rows: Vec<Vec<serde_json::Value>>) -> ResultDto {
        ResultDto {
            columns: columns
                .iter()
                .map(|name| ColumnDto {
                    name: (*name).to_string(),
                })
                .collect(),
            row_count: rows.len(),
            rows,
        }
    }

    // ========================================================================
    // TEST 1: cell rendering — null empty, strings bare, numbers plain
    // ========================================================================
    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&serde_json::Value::Null), "");
        assert_eq!(cell_to_string(&serde_json::json!("West")), "West");
        assert_eq!(cell_to_string(&serde_json::json!(50000)), "50000");
        assert_eq!(cell_to_string(&serde_json::json!(12.5)), "12.5");
    }

    // ========================================================================
    // TEST 2: table columns align to the widest cell
    // ========================================================================
    #[test]
    fn test_render_table_aligns_columns() {
        let result = result_dto(
            &["region", "revenue"],
            vec![
                vec![serde_json::json!("West"), serde_json::json!(125000)],
                vec![serde_json::json!("North East"), serde_json::json!(980)],
            ],
        );

        let table = render_result_table(&result);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("region      "), "got: {:?}", lines[0]);
        assert!(lines[2].starts_with("West        "), "got: {:?}", lines[2]);
        assert!(lines[3].starts_with("North East  "), "got: {:?}", lines[3]);
    }

    // ========================================================================
    // TEST 3: header row lists every column in order
    // ========================================================================
    #[test]
    fn test_render_table_header_order() {
        let result = result_dto(
            &["total_revenue", "order_count"],
            vec![vec![serde_json::json!(50000), serde_json::json!(12)]],
        );

        let table = render_result_table(&result);
        let header = table.lines().next().unwrap();
        let revenue_at = header.find("total_revenue").unwrap();
        let orders_at = header.find("order_count").unwrap();
        assert!(revenue_at < orders_at);
    }

    // ========================================================================
    // TEST 4: empty result renders a placeholder, not a panic
    // ========================================================================
    #[test]
    fn test_render_table_empty() {
        let result = result_dto(&[], vec![]);
        assert_eq!(render_result_table(&result), "(no data)");
    }

    // ========================================================================
    // TEST 5: null cells render as blanks inside the table
    // ========================================================================
    #[test]
    fn test_render_table_null_cells() {
        let result = result_dto(
            &["category", "units_sold"],
            vec![vec![serde_json::json!("Office"), serde_json::Value::Null]],
        );

        let table = render_result_table(&result);
        assert!(table.contains("Office"));
        assert!(!table.contains("null"));
    }
}
