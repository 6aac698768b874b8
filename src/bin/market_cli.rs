//! Interactive terminal: daily summary, topic search, discussion insights.

use std::process::ExitCode;

use chrono::Local;
use market_intel::bootstrap::Runtime;
use market_intel::dates::DateBounds;
use market_intel::insight::render_terminal;
use market_intel::telemetry;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

async fn prompt(lines: &mut Input, label: &str) -> Option<String> {
    let mut out = tokio::io::stdout();
    let _ = out.write_all(label.as_bytes()).await;
    let _ = out.flush().await;
    match lines.next_line().await {
        Ok(Some(l)) => Some(l.trim().to_string()),
        _ => None,
    }
}

fn blank_to_none(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let runtime = match Runtime::from_env() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let insights = runtime.insights.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("MARKET INTEL DIGEST");
    println!("{}", "=".repeat(60));
    loop {
        println!("\nOPTIONS:");
        println!("1. Today's daily market summary");
        println!("2. Topic / company news search");
        println!("3. Community discussion insights");
        println!("4. Exit");

        let Some(choice) = prompt(&mut lines, "\nSelect option (1-4): ").await else {
            break;
        };
        match choice.as_str() {
            "1" | "daily" => {
                println!("\nGenerating today's market summary...");
                let result = insights.daily_summary(Local::now().date_naive()).await;
                print!("{}", render_terminal(&result));
            }
            "2" | "topic" => {
                let query = prompt(&mut lines, "\nCompany name, ticker or topic: ")
                    .await
                    .unwrap_or_default();
                if query.is_empty() {
                    println!("Please enter a search term.");
                    continue;
                }
                println!("\nSearching for insights on '{query}'...");
                let result = insights.topic_insights(&query, DateBounds::default()).await;
                print!("{}", render_terminal(&result));
            }
            "3" | "discussion" => {
                let query = prompt(&mut lines, "\nTopic, ticker or keyword: ")
                    .await
                    .unwrap_or_default();
                if query.is_empty() {
                    println!("Please enter a topic.");
                    continue;
                }
                let (mut start, mut end) = (None, None);
                let filter = prompt(&mut lines, "Filter by date range? (y/n, default n): ")
                    .await
                    .unwrap_or_default();
                if filter.eq_ignore_ascii_case("y") {
                    start = blank_to_none(prompt(&mut lines, "Start date (e.g. YYYY-MM-DD, blank for none): ").await);
                    end = blank_to_none(prompt(&mut lines, "End date (blank for today): ").await);
                }
                let (result, report) = insights
                    .discussion_insights(&query, start.as_deref(), end.as_deref())
                    .await;
                println!("{}", report.journal.render());
                print!("{}", render_terminal(&result));
            }
            "4" | "exit" | "quit" => break,
            _ => println!("Invalid option. Please select 1, 2, 3 or 4."),
        }
    }
    println!("\nGoodbye.");
    ExitCode::SUCCESS
}
