use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct AnswerOutput<'a> {
    schema_id: &'a str,
    endpoint: &'a str,
    transport: &'a str,
    answer_size: usize,
    answer: String,
    timestamp: String,
}

pub fn print_answer(answer: &[u8], endpoint: &str, transport: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = AnswerOutput {
                schema_id: "https://schemas.3leaps.dev/lablink/cli/v1/answer.schema.json",
                endpoint,
                transport,
                answer_size: answer.len(),
                answer: payload_preview(answer),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "TRANSPORT", "SIZE", "ANSWER"])
                .add_row(vec![
                    endpoint.to_string(),
                    transport.to_string(),
                    answer.len().to_string(),
                    payload_preview(answer),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "endpoint={} transport={} size={} answer={}",
                endpoint,
                transport,
                answer.len(),
                payload_preview(answer)
            );
        }
        OutputFormat::Raw => {
            print_raw(answer);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
