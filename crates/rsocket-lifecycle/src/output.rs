use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rsocket_frame::{error_code_name, Frame, Payload};
use rsocket_stream::InboundEvent;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

/// One thing the channel did in response to a step.
#[derive(Debug, Serialize)]
pub struct EventRecord {
    /// `sent` for frames handed to the connection, `received` for inbound subscriber signals.
    pub direction: &'static str,
    pub kind: String,
    pub detail: String,
}

impl EventRecord {
    pub fn sent(frame: &Frame) -> Self {
        let detail = match frame {
            Frame::Payload(frame) => format!(
                "next={} complete={} {}",
                frame.next,
                frame.complete,
                payload_preview(&frame.payload)
            ),
            Frame::Error(frame) => format!(
                "code={} ({:#06x}) message={}",
                error_code_name(frame.code),
                frame.code,
                frame.message
            ),
            Frame::RequestN(frame) => format!("n={}", frame.n),
            Frame::Cancel(_) => String::new(),
        };
        Self {
            direction: "sent",
            kind: frame.frame_type().to_string(),
            detail,
        }
    }

    pub fn received(event: &InboundEvent) -> Self {
        let (kind, detail) = match event {
            InboundEvent::Next(payload) => ("next", payload_preview(payload)),
            InboundEvent::Complete => ("complete", String::new()),
            InboundEvent::Error {
                message,
                cancellation,
                ..
            } => {
                let detail = if *cancellation {
                    format!("{message} (cancellation)")
                } else {
                    message.clone()
                };
                ("error", detail)
            }
        };
        Self {
            direction: "received",
            kind: kind.to_string(),
            detail,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub action: &'static str,
    pub events: Vec<EventRecord>,
}

/// Final state of the simulated channel.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub incoming_finished: bool,
    pub outgoing_finished: bool,
    pub joined: bool,
    pub disposed: bool,
    pub producer_subscriptions: usize,
    pub producer_requested: u64,
    pub producer_cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub stream_id: u32,
    pub steps: Vec<StepReport>,
    pub outcome: Outcome,
}

pub fn print_report(report: &SimulationReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["STEP", "ACTION", "DIRECTION", "KIND", "DETAIL"]);
            for step in &report.steps {
                if step.events.is_empty() {
                    table.add_row(vec![
                        step.index.to_string(),
                        step.action.to_string(),
                        "-".to_string(),
                        "-".to_string(),
                        String::new(),
                    ]);
                }
                for event in &step.events {
                    table.add_row(vec![
                        step.index.to_string(),
                        step.action.to_string(),
                        event.direction.to_string(),
                        event.kind.clone(),
                        event.detail.clone(),
                    ]);
                }
            }
            println!("{table}");
            print_outcome_pretty(report.stream_id, &report.outcome);
        }
        OutputFormat::Pretty => {
            for step in &report.steps {
                println!("step {} {}", step.index, step.action);
                for event in &step.events {
                    println!("  {} {} {}", event.direction, event.kind, event.detail);
                }
            }
            print_outcome_pretty(report.stream_id, &report.outcome);
        }
    }
}

fn print_outcome_pretty(stream_id: u32, outcome: &Outcome) {
    println!(
        "stream={} incoming_finished={} outgoing_finished={} joined={} disposed={}",
        stream_id,
        outcome.incoming_finished,
        outcome.outgoing_finished,
        outcome.joined,
        outcome.disposed
    );
    println!(
        "producer subscriptions={} requested={} cancelled={}",
        outcome.producer_subscriptions, outcome.producer_requested, outcome.producer_cancelled
    );
}

#[derive(Debug, Serialize)]
pub struct CodeOutput {
    pub name: &'static str,
    pub code: u32,
    pub hex: String,
    pub scope: &'static str,
}

pub fn print_codes(codes: &[CodeOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&codes),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "CODE", "SCOPE"]);
            for code in codes {
                table.add_row(vec![
                    code.name.to_string(),
                    code.hex.clone(),
                    code.scope.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for code in codes {
                println!("{} {} {}", code.hex, code.name, code.scope);
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn payload_preview(payload: &Payload) -> String {
    let data = preview(&payload.data);
    match &payload.metadata {
        Some(metadata) => format!("data={data} metadata={}", preview(metadata)),
        None => format!("data={data}"),
    }
}

fn preview(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use rsocket_frame::{CancelFrame, ErrorFrame, PayloadFrame, APPLICATION_ERROR};

    use super::*;

    #[test]
    fn sent_frames_are_described() {
        let frame = PayloadFrame::new(1, Payload::with_metadata("hi", "m"), true, false).unwrap();
        let event = EventRecord::sent(&frame.into());
        assert_eq!(event.direction, "sent");
        assert_eq!(event.kind, "PAYLOAD");
        assert_eq!(event.detail, "next=true complete=false data=hi metadata=m");

        let frame = ErrorFrame::new(1, APPLICATION_ERROR, "boom").unwrap();
        let event = EventRecord::sent(&frame.into());
        assert_eq!(event.detail, "code=APPLICATION_ERROR (0x0201) message=boom");

        let event = EventRecord::sent(&CancelFrame::new(1).unwrap().into());
        assert_eq!(event.kind, "CANCEL");
        assert!(event.detail.is_empty());
    }

    #[test]
    fn received_cancellation_is_flagged() {
        let event = EventRecord::received(&InboundEvent::Error {
            message: "stream 1 cancelled: disposed".into(),
            cancellation: true,
            protocol: None,
        });
        assert_eq!(event.kind, "error");
        assert_eq!(event.detail, "stream 1 cancelled: disposed (cancellation)");
    }

    #[test]
    fn binary_data_is_summarized() {
        assert_eq!(preview(&[0xff, 0xfe]), "<binary 2 bytes>");
    }
}
