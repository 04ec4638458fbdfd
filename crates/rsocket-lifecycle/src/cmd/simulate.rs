use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rsocket_frame::{
    error_code_from_name, CancelFrame, ErrorFrame, Payload, PayloadFrame, RequestNFrame,
    MAX_STREAM_ID,
};
use rsocket_reactive::{Publisher, Subscription};
use rsocket_stream::{
    Channel, ChannelConfig, PublisherPolicy, RecordingSink, RecordingSubscriber, ScriptedProducer,
    StreamError,
};
use serde::Deserialize;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::cmd::SimulateArgs;
use crate::exit::{
    frame_error, io_error, json_error, CliError, CliResult, DATA_INVALID, SUCCESS,
};
use crate::output::{
    print_report, EventRecord, Outcome, OutputFormat, SimulationReport, StepReport,
};

/// A scripted exchange on one stream.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default = "default_stream_id")]
    pub stream_id: u32,
    #[serde(default)]
    pub config: ChannelConfig,
    pub steps: Vec<Step>,
}

fn default_stream_id() -> u32 {
    1
}

fn yes() -> bool {
    true
}

/// One input to the channel: a frame from the peer, a producer signal, or a local action.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Payload {
        #[serde(default)]
        data: String,
        metadata: Option<String>,
        #[serde(default = "yes")]
        next: bool,
        #[serde(default)]
        complete: bool,
    },
    Error {
        code: ErrorCode,
        #[serde(default)]
        message: String,
    },
    RequestN {
        n: u32,
    },
    Cancel,
    ProduceNext {
        data: String,
        metadata: Option<String>,
    },
    ProduceComplete,
    ProduceError {
        message: String,
    },
    RequestIncoming {
        n: u32,
    },
    CancelIncoming,
    Dispose,
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Payload { .. } => "payload",
            Step::Error { .. } => "error",
            Step::RequestN { .. } => "request_n",
            Step::Cancel => "cancel",
            Step::ProduceNext { .. } => "produce_next",
            Step::ProduceComplete => "produce_complete",
            Step::ProduceError { .. } => "produce_error",
            Step::RequestIncoming { .. } => "request_incoming",
            Step::CancelIncoming => "cancel_incoming",
            Step::Dispose => "dispose",
        }
    }
}

/// Error code given by name (`"APPLICATION_ERROR"`) or number (`513`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(u32),
    Name(String),
}

impl ErrorCode {
    fn resolve(&self) -> Option<u32> {
        match self {
            ErrorCode::Number(code) => Some(*code),
            ErrorCode::Name(name) => error_code_from_name(name),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Number(code) => write!(f, "{code}"),
            ErrorCode::Name(name) => f.write_str(name),
        }
    }
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let context = format!("read scenario {}", args.scenario.display());
    let text = std::fs::read_to_string(&args.scenario).map_err(|err| io_error(&context, err))?;
    let mut scenario: Scenario =
        serde_json::from_str(&text).map_err(|err| json_error("parse scenario", err))?;

    if let Some(stream_id) = args.stream_id {
        scenario.stream_id = stream_id;
    }
    if let Some(n) = args.initial_request {
        scenario.config.initial_outgoing_request = n;
    }

    let report = simulate(&scenario)?;
    print_report(&report, format);
    Ok(SUCCESS)
}

/// Drive a fresh channel through `scenario`.
///
/// The channel is joined once before the first step, which grants any configured initial credit,
/// and polled once more at the end to see whether it has resolved.
pub fn simulate(scenario: &Scenario) -> CliResult<SimulationReport> {
    let stream_id = scenario.stream_id;
    if stream_id == 0 || stream_id > MAX_STREAM_ID {
        return Err(CliError::new(
            DATA_INVALID,
            format!("scenario stream_id {stream_id} is out of range 1..={MAX_STREAM_ID}"),
        ));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|err| io_error("start runtime", err))?;

    let sink = Arc::new(RecordingSink::new());
    let producer = ScriptedProducer::new();
    let policy = Arc::new(PublisherPolicy::new(Arc::new(producer.clone())));
    let channel = Channel::new(stream_id, sink.clone(), policy, scenario.config.clone());
    let subscriber = Arc::new(RecordingSubscriber::new());
    let subscription = channel.incoming().subscribe(subscriber.clone());

    info!(stream_id, steps = scenario.steps.len(), "simulating scenario");

    let mut steps = Vec::with_capacity(scenario.steps.len() + 1);
    poll_join(&runtime, &channel);
    steps.push(StepReport {
        index: 0,
        action: "join",
        events: drain(&sink, &subscriber),
    });

    for (offset, step) in scenario.steps.iter().enumerate() {
        let index = offset + 1;
        debug!(stream_id, index, action = step.action(), "applying step");
        apply(step, index, &channel, &producer, subscription.as_ref())?;
        steps.push(StepReport {
            index,
            action: step.action(),
            events: drain(&sink, &subscriber),
        });
    }

    let joined = poll_join(&runtime, &channel);
    let outcome = Outcome {
        incoming_finished: channel.is_incoming_finished(),
        outgoing_finished: channel.is_outgoing_finished(),
        joined,
        disposed: channel.is_disposed(),
        producer_subscriptions: producer.subscribe_count(),
        producer_requested: producer.requested(),
        producer_cancelled: producer.is_cancelled(),
    };
    info!(stream_id, joined, "scenario finished");

    Ok(SimulationReport {
        stream_id,
        steps,
        outcome,
    })
}

fn apply(
    step: &Step,
    index: usize,
    channel: &Channel,
    producer: &ScriptedProducer,
    subscription: &dyn Subscription,
) -> CliResult<()> {
    let stream_id = channel.stream_id();
    let context = format!("step {index} ({})", step.action());

    match step {
        Step::Payload {
            data,
            metadata,
            next,
            complete,
        } => {
            let payload = make_payload(data, metadata.as_deref());
            let frame = PayloadFrame::new(stream_id, payload, *next, *complete)
                .map_err(|err| frame_error(&context, err))?;
            channel.handle_frame(frame.into());
        }
        Step::Error { code, message } => {
            let resolved = code.resolve().ok_or_else(|| {
                CliError::new(DATA_INVALID, format!("{context}: unknown error code {code}"))
            })?;
            let frame = ErrorFrame::new(stream_id, resolved, message.clone())
                .map_err(|err| frame_error(&context, err))?;
            channel.handle_frame(frame.into());
        }
        Step::RequestN { n } => {
            let frame =
                RequestNFrame::new(stream_id, *n).map_err(|err| frame_error(&context, err))?;
            channel.handle_frame(frame.into());
        }
        Step::Cancel => {
            let frame = CancelFrame::new(stream_id).map_err(|err| frame_error(&context, err))?;
            channel.handle_frame(frame.into());
        }
        Step::ProduceNext { data, metadata } => {
            if !producer.emit_next(make_payload(data, metadata.as_deref())) {
                warn!(stream_id, index, "producer has no active subscriber; item dropped");
            }
        }
        Step::ProduceComplete => {
            if !producer.emit_complete() {
                warn!(stream_id, index, "producer has no active subscriber; completion dropped");
            }
        }
        Step::ProduceError { message } => {
            if !producer.emit_error(StreamError::application(message.clone())) {
                warn!(stream_id, index, "producer has no active subscriber; error dropped");
            }
        }
        Step::RequestIncoming { n } => subscription.request(*n),
        Step::CancelIncoming => subscription.cancel(),
        Step::Dispose => channel.dispose(),
    }
    Ok(())
}

fn make_payload(data: &str, metadata: Option<&str>) -> Payload {
    match metadata {
        Some(metadata) => Payload::with_metadata(data.to_owned(), metadata.to_owned()),
        None => Payload::new(data.to_owned()),
    }
}

fn drain(sink: &RecordingSink, subscriber: &RecordingSubscriber) -> Vec<EventRecord> {
    let mut events: Vec<EventRecord> = sink.take().iter().map(EventRecord::sent).collect();
    events.extend(subscriber.take().iter().map(EventRecord::received));
    events
}

/// Poll the channel's join once. True if it has resolved.
fn poll_join(runtime: &Runtime, channel: &Channel) -> bool {
    runtime.block_on(async {
        tokio::time::timeout(Duration::ZERO, channel.join())
            .await
            .is_ok()
    })
}
