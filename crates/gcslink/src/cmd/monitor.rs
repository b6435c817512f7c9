use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcslink_broker::{MessageBroker, SessionLogger, Subscriber};
use gcslink_link::{LinkConfig, LinkEvent, LinkManager};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_descriptor, parse_duration, MonitorArgs};
use crate::exit::{broker_error, link_error, CliError, CliResult, FAILURE, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_message, OutputFormat};

const POLL: Duration = Duration::from_millis(100);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let descriptor = parse_descriptor(&args.descriptor)?;
    let duration = args.duration.as_deref().map(parse_duration).transpose()?;

    let broker = Arc::new(MessageBroker::new());
    let printed = Arc::new(AtomicUsize::new(0));
    let printer = {
        let printed = Arc::clone(&printed);
        Subscriber::from_fn(move |message| {
            print_message(message, format);
            printed.fetch_add(1, Ordering::SeqCst);
        })
        .named("printer")
    };
    match &args.types {
        Some(types) => {
            for msg_type in types {
                broker.subscribe(&msg_type.trim().to_ascii_uppercase(), &printer);
            }
        }
        None => {
            broker.subscribe_all(&printer);
        }
    }

    let mut logger = args.log_dir.map(SessionLogger::new);
    if let Some(logger) = logger.as_mut() {
        let path = logger
            .start(&broker)
            .map_err(|err| broker_error("session log failed", err))?;
        info!(path = %path.display(), "recording session");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let config = LinkConfig::default().with_stream_rate(args.stream_rate);
    let mut manager = LinkManager::with_config(config);
    manager
        .connect(descriptor)
        .map_err(|err| link_error("connect failed", err))?;

    let started = Instant::now();
    let outcome = loop {
        if !running.load(Ordering::SeqCst) {
            break Ok(SUCCESS);
        }
        if duration.is_some_and(|limit| started.elapsed() >= limit) {
            break Ok(SUCCESS);
        }
        if args
            .count
            .is_some_and(|count| printed.load(Ordering::SeqCst) >= count)
        {
            break Ok(SUCCESS);
        }

        let mut failed = None;
        for event in manager.poll_events(POLL) {
            match event {
                LinkEvent::ConnectionAttemptFinished { success: true, message } => {
                    info!("{message}");
                }
                LinkEvent::ConnectionAttemptFinished { success: false, message } => {
                    failed = Some(CliError::new(TRANSPORT_ERROR, message));
                }
                LinkEvent::LinkStatusChanged(up) => {
                    if up {
                        info!("vehicle link up");
                    } else {
                        warn!("vehicle link down");
                    }
                }
                LinkEvent::MessageReceived(message) => {
                    broker.publish(&message);
                }
                LinkEvent::ErrorOccurred(err) => warn!(error = %err, "link error"),
                _ => {}
            }
        }
        if let Some(err) = failed {
            break Err(err);
        }
        if manager.descriptor().is_none() && !manager.is_connecting() {
            break Err(CliError::new(FAILURE, "link closed by peer"));
        }
    };

    manager.disconnect();
    if let Some(mut logger) = logger {
        let rows = logger
            .stop()
            .map_err(|err| broker_error("session log failed", err))?;
        info!(rows, "session log closed");
    }
    outcome
}
