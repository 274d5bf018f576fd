use super::{block_on, ctrl_c, load_config, open_input, open_store, print_json, remote_screen};
use crate::audio::queue::OverflowPolicy;
use crate::audio::stream::run_stream;
use crate::cli::OutputFormat;
use crate::controls::CaptureMode;
use crate::error::AppError;
use colored::Colorize;

pub fn run(
    input: Option<&str>,
    queue: Option<usize>,
    overflow: Option<OverflowPolicy>,
    format: OutputFormat,
) -> Result<(), String> {
    let config = load_config()?;
    let store = open_store()?;
    let mut screen = remote_screen(&store, &config)?;

    let capacity = queue.unwrap_or(config.stream_queue_capacity);
    let policy = overflow.unwrap_or(config.stream_overflow);

    screen.begin_capture(CaptureMode::Streaming);
    if format == OutputFormat::Text {
        if let Some(line) = screen.capture_mode().status_line() {
            eprintln!("{} {line} (Ctrl-C to stop)", "●".red());
        }
    }

    let relay = screen.relay().clone();
    let result = block_on(async move {
        let reader = open_input(input).await?;
        run_stream(&relay, reader, ctrl_c(), capacity, policy)
            .await
            .map_err(|e| AppError::from(e).to_string())
    })?;
    screen.end_capture();
    let stats = result?;

    if format == OutputFormat::Json {
        print_json(&stats);
    } else {
        println!(
            "{} Streamed {} of {} frame(s)",
            "✓".green(),
            stats.sent,
            stats.captured
        );
        if stats.failed > 0 {
            println!("  {} {} frame(s) failed to send", "!".yellow(), stats.failed);
        }
        if stats.dropped > 0 {
            println!(
                "  {} {} frame(s) dropped while the network caught up",
                "!".yellow(),
                stats.dropped
            );
        }
    }
    Ok(())
}
