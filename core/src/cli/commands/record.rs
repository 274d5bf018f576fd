use super::{
    block_on, ctrl_c, extension_hint, load_config, open_input, open_store, print_json,
    remote_screen,
};
use crate::audio::recorder::{record_from, upload_recording};
use crate::cli::OutputFormat;
use crate::controls::CaptureMode;
use crate::error::AppError;
use colored::Colorize;

pub fn run(input: Option<&str>, container: Option<&str>, format: OutputFormat) -> Result<(), String> {
    let config = load_config()?;
    let store = open_store()?;
    let mut screen = remote_screen(&store, &config)?;

    let extension = extension_hint(input, container);

    screen.begin_capture(CaptureMode::Recording);
    if format == OutputFormat::Text {
        if let Some(line) = screen.capture_mode().status_line() {
            eprintln!("{} {line} (Ctrl-C to stop)", "●".red());
        }
    }

    let relay = screen.relay().clone();
    let result = block_on(async move {
        let reader = open_input(input).await?;
        let recording = record_from(reader, ctrl_c())
            .await
            .map_err(|e| AppError::from(e).to_string())?;
        let bytes = recording.len();
        let response = upload_recording(&relay, recording, extension.as_deref())
            .await
            .map_err(|e| AppError::from(e).to_string())?;
        Ok::<_, String>((bytes, response))
    })?;
    screen.end_capture();
    let (bytes, response) = result?;

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({
            "recordedBytes": bytes,
            "response": response,
        }));
    } else {
        println!("{} Audio uploaded ({bytes} bytes recorded)", "✓".green());
    }
    Ok(())
}
