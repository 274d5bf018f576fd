use super::{block_on, extension_hint, load_config, open_input, open_store, remote_screen};
use crate::audio::queue::OverflowPolicy;
use crate::audio::recorder::{record_from, upload_recording};
use crate::audio::stream::run_stream;
use crate::config::Config;
use crate::controls::{CaptureMode, MediaAction, RemoteScreen, SystemAction};
use crate::error::AppError;
use crate::session::SessionStore;
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Empty,
    Help,
    Media(MediaAction),
    System(SystemAction),
    Record(String),
    Stream(String),
    Stop,
    Logout,
    Quit,
}

/// Parse one shell line. Actions may be given bare (`next`) or qualified
/// (`media next`, `system lock`).
fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => Ok(ShellCommand::Empty),
        ["help" | "?"] => Ok(ShellCommand::Help),
        ["quit" | "exit"] => Ok(ShellCommand::Quit),
        ["logout" | "clean-token"] => Ok(ShellCommand::Logout),
        ["stop"] => Ok(ShellCommand::Stop),
        ["record", path] => Ok(ShellCommand::Record((*path).to_owned())),
        ["stream", path] => Ok(ShellCommand::Stream((*path).to_owned())),
        ["record" | "stream"] => Err(format!("Usage: {} <FILE>", words[0])),
        ["media", action] => action
            .parse()
            .map(ShellCommand::Media)
            .map_err(|e| e.to_string()),
        ["system", action] => action
            .parse()
            .map(ShellCommand::System)
            .map_err(|e| e.to_string()),
        [action] => action
            .parse()
            .map(ShellCommand::Media)
            .or_else(|_| action.parse().map(ShellCommand::System))
            .map_err(|_| format!("Unknown command '{action}', type 'help'")),
        _ => Err(format!("Unknown command '{}', type 'help'", line.trim())),
    }
}

fn print_help() {
    let media: Vec<&str> = MediaAction::ALL.iter().map(|a| a.as_str()).collect();
    let system: Vec<&str> = SystemAction::ALL.iter().map(|a| a.as_str()).collect();
    println!("{}", "Media".bold());
    println!("  {}", media.join(", "));
    println!("{}", "System".bold());
    println!("  {}", system.join(", "));
    println!("{}", "Audio".bold());
    println!("  record <FILE>, stream <FILE>, stop");
    println!("{}", "Session".bold());
    println!("  logout, quit");
}

/// A recording or stream running in the background.
struct ActiveCapture {
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<String, String>>,
}

struct Shell<'a> {
    screen: RemoteScreen,
    store: &'a dyn SessionStore,
    capacity: usize,
    policy: OverflowPolicy,
    capture: Option<ActiveCapture>,
}

impl<'a> Shell<'a> {
    fn new(screen: RemoteScreen, store: &'a dyn SessionStore, config: &Config) -> Self {
        Self {
            screen,
            store,
            capacity: config.stream_queue_capacity,
            policy: config.stream_overflow,
            capture: None,
        }
    }

    /// Execute one command. Returns false when the shell should exit.
    async fn execute(&mut self, command: ShellCommand) -> Result<bool, String> {
        match command {
            ShellCommand::Empty => {}
            ShellCommand::Help => print_help(),
            ShellCommand::Media(action) => {
                if self.screen.media(action).await {
                    println!("{} {action}", "✓".green());
                } else {
                    println!("{} {action}", "✗".red());
                }
            }
            ShellCommand::System(action) => match self.screen.system(action).await {
                Some(_) if action == SystemAction::Battery => {
                    println!("{}", self.screen.battery_label())
                }
                Some(_) => println!("{} {action}", "✓".green()),
                None => println!("{} {action}", "✗".red()),
            },
            ShellCommand::Record(path) => self.start(CaptureMode::Recording, path),
            ShellCommand::Stream(path) => self.start(CaptureMode::Streaming, path),
            ShellCommand::Stop => {
                if self.capture.is_none() {
                    println!("{} Nothing is recording or streaming", "→".dimmed());
                }
                self.stop().await;
            }
            ShellCommand::Logout => {
                self.stop().await;
                self.screen.clean_token(self.store).map_err(AppError::from)?;
                println!("{} Session cleared", "✓".green());
                return Ok(false);
            }
            ShellCommand::Quit => {
                self.stop().await;
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Start recording or streaming `path` in the background.
    fn start(&mut self, mode: CaptureMode, path: String) {
        if !self.screen.begin_capture(mode) {
            let running = self.screen.capture_mode().status_line().unwrap_or_default();
            eprintln!("{} {running} Type 'stop' first", "✗".red());
            return;
        }

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        // A dropped sender also stops the capture.
        let stop = async move {
            let _ = stop_rx.await;
        };
        let relay = self.screen.relay().clone();
        let task = match mode {
            CaptureMode::Recording => tokio::spawn(async move {
                let reader = open_input(Some(&path)).await?;
                let recording = record_from(reader, stop)
                    .await
                    .map_err(|e| AppError::from(e).to_string())?;
                let bytes = recording.len();
                let extension = extension_hint(Some(&path), None);
                upload_recording(&relay, recording, extension.as_deref())
                    .await
                    .map_err(|e| AppError::from(e).to_string())?;
                Ok(format!("Audio uploaded ({bytes} bytes recorded)"))
            }),
            CaptureMode::Streaming => {
                let (capacity, policy) = (self.capacity, self.policy);
                tokio::spawn(async move {
                    let reader = open_input(Some(&path)).await?;
                    let stats = run_stream(&relay, reader, stop, capacity, policy)
                        .await
                        .map_err(|e| AppError::from(e).to_string())?;
                    Ok(format!(
                        "Streamed {} of {} frame(s), {} dropped, {} failed",
                        stats.sent, stats.captured, stats.dropped, stats.failed
                    ))
                })
            }
            CaptureMode::Idle => return,
        };

        if let Some(line) = mode.status_line() {
            println!("{} {line} (type 'stop' to finish)", "●".red());
        }
        self.capture = Some(ActiveCapture {
            stop: stop_tx,
            task,
        });
    }

    /// Signal the running capture, wait for it and report how it went.
    async fn stop(&mut self) {
        if let Some(active) = self.capture.take() {
            let _ = active.stop.send(());
            self.finish(active.task).await;
        }
    }

    /// Report a capture that ended by itself at EOF.
    async fn reap(&mut self) {
        if self.capture.as_ref().is_some_and(|c| c.task.is_finished()) {
            if let Some(active) = self.capture.take() {
                self.finish(active.task).await;
            }
        }
    }

    async fn finish(&mut self, task: JoinHandle<Result<String, String>>) {
        match task.await {
            Ok(Ok(summary)) => println!("{} {summary}", "✓".green()),
            Ok(Err(message)) => println!("{} {message}", "✗".red()),
            Err(e) => log::error!("Capture task failed: {e}"),
        }
        self.screen.end_capture();
    }
}

pub fn run() -> Result<(), String> {
    let config = load_config()?;
    let store = open_store()?;
    let screen = remote_screen(&store, &config)?;

    println!(
        "Connected to {}. Type 'help' for commands.",
        screen.relay().service_url().cyan()
    );

    block_on(async {
        let mut shell = Shell::new(screen, &store, &config);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{} ", "remote>".bold());
            std::io::stdout().flush().map_err(|e| e.to_string())?;

            let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? else {
                shell.stop().await;
                break;
            };
            shell.reap().await;
            match parse_line(&line) {
                Ok(command) => {
                    if !shell.execute(command).await? {
                        break;
                    }
                }
                Err(message) => eprintln!("{message}"),
            }
        }
        Ok::<(), String>(())
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayClient;
    use crate::session::MemorySessionStore;

    fn shell(store: &MemorySessionStore) -> Shell<'_> {
        let relay = RelayClient::with_defaults("http://127.0.0.1:9", "t").unwrap();
        Shell::new(RemoteScreen::new(relay), store, &Config::default())
    }

    #[test]
    fn test_parse_bare_actions() {
        assert_eq!(parse_line("next"), Ok(ShellCommand::Media(MediaAction::Next)));
        assert_eq!(
            parse_line("  volume-up "),
            Ok(ShellCommand::Media(MediaAction::VolumeUp))
        );
        assert_eq!(
            parse_line("capture-and-lock"),
            Ok(ShellCommand::System(SystemAction::CaptureAndLock))
        );
    }

    #[test]
    fn test_parse_qualified_actions() {
        assert_eq!(
            parse_line("media play-pause"),
            Ok(ShellCommand::Media(MediaAction::PlayPause))
        );
        assert_eq!(
            parse_line("system battery"),
            Ok(ShellCommand::System(SystemAction::Battery))
        );
        assert!(parse_line("media lock").is_err());
    }

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(parse_line(""), Ok(ShellCommand::Empty));
        assert_eq!(parse_line("?"), Ok(ShellCommand::Help));
        assert_eq!(parse_line("exit"), Ok(ShellCommand::Quit));
        assert_eq!(parse_line("clean-token"), Ok(ShellCommand::Logout));
        assert!(parse_line("dance").is_err());
        assert!(parse_line("media next now").is_err());
    }

    #[test]
    fn test_parse_capture_commands() {
        assert_eq!(
            parse_line("record memo.flac"),
            Ok(ShellCommand::Record("memo.flac".to_owned()))
        );
        assert_eq!(
            parse_line("stream mic.raw"),
            Ok(ShellCommand::Stream("mic.raw".to_owned()))
        );
        assert_eq!(parse_line("stop"), Ok(ShellCommand::Stop));
        assert_eq!(parse_line("record"), Err("Usage: record <FILE>".to_owned()));
    }

    #[tokio::test]
    async fn test_capture_refused_while_another_runs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("silence.raw");
        std::fs::write(&input, []).unwrap();
        let input = input.to_string_lossy().into_owned();

        let store = MemorySessionStore::new();
        let mut shell = shell(&store);
        assert!(shell.execute(ShellCommand::Stream(input.clone())).await.unwrap());
        assert_eq!(shell.screen.capture_mode(), CaptureMode::Streaming);

        assert!(shell.execute(ShellCommand::Record(input.clone())).await.unwrap());
        assert_eq!(shell.screen.capture_mode(), CaptureMode::Streaming);

        assert!(shell.execute(ShellCommand::Stop).await.unwrap());
        assert_eq!(shell.screen.capture_mode(), CaptureMode::Idle);
        assert!(shell.capture.is_none());

        assert!(shell.execute(ShellCommand::Record(input)).await.unwrap());
        assert_eq!(shell.screen.capture_mode(), CaptureMode::Recording);
        assert!(!shell.execute(ShellCommand::Quit).await.unwrap());
        assert_eq!(shell.screen.capture_mode(), CaptureMode::Idle);
    }

    #[tokio::test]
    async fn test_stop_without_capture_is_harmless() {
        let store = MemorySessionStore::new();
        let mut shell = shell(&store);
        assert!(shell.execute(ShellCommand::Stop).await.unwrap());
        assert_eq!(shell.screen.capture_mode(), CaptureMode::Idle);
    }
}
