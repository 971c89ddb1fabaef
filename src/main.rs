/*
 *  main.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Console front-end: config, logging, signals and line commands
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use log::{debug, error, info, warn};
use env_logger::Env;
use tokio::signal::unix::{signal, SignalKind}; // Import specific Unix signals
use tokio::sync::mpsc;

use oled_gif::config::{self, Config};
use oled_gif::display::drivers::hid::HidBackend;
use oled_gif::{DeviceChannel, FrameCache, PlaybackController, PlaybackMode};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

const HELP: &str = "\
commands:
  start            play the selected file, or the folder when cycling
  stop             stop playback
  invert           toggle inverted output
  cycle on|off     switch between folder cycling and single file
  file <path>      select the GIF for single file mode
  folder <path>    select the folder for cycle mode
  status           show playback status
  quit             blank the panel and exit";

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
/// Once a signal is caught it logs the event and returns, allowing for
/// graceful shutdown.
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Start,
    Stop,
    Invert,
    Cycle(bool),
    File(PathBuf),
    Folder(PathBuf),
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, arg) = line
        .split_once(char::is_whitespace)
        .map(|(w, a)| (w, a.trim()))
        .unwrap_or((line, ""));

    let cmd = match (word.to_ascii_lowercase().as_str(), arg) {
        ("start", "") => Command::Start,
        ("stop", "") => Command::Stop,
        ("invert", "") => Command::Invert,
        ("cycle", "on") => Command::Cycle(true),
        ("cycle", "off") => Command::Cycle(false),
        ("file", path) if !path.is_empty() => Command::File(PathBuf::from(path)),
        ("folder", path) if !path.is_empty() => Command::Folder(PathBuf::from(path)),
        ("status", "") => Command::Status,
        ("help" | "?", "") => Command::Help,
        ("quit" | "exit", "") => Command::Quit,
        _ => return Err(format!("unknown command {:?}, try `help`", line)),
    };
    Ok(cmd)
}

/// Run a controller call off the async thread; they block on joins and sends.
async fn blocking<R, F>(controller: &Arc<PlaybackController>, f: F) -> anyhow::Result<R>
where
    F: FnOnce(&PlaybackController) -> R + Send + 'static,
    R: Send + 'static,
{
    let controller = Arc::clone(controller);
    Ok(tokio::task::spawn_blocking(move || f(&controller)).await?)
}

/// Forward lines from `input` over a channel, read on a plain thread.
///
/// The thread is detached so a read parked on an idle terminal never holds
/// up runtime shutdown. It ends at EOF or once the receiver is gone.
fn read_lines<R>(input: R) -> io::Result<mpsc::Receiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    thread::Builder::new()
        .name("oled-console".into())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Console input failed: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Selection state the GUI would normally hold
#[derive(Debug, Clone, PartialEq, Eq)]
struct Console {
    gif_path: Option<PathBuf>,
    folder: PathBuf,
    cycle: bool,
}

impl Console {
    fn from_config(cfg: &Config) -> Self {
        Self {
            gif_path: cfg.gif_path(),
            folder: cfg.cycle_folder(),
            cycle: cfg.cycle_enabled(),
        }
    }

    fn mode(&self) -> Option<PlaybackMode> {
        if self.cycle {
            Some(PlaybackMode::Cycle(self.folder.clone()))
        } else {
            self.gif_path.clone().map(PlaybackMode::Single)
        }
    }

    async fn start(&self, controller: &Arc<PlaybackController>) -> anyhow::Result<()> {
        match self.mode() {
            Some(mode) => {
                if let Err(e) = blocking(controller, move |c| c.start(mode)).await? {
                    println!("start failed: {e}");
                }
            }
            None => println!("no GIF selected, use `file <path>` or `cycle on`"),
        }
        Ok(())
    }

    async fn run(&mut self, controller: Arc<PlaybackController>, mut lines: mpsc::Receiver<String>) -> anyhow::Result<()> {
        info!("Console ready, type `help` for commands");

        while let Some(line) = lines.recv().await {
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(Command::Quit) => return Ok(()),
                Ok(cmd) => self.apply(cmd, &controller).await?,
                Err(msg) => println!("{msg}"),
            }
        }

        // no console attached (service, pipe closed): keep playing until signalled
        debug!("stdin closed, console disabled");
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn apply(&mut self, cmd: Command, controller: &Arc<PlaybackController>) -> anyhow::Result<()> {
        match cmd {
            Command::Start => self.start(controller).await?,
            Command::Stop => blocking(controller, |c| c.stop()).await?,
            Command::Invert => {
                let on = blocking(controller, |c| c.toggle_invert()).await?;
                println!("invert {}", if on { "on" } else { "off" });
            }
            Command::Cycle(on) => {
                blocking(controller, |c| c.stop()).await?;
                self.cycle = on;
                println!("cycle {}", if on { "on" } else { "off" });
            }
            Command::File(path) if self.cycle => {
                println!("cycling {}, use `cycle off` before picking {}", self.folder.display(), path.display());
            }
            Command::File(path) => {
                self.gif_path = Some(path.clone());
                if let Err(e) = blocking(controller, move |c| c.select_file(path)).await? {
                    println!("select failed: {e}");
                }
            }
            Command::Folder(path) => {
                self.folder = path;
                if self.cycle && controller.is_playing() {
                    self.start(controller).await?;
                }
            }
            Command::Status => {
                println!(
                    "{} | {:?} | invert {}",
                    controller.status(),
                    controller.state(),
                    if controller.is_inverted() { "on" } else { "off" }
                );
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;

    // Initialize the logger with the configured level
    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("This {} drives your panel", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let channel = Arc::new(DeviceChannel::new(Box::new(HidBackend::new()), cfg.device_filter()));
    if !channel.open() {
        warn!("Panel not connected, will retry on first frame");
    }
    let controller = Arc::new(PlaybackController::new(
        channel,
        Arc::new(FrameCache::default()),
        cfg.playback_settings(),
    ));

    let mut console = Console::from_config(&cfg);
    if cfg.start_on_launch() {
        console.start(&controller).await?;
    }

    let lines = read_lines(BufReader::new(io::stdin()))?;
    tokio::select! {
        // Handle Unix signals for graceful shutdown
        result = signal_handler() => {
            if let Err(e) = result {
                error!("Signal handling failed: {}", e);
            }
        }
        result = console.run(Arc::clone(&controller), lines) => {
            if let Err(e) = result {
                error!("Console failed: {}", e);
            }
        }
    }

    blocking(&controller, |c| c.shutdown()).await?;
    info!("Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oled_gif::display::drivers::mock::MockBackend;
    use oled_gif::{DeviceFilter, PlaybackSettings};
    use std::io::{Cursor, Read};
    use std::time::{Duration, Instant};

    /// Input that never produces a byte, like a terminal nobody types into
    struct Idle;

    impl Read for Idle {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            thread::sleep(Duration::from_secs(3600));
            Ok(0)
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("start"), Ok(Command::Start));
        assert_eq!(parse_command("  STOP "), Ok(Command::Stop));
        assert_eq!(parse_command("cycle on"), Ok(Command::Cycle(true)));
        assert_eq!(parse_command("cycle off"), Ok(Command::Cycle(false)));
        assert_eq!(
            parse_command("file /tmp/my cat.gif"),
            Ok(Command::File(PathBuf::from("/tmp/my cat.gif")))
        );
        assert_eq!(parse_command("folder gifs"), Ok(Command::Folder(PathBuf::from("gifs"))));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("cycle maybe").is_err());
        assert!(parse_command("file").is_err());
        assert!(parse_command("start now").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_console_mode() {
        let mut console = Console {
            gif_path: None,
            folder: PathBuf::from("/gifs"),
            cycle: false,
        };
        assert_eq!(console.mode(), None);
        console.gif_path = Some(PathBuf::from("a.gif"));
        assert_eq!(console.mode(), Some(PlaybackMode::Single(PathBuf::from("a.gif"))));
        console.cycle = true;
        assert_eq!(console.mode(), Some(PlaybackMode::Cycle(PathBuf::from("/gifs"))));
    }

    #[test]
    fn test_read_lines_forwards_until_eof() {
        let mut lines = read_lines(Cursor::new("start\n\nfile a.gif\n")).unwrap();
        let got = runtime().block_on(async {
            let mut got = Vec::new();
            while let Some(line) = lines.recv().await {
                got.push(line);
            }
            got
        });
        assert_eq!(got, vec!["start", "", "file a.gif"]);
    }

    #[test]
    fn test_idle_input_does_not_hold_shutdown() {
        let started = Instant::now();
        let rt = runtime();
        let mut lines = read_lines(BufReader::new(Idle)).unwrap();
        rt.block_on(async {
            tokio::task::yield_now().await;
            assert!(lines.try_recv().is_err());
        });
        drop(rt);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_console_returns_on_quit() {
        let backend = MockBackend::new();
        let channel = Arc::new(DeviceChannel::new(Box::new(backend), DeviceFilter::default()));
        let controller = Arc::new(PlaybackController::new(
            channel,
            Arc::new(FrameCache::default()),
            PlaybackSettings::default(),
        ));
        let mut console = Console { gif_path: None, folder: PathBuf::from("/gifs"), cycle: false };
        let lines = read_lines(Cursor::new("help\nbogus\nquit\nstart\n")).unwrap();

        runtime().block_on(console.run(Arc::clone(&controller), lines)).unwrap();
        assert!(!controller.is_playing());
    }
}
