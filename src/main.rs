#[cfg(not(feature = "playback"))]
fn main() {
    eprintln!(
        "The taptone station requires the \"playback\" feature. Rebuild with `--features playback` to enable audio output."
    );
}

#[cfg(feature = "playback")]
mod station {
    use std::collections::VecDeque;
    use std::env;
    use std::io::BufRead;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Context;
    use flexi_logger::Logger;
    use log::warn;
    use parking_lot::Mutex;
    use serde::Deserialize;

    use taptone::ndef::{RECORD_HEADER, TYPE_LENGTH, TYPE_TEXT};
    use taptone::transport::{DATA_PAGE_START, PAGE_LEN, RAW_BUFFER_LEN};
    use taptone::{
        FileByteStore, Kiosk, KioskConfig, TagTransport, TagUid, TransportError, WavAssetLibrary,
    };

    /// Station settings, optionally loaded from a JSON file.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct StationConfig {
        /// Directory holding the WAV assets.
        assets_dir: PathBuf,
        /// Settings image file backing the persisted volume.
        settings_file: PathBuf,
        /// Pause between dispatch cycles in milliseconds.
        poll_interval_ms: u64,
        /// Log specification (flexi_logger syntax, e.g. `info` or `taptone=debug`).
        log_spec: String,
    }

    impl Default for StationConfig {
        fn default() -> Self {
            StationConfig {
                assets_dir: PathBuf::from("assets"),
                settings_file: PathBuf::from("settings.bin"),
                poll_interval_ms: 250,
                log_spec: "info".to_string(),
            }
        }
    }

    fn load_config(path: Option<&Path>) -> anyhow::Result<StationConfig> {
        let Some(path) = path else {
            return Ok(StationConfig::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("config file {} is not valid", path.display()))?;
        Ok(config)
    }

    /// Tag transport driven by stdin lines, for running the station
    /// without reader hardware.
    ///
    /// Each line is one tap of a freshly written tag holding that text.
    /// Two directives exercise the failure paths: `!foreign` taps a tag
    /// outside the accepted family and `!blank` taps a family tag whose
    /// data window holds no record.
    struct SimulatedTransport {
        lines: Arc<Mutex<VecDeque<String>>>,
        window: Vec<u8>,
        serial: u32,
    }

    impl SimulatedTransport {
        fn new(lines: Arc<Mutex<VecDeque<String>>>) -> Self {
            SimulatedTransport {
                lines,
                window: Vec::new(),
                serial: 0,
            }
        }
    }

    impl TagTransport for SimulatedTransport {
        fn poll(&mut self) -> Option<TagUid> {
            let line = self.lines.lock().pop_front()?;
            self.serial = self.serial.wrapping_add(1);

            if line == "!foreign" {
                self.window.clear();
                return Some(TagUid::new(&[0xDE, 0xAD, 0xBE, 0xEF]));
            }
            if line == "!blank" {
                self.window = vec![0u8; RAW_BUFFER_LEN];
            } else {
                self.window = encode_tag_window(&line);
            }

            let s = self.serial.to_be_bytes();
            Some(TagUid::new(&[0x04, 0x54, 0x50, s[1], s[2], s[3], 0x01]))
        }

        fn read_page(&mut self, page: u8) -> Result<[u8; PAGE_LEN], TransportError> {
            let start = page
                .checked_sub(DATA_PAGE_START)
                .map(|offset| offset as usize * PAGE_LEN)
                .filter(|start| start + PAGE_LEN <= self.window.len());
            let Some(start) = start else {
                return Err(TransportError::PageRead {
                    page,
                    reason: "page outside the simulated tag".to_string(),
                });
            };
            let mut out = [0u8; PAGE_LEN];
            out.copy_from_slice(&self.window[start..start + PAGE_LEN]);
            Ok(out)
        }
    }

    /// Build the data window a phone app would leave on a tag: TLV byte
    /// pair, Text Record with an `en` language code, terminator, padding.
    fn encode_tag_window(text: &str) -> Vec<u8> {
        // TLV pair, five record bytes, two language bytes, terminator.
        const MAX_TEXT: usize = RAW_BUFFER_LEN - 10;

        let mut end = MAX_TEXT.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        if end < text.len() {
            warn!("tag text '{}' truncated to {} bytes", text, end);
        }
        let text = &text.as_bytes()[..end];

        let mut record = vec![
            RECORD_HEADER,
            TYPE_LENGTH,
            (1 + 2 + text.len()) as u8,
            TYPE_TEXT,
            0x02,
        ];
        record.extend_from_slice(b"en");
        record.extend_from_slice(text);

        let mut window = vec![0x03, record.len() as u8];
        window.extend_from_slice(&record);
        window.push(0xFE);
        window.resize(RAW_BUFFER_LEN, 0x00);
        window
    }

    fn spawn_stdin_feed(lines: Arc<Mutex<VecDeque<String>>>, eof: Arc<AtomicBool>) {
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            lines.lock().push_back(trimmed.to_string());
                        }
                    }
                    Err(_) => break,
                }
            }
            eof.store(true, Ordering::Relaxed);
        });
    }

    fn print_usage() {
        eprintln!(
            "Usage:\n  taptone [--config <file>] [--assets <dir>] [--settings <file>] [--once]\n\nFlags:\n  --config <file>      Load station settings from a JSON file\n  --assets <dir>       Directory of WAV assets (default: assets)\n  --settings <file>    Settings image for the persisted volume (default: settings.bin)\n  --once               Start up, run a single cycle, and exit\n  -h, --help           Show this help\n\nWithout reader hardware, each stdin line simulates one tag tap:\n  museum               Tap a tag holding the text \"museum\"\n  VOLUMEUP             Tap a volume-up command tag\n  !foreign             Tap a tag outside the accepted family\n  !blank               Tap a family tag with an empty data window"
        );
    }

    pub fn run() -> anyhow::Result<()> {
        let mut config_path: Option<PathBuf> = None;
        let mut assets_override: Option<PathBuf> = None;
        let mut settings_override: Option<PathBuf> = None;
        let mut once = false;
        let mut show_help = false;

        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => match args.next() {
                    Some(value) => config_path = Some(PathBuf::from(value)),
                    None => {
                        eprintln!("--config requires a file argument");
                        show_help = true;
                    }
                },
                "--assets" => match args.next() {
                    Some(value) => assets_override = Some(PathBuf::from(value)),
                    None => {
                        eprintln!("--assets requires a directory argument");
                        show_help = true;
                    }
                },
                "--settings" => match args.next() {
                    Some(value) => settings_override = Some(PathBuf::from(value)),
                    None => {
                        eprintln!("--settings requires a file argument");
                        show_help = true;
                    }
                },
                "--once" => once = true,
                "--help" | "-h" => show_help = true,
                _ if arg.starts_with("--config=") => {
                    config_path = Some(PathBuf::from(&arg[9..]));
                }
                _ if arg.starts_with("--assets=") => {
                    assets_override = Some(PathBuf::from(&arg[9..]));
                }
                _ if arg.starts_with("--settings=") => {
                    settings_override = Some(PathBuf::from(&arg[11..]));
                }
                _ => {
                    eprintln!("Unknown argument: {}", arg);
                    show_help = true;
                }
            }
        }

        if show_help {
            print_usage();
            return Ok(());
        }

        let mut config = load_config(config_path.as_deref())?;
        if let Some(dir) = assets_override {
            config.assets_dir = dir;
        }
        if let Some(file) = settings_override {
            config.settings_file = file;
        }

        let _logger = Logger::try_with_env_or_str(&config.log_spec)
            .context("invalid log specification")?
            .start()
            .context("cannot start logger")?;

        println!("TapTone Station");
        println!("===============\n");

        let assets = WavAssetLibrary::open(&config.assets_dir).with_context(|| {
            format!(
                "asset library at {} is unusable",
                config.assets_dir.display()
            )
        })?;
        let store = FileByteStore::open(&config.settings_file).with_context(|| {
            format!(
                "settings store at {} is unusable",
                config.settings_file.display()
            )
        })?;

        println!(
            "Assets:   {} ({} WAV files)",
            config.assets_dir.display(),
            assets.asset_count()
        );
        println!("Settings: {}", config.settings_file.display());

        let lines = Arc::new(Mutex::new(VecDeque::new()));
        let eof = Arc::new(AtomicBool::new(false));
        spawn_stdin_feed(Arc::clone(&lines), Arc::clone(&eof));
        let transport = SimulatedTransport::new(Arc::clone(&lines));

        let kiosk_config = KioskConfig {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            ..KioskConfig::default()
        };
        let mut kiosk =
            Kiosk::new(transport, assets, store, kiosk_config).context("kiosk startup failed")?;

        println!("Volume:   {}%\n", (kiosk.volume() * 100.0).round() as u32);
        kiosk.startup();

        if once {
            let outcome = kiosk.run_cycle()?;
            println!("Cycle outcome: {:?}", outcome);
            return Ok(());
        }

        println!("One tag tap per stdin line (try \"museum\" or \"VOLUMEUP\"); Ctrl-D stops the station.\n");
        kiosk.run(|| !(eof.load(Ordering::Relaxed) && lines.lock().is_empty()));

        println!("\nStation stopped.");
        Ok(())
    }
}

#[cfg(feature = "playback")]
fn main() -> anyhow::Result<()> {
    station::run()
}
