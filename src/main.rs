use anyhow::Result;
use clap::Parser;
use scribewire::cli::{Cli, Commands, default_config_path};
use scribewire::config::Config;
use scribewire::pipeline::orchestrator::{PipelineConfig, Recorder};
use scribewire::pipeline::types::SessionEvent;
use std::path::Path;
use std::thread;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Devices) => list_audio_devices()?,
        None => run_record(cli)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => Config::load_or_default(path),
        None => match default_config_path() {
            Some(path) => Config::load_or_default(&path),
            None => Config::default(),
        },
    }
}

fn run_record(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref());
    if let Some(device) = cli.device {
        config.audio.device = Some(device);
    }
    if let Some(model) = cli.model {
        config.transport.model = model;
    }
    if let Some(language) = cli.language {
        config.transport.language = language;
    }
    if cli.diarize {
        config.transport.diarize = true;
    }

    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let mut pipeline_config = PipelineConfig::from_config(config.clone());
    pipeline_config.event_tx = Some(event_tx);

    let quiet = cli.quiet;
    let printer = thread::spawn(move || {
        for event in event_rx.iter() {
            match event {
                SessionEvent::Transcript { text, is_final } => {
                    if quiet {
                        continue;
                    }
                    if is_final {
                        eprint!("\r\x1b[K");
                        println!("{text}");
                    } else {
                        eprint!("\r\x1b[K{text}");
                    }
                }
                SessionEvent::StateChanged(state) => {
                    if !quiet {
                        eprintln!("scribewire: connection {state}");
                    }
                }
                SessionEvent::Warning(message) => {
                    eprintln!("scribewire: warning: {message}");
                }
                SessionEvent::Error(message) => {
                    eprintln!("scribewire: error: {message}");
                }
            }
        }
    });

    let mut recorder = Recorder::new(pipeline_config);
    let source = build_source(&config)?;
    recorder.start(source)?;

    eprintln!("scribewire: recording, press Enter to stop");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);

    let transcript = recorder.stop();
    // Dropping the recorder releases the last event sender so the printer
    // thread can exit.
    drop(recorder);
    let _ = printer.join();

    if quiet && let Some(text) = transcript {
        println!("{text}");
    }

    Ok(())
}

#[cfg(feature = "cpal-audio")]
fn build_source(config: &Config) -> Result<Box<dyn scribewire::CaptureSource>> {
    use scribewire::audio::cpal_capture::CpalCaptureSource;
    let source = CpalCaptureSource::new(config.audio.device.as_deref())?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "cpal-audio"))]
fn build_source(_config: &Config) -> Result<Box<dyn scribewire::CaptureSource>> {
    anyhow::bail!("built without microphone support, enable the cpal-audio feature")
}

#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    let devices = scribewire::audio::cpal_capture::list_devices()?;
    if devices.is_empty() {
        eprintln!("scribewire: no audio input devices found");
        return Ok(());
    }
    println!("Available audio input devices:");
    for device in devices {
        println!("  {device}");
    }
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices() -> Result<()> {
    anyhow::bail!("built without microphone support, enable the cpal-audio feature")
}
