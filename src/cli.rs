use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synth_remote::config::{self, Config};
use synth_remote::midi::{self, MidiError};
use synth_remote::player::{all_notes_off, PlaybackError, PlaybackEvent, Player};
use synth_remote::preset::{PresetError, PresetStore, SynthPreset};
use synth_remote::sink::{CommandSink, ConsoleSink, DeviceSink, SinkError};
use synth_remote::{SynthCommand, Waveform};

/// Synth Remote: play MIDI files and tweak a serial-connected synthesizer
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a MIDI file on the synth (press Enter to stop)
    Play(PlayArgs),

    /// Print the command list compiled from a MIDI file
    Commands(CommandsArgs),

    /// Send one or more raw commands, e.g. ATTACK:75 DOWN:60
    Send(SendArgs),

    /// Release every note and reset the synth
    Panic(SinkArgs),

    /// Manage stored presets
    #[command(subcommand)]
    Preset(PresetCommands),
}

/// Where commands go
#[derive(Args)]
struct SinkArgs {
    /// Serial device node (defaults to the one in config.toml)
    #[arg(short, long, value_name = "PATH")]
    device: Option<PathBuf>,

    /// Print commands to stdout instead of sending them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct PlayArgs {
    /// Path to the input MIDI file
    #[arg(required = true)]
    midi_file: String,

    #[command(flatten)]
    sink: SinkArgs,
}

#[derive(Args)]
struct CommandsArgs {
    /// Path to the input MIDI file
    #[arg(required = true)]
    midi_file: String,
}

#[derive(Args)]
struct SendArgs {
    /// Commands in KEYWORD:VALUE form
    #[arg(required = true, num_args = 1.., value_name = "COMMAND")]
    commands: Vec<SynthCommand>,

    #[command(flatten)]
    sink: SinkArgs,
}

#[derive(Subcommand)]
enum PresetCommands {
    /// List stored preset names
    List,

    /// Show the commands a preset would send
    Show { name: String },

    /// Send a preset's parameters to the synth
    Apply {
        name: String,

        #[command(flatten)]
        sink: SinkArgs,
    },

    /// Create or update a preset
    Save(SavePresetArgs),
}

#[derive(Args)]
struct SavePresetArgs {
    /// Preset name; existing values are used as the starting point
    name: String,

    /// Main oscillator waveform (saw, square, sine, triangle or 0-3)
    #[arg(long, value_parser = parse_waveform)]
    main_wave: Option<Waveform>,

    /// Sub oscillator waveform (saw, square, sine, triangle or 0-3)
    #[arg(long, value_parser = parse_waveform)]
    sub_wave: Option<Waveform>,

    #[arg(long)]
    attack: Option<u8>,

    #[arg(long)]
    decay: Option<u8>,

    #[arg(long)]
    sustain: Option<u8>,

    #[arg(long)]
    release: Option<u8>,

    #[arg(long)]
    filter: Option<u8>,

    #[arg(long)]
    detune: Option<u8>,

    #[arg(long)]
    vib_rate: Option<u8>,

    #[arg(long)]
    vib_depth: Option<u8>,

    #[arg(long, allow_hyphen_values = true)]
    octave: Option<i32>,
}

fn parse_waveform(value: &str) -> Result<Waveform, String> {
    match value.to_lowercase().as_str() {
        "saw" => Ok(Waveform::Saw),
        "square" => Ok(Waveform::Square),
        "sine" => Ok(Waveform::Sine),
        "triangle" => Ok(Waveform::Triangle),
        other => other
            .parse::<u8>()
            .ok()
            .and_then(Waveform::from_index)
            .ok_or_else(|| format!("unknown waveform '{}'", value)),
    }
}

fn format_time(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}", minutes, seconds)
}

fn open_sink(args: &SinkArgs, config: &Config) -> Result<Arc<dyn CommandSink>, SinkError> {
    let sink: Arc<dyn CommandSink> = if args.dry_run {
        Arc::new(ConsoleSink::new())
    } else {
        let path = args.device.as_ref().unwrap_or(&config.device.path);
        Arc::new(DeviceSink::new(path))
    };
    sink.connect()?;
    Ok(sink)
}

fn run_play_command(args: &PlayArgs, config: &Config) -> Result<(), Box<dyn Error>> {
    // Check if MIDI file exists with a clear error message
    if !Path::new(&args.midi_file).exists() {
        return Err(Box::new(MidiError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("MIDI file not found: {}", args.midi_file),
        ))));
    }

    let sink = open_sink(&args.sink, config)?;
    let mut player = Player::new(Arc::clone(&sink), config.playback);
    let events = player.events();

    // Any line on stdin stops playback
    let (stop_tx, stop_rx) = bounded::<()>(1);
    thread::spawn(move || {
        let mut line = String::new();
        if let Ok(n) = io::stdin().read_line(&mut line) {
            if n > 0 {
                let _ = stop_tx.send(());
            }
        }
    });

    player.play_file(&args.midi_file)?;
    eprintln!("Playing {}, press Enter to stop", args.midi_file);

    let mut total_duration = 0;
    let mut outcome = None;
    loop {
        if stop_rx.try_recv().is_ok() {
            eprintln!("\nStopping playback...");
            outcome = player.stop();
        }

        match events.recv_timeout(Duration::from_millis(50)) {
            Ok(PlaybackEvent::Started {
                commands,
                duration_ms,
            }) => {
                total_duration = duration_ms;
                eprintln!("{} commands, total duration: {}", commands, format_time(duration_ms));
            }
            Ok(PlaybackEvent::Sent { timestamp_ms, .. }) => {
                eprint!(
                    "\rProgress: {} / {}",
                    format_time(timestamp_ms),
                    format_time(total_duration)
                );
            }
            Ok(PlaybackEvent::Finished { state, sent }) => {
                eprintln!("\nPlayback {} after {} commands", state, sent);
                break;
            }
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let outcome = outcome.or_else(|| player.wait());
    sink.disconnect();

    match outcome.and_then(|o| o.error) {
        Some(error) => Err(Box::new(error)),
        None => Ok(()),
    }
}

fn run_commands_command(args: &CommandsArgs, config: &Config) -> Result<(), MidiError> {
    let commands = midi::compile_midi_file(&args.midi_file, config.playback.tie_break)?;

    let mut stdout = io::stdout().lock();
    for timed in commands {
        writeln!(stdout, "{}\t{}", timed.timestamp_ms, timed.command)?;
    }
    Ok(())
}

fn send_all(sink: &dyn CommandSink, commands: &[SynthCommand]) -> Result<(), SinkError> {
    for command in commands {
        sink.send_command(&command.to_string())?;
    }
    Ok(())
}

fn run_send_command(args: &SendArgs, config: &Config) -> Result<(), SinkError> {
    let sink = open_sink(&args.sink, config)?;
    let result = send_all(sink.as_ref(), &args.commands);
    sink.disconnect();
    result
}

fn run_panic_command(args: &SinkArgs, config: &Config) -> Result<(), SinkError> {
    let sink = open_sink(args, config)?;
    let sent = all_notes_off(sink.as_ref(), true);
    sink.disconnect();
    eprintln!("Sent {} cleanup commands", sent);
    Ok(())
}

fn run_preset_command(command: &PresetCommands, config: &Config) -> Result<(), Box<dyn Error>> {
    let mut store = PresetStore::open(&config.presets.path)?;

    match command {
        PresetCommands::List => {
            for name in store.names() {
                println!("{}", name);
            }
        }
        PresetCommands::Show { name } => {
            let preset = store.require(name)?;
            for command in preset.to_commands() {
                println!("{}", command);
            }
        }
        PresetCommands::Apply { name, sink } => {
            let preset = store.require(name)?;
            let sink = open_sink(sink, config)?;
            let result = send_all(sink.as_ref(), &preset.to_commands());
            sink.disconnect();
            result?;
            eprintln!("Applied preset {}", name);
        }
        PresetCommands::Save(args) => {
            let mut preset = store
                .get(&args.name)
                .cloned()
                .unwrap_or_else(|| SynthPreset::named(&args.name));
            apply_overrides(&mut preset, args);
            store.save_preset(preset)?;
            eprintln!("Saved preset {} to {}", args.name, store.path().display());
        }
    }

    Ok(())
}

fn apply_overrides(preset: &mut SynthPreset, args: &SavePresetArgs) {
    if let Some(v) = args.main_wave {
        preset.main_waveform = v;
    }
    if let Some(v) = args.sub_wave {
        preset.sub_waveform = v;
    }
    let params = [
        (&mut preset.attack, args.attack),
        (&mut preset.decay, args.decay),
        (&mut preset.sustain, args.sustain),
        (&mut preset.release, args.release),
        (&mut preset.filter, args.filter),
        (&mut preset.detune, args.detune),
        (&mut preset.vib_rate, args.vib_rate),
        (&mut preset.vib_depth, args.vib_depth),
    ];
    for (field, value) in params {
        if let Some(v) = value {
            *field = v;
        }
    }
    if let Some(v) = args.octave {
        preset.octave = v;
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "synth_remote=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();
    let config = config::load_config()?;

    match &cli.command {
        Commands::Play(args) => run_play_command(args, &config)?,
        Commands::Commands(args) => run_commands_command(args, &config)?,
        Commands::Send(args) => run_send_command(args, &config)?,
        Commands::Panic(args) => run_panic_command(args, &config)?,
        Commands::Preset(command) => run_preset_command(command, &config)?,
    }

    Ok(())
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(err) => {
            eprintln!("\nERROR: {}\n", err);
            let midi_error = err.downcast_ref::<MidiError>().or_else(|| {
                match err.downcast_ref::<PlaybackError>() {
                    Some(PlaybackError::Decode(inner)) => Some(inner),
                    _ => None,
                }
            });
            match midi_error {
                Some(MidiError::Io(ref io_err)) if io_err.kind() == io::ErrorKind::NotFound => {
                    eprintln!("Please check that:");
                    eprintln!("1. The file path is correct");
                    eprintln!("2. The file exists");
                    eprintln!("3. You have permission to read the file");
                }
                Some(MidiError::Parse(_)) => {
                    eprintln!("Make sure the file is a Standard MIDI File (.mid)!");
                }
                _ => {}
            }
            if let Some(PresetError::NotFound(_)) = err.downcast_ref::<PresetError>() {
                eprintln!("Run `synth_remote preset list` to see the stored presets.");
            }
            if let Some(SinkError::Io(_)) = err.downcast_ref::<SinkError>() {
                eprintln!("Make sure the synth is paired and its serial port is bound (e.g. rfcomm bind)!");
            }
            process::exit(1);
        }
    }
}
