//! Ziffers CLI - evaluate numeric notation patterns from the command line

use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use ziffers::error_diagnostics::check_for_common_mistakes;
use ziffers::{parse_expression, Event, Field, Options, Scale, ZiffersError};

#[derive(Parser)]
#[command(name = "ziffers")]
#[command(about = "Numeric music notation evaluator", long_about = None)]
struct Cli {
    #[command(flatten)]
    options: OptionArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(Args)]
struct OptionArgs {
    /// TOML or JSON file with default options
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Key as a note name (C4, Eb3) or MIDI number
    #[arg(short, long, global = true)]
    key: Option<String>,

    /// Scale name (Ionian, Dorian, Chromatic, ...)
    #[arg(short, long, global = true)]
    scale: Option<String>,

    /// Baseline octave
    #[arg(short, long, global = true, allow_hyphen_values = true)]
    octave: Option<i32>,

    /// Default duration as a fraction of a whole note
    #[arg(short, long, global = true)]
    duration: Option<f64>,

    /// Seed for random values
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a pattern and print its events
    Eval {
        /// Pattern text, e.g. "q 0 2 4 [5 6]"
        pattern: String,

        /// Number of events to print (continues into later cycles)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Comma separated fields to print (pitch_class, note, duration, beat, octave, freq, pitch_bend)
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read patterns line by line from stdin
    Repl,
}

impl OptionArgs {
    fn resolve(&self) -> Result<Options, ZiffersError> {
        let mut options = match &self.config {
            Some(path) => Options::load(path)?,
            None => Options::default(),
        };

        if let Some(key) = &self.key {
            options = match key.parse::<i32>() {
                Ok(midi) => options.with_key(midi),
                Err(_) => options.with_key(key.as_str()),
            };
        }
        if let Some(scale) = &self.scale {
            options = options.with_scale(Scale::from(scale.as_str()));
        }
        if let Some(octave) = self.octave {
            options = options.with_octave(octave);
        }
        if let Some(duration) = self.duration {
            options = options.with_duration(duration);
        }
        if let Some(seed) = self.seed {
            options = options.with_seed(seed);
        }
        Ok(options)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let options = cli.options.resolve()?;

    match cli.command {
        Commands::Eval {
            pattern,
            count,
            fields,
            json,
        } => {
            let fields = fields
                .iter()
                .map(|f| f.parse::<Field>())
                .collect::<Result<Vec<_>, _>>()?;

            if let Err(e) = eval(&pattern, options, count, &fields, json) {
                report(&pattern, &e);
                std::process::exit(1);
            }
        }

        Commands::Repl => {
            println!("🎵 Ziffers REPL (empty line, 'exit' or 'quit' to leave)");
            let stdin = io::stdin();
            loop {
                print!("> ");
                io::stdout().flush()?;

                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let pattern = line.trim();
                if pattern.is_empty() || pattern == "exit" || pattern == "quit" {
                    break;
                }

                if let Err(e) = eval(pattern, options.clone(), None, &[], false) {
                    report(pattern, &e);
                }
            }
        }
    }

    Ok(())
}

fn eval(
    pattern: &str,
    options: Options,
    count: Option<usize>,
    fields: &[Field],
    json: bool,
) -> Result<(), ZiffersError> {
    let mut root = parse_expression(pattern)?.with_options(options)?;
    let count = count.unwrap_or_else(|| root.len());

    if !fields.is_empty() {
        let rows = root.collect(count, fields)?;
        for (field, row) in fields.iter().zip(rows) {
            let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            println!("{:?}: {}", field, values.join(" "));
        }
        return Ok(());
    }

    let events = root.take(count)?;
    if json {
        let text = serde_json::to_string_pretty(&events)
            .map_err(|e| ZiffersError::Config(e.to_string()))?;
        println!("{}", text);
    } else {
        for (i, event) in events.iter().enumerate() {
            println!("{:>4}  {}", i, describe(event));
        }
        println!(
            "      {} events, {} beats per cycle",
            root.len(),
            root.total_beats()
        );
    }
    Ok(())
}

fn describe(event: &Event) -> String {
    match event {
        Event::Pitch(p) => format!(
            "{:<8} pc={} note={} dur={}",
            p.text,
            p.pitch_class,
            p.note.map_or("-".to_string(), |n| n.to_string()),
            p.duration.unwrap_or(0.0)
        ),
        Event::Chord(c) => {
            let notes: Vec<String> = c
                .notes()
                .iter()
                .map(|n| n.map_or("-".to_string(), |n| n.to_string()))
                .collect();
            format!(
                "{:<8} notes=[{}] dur={}",
                c.text,
                notes.join(","),
                c.duration.unwrap_or(0.0)
            )
        }
        Event::Polyphony(p) => {
            let layers: Vec<String> = p
                .layers
                .iter()
                .map(|layer| layer.iter().map(|e| e.text().trim()).collect::<Vec<_>>().join(" "))
                .collect();
            format!("{:<8} layers=[{}] dur={}", p.text, layers.join(" | "), p.duration())
        }
        other => format!("{:<8} dur={}", other.text(), other.duration().unwrap_or(0.0)),
    }
}

fn report(pattern: &str, error: &ZiffersError) {
    eprintln!("{}", error);
    if matches!(error, ZiffersError::Parse(_)) {
        let warnings = check_for_common_mistakes(pattern);
        if !warnings.is_empty() {
            eprintln!("⚠️  Additional warnings:");
            for warning in warnings {
                eprintln!("  • {}", warning);
            }
        }
    }
}
