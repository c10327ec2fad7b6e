use clap::{Parser, Subcommand};
use colored::*;
use env_logger::Env;
use ewise::core::config::CONFIG_FILE;
use ewise::core::{BroadcastResult, DType, EngineConfig, Shape};
use ewise::dsl::{execute_line, paren_delta, DslOutput};
use ewise::engine::TensorDb;
use ewise::utils::parsing::{parse_f32, parse_usize_list};
use ewise::{check_compatible, classify};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde::Serialize;
use std::fs;
use toon_format::encode_default;

#[derive(Parser)]
#[command(name = "ewise")]
#[command(version = "0.1")]
#[command(about = "ewise: broadcast elementwise evaluator (a - alpha * b)", long_about = None)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start REPL (default)
    Repl {
        /// Output format: 'display', 'toon' or 'json' (default from ewise.toml)
        #[arg(long)]
        format: Option<String>,
    },
    /// Run a script file
    Run {
        /// Path to the script file
        file: String,
        /// Output format: 'display', 'toon' or 'json' (default from ewise.toml)
        #[arg(long)]
        format: Option<String>,
    },
    /// Check whether two shapes broadcast together, e.g. `check 1,1,32,32 5,3,32,32`
    Check { shape_a: String, shape_b: String },
    /// Evaluate a - alpha * b on random operands and compare against the reference
    Eval {
        shape_a: String,
        shape_b: String,
        /// Any finite number
        #[arg(long, default_value_t = 1.0, allow_hyphen_values = true, value_parser = parse_f32)]
        alpha: f32,
        /// f32, bf16 or i32
        #[arg(long, default_value = "bf16")]
        dtype: String,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Write a default ewise.toml
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Display,
    Toon,
    Json,
}

impl OutputFormat {
    fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "display" => Ok(OutputFormat::Display),
            "toon" => Ok(OutputFormat::Toon),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }

    fn render<T: Serialize + std::fmt::Display>(self, value: &T) -> String {
        match self {
            OutputFormat::Display => value.to_string(),
            OutputFormat::Toon => encode_default(value)
                .unwrap_or_else(|e| format!("Error encoding TOON: {}", e)),
            OutputFormat::Json => serde_json::to_string(value)
                .unwrap_or_else(|e| format!("Error encoding JSON: {}", e)),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Some(Commands::Run { file, format }) => {
            let db = TensorDb::new();
            let format = resolve_format(&db, format)?;
            run_file(db, &file, format)?;
        }
        Some(Commands::Check { shape_a, shape_b }) => {
            handle_check(&shape_a, &shape_b)?;
        }
        Some(Commands::Eval {
            shape_a,
            shape_b,
            alpha,
            dtype,
            seed,
        }) => {
            handle_eval(&shape_a, &shape_b, alpha, &dtype, seed)?;
        }
        Some(Commands::Init) => {
            handle_init()?;
        }
        Some(Commands::Repl { format }) => {
            let db = TensorDb::new();
            let format = resolve_format(&db, format)?;
            run_repl(db, format)?;
        }
        None => {
            let db = TensorDb::new();
            let format = resolve_format(&db, None)?;
            run_repl(db, format)?;
        }
    }

    Ok(())
}

fn init_logging(debug: bool) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn resolve_format(db: &TensorDb, flag: Option<String>) -> Result<OutputFormat, String> {
    OutputFormat::parse(flag.as_deref().unwrap_or(&db.config.output.format))
}

/// "1,3,32,32" or "[1, 3, 32, 32]"
fn parse_shape_arg(text: &str) -> Result<Shape, String> {
    let text = text.trim();
    let dims = if text.starts_with('[') {
        parse_usize_list(text)?
    } else {
        parse_usize_list(&format!("[{}]", text))?
    };
    Ok(Shape::new(dims))
}

fn handle_check(shape_a: &str, shape_b: &str) -> Result<(), Box<dyn std::error::Error>> {
    let a = parse_shape_arg(shape_a)?;
    let b = parse_shape_arg(shape_b)?;

    match check_compatible(&a, &b) {
        BroadcastResult::Compatible(out) => {
            let kind = classify(&a, &b)?;
            println!(
                "{} {} x {} -> {} (broadcast {})",
                "compatible".green(),
                a,
                b,
                out,
                kind
            );
        }
        BroadcastResult::Incompatible(err) => {
            eprintln!("{}: {}", "incompatible".red(), err);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn handle_eval(
    shape_a: &str,
    shape_b: &str,
    alpha: f32,
    dtype: &str,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let a_shape = parse_shape_arg(shape_a)?;
    let b_shape = parse_shape_arg(shape_b)?;
    let dtype: DType = dtype.parse()?;

    let mut db = TensorDb::new();
    db.insert_random("a", a_shape, dtype, -100.0, 100.0, seed)?;
    db.insert_random("b", b_shape, dtype, -150.0, 150.0, seed.wrapping_add(1))?;

    if let Err(e) = db.eval_subalpha("c", "a", "b", alpha) {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }

    let c = db.get("c")?;
    let error = db.verify("c")?;
    println!("output shape: {}", c.shape().to_string().bold());
    println!("dtype: {}", c.dtype());
    println!("max_abs_error: {:e}", error);
    Ok(())
}

fn handle_init() -> Result<(), Box<dyn std::error::Error>> {
    if std::path::Path::new(CONFIG_FILE).exists() {
        println!("Configuration file already exists: {}", CONFIG_FILE.yellow());
        return Ok(());
    }

    fs::write(CONFIG_FILE, EngineConfig::default().to_toml()?)?;
    println!("Created default configuration: {}", CONFIG_FILE.green());
    println!("{}", "Initialization complete.".bold().blue());
    Ok(())
}

fn print_output(output: &DslOutput, format: OutputFormat) {
    if !matches!(output, DslOutput::None) {
        println!("{}", format.render(output));
    }
}

fn run_file(
    mut db: TensorDb,
    file: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file)?;

    let mut current_cmd = String::new();
    let mut start_line = 0;
    let mut paren_balance = 0;

    for (idx, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();

        if current_cmd.is_empty() {
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            start_line = idx + 1;
        }

        if !current_cmd.is_empty() {
            current_cmd.push(' ');
        }
        current_cmd.push_str(line);
        paren_balance += paren_delta(line);

        if paren_balance == 0 {
            match execute_line(&mut db, &current_cmd, start_line) {
                Ok(output) => print_output(&output, format),
                Err(e) => {
                    eprintln!("Error on line {}: {}", start_line, e);
                    std::process::exit(1);
                }
            }
            current_cmd.clear();
        }
    }

    if !current_cmd.is_empty() {
        eprintln!(
            "Error: Script ended with unbalanced parentheses starting at line {}",
            start_line
        );
        std::process::exit(1);
    }
    Ok(())
}

fn run_repl(mut db: TensorDb, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let mut rl = DefaultEditor::new()?;
    let history_path = ".ewise_history";

    if rl.load_history(history_path).is_err() {
        // No history yet
    }

    println!("{}", "ewise REPL v0.1".bold().blue());
    println!("Output format: {}", format!("{:?}", format).yellow());
    println!(
        "Kernel backend: {}",
        format!("{:?}", db.config.kernel.backend).yellow()
    );
    println!("Type 'EXIT' or use Ctrl-D to quit.");

    let mut current_cmd = String::new();
    let mut paren_balance = 0;
    let mut line_no = 0;

    loop {
        let prompt = if paren_balance == 0 { ">_>  " } else { " ..  " };
        let readline = rl.readline(prompt);

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                if trimmed.eq_ignore_ascii_case("EXIT") {
                    break;
                }

                rl.add_history_entry(trimmed)?;
                line_no += 1;

                if !current_cmd.is_empty() {
                    current_cmd.push(' ');
                }
                current_cmd.push_str(trimmed);
                paren_balance += paren_delta(trimmed);

                if paren_balance == 0 {
                    match execute_line(&mut db, &current_cmd, line_no) {
                        Ok(output) => print_output(&output, format),
                        Err(e) => eprintln!("{}: {}", "Error".red(), e),
                    }
                    current_cmd.clear();
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                current_cmd.clear();
                paren_balance = 0;
                continue;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(history_path);
    Ok(())
}
