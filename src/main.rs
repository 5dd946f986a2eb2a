// gentty: step-through generator engine

use std::fs;
use std::io;
use std::process;

use clap::Parser as _;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use gentty::config::{Cli, Config};
use gentty::interpreter::Interpreter;
use gentty::parser::parse_source;
use gentty::ui::App;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::from_cli(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    if let Err(e) = gentty::logging::init(&config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let source = fs::read_to_string(&config.file)?;
    let program = match parse_source(&source) {
        Ok(program) => program,
        Err(e) => {
            error!(error = %e, "parse failed");
            eprintln!("Parser error: {}", e);
            process::exit(1);
        }
    };
    info!(file = %config.file.display(), statements = program.body.len(), "parsed");

    let mut interpreter = Interpreter::new(config.trace_limit);
    let run_error = interpreter.run(&program).err();
    info!(drives = interpreter.trace().len(), "run finished");

    if config.headless {
        for line in interpreter.output() {
            println!("{}", line);
        }
        if let Some(e) = run_error {
            error!(error = %e, "run failed");
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
        return Ok(());
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(interpreter, source, run_error);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {}", err);
    }

    Ok(())
}
