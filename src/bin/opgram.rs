//! Command-line interface for opgram
//! Drives the bundled integer calculator grammar, mostly as a way to poke at the toolkit.
//!
//! Usage:
//!   opgram eval `<expr>`                        - Evaluate `;`-separated statements, one result per line
//!   opgram tree `<expr>` [--format `<format>`]  - Print the untyped parse tree (json or yaml)
//!   opgram check                              - Validate the calculator grammar against its actions
//!
//! Every subcommand accepts `--config <file>` to layer a TOML file over the built-in defaults.
//! Set `RUST_LOG=opgram=trace` to watch reductions and resolution attempts.

use clap::{Arg, Command};
use opgram::config::ParserConfig;
use opgram::testing::{calculator, CalcContext};
use opgram::{validate, Cursor, Parser};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("opgram")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Operator-precedence grammar toolkit, driving the bundled calculator grammar")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("TOML file layered over the default configuration"),
        )
        .subcommand(
            Command::new("eval")
                .about("Evaluate ';'-separated arithmetic statements")
                .arg(
                    Arg::new("expr")
                        .help("Statements to evaluate")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("tree")
                .about("Print the untyped parse tree of an expression")
                .arg(
                    Arg::new("expr")
                        .help("Expression to parse")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["json", "yaml"])
                        .default_value("json"),
                ),
        )
        .subcommand(Command::new("check").about("Validate the calculator grammar and actions"))
        .get_matches();

    let config = load_config(matches.get_one::<String>("config"));
    let parser = calculator::parser()
        .unwrap_or_else(|e| fail(&format!("Error building calculator: {}", e)))
        .with_config(config);

    match matches.subcommand() {
        Some(("eval", eval_matches)) => {
            let expr = eval_matches.get_one::<String>("expr").unwrap();
            handle_eval_command(&parser, expr);
        }
        Some(("tree", tree_matches)) => {
            let expr = tree_matches.get_one::<String>("expr").unwrap();
            let format = tree_matches.get_one::<String>("format").unwrap();
            handle_tree_command(&parser, expr, format);
        }
        Some(("check", _)) => {
            handle_check_command(&parser);
        }
        _ => unreachable!(),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

fn load_config(path: Option<&String>) -> ParserConfig {
    ParserConfig::load(path.map(Path::new), &[])
        .unwrap_or_else(|e| fail(&format!("Error loading configuration: {}", e)))
}

/// Handle the eval command
fn handle_eval_command(parser: &Parser<CalcContext>, expr: &str) {
    let context = CalcContext::new();
    let width = parser.config().diagnostics.excerpt_width;
    let mut cursor = Cursor::new(expr);
    loop {
        match parser.parse_next::<i64>(&context, &mut cursor) {
            Ok(Some(value)) => println!("{}", value),
            Ok(None) => break,
            Err(e) => fail(&format!("Error: {}\n{}", e, e.excerpt(width))),
        }
    }
}

/// Handle the tree command
fn handle_tree_command(parser: &Parser<CalcContext>, expr: &str, format: &str) {
    let width = parser.config().diagnostics.excerpt_width;
    let tree = parser
        .tree(expr)
        .unwrap_or_else(|e| fail(&format!("Error: {}\n{}", e, e.excerpt(width))));

    let output = match format {
        "yaml" => serde_yaml::to_string(&tree).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(&tree)
            .map(|json| json + "\n")
            .map_err(|e| e.to_string()),
    };
    match output {
        Ok(text) => print!("{}", text),
        Err(e) => fail(&format!("Serialization error: {}", e)),
    }
}

/// Handle the check command
fn handle_check_command(parser: &Parser<CalcContext>) {
    let diagnostics = validate(parser.grammar(), parser.catalog());
    if diagnostics.is_empty() {
        println!("grammar and actions are consistent");
        return;
    }
    for diagnostic in &diagnostics {
        println!("{}", diagnostic);
    }
    std::process::exit(1);
}
