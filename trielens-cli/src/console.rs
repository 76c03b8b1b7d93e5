//! Interactive console: line commands driving the session.
//!
//! A small fixed verb set covers the inspector actions (insert, remove,
//! get, show, import, run, set, root). Any line that is not one of these
//! verbs, or an insert/remove/get whose arguments are not plain hex, is
//! handed to the script sandbox verbatim, so the full script language
//! is available at the prompt.

use std::io::{self, BufRead, Write};

use colored::Colorize;
use trielens_core::{to_hex, LayoutMode, MemoryTrie, Session};

use crate::error::{CliError, CliResult};
use crate::output;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Insert { key: String, value: String },
    Remove { key: String },
    Get { key: String },
    Root,
    Show,
    Import { path: String },
    Run { path: String },
    Set { option: String, value: String },
    Help,
    Quit,
    /// Anything else goes through the script sandbox.
    Script(String),
}

/// A console argument the insert/remove/get verbs accept directly:
/// hex digits with an optional 0x prefix.
fn is_hex_arg(arg: &str) -> bool {
    let digits = arg.strip_prefix("0x").unwrap_or(arg);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Console inputs follow the manual-entry convention: bare hex digits
/// get the 0x prefix added for canonicalization.
fn normalize_hex_arg(arg: &str) -> String {
    if arg.starts_with("0x") {
        arg.to_string()
    } else {
        format!("0x{arg}")
    }
}

/// Parse one console line; `None` for blank lines.
pub fn parse_line(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    let command = match (parts[0], &parts[1..]) {
        ("insert", [key, value]) if is_hex_arg(key) && is_hex_arg(value) => Command::Insert {
            key: normalize_hex_arg(key),
            value: normalize_hex_arg(value),
        },
        ("remove", [key]) if is_hex_arg(key) => Command::Remove {
            key: normalize_hex_arg(key),
        },
        ("get", [key]) if is_hex_arg(key) => Command::Get {
            key: normalize_hex_arg(key),
        },
        ("root", []) => Command::Root,
        ("show", []) => Command::Show,
        ("import", [path]) => Command::Import {
            path: (*path).to_string(),
        },
        ("run", [path]) => Command::Run {
            path: (*path).to_string(),
        },
        ("set", [option, value]) => Command::Set {
            option: (*option).to_string(),
            value: (*value).to_string(),
        },
        ("help", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => Command::Script(trimmed.to_string()),
    };
    Some(command)
}

const HELP: &str = "\
commands:
  insert <key> <value>   insert a hex key/value pair, commit, re-render
  remove <key>           remove a key, commit, re-render
  get <key>              look a key up on the engine
  root                   print the committed root
  show                   re-render the table and hierarchy views
  import <file>          replace the state from a genesis JSON document
  run <file>             execute a script file
  set <option> <value>   layout tree|cluster, x_scale N, y_scale N,
                         storage on|off, truncate N|off
  help                   this text
  quit                   leave the console

any other line is executed as a script statement, e.g.:
  insert twox_128(\"System\") 0x01
  let k = 0xaabb
multi-line scripts (repeat blocks) go through 'run <file>'";

/// Apply one command. Returns `false` when the console should exit.
pub fn dispatch(command: Command, session: &mut Session<MemoryTrie>) -> CliResult<bool> {
    match command {
        Command::Insert { key, value } => {
            let snapshot = session.insert(key.as_str(), value.as_str())?;
            output::print_snapshot(&snapshot, &session.options);
        }
        Command::Remove { key } => {
            let snapshot = session.remove(key.as_str())?;
            output::print_snapshot(&snapshot, &session.options);
        }
        Command::Get { key } => match session.get(key.as_str())? {
            Some(value) => println!("0x{}", to_hex(&value)),
            None => println!("(not found)"),
        },
        Command::Root => println!("0x{}", session.root()),
        Command::Show => {
            let snapshot = session.render_current();
            output::print_snapshot(&snapshot, &session.options);
        }
        Command::Import { path } => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| CliError::Input(format!("cannot read {path}: {e}")))?;
            let snapshot = session.load_genesis(&text)?;
            output::print_snapshot(&snapshot, &session.options);
        }
        Command::Run { path } => {
            let source = std::fs::read_to_string(&path)
                .map_err(|e| CliError::Input(format!("cannot read {path}: {e}")))?;
            run_script(session, &source);
        }
        Command::Set { option, value } => {
            apply_option(session, &option, &value)?;
            let snapshot = session.render_current();
            output::print_snapshot(&snapshot, &session.options);
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
        Command::Script(source) => run_script(session, &source),
    }
    Ok(true)
}

/// Script execution surfaces the failure but always shows the re-rendered
/// views built from whatever state resulted.
fn run_script(session: &mut Session<MemoryTrie>, source: &str) {
    match session.run_script(source) {
        Ok(run) => {
            if let Some(err) = run.script_error {
                eprintln!("{} {err}", "script error:".yellow().bold());
            }
            output::print_snapshot(&run.snapshot, &session.options);
        }
        Err(err) => eprintln!("{}", CliError::from(err)),
    }
}

fn apply_option(
    session: &mut Session<MemoryTrie>,
    option: &str,
    value: &str,
) -> CliResult<()> {
    let options = &mut session.options;
    match option {
        "layout" => {
            options.layout = match value {
                "tree" => LayoutMode::Tree,
                "cluster" => LayoutMode::Cluster,
                other => {
                    return Err(CliError::Usage(format!(
                        "unknown layout '{other}' (expected tree or cluster)"
                    )))
                }
            }
        }
        "x_scale" => {
            options.x_scale = value
                .parse()
                .map_err(|_| CliError::Usage(format!("invalid x_scale '{value}'")))?
        }
        "y_scale" => {
            options.y_scale = value
                .parse()
                .map_err(|_| CliError::Usage(format!("invalid y_scale '{value}'")))?
        }
        "storage" => {
            options.show_storage_nodes = match value {
                "on" => true,
                "off" => false,
                other => {
                    return Err(CliError::Usage(format!(
                        "unknown storage setting '{other}' (expected on or off)"
                    )))
                }
            }
        }
        "truncate" => {
            options.value_truncation = match value {
                "off" => None,
                n => {
                    let parsed: usize = n
                        .parse()
                        .map_err(|_| CliError::Usage(format!("invalid truncate '{n}'")))?;
                    (parsed > 0).then_some(parsed)
                }
            }
        }
        other => {
            return Err(CliError::Usage(format!(
                "unknown option '{other}' (layout, x_scale, y_scale, storage, truncate)"
            )))
        }
    }
    Ok(())
}

/// The interactive loop: read, parse, dispatch, report-and-continue.
pub fn run_loop(session: &mut Session<MemoryTrie>) -> CliResult<()> {
    println!("trielens console ('help' for commands, 'quit' to exit)");
    if !session.mirror().is_empty() {
        let snapshot = session.render_current();
        output::print_snapshot(&snapshot, &session.options);
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let Some(command) = parse_line(&line) else {
            continue;
        };
        match dispatch(command, session) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => eprintln!("{err}"),
        }
    }
    Ok(())
}
