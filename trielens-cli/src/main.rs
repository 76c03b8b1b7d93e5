mod cli;
mod config;
mod console;
mod error;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use error::{exit_with_error, CliError, CliResult};
use trielens_core::{ByteInput, MemoryTrie, Session};

/// The keys the demo session is seeded with: the runtime's well-known
/// entries plus a handful of real storage keys, valued by their position
/// after sorting.
const DEMO_KEYS: &[&str] = &[
    ":code",
    ":heappages",
    ":extrinsic_index",
    ":changes_trie",
    ":child_storage",
    "0x06de3d8a54d27e44a9d5ce189618f22db4b49d95320d9021994c850f25b8e385",
    "0xf5207f03cfdce586301014700e2c2593fad157e461d71fd4c1f936839a5f1f3e",
    "0x6a0da05ca59913bc38a8630590f2627cb6604cff828a6e3f579ca6c59ace013d",
    "0x6a0da05ca59913bc38a8630590f2627c1d3719f5b0b12c7105c073c507445948",
    "0x6a0da05ca59913bc38a8630590f2627cf12b746dcf32e843354583c9702cc020",
    "0x63f78c98723ddc9073523ef3beefda0c4d7fefc408aac59dbfe80a72ac8e3ce5",
];

fn init_tracing(cli: &Cli) {
    // Console tracing policy:
    //   --quiet  → always "off"
    //   --verbose → "info" unless RUST_LOG overrides
    //   default  → "off" (clean prompt; RUST_LOG intentionally ignored)
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("off")
    };

    let ansi = !(cli.no_color || std::env::var_os("NO_COLOR").is_some());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn seed_demo(session: &mut Session<MemoryTrie>) -> CliResult<()> {
    let mut keys = DEMO_KEYS
        .iter()
        .map(|key| trielens_core::to_bytes(*key))
        .collect::<trielens_core::Result<Vec<_>>>()?;
    keys.sort();
    let pairs = keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| (ByteInput::Bytes(key), ByteInput::Int(i as u64)));
    session.mirror_mut().bulk_load(pairs)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    init_tracing(&cli);

    if let Err(e) = run(cli) {
        exit_with_error(e);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let file_options = config::load(cli.config.as_deref())?;
    let options = config::resolve_options(&cli, file_options);
    let mut session = Session::with_options(MemoryTrie::new(), options);

    if cli.demo {
        seed_demo(&mut session)?;
    }

    match cli.command {
        Some(Commands::Script { file }) => {
            let source = std::fs::read_to_string(&file)
                .map_err(|e| CliError::Input(format!("cannot read {}: {e}", file.display())))?;
            let run = session.run_script(&source)?;
            output::print_snapshot(&run.snapshot, &session.options);
            match run.script_error {
                Some(err) => Err(CliError::Script(err.to_string())),
                None => Ok(()),
            }
        }

        Some(Commands::Import { file }) => {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| CliError::Input(format!("cannot read {}: {e}", file.display())))?;
            let snapshot = session.load_genesis(&text)?;
            output::print_snapshot(&snapshot, &session.options);
            Ok(())
        }

        None => console::run_loop(&mut session),
    }
}
