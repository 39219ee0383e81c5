//! Seedwallet CLI
//!
//!   seedwallet create                 → new mnemonic, encrypted keystore, session
//!   seedwallet load <file>            → unlock an existing keystore, session
//!   seedwallet recover                → re-create a keystore from a mnemonic, session
//!   seedwallet list                   → keystore files in the keystore directory
//!   seedwallet serve [--port <port>]  → HTTP front end
//!
//! Inside a session: balance | receive | send | help | exit
//!
//! Configuration comes from `SEEDWALLET_*` variables (and `.env`); flags win.

use anyhow::{anyhow, bail, Context};
use seedwallet::logging::init_logging;
use seedwallet::{
    DerivationScheme, JsonRpcProvider, Keystore, SendOutcome, SendRequest, WalletConfig, WalletSession,
};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::debug;

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }
    if opts.version {
        println!("seedwallet {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = load_config(&opts).and_then(|config| match opts.command.as_deref() {
        Some("create") => cmd_create(&config),
        Some("load") => cmd_load(&opts, &config),
        Some("recover") => cmd_recover(&config),
        Some("list") | Some("ls") => cmd_list(&config),
        Some("serve") => cmd_serve(&opts, config),
        Some(cmd) => Err(anyhow!("Unknown command: {cmd}")),
        None => {
            print_usage();
            Ok(())
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    file: Option<String>,
    keystore_dir: Option<String>,
    rpc_url: Option<String>,
    chain_id: Option<u64>,
    window: Option<u32>,
    standard_path: bool,
    port: Option<u16>,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            let value = args.get(i + 1).cloned();
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--standard-path" => opts.standard_path = true,
                "--keystore-dir" | "-d" => {
                    opts.keystore_dir = value;
                    i += 1;
                }
                "--rpc-url" | "-r" => {
                    opts.rpc_url = value;
                    i += 1;
                }
                "--chain-id" => {
                    opts.chain_id = value.and_then(|v| v.parse().ok());
                    i += 1;
                }
                "--window" | "-w" => {
                    opts.window = value.and_then(|v| v.parse().ok());
                    i += 1;
                }
                "--port" | "-p" => {
                    opts.port = value.and_then(|v| v.parse().ok());
                    i += 1;
                }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => {} // Ignore unknown flags
            }
            i += 1;
        }

        let mut positional = positional.into_iter();
        opts.command = positional.next();
        opts.file = positional.next();

        if opts.port.is_none() {
            opts.port = env::var("SEEDWALLET_PORT").ok().and_then(|s| s.parse().ok());
        }
        opts
    }
}

/// Environment first, flags on top.
fn load_config(opts: &ParsedArgs) -> anyhow::Result<WalletConfig> {
    let mut config = WalletConfig::from_env()?;
    if let Some(dir) = &opts.keystore_dir {
        config.keystore_dir = PathBuf::from(dir);
    }
    if let Some(url) = &opts.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(id) = opts.chain_id {
        config.chain_id = id;
    }
    if let Some(n) = opts.window {
        config.window_size = n;
    }
    if opts.standard_path {
        config.scheme = DerivationScheme::standard();
    }
    config.validate()?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn print_usage() {
    println!(
        r#"seedwallet - HD wallet engine

USAGE:
    seedwallet <command> [file] [options]

COMMANDS:
    create                  Create a wallet (new mnemonic + keystore file)
    load <file>             Unlock a keystore file
    recover                 Restore a wallet from its 12-word mnemonic
    list                    List keystore files
    serve                   Start HTTP server

OPTIONS:
    --keystore-dir, -d <path>   Keystore directory (env: SEEDWALLET_KEYSTORE_DIR)
    --rpc-url, -r <url>         JSON-RPC endpoint (env: SEEDWALLET_RPC_URL)
    --chain-id <id>             Chain id for signing (env: SEEDWALLET_CHAIN_ID)
    --window, -w <n>            Accounts per session (env: SEEDWALLET_WINDOW_SIZE)
    --standard-path             Use m/44'/60'/0'/0/i instead of m/44'/60'/0'/3/i
    --port, -p <port>           Server port (default: 8080, env: SEEDWALLET_PORT)
    --version, -V               Print version

SESSION COMMANDS:
    balance                 Balance of every account in the window
    receive                 Receiving addresses
    send                    Transfer ether (asks for confirmation)
    exit                    Leave the session
"#
    );
}

fn keystore(config: &WalletConfig) -> Keystore {
    Keystore::open(&config.keystore_dir, config.file_prefix.clone())
}

fn cmd_create(config: &WalletConfig) -> anyhow::Result<()> {
    let password = prompt_new_password()?;
    let session = WalletSession::create(&keystore(config), &password, config)?;

    println!();
    println!("Write these words down and keep them offline. They are the only backup:");
    println!();
    println!("    {}", session.mnemonic().phrase());
    println!();
    if let Some(file) = session.keystore_file() {
        println!("Keystore: {}", config.keystore_dir.join(file).display());
    }
    session_loop(&session, config)
}

fn cmd_load(opts: &ParsedArgs, config: &WalletConfig) -> anyhow::Result<()> {
    let file = opts.file.as_deref().context("File required: seedwallet load <file>")?;
    let password = prompt("Password: ")?;
    let session = WalletSession::load(&keystore(config), file, &password, config)?;
    println!("Unlocked {file}");
    session_loop(&session, config)
}

fn cmd_recover(config: &WalletConfig) -> anyhow::Result<()> {
    let keystore = keystore(config);
    let session = loop {
        let phrase = prompt("Mnemonic (12 words): ")?;
        if let Err(e) = seedwallet::Mnemonic::parse(&phrase) {
            println!("{e}");
            continue;
        }
        let password = prompt_new_password()?;
        break WalletSession::recover(&keystore, &phrase, &password, config)?;
    };
    if let Some(file) = session.keystore_file() {
        println!("Recovered. Keystore: {}", config.keystore_dir.join(file).display());
    }
    session_loop(&session, config)
}

fn cmd_list(config: &WalletConfig) -> anyhow::Result<()> {
    let files = keystore(config).list()?;
    for file in &files {
        println!("{file}");
    }
    println!("({} keystore files in {})", files.len(), config.keystore_dir.display());
    Ok(())
}

#[cfg(feature = "server")]
fn cmd_serve(opts: &ParsedArgs, config: WalletConfig) -> anyhow::Result<()> {
    let port = opts.port.unwrap_or(8080);
    let rt = Runtime::new().context("Failed to create runtime")?;
    rt.block_on(seedwallet::server::serve(config, ([0, 0, 0, 0], port).into()))
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_opts: &ParsedArgs, _config: WalletConfig) -> anyhow::Result<()> {
    bail!("built without the 'server' feature")
}

fn session_loop(session: &WalletSession, config: &WalletConfig) -> anyhow::Result<()> {
    let rt = Runtime::new().context("Failed to create runtime")?;
    let provider = JsonRpcProvider::new(config.rpc_url.clone(), config.request_timeout)?;
    let dispatcher = config.dispatcher();
    println!("\nSession open - type 'help' or 'exit'\n");

    loop {
        let input = match prompt("seedwallet> ") {
            Ok(input) => input,
            Err(_) => break,
        };
        match input.as_str() {
            "" => continue,
            "exit" | "quit" | "q" => break,
            "help" | "?" => {
                println!("  balance   - balances of all accounts");
                println!("  receive   - receiving addresses");
                println!("  send      - transfer ether");
                println!("  exit      - leave");
            }
            "receive" => {
                let scheme = session.window().scheme();
                for kp in session.window().iter() {
                    println!("  {:>3}  {}  {}", kp.index, kp.address, scheme.path_string(kp.index));
                }
            }
            "balance" => {
                let report = rt.block_on(session.balance(&provider));
                for entry in &report.entries {
                    match &entry.balance {
                        Ok(wei) => println!("  {:>3}  {}  {} ETH", entry.index, entry.address, wei),
                        Err(e) => println!("  {:>3}  {}  unavailable ({e})", entry.index, entry.address),
                    }
                }
                if report.is_complete() {
                    println!("  Total: {} ETH", report.total());
                } else {
                    println!(
                        "  Total of reachable accounts: {} ETH ({} lookups failed)",
                        report.total(),
                        report.failures().count()
                    );
                }
            }
            "send" => {
                if let Err(e) = send_interactive(session, &rt, &provider, &dispatcher) {
                    println!("Send failed: {e:#}");
                }
            }
            other => println!("Unknown: {other}. Type 'help'."),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn send_interactive(
    session: &WalletSession,
    rt: &Runtime,
    provider: &JsonRpcProvider,
    dispatcher: &seedwallet::Dispatcher,
) -> anyhow::Result<()> {
    let request = SendRequest {
        from: prompt("From address: ")?,
        to: prompt("To address: ")?,
        amount: prompt("Amount (ETH): ")?,
    };
    let answer = prompt(&format!(
        "Send {} ETH from {} to {} on chain {}? [yes/no]: ",
        request.amount, request.from, request.to, dispatcher.chain_id
    ))?;
    if !matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes") {
        println!("Cancelled.");
        return Ok(());
    }

    match rt.block_on(session.send(provider, dispatcher, &request))? {
        SendOutcome::Submitted { hash } => println!("Submitted: {hash}"),
        SendOutcome::Confirmed(r) => println!(
            "Confirmed: {} (block {})",
            r.transaction_hash,
            r.block_number.map(|b| b.to_string()).unwrap_or_else(|| "?".into())
        ),
        SendOutcome::Failed(r) => println!("Included but failed: {}", r.transaction_hash),
    }
    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}");
    io::stdout().flush().ok();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).context("stdin read failed")? == 0 {
        bail!("stdin closed");
    }
    Ok(line.trim().to_string())
}

fn prompt_new_password() -> anyhow::Result<String> {
    loop {
        let password = prompt("Password for encryption: ")?;
        if password.is_empty() {
            println!("Password cannot be empty");
            continue;
        }
        if prompt("Confirm password: ")? != password {
            println!("Passwords did not match!");
            continue;
        }
        return Ok(password);
    }
}
