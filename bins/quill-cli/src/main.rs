//! Command-line front end for a file-backed Quill wallet.
//!
//! Account state lives in the wallet file, known credits and the chain tip
//! in a ledger snapshot next to it. Authored transactions are printed as
//! JSON on stdout; logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use quill_core::fees::FeeRate;
use quill_core::types::{
    AccountId, Hash256, OutPoint, Script, ScriptKind, Transaction, TxInput, TxOutput,
};
use quill_wallet::{
    LedgerSnapshot, MemoryLedger, OutputRequest, SelectionStrategy, Seed, Wallet, WalletConfig,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Quill command-line wallet.
#[derive(Parser)]
#[command(name = "quill-cli")]
#[command(version, about = "Fee-aware transaction authoring")]
struct Cli {
    /// Data directory (default: $QUILL_DATA_DIR or the platform data dir).
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new wallet.
    Init(InitArgs),
    /// Show the current receive address, or issue a new one.
    Address(AddressArgs),
    /// List every issued address of an account.
    Addresses(AccountArgs),
    /// Record a synthetic confirmed credit to the current address.
    Credit(CreditArgs),
    /// Set the chain tip height.
    Tip(TipArgs),
    /// Show the spendable balance.
    Balance(BalanceArgs),
    /// Author a transaction.
    Author(AuthorArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Script kind of the default account (p2pkh, p2wpkh, np2wpkh, p2tr).
    #[arg(short, long, default_value = "p2wpkh")]
    kind: String,

    /// Hex-encoded 32-byte seed. Random if omitted.
    #[arg(short, long)]
    seed: Option<String>,
}

#[derive(Args)]
struct AccountArgs {
    #[arg(short, long, default_value_t = 0)]
    account: u32,
}

#[derive(Args)]
struct AddressArgs {
    #[command(flatten)]
    account: AccountArgs,

    /// Issue a fresh receive address.
    #[arg(short, long)]
    new: bool,
}

#[derive(Args)]
struct CreditArgs {
    #[command(flatten)]
    account: AccountArgs,

    /// Amount in minor units.
    amount: u64,
}

#[derive(Args)]
struct TipArgs {
    height: u64,
}

#[derive(Args)]
struct BalanceArgs {
    #[command(flatten)]
    account: AccountArgs,

    /// Minimum confirmations (default: configured).
    #[arg(short, long)]
    min_conf: Option<u32>,
}

#[derive(Args)]
struct AuthorArgs {
    #[command(flatten)]
    account: AccountArgs,

    /// Payment as kind:hexhash:amount. Repeat for several outputs.
    #[arg(short, long, required = true)]
    to: Vec<String>,

    /// Fee rate in minor units per 1000 vbytes (default: configured).
    #[arg(short, long)]
    fee_rate: Option<u64>,

    /// Selection strategy: largest or random (default: configured).
    #[arg(short, long)]
    strategy: Option<String>,

    /// Minimum confirmations (default: configured).
    #[arg(short, long)]
    min_conf: Option<u32>,

    /// Preview without allocating a change address.
    #[arg(long)]
    dry_run: bool,

    /// Sign, self-check and record the transaction.
    #[arg(long, conflicts_with = "dry_run")]
    sign: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = WalletConfig::load(cli.data_dir).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Init(args) => wallet_init(&config, args),
        Commands::Address(args) => wallet_address(&config, args),
        Commands::Addresses(args) => wallet_addresses(&config, args),
        Commands::Credit(args) => wallet_credit(&config, args),
        Commands::Tip(args) => wallet_tip(&config, args),
        Commands::Balance(args) => wallet_balance(&config, args),
        Commands::Author(args) => wallet_author(&config, args),
    }
}

/// Create the wallet file and an empty ledger.
fn wallet_init(config: &WalletConfig, args: InitArgs) -> Result<()> {
    let kind: ScriptKind = args.kind.parse().map_err(anyhow::Error::msg)?;
    let seed = match args.seed {
        Some(hex_seed) => parse_seed(&hex_seed)?,
        None => Seed::generate(),
    };

    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create directory: {}", config.data_dir.display()))?;

    let wallet_path = config.wallet_path();
    let wallet = Wallet::create_file(&wallet_path, seed, kind).context("Failed to create wallet")?;
    let address = wallet.current_address(AccountId::DEFAULT)?;
    save_ledger(&config.ledger_path(), &wallet.ledger().snapshot())?;

    println!("Wallet saved to: {}", wallet_path.display());
    println!("Receive address: {address}");
    Ok(())
}

fn wallet_address(config: &WalletConfig, args: AddressArgs) -> Result<()> {
    let wallet = open_wallet(config)?;
    let account = AccountId(args.account.account);
    let address = if args.new {
        wallet.new_address(account)?
    } else {
        wallet.current_address(account)?
    };
    println!("{address}");
    Ok(())
}

fn wallet_addresses(config: &WalletConfig, args: AccountArgs) -> Result<()> {
    let wallet = open_wallet(config)?;
    for script in wallet.account_addresses(AccountId(args.account))? {
        println!("{script}");
    }
    Ok(())
}

/// Record a one-output transaction paying `amount` to the current address,
/// confirmed at the tip.
fn wallet_credit(config: &WalletConfig, args: CreditArgs) -> Result<()> {
    if args.amount == 0 {
        bail!("Credit amount must be positive");
    }
    let wallet = open_wallet(config)?;
    let account = AccountId(args.account.account);
    let script = wallet.current_address(account)?;
    let tip = wallet.tip_height()?;

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock before 1970")?
        .as_nanos() as u64;
    let tx = Transaction {
        version: quill_core::constants::TX_VERSION,
        inputs: vec![TxInput::unsigned(OutPoint {
            txid: Hash256::ZERO,
            index: nonce,
        })],
        outputs: vec![TxOutput {
            value: args.amount,
            script,
        }],
        lock_time: tip,
    };
    wallet.record_transaction(&tx, Some(tip))?;
    save_ledger(&config.ledger_path(), &wallet.ledger().snapshot())?;

    println!("Credited {} to {script} at height {tip}", args.amount);
    Ok(())
}

fn wallet_tip(config: &WalletConfig, args: TipArgs) -> Result<()> {
    let wallet = open_wallet(config)?;
    wallet.set_tip_height(args.height);
    save_ledger(&config.ledger_path(), &wallet.ledger().snapshot())?;
    println!("Tip height: {}", args.height);
    Ok(())
}

fn wallet_balance(config: &WalletConfig, args: BalanceArgs) -> Result<()> {
    let wallet = open_wallet(config)?;
    let min_conf = args.min_conf.unwrap_or(config.author.min_conf);
    let balance = wallet.balance(AccountId(args.account.account), min_conf)?;
    println!("Balance: {balance} (min_conf {min_conf})");
    Ok(())
}

fn wallet_author(config: &WalletConfig, args: AuthorArgs) -> Result<()> {
    let wallet = open_wallet(config)?;
    let account = AccountId(args.account.account);
    let outputs = args
        .to
        .iter()
        .map(|s| parse_output(s))
        .collect::<Result<Vec<_>>>()?;
    let fee_rate = args
        .fee_rate
        .map_or(config.author.fee_rate, FeeRate::from_per_kvb);
    let strategy = match args.strategy {
        Some(s) => s.parse::<SelectionStrategy>()?,
        None => config.author.strategy,
    };
    let min_conf = args.min_conf.unwrap_or(config.author.min_conf);

    let report = if args.sign {
        let (authored, signed) =
            wallet.create_signed_transaction(&outputs, account, min_conf, fee_rate, strategy)?;
        wallet.record_transaction(&signed, None)?;
        save_ledger(&config.ledger_path(), &wallet.ledger().snapshot())?;
        let raw = signed.encode()?;
        serde_json::json!({
            "authored": authored,
            "txid": signed.txid()?.to_string(),
            "raw": hex::encode(raw),
        })
    } else {
        let authored = wallet.author_transaction(
            &outputs,
            account,
            min_conf,
            fee_rate,
            strategy,
            args.dry_run,
        )?;
        serde_json::json!({ "authored": authored, "dry_run": args.dry_run })
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn open_wallet(config: &WalletConfig) -> Result<Wallet> {
    debug!(dir = %config.data_dir.display(), "opening wallet");
    let ledger = load_ledger(&config.ledger_path())?;
    let wallet = Wallet::open_file(&config.wallet_path(), ledger)
        .with_context(|| format!("Failed to open wallet in {}", config.data_dir.display()))?;
    Ok(wallet.with_config(config.author.clone()))
}

fn load_ledger(path: &Path) -> Result<MemoryLedger> {
    if !path.exists() {
        return Ok(MemoryLedger::new());
    }
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)
        .with_context(|| format!("Invalid ledger file: {}", path.display()))?;
    Ok(MemoryLedger::from_snapshot(snapshot))
}

fn save_ledger(path: &Path, snapshot: &LedgerSnapshot) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(snapshot)?;
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Parse a hex-encoded 32-byte seed.
fn parse_seed(input: &str) -> Result<Seed> {
    let bytes = hex::decode(input.trim()).context("Seed must be hex")?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("Seed must be 32 bytes, got {}", b.len()))?;
    Ok(Seed::from_bytes(bytes))
}

/// Parse `kind:hexhash:amount`.
fn parse_output(input: &str) -> Result<OutputRequest> {
    let (script, amount) = input
        .rsplit_once(':')
        .with_context(|| format!("Expected kind:hexhash:amount, got {input}"))?;
    let script: Script = script.parse().map_err(anyhow::Error::msg)?;
    let amount: u64 = amount
        .parse()
        .with_context(|| format!("Invalid amount: {amount}"))?;
    Ok(OutputRequest::new(script, amount))
}
