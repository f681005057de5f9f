#![forbid(unsafe_code)]
use clap::{Parser, Subcommand};
use copperchain::chain::Blockchain;
use copperchain::config::load_config;
use copperchain::error::ChainError;
use copperchain::miner::CancelToken;
use copperchain::transaction::Transaction;
use copperchain::wallet::{decode_address, validate_address, WalletStore};

#[derive(Parser)]
#[command(name = "copperchain", version, about = "An educational proof-of-work UTXO ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new chain; the genesis reward goes to the founding address
    Create {
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "Genesis block")]
        note: String,
    },
    /// Print every block, tip to genesis (or forward with --forward)
    PrintChain {
        #[arg(long)]
        forward: bool,
    },
    /// Show the spendable balance of an address
    Balance {
        #[arg(long)]
        address: String,
    },
    /// Transfer an amount; the miner address collects the block reward
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        miner: String,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Create a new wallet and print its address
    NewWallet,
    /// List all addresses in the keystore
    ListAddresses,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = load_config()?;
    let cli = Cli::parse();
    let cancel = CancelToken::new();

    match cli.command {
        Command::Create { address, note } => {
            let chain = Blockchain::create(
                &config.database.path,
                &address,
                &note,
                config.mining.difficulty,
                &cancel,
            )?;
            println!("Chain created; genesis hash: {}", hex::encode(chain.tip()));
        }

        Command::PrintChain { forward } => {
            let chain = Blockchain::open(&config.database.path)?;
            let mut blocks = Vec::new();
            for block in chain.iter() {
                blocks.push(block?);
            }
            if forward {
                blocks.reverse();
            }
            for block in blocks {
                println!("============================");
                println!("Version:       {}", block.version);
                println!("Prev hash:     {}", hex::encode(&block.prev_hash));
                println!("Tx root:       {}", hex::encode(&block.tx_root));
                println!("Timestamp:     {}", block.timestamp);
                println!("Difficulty:    {}", block.difficulty);
                println!("Nonce:         {}", block.nonce);
                println!("Hash:          {}", hex::encode(&block.hash));
                println!("Transactions:  {}", block.transactions.len());
                for tx in &block.transactions {
                    let kind = if tx.is_coinbase() { "coinbase" } else { "transfer" };
                    println!("  {} {}", kind, hex::encode(&tx.id));
                }
            }
        }

        Command::Balance { address } => {
            let pub_key_hash = decode_address(&address)?;
            let chain = Blockchain::open(&config.database.path)?;
            let balance = chain.balance(&pub_key_hash)?;
            println!("Balance of {}: {}", address, balance);
        }

        Command::Send {
            from,
            to,
            amount,
            miner,
            note,
        } => {
            if !validate_address(&miner) {
                return Err(ChainError::InvalidAddress(miner).into());
            }

            let mut chain = Blockchain::open(&config.database.path)?;
            let store = WalletStore::load_or_create(&config.wallet.path)?;

            let transfer = Transaction::new_transfer(&from, &to, amount, &store, &chain)?;
            let coinbase = Transaction::new_coinbase(&miner, &note)?;

            let block = chain.append_block(vec![coinbase, transfer], &cancel)?;
            println!(
                "Sent {} from {} to {}; block {}",
                amount,
                from,
                to,
                hex::encode(&block.hash)
            );
        }

        Command::NewWallet => {
            let mut store = WalletStore::load_or_create(&config.wallet.path)?;
            let address = store.create_wallet()?;
            println!("New wallet address: {}", address);
        }

        Command::ListAddresses => {
            let store = WalletStore::load_or_create(&config.wallet.path)?;
            for address in store.addresses() {
                println!("{}", address);
            }
        }
    }

    Ok(())
}
