use clap::Parser;
use mbslave_server::{BankDispatcher, DataBank, Server, ServerConfig, WordSpace};
use mbslave_tools::common::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const HIGH_WORDS: [u16; 5] = [100, 200, 300, 400, 500];
const LOW_WORDS: [u16; 5] = [1, 2, 3, 4, 5];

#[derive(Debug, Parser)]
#[command(name = "simulator", about = "Modbus TCP slave with cycling demo registers")]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 502)]
    port: u16,
    /// First holding register of the demo block.
    #[arg(long, default_value_t = 6000)]
    start: u16,
    /// Seconds between demo register updates.
    #[arg(long, default_value_t = 2)]
    interval: u64,
    /// Stop automatically after this many seconds; runs until ctrl-c when absent.
    #[arg(long)]
    run_for: Option<u64>,
    #[arg(long, default_value_t = 30)]
    idle_timeout: u64,
    #[arg(long, default_value_t = 64)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let bank = Arc::new(DataBank::new());
    bank.write_words(WordSpace::Holding, args.start, &HIGH_WORDS)?;

    let config = ServerConfig::default()
        .with_host(&args.host)
        .with_port(args.port)
        .with_idle_timeout(Duration::from_secs(args.idle_timeout))
        .with_max_connections(args.max_connections);
    let server = Server::bind(config, BankDispatcher::new(Arc::clone(&bank))).await?;
    let handle = server.handle();
    let server_task = tokio::spawn(server.run());

    // The demo mutation runs beside connection handling and touches nothing
    // but the bank's synchronized interface.
    let updater = {
        let bank = Arc::clone(&bank);
        let start = args.start;
        let period = Duration::from_secs(args.interval.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            let mut high = true;
            loop {
                ticker.tick().await;
                high = !high;
                let words = if high { &HIGH_WORDS } else { &LOW_WORDS };
                if let Err(err) = bank.write_words(WordSpace::Holding, start, words) {
                    warn!(error = %err, "demo register update failed");
                    break;
                }
                info!(start, ?words, "demo holding registers updated");
            }
        })
    };

    match args.run_for {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => info!(secs, "run time elapsed"),
                _ = tokio::signal::ctrl_c() => info!("ctrl-c received"),
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("ctrl-c received");
        }
    }

    updater.abort();
    handle.shutdown();
    server_task.await??;
    Ok(())
}
