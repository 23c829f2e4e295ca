use anyhow::{anyhow, Result};
use bridge_contracts::bridge_abi::checksummed;
use bridge_contracts::{contract_filter, BridgeContract, EventsWorker};
use clap::{ArgAction, Parser};
use ethers::providers::{Middleware, Provider, Ws};
use ethers::types::Address;
use std::sync::Arc;
use tracing::Level;

/// Arguments for the `bridge-monitor` binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Verbosity level (0-4)
    #[arg(long, short, help = "Verbosity level (0-4)", action = ArgAction::Count, env = "VERBOSITY")]
    v: u8,

    /// The websocket RPC endpoint used to read bridge state and logs.
    #[arg(
        long,
        short,
        help = "The websocket RPC endpoint used to read bridge state and logs.",
        env = "BRIDGE_MONITOR_WS"
    )]
    ws_endpoint: String,

    /// The address of the bridge contract.
    #[arg(
        long,
        short,
        help = "The address of the bridge contract.",
        env = "BRIDGE_MONITOR_BRIDGE"
    )]
    bridge: Address,

    /// The block to start replaying bridge events from.
    #[arg(
        long,
        short,
        help = "The block to start replaying bridge events from.",
        env = "BRIDGE_MONITOR_FROM_BLOCK",
        default_value_t = 0
    )]
    from_block: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse the command arguments
    let Args {
        v,
        ws_endpoint,
        bridge,
        from_block,
    } = Args::parse();

    // Initialize the tracing subscriber
    init_tracing_subscriber(v)?;

    // Connect to the websocket endpoint.
    tracing::debug!(target: "bridge-monitor", "Connecting to websocket endpoint...");
    let provider = Arc::new(Provider::<Ws>::connect(ws_endpoint.clone()).await?);
    tracing::info!(target: "bridge-monitor", "Websocket connected @ {}", &ws_endpoint);

    let bridge = BridgeContract::new(provider, bridge);
    let owner = bridge.owner(None).await?;
    let terminated = bridge.terminated(None).await?;
    tracing::info!(
        target: "bridge-monitor",
        "Watching bridge {} (owner: {}, terminated: {})",
        checksummed(&bridge.address()),
        checksummed(&owner),
        terminated
    );

    let mut defined = bridge
        .bridged_resource_type_defined_events(contract_filter(bridge.address()), from_block);
    let mut removed = bridge
        .bridged_resource_type_removed_events(contract_filter(bridge.address()), from_block);
    let mut ownership =
        bridge.ownership_transferred_events(contract_filter(bridge.address()), from_block);

    // Ctrl-C stops the workers cooperatively; buffered occurrences still
    // drain before the loops end.
    let stop_handles = [
        defined.cancellation_token(),
        removed.cancellation_token(),
        ownership.cancellation_token(),
    ];
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "bridge-monitor", "Stop requested, halting event workers...");
            for handle in stop_handles {
                handle.cancel();
            }
        }
    });

    // Tail all three event feeds in parallel until they are stopped.
    tokio::try_join!(
        tail("resource-defined", &mut defined),
        tail("resource-removed", &mut removed),
        tail("ownership", &mut ownership),
    )?;

    tracing::info!(target: "bridge-monitor", "All event workers stopped, exiting.");
    Ok(())
}

/// Logs every occurrence one worker produces until the worker is stopped.
async fn tail<M: Middleware>(label: &str, worker: &mut EventsWorker<M>) -> Result<()> {
    while let Some(occurrence) = worker.next().await {
        match occurrence {
            Ok(occurrence) => {
                tracing::info!(
                    target: "bridge-monitor",
                    "[{}] block {}, log {}, tx {:?}: {:?}",
                    label,
                    occurrence.block_number,
                    occurrence.log_index,
                    occurrence.transaction_hash,
                    occurrence.params
                );
            }
            Err(e) => {
                // Soft failure, log the error and continue.
                tracing::error!(target: "bridge-monitor", "[{}] {}", label, e);
            }
        }
    }
    Ok(())
}

/// Initializes the tracing subscriber
///
/// # Arguments
/// * `verbosity_level` - The verbosity level (0-4)
///
/// # Returns
/// * `Result<()>` - Ok if successful, Err otherwise.
fn init_tracing_subscriber(verbosity_level: u8) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(match verbosity_level {
            0 => Level::ERROR,
            1 => Level::WARN,
            2 => Level::INFO,
            3 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
}
