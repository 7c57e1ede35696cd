//! DAO Node
//!
//! Mirrors governance proposals from an EVM contract into memory and
//! serves them over HTTP next to a wallet sign-in challenge.

use anyhow::Result;
use chain_sync::{build_poller, parse_event_kinds, ProposalStore, SyncConfig, SyncError};
use clap::Parser;
use dao_server::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use wallet_auth::{AuthConfig, ChallengeAuth};

// ==================== CLI ====================

#[derive(Parser, Debug)]
#[command(name = "dao-node")]
#[command(about = "Governance proposal mirror with wallet sign-in")]
struct Args {
    /// JSON-RPC endpoint of the chain
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    /// Governance contract address
    #[arg(long, env = "CONTRACT_ADDRESS")]
    contract_address: Option<String>,

    /// Block to start scanning from (defaults to the current tip)
    #[arg(long, env = "START_POSITION")]
    start_position: Option<u64>,

    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "10000")]
    poll_interval_ms: u64,

    /// Upper bound on a single sync cycle
    #[arg(long, env = "CYCLE_TIMEOUT_MS", default_value = "60000")]
    cycle_timeout_ms: u64,

    /// Comma-separated subset of created,voted,executed,finalized
    #[arg(long, env = "EVENT_KINDS")]
    event_kinds: Option<String>,

    /// Sign-in nonce lifetime (0 = default)
    #[arg(long, env = "NONCE_TTL_MS", default_value = "300000")]
    nonce_ttl_ms: u64,

    // HTTP
    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    bind_addr: String,
}

// ==================== Main ====================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dao_node=debug".into()),
        )
        .init();

    let args = Args::parse();
    info!("Starting DAO node");

    let proposals = Arc::new(ProposalStore::new());
    let auth = Arc::new(ChallengeAuth::with_config(AuthConfig::with_nonce_ttl(
        Duration::from_millis(args.nonce_ttl_ms),
    )));
    info!("Wallet auth: nonce TTL {:?}", auth.nonce_ttl());

    // Contract poller
    let mut state = AppState::new(proposals.clone(), auth.clone());
    match sync_config(&args) {
        Ok(config) => {
            let poller = Arc::new(build_poller(&config, proposals.clone())?);
            poller.start();
            info!(
                contract = %config.contract_address,
                interval = ?config.poll_interval,
                "Contract poller: started"
            );
            state = state.with_poller(poller);
        }
        Err(e @ SyncError::ConfigMissing(_)) => {
            warn!("Contract poller: disabled ({})", e);
        }
        Err(e) => return Err(e.into()),
    }
    let state = Arc::new(state);

    // HTTP server
    let addr: SocketAddr = format!("{}:{}", args.bind_addr, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = dao_server::router(state.clone());
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });
    info!("HTTP: http://{}", addr);

    info!("DAO node running. Ctrl+C to stop.");

    let mut interval = tokio::time::interval(Duration::from_secs(60));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let purged = auth.purge_expired();
                debug!(
                    purged,
                    sessions = auth.session_count(),
                    proposals = proposals.len(),
                    "Heartbeat"
                );
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    if let Some(poller) = &state.poller {
        poller.stop();
    }
    server.abort();

    info!("Stopped.");
    Ok(())
}

fn sync_config(args: &Args) -> Result<SyncConfig, SyncError> {
    let mut config =
        SyncConfig::from_settings(args.rpc_url.as_deref(), args.contract_address.as_deref())?
            .with_start_position(args.start_position)
            .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
            .with_cycle_timeout(Duration::from_millis(args.cycle_timeout_ms));

    if let Some(raw) = args.event_kinds.as_deref() {
        match parse_event_kinds(raw) {
            Ok(kinds) => config = config.with_event_kinds(kinds),
            Err(e) => warn!("Ignoring EVENT_KINDS: {}", e),
        }
    }
    Ok(config)
}
