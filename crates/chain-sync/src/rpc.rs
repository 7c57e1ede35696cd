//! Ethereum JSON-RPC implementation of [`EventSource`]
//!
//! Uses raw `reqwest` calls (`eth_blockNumber`, `eth_getLogs`, `eth_call`)
//! with `alloy-sol-types` for ABI encoding of the governance contract.

use crate::error::{SyncError, SyncResult};
use crate::source::EventSource;
use crate::types::{
    BlockPosition, ChainEvent, EventKind, EventPayload, ProposalId, ProposalSnapshot,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

sol! {
    event ProposalCreated(uint256 indexed id, address indexed creator, string description);
    event Voted(uint256 indexed id, address indexed voter, bool support, uint256 weight);
    event ProposalExecuted(uint256 indexed id, address indexed executor);
    event ProposalFinalized(uint256 indexed id, address indexed finalizer);

    function getProposal(uint256 proposalId) external view returns (
        uint256 id,
        string description,
        bool executed,
        bool finalized,
        uint256 votesFor,
        uint256 votesAgainst,
        uint256 createdAt
    );
}

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A log entry as returned by `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(deserialize_with = "deserialize_u64_hex")]
    pub block_number: u64,
    #[serde(default)]
    pub removed: bool,
}

fn deserialize_u64_hex<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_hex_u64(&s).map_err(serde::de::Error::custom)
}

fn parse_hex_u64(s: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
}

/// Minimal JSON-RPC 2.0 client over HTTP.
pub struct RpcClient {
    url: String,
    client: reqwest::Client,
    request_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: &str) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            url: url.to_string(),
            client,
            request_id: AtomicU64::new(1),
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> SyncResult<T> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let resp: JsonRpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = resp.error {
            return Err(SyncError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        resp.result
            .ok_or_else(|| SyncError::UpstreamUnavailable(format!("null result from {method}")))
    }

    pub async fn block_number(&self) -> SyncResult<u64> {
        let hex: String = self.call("eth_blockNumber", json!([])).await?;
        parse_hex_u64(&hex).map_err(|e| {
            SyncError::UpstreamUnavailable(format!("bad block number {hex}: {e}"))
        })
    }

    pub async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        from: u64,
        to: u64,
    ) -> SyncResult<Vec<RpcLog>> {
        self.call(
            "eth_getLogs",
            json!([{
                "address": format!("{address:?}"),
                "topics": [format!("{topic0:?}")],
                "fromBlock": format!("0x{from:x}"),
                "toBlock": format!("0x{to:x}"),
            }]),
        )
        .await
    }

    pub async fn eth_call(&self, to: Address, data: Vec<u8>) -> SyncResult<Vec<u8>> {
        let result: String = self
            .call(
                "eth_call",
                json!([{
                    "to": format!("{to:?}"),
                    "data": format!("0x{}", hex::encode(&data)),
                }, "latest"]),
            )
            .await?;
        hex::decode(result.trim_start_matches("0x"))
            .map_err(|e| SyncError::MalformedEvent(format!("eth_call returned invalid hex: {e}")))
    }
}

/// [`EventSource`] backed by a governance contract on an EVM chain.
pub struct RpcEventSource {
    client: RpcClient,
    contract: Address,
    kinds: HashSet<EventKind>,
}

impl RpcEventSource {
    pub fn new(
        rpc_url: &str,
        contract: Address,
        kinds: impl IntoIterator<Item = EventKind>,
    ) -> SyncResult<Self> {
        Ok(Self {
            client: RpcClient::new(rpc_url)?,
            contract,
            kinds: kinds.into_iter().collect(),
        })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }
}

fn topic_for(kind: EventKind) -> B256 {
    match kind {
        EventKind::Created => ProposalCreated::SIGNATURE_HASH,
        EventKind::Voted => Voted::SIGNATURE_HASH,
        EventKind::Executed => ProposalExecuted::SIGNATURE_HASH,
        EventKind::Finalized => ProposalFinalized::SIGNATURE_HASH,
    }
}

fn proposal_id(raw: U256) -> SyncResult<ProposalId> {
    u64::try_from(raw)
        .map_err(|_| SyncError::MalformedEvent(format!("proposal id {raw} exceeds u64")))
}

fn decode_err(kind: EventKind, e: alloy_sol_types::Error) -> SyncError {
    SyncError::MalformedEvent(format!("{kind} log: {e}"))
}

/// Decode one raw log of the given kind.
pub fn decode_log(kind: EventKind, log: &RpcLog) -> SyncResult<ChainEvent> {
    let topics = log.topics.iter().copied();
    let (id, payload) = match kind {
        EventKind::Created => {
            let ev = ProposalCreated::decode_raw_log(topics, &log.data)
                .map_err(|e| decode_err(kind, e))?;
            (
                ev.id,
                EventPayload::Created {
                    creator: ev.creator,
                    description: ev.description,
                },
            )
        }
        EventKind::Voted => {
            let ev = Voted::decode_raw_log(topics, &log.data).map_err(|e| decode_err(kind, e))?;
            (
                ev.id,
                EventPayload::Voted {
                    voter: ev.voter,
                    support: ev.support,
                    weight: ev.weight,
                },
            )
        }
        EventKind::Executed => {
            let ev = ProposalExecuted::decode_raw_log(topics, &log.data)
                .map_err(|e| decode_err(kind, e))?;
            (ev.id, EventPayload::Executed { executor: ev.executor })
        }
        EventKind::Finalized => {
            let ev = ProposalFinalized::decode_raw_log(topics, &log.data)
                .map_err(|e| decode_err(kind, e))?;
            (ev.id, EventPayload::Finalized { finalizer: ev.finalizer })
        }
    };

    Ok(ChainEvent {
        proposal_id: proposal_id(id)?,
        position: log.block_number,
        payload,
    })
}

/// Decode `getProposal` return data. `createdAt` is seconds on-chain.
pub fn decode_snapshot(data: &[u8]) -> SyncResult<ProposalSnapshot> {
    let ret = getProposalCall::abi_decode_returns(data)
        .map_err(|e| SyncError::MalformedEvent(format!("getProposal returned bad data: {e}")))?;

    let created_secs = u64::try_from(ret.createdAt).unwrap_or(u64::MAX);
    Ok(ProposalSnapshot {
        id: proposal_id(ret.id)?,
        description: ret.description,
        executed: ret.executed,
        finalized: ret.finalized,
        votes_for: ret.votesFor,
        votes_against: ret.votesAgainst,
        created_at: created_secs.saturating_mul(1000),
    })
}

#[async_trait]
impl EventSource for RpcEventSource {
    async fn current_position(&self) -> SyncResult<BlockPosition> {
        self.client.block_number().await
    }

    fn supports(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }

    async fn query_events(
        &self,
        kind: EventKind,
        from: BlockPosition,
        to: BlockPosition,
    ) -> SyncResult<Vec<ChainEvent>> {
        let logs = self
            .client
            .get_logs(self.contract, topic_for(kind), from, to)
            .await?;
        debug!(kind = %kind, from_block = from, to_block = to, count = logs.len(), "Fetched logs");

        let mut events = Vec::with_capacity(logs.len());
        for log in logs.iter() {
            if log.removed {
                warn!(kind = %kind, block = log.block_number, "Dropping removed log");
                continue;
            }
            events.push(decode_log(kind, log)?);
        }
        Ok(events)
    }

    async fn canonical_snapshot(&self, id: ProposalId) -> SyncResult<ProposalSnapshot> {
        let call = getProposalCall {
            proposalId: U256::from(id),
        };
        let data = self.client.eth_call(self.contract, call.abi_encode()).await?;
        decode_snapshot(&data)
    }
}
