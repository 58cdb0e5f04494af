mod constants;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use constants::{DEFAULT_ADDRESS, DEFAULT_LISTEN};
use ledger_core::constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD};
use ledger_core::{Block, Node, NodeConfig, ReplaceOutcome, Transaction};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Recipient of mining rewards
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Trailing zero hex characters required in every block digest
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Amount credited to the reward address per mined block
    #[arg(long, default_value_t = DEFAULT_MINING_REWARD)]
    reward: f64,
}

#[derive(Clone)]
struct AppState {
    node: Arc<Node>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct Head {
    length: usize,
    hash: String,
}

#[derive(Serialize)]
struct ChainOut {
    length: usize,
    chain: Vec<Block>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TxIn {
    sender: String,
    recipient: String,
    amount: f64,
}

#[derive(Serialize)]
struct Mined {
    hash: String,
    block: Block,
}

type ApiError = (StatusCode, String);

async fn head(State(state): State<AppState>) -> Json<Head> {
    let tip = state.node.chain().tip();
    Json(Head {
        length: tip.length,
        hash: tip.hash,
    })
}

async fn export_chain(State(state): State<AppState>) -> Json<ChainOut> {
    let chain = state.node.export_chain();
    Json(ChainOut {
        length: chain.len(),
        chain,
    })
}

async fn receive_chain(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<ReplaceOutcome>) {
    let outcome = state.node.receive_chain(&body);
    let status = match outcome {
        ReplaceOutcome::Accepted { .. } => StatusCode::OK,
        ReplaceOutcome::RejectedNotLonger { .. } => StatusCode::CONFLICT,
        ReplaceOutcome::RejectedInvalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ReplaceOutcome::Malformed { .. } => StatusCode::BAD_REQUEST,
    };
    (status, Json(outcome))
}

async fn submit_transaction(
    State(state): State<AppState>,
    Json(tx): Json<TxIn>,
) -> Result<StatusCode, ApiError> {
    state
        .node
        .submit_transaction(tx.sender, tx.recipient, tx.amount)
        .map_err(|err| (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()))?;
    Ok(StatusCode::ACCEPTED)
}

async fn pending_transactions(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.node.pending_transactions())
}

async fn mine(State(state): State<AppState>) -> Result<Json<Mined>, ApiError> {
    let node = state.node.clone();
    let block = tokio::task::spawn_blocking(move || node.mine())
        .await
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok(Json(Mined {
        hash: block.hash(),
        block,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = NodeConfig::new(args.address, args.difficulty, args.reward);
    let node = tokio::task::spawn_blocking(move || Node::new(config)).await??;
    let state = AppState {
        node: Arc::new(node),
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/chain", get(export_chain).post(receive_chain))
        .route("/chain/head", get(head))
        .route(
            "/transactions",
            get(pending_transactions).post(submit_transaction),
        )
        .route("/mine", post(mine))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
