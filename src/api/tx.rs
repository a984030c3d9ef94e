use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info, warn};
use std::time::Instant;

use super::models::{AppState, FaucetRequest, NewTxRequest, NewTxResponse, PoolResponse};
use super::rejection;
use crate::transaction::Transaction;

/// DEV Faucet: the minter grants `amount` to a registered address.
/// The grant waits in the pool like any other transaction until mined.
#[post("/faucet/")]
pub async fn post_faucet(
    state: web::Data<AppState>,
    body: web::Json<FaucetRequest>,
) -> impl Responder {
    match state.ledger.grant(body.address.trim(), body.amount) {
        Ok(transaction) => {
            let pool_size = state.ledger.read(|bc| bc.pool().len());
            debug!(
                "FAUCET - {} granted to {} (pool size {})",
                body.amount, body.address, pool_size
            );
            HttpResponse::Ok().json(NewTxResponse {
                transaction,
                pool_size,
            })
        }
        Err(e) => {
            warn!("POST /faucet/ - rejected: {e}");
            rejection(&e)
        }
    }
}

/// Submit a transfer signed by a node-held wallet.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> impl Responder {
    let t0 = Instant::now();
    debug!(
        "POST /tx/ - received: {} -> {} ({})",
        body.from, body.to, body.amount
    );

    let Some(signer) = state.signer(&body.from) else {
        warn!("POST /tx/ - rejected: sender wallet not held by this node");
        return HttpResponse::NotFound().body("sender wallet is not held by this node");
    };

    let tx = Transaction::new(body.from.clone(), body.to.clone(), body.amount);
    match state.ledger.create_transaction(tx, &signer) {
        Ok(transaction) => {
            let pool_size = state.ledger.read(|bc| bc.pool().len());
            info!("POST /tx/ - OK ({} ms)", t0.elapsed().as_millis());
            HttpResponse::Ok().json(NewTxResponse {
                transaction,
                pool_size,
            })
        }
        Err(e) => {
            warn!("POST /tx/ - rejected: {e}");
            rejection(&e)
        }
    }
}

/// List pending transactions.
#[get("/pool/")]
pub async fn get_pool(state: web::Data<AppState>) -> impl Responder {
    state.ledger.read(|bc| {
        HttpResponse::Ok().json(PoolResponse {
            size: bc.pool().len(),
            transactions: bc.pool(),
        })
    })
}
