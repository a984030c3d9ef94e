use actix_web::{HttpResponse, Responder, post, web};
use log::{error, info, warn};

use super::models::{AppState, CancelResponse, MineRequest, MineResponse};
use super::rejection;

/// Mine a block from the current pool for a node-held miner wallet.
/// Proof-of-Work runs on the blocking pool so request workers stay free.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>, req: web::Json<MineRequest>) -> impl Responder {
    let miner_address = req.miner_address.trim();
    if miner_address.is_empty() {
        return HttpResponse::BadRequest().body("miner_address required");
    }
    let Some(miner) = state.signer(miner_address) else {
        return HttpResponse::NotFound().body("miner wallet is not held by this node");
    };

    let worker = state.clone();
    let mined = web::block(move || worker.ledger.create_block(&miner)).await;

    match mined {
        Ok(Ok(block)) => {
            let mined_index = state.ledger.read(|bc| {
                bc.chain()
                    .iter()
                    .rposition(|b| b.hash == block.hash)
                    .unwrap_or_else(|| bc.chain_size().saturating_sub(1))
            });
            info!(
                "MINER - sealed block #{} (hash={}, nonce={})",
                mined_index, block.hash, block.nonce
            );
            HttpResponse::Ok().json(MineResponse {
                mined_index,
                hash: block.hash,
                nonce: block.nonce,
                difficulty: block.difficulty,
                transactions: block.data.len(),
            })
        }
        Ok(Err(e)) => {
            warn!("POST /mine/ - no block: {e}");
            rejection(&e)
        }
        Err(e) => {
            error!("POST /mine/ - mining worker failed: {e}");
            HttpResponse::InternalServerError().body("mining worker failed")
        }
    }
}

/// Cancel every in-flight mining job.
#[post("/mining/cancel/")]
pub async fn cancel_mining(state: web::Data<AppState>) -> impl Responder {
    let cancelled = state.ledger.cancel_mining();
    info!("POST /mining/cancel/ - {cancelled} job(s) signalled");
    HttpResponse::Ok().json(CancelResponse { cancelled })
}
