use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{
    AppState, ChainResponse, DifficultyResponse, ReplaceChainResponse, SetDifficultyRequest,
    ValidateResponse,
};
use super::rejection;
use crate::blockchain::{Block, DIFF_MAX};

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    state.ledger.read(|bc| {
        HttpResponse::Ok().json(ChainResponse {
            length: bc.chain_size(),
            difficulty: bc.difficulty(),
            chain: bc.chain(),
        })
    })
}

/// Offer a chain received from a peer; adopted only if longer and valid.
#[post("/chain/")]
pub async fn replace_chain(
    state: web::Data<AppState>,
    body: web::Json<Vec<Block>>,
) -> impl Responder {
    let candidate = body.into_inner();
    let offered = candidate.len();
    match state.ledger.set_chain(candidate) {
        Ok(length) => {
            info!("POST /chain/ - adopted chain of {length} blocks");
            HttpResponse::Ok().json(ReplaceChainResponse {
                replaced: true,
                length,
            })
        }
        Err(e) => {
            warn!("POST /chain/ - kept local chain, offered {offered} blocks: {e}");
            rejection(&e)
        }
    }
}

/// Last block of the chain.
#[get("/chain/last/")]
pub async fn get_last_block(state: web::Data<AppState>) -> impl Responder {
    state.ledger.read(|bc| match bc.last_block() {
        Some(block) => HttpResponse::Ok().json(block),
        None => HttpResponse::NotFound().body("chain is empty"),
    })
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let resp = state.ledger.read(|bc| ValidateResponse {
        valid: bc.is_valid(),
        length: bc.chain_size(),
        broken_index: bc.chain_broken_index(),
    });
    HttpResponse::Ok().json(resp)
}

/// Get current PoW difficulty.
#[get("/difficulty/")]
pub async fn get_difficulty(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: state.ledger.read(|bc| bc.difficulty()),
    })
}

/// Update PoW difficulty (affects future blocks only).
#[post("/difficulty/")]
pub async fn set_difficulty(
    state: web::Data<AppState>,
    body: web::Json<SetDifficultyRequest>,
) -> impl Responder {
    if body.difficulty > DIFF_MAX {
        return HttpResponse::BadRequest().body(format!("difficulty must be <= {DIFF_MAX}"));
    }
    state.ledger.set_difficulty(body.difficulty);
    info!("POST /difficulty/ - difficulty set to {}", body.difficulty);
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: body.difficulty,
    })
}
