use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let active_mining_jobs = state.ledger.active_jobs();
    let resp = state.ledger.read(|bc| StatsResponse {
        height: bc.chain_size(),
        difficulty: bc.difficulty(),
        miner_reward: bc.miner_reward(),
        last_hash: bc.last_block().map(|b| b.hash.clone()),
        pool_size: bc.pool().len(),
        addresses: bc.addresses().count(),
        active_mining_jobs,
        total_issued: bc.total_issued(),
    });
    HttpResponse::Ok().json(resp)
}
