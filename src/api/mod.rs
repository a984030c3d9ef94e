mod balance;
mod chain;
mod health;
mod mining;
pub mod models;
mod stats;
mod tx;
mod wallet;

use actix_web::HttpResponse;
use actix_web::web::{self, ServiceConfig};

use crate::error::LedgerError;
pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::replace_chain)
            .service(chain::get_last_block)
            .service(chain::validate_chain)
            .service(chain::get_difficulty)
            .service(chain::set_difficulty)
            .service(wallet::create_wallet)
            .service(wallet::list_addresses)
            .service(wallet::register_address)
            .service(tx::post_faucet)
            .service(tx::post_transaction)
            .service(tx::get_pool)
            .service(mining::mine_block)
            .service(mining::cancel_mining)
            .service(balance::get_balance)
            .service(stats::get_stats),
    );
}

/// Map a ledger rejection to a response. Races (stale or cancelled work,
/// losing chain offers) are conflicts; everything else is a bad request.
pub(crate) fn rejection(err: &LedgerError) -> HttpResponse {
    match err {
        LedgerError::EmptyPool
        | LedgerError::StaleBlock { .. }
        | LedgerError::PoolMismatch
        | LedgerError::MiningCancelled
        | LedgerError::ChainNotLonger { .. } => HttpResponse::Conflict().body(err.to_string()),
        _ => HttpResponse::BadRequest().body(err.to_string()),
    }
}
