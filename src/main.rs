mod api;
mod blockchain;
mod config;
mod error;
mod transaction;
mod wallet;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use api::AppState;
use blockchain::genesis::genesis_ledger;
use config::Config;
use wallet::Signer;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env();

    let minter = Signer::new();
    let mut ledger = genesis_ledger(minter);
    if let Some(difficulty) = config.difficulty {
        ledger.set_difficulty(difficulty);
    }
    info!(
        "ledger ready: minter={} difficulty={} reward={}",
        ledger.minter_address(),
        ledger.difficulty(),
        ledger.miner_reward()
    );

    println!(
        "⛓️ Starting ledger API at http://{}:{}",
        config.host, config.port
    );

    let state = web::Data::new(AppState::new(ledger));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
