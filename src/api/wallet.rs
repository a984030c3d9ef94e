use actix_web::{HttpResponse, Responder, get, post, web};
use log::info;

use super::models::{
    AddressesResponse, AppState, NewWalletResponse, RegisterAddressRequest,
    RegisterAddressResponse,
};
use crate::wallet::{Signer, pubkey_to_address_hex};

/// Create a wallet held by this node and register its address.
/// Only the address is returned; the private key never leaves the node.
#[post("/wallet/new/")]
pub async fn create_wallet(state: web::Data<AppState>) -> impl Responder {
    let signer = Signer::new();
    let address = signer.address().to_string();
    {
        let mut wallets = state.wallets.lock().expect("mutex poisoned");
        wallets.insert(address.clone(), signer);
    }
    state.ledger.add_address(address.clone());
    info!("POST /wallet/new/ - wallet {address} created");
    HttpResponse::Ok().json(NewWalletResponse { address })
}

/// List registered addresses.
#[get("/addresses/")]
pub async fn list_addresses(state: web::Data<AppState>) -> impl Responder {
    state.ledger.read(|bc| {
        let addresses: Vec<&str> = bc.addresses().collect();
        HttpResponse::Ok().json(AddressesResponse {
            size: addresses.len(),
            addresses,
        })
    })
}

/// Register an externally held address (a peer announcing itself).
#[post("/addresses/")]
pub async fn register_address(
    state: web::Data<AppState>,
    body: web::Json<RegisterAddressRequest>,
) -> impl Responder {
    let address = match pubkey_to_address_hex(body.address.trim()) {
        Ok(address) => address,
        Err(msg) => return HttpResponse::BadRequest().body(msg),
    };
    let added = state.ledger.add_address(address.clone());
    HttpResponse::Ok().json(RegisterAddressResponse { address, added })
}
