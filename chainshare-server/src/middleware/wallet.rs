use crate::error::{ServerError, ServerResult};
use axum::{
    extract::Request,
    http::header::HeaderMap,
    middleware::Next,
    response::Response,
};
use chainshare_access::Address;

pub const WALLET_HEADER: &str = "x-wallet-address";

/// Acting identity, inserted into request extensions
#[derive(Clone, Copy, Debug)]
pub struct CallerIdentity(pub Address);

/// Extract and validate the caller's wallet address
pub fn extract_wallet_address(headers: &HeaderMap) -> ServerResult<Address> {
    let raw = headers
        .get(WALLET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::Unauthorized("Missing X-Wallet-Address header".into()))?;

    let address = Address::parse(raw)
        .ok_or_else(|| ServerError::BadRequest(format!("Invalid wallet address: {raw}")))?;
    if address.is_zero() {
        return Err(ServerError::BadRequest("Zero address cannot act".into()));
    }
    Ok(address)
}

/// Middleware for mutating routes: rejects requests without a valid wallet
pub async fn require_wallet(mut request: Request, next: Next) -> Result<Response, ServerError> {
    let caller = extract_wallet_address(request.headers())?;
    request.extensions_mut().insert(CallerIdentity(caller));
    Ok(next.run(request).await)
}
