use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::gateway::types::{Listing, ListingId};
use crate::listings::{to_display_units, NewListing, PendingCreate};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Base units, decimal string.
    pub price: String,
    pub price_display: String,
    pub seller: String,
    pub is_sold: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCreateView {
    pub operation_id: String,
    pub seller: String,
    pub name: String,
    pub description: String,
    pub price: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListingsResponse {
    pub listings: Vec<ListingView>,
    pub pending: Vec<PendingCreateView>,
}

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub name: String,
    pub description: String,
    /// Display amount; a JSON string or number.
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub message: String,
    pub transaction_hash: String,
    pub block_number: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: &'static str,
    pub network: u64,
    pub expected_network: u64,
    pub network_matches: bool,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

fn listing_view(listing: Listing, decimals: u8) -> Result<ListingView, ApiError> {
    Ok(ListingView {
        id: listing.id.to_string(),
        price_display: to_display_units(listing.price, decimals)?,
        price: listing.price.to_string(),
        name: listing.name,
        description: listing.description,
        seller: listing.seller.to_string(),
        is_sold: listing.is_sold,
    })
}

fn pending_view(create: PendingCreate) -> PendingCreateView {
    PendingCreateView {
        operation_id: create.operation_id.to_string(),
        seller: create.seller.to_string(),
        name: create.name,
        description: create.description,
        price: create.price,
    }
}

/// Fresh ledger read, returned through the reconciled cache view.
pub async fn list_listings(State(state): State<AppState>) -> Result<Json<ListingsResponse>, ApiError> {
    state.client.fetch_listings_with_retry().await?;

    let decimals = state.client.settings().decimals;
    let listings = state
        .client
        .cached_listings()
        .into_iter()
        .map(|l| listing_view(l, decimals))
        .collect::<Result<Vec<_>, _>>()?;
    let pending = state
        .client
        .pending_creates()
        .into_iter()
        .map(pending_view)
        .collect();

    Ok(Json(ListingsResponse { listings, pending }))
}

pub async fn create_listing(
    State(state): State<AppState>,
    Json(request): Json<CreateListingRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let settlement = state
        .client
        .create_and_confirm(NewListing {
            name: request.name,
            description: request.description,
            price: request.price,
        })
        .await?;

    Ok(Json(OperationResponse {
        message: "Listing created successfully".to_string(),
        transaction_hash: settlement.tx_hash.to_string(),
        block_number: settlement.block_number,
    }))
}

pub async fn purchase_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OperationResponse>, ApiError> {
    let id = ListingId::from_str(&id)?;
    let settlement = state.client.purchase_and_confirm(id).await?;

    Ok(Json(OperationResponse {
        message: "Listing purchased successfully".to_string(),
        transaction_hash: settlement.tx_hash.to_string(),
        block_number: settlement.block_number,
    }))
}

pub async fn get_account(State(state): State<AppState>) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.client.refresh_account().await?;
    Ok(Json(AccountResponse {
        account: account.map(|a| a.to_string()),
    }))
}

pub async fn get_health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state.client.probe().await?;
    let session = state.client.session();
    let check = session.check_network().await?;
    let provider = session.provider().await?.kind().as_str();

    Ok(Json(HealthResponse {
        status: if check.is_match() { "ok" } else { "degraded" },
        provider,
        network: check.observed.0,
        expected_network: check.expected.0,
        network_matches: check.is_match(),
    }))
}
