//! Marketplace operations and how they map onto contract calls.

use crate::{
    cache::{MarketCache, OptimisticUpdate},
    error::SubmitError,
    submitter::SubmitSettings,
    types::{
        DomainRecord, EscrowRecord, EscrowStatus, LISTING_ACTIVE, RecordKind, REQUEST_OPEN,
    },
};
use borderless_wallets::{Address, UnsignedPayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A traveller's offer to bring goods along a route.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: String,
    pub delivery_estimate: String,
}

/// A buyer's request for goods to be brought.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRequest {
    pub title: String,
    pub description: String,
    pub max_price: String,
    pub delivery_date: String,
}

/// A state-changing marketplace operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketOperation {
    AddListing(NewListing),
    AddRequest(NewRequest),
    /// Buys a listing, locking `amount` in escrow.
    Purchase { listing_id: String, amount: String },
    /// Releases the escrowed funds to the seller.
    ConfirmDelivery { escrow_id: String },
    /// Attaches proof that the goods were handed over.
    AddDeliveryProof { escrow_id: String, proof_hash: String },
}

/// An operation resolved against the current marketplace state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PreparedOperation {
    pub payload: UnsignedPayload,
    pub amount: Option<String>,
    pub counterparty: Option<Address>,
}

impl MarketOperation {
    /// The contract method this operation invokes.
    pub fn method(&self) -> &'static str {
        match self {
            Self::AddListing(_) => "add_product",
            Self::AddRequest(_) => "add_request",
            Self::Purchase { .. } => "add_escrow",
            Self::ConfirmDelivery { .. } => "confirm_delivery",
            Self::AddDeliveryProof { .. } => "add_delivery",
        }
    }

    /// Default summary shown to the user when approving.
    pub fn describe(&self) -> String {
        match self {
            Self::AddListing(listing) => format!("Add listing: {}", listing.title),
            Self::AddRequest(request) => format!("Add request: {}", request.title),
            Self::Purchase { listing_id, amount } => {
                format!("Purchase listing {listing_id} for {amount}")
            }
            Self::ConfirmDelivery { escrow_id } => format!("Confirm delivery of escrow {escrow_id}"),
            Self::AddDeliveryProof { escrow_id, .. } => {
                format!("Add delivery proof to escrow {escrow_id}")
            }
        }
    }

    /// Builds the contract call for `owner`.
    ///
    /// Purchases are resolved against the cached listing to find the seller.
    pub(crate) fn prepare(
        &self,
        owner: &Address,
        settings: &SubmitSettings,
        cache: &MarketCache,
    ) -> Result<PreparedOperation, SubmitError> {
        let mut params = BTreeMap::new();
        let mut put = |name: &str, value: &str| {
            params.insert(name.to_string(), value.to_string());
        };
        let (amount, counterparty) = match self {
            Self::AddListing(listing) => {
                put("seller", owner.as_str());
                put("title", &listing.title);
                put("description", &listing.description);
                put("price", &listing.price);
                put("delivery_estimate", &listing.delivery_estimate);
                (Some(listing.price.clone()), None)
            }
            Self::AddRequest(request) => {
                put("requester", owner.as_str());
                put("title", &request.title);
                put("description", &request.description);
                put("max_price", &request.max_price);
                put("delivery_date", &request.delivery_date);
                (Some(request.max_price.clone()), None)
            }
            Self::Purchase { listing_id, amount } => {
                let listing = cache
                    .listing(listing_id)
                    .ok_or_else(|| SubmitError::UnknownListing(listing_id.clone()))?;
                put("buyer", owner.as_str());
                put("seller", listing.owner.as_str());
                put("listing_id", listing_id);
                put("amount", amount);
                (Some(amount.clone()), Some(listing.owner))
            }
            Self::ConfirmDelivery { escrow_id } => {
                put("buyer", owner.as_str());
                put("escrow_id", escrow_id);
                let escrow = cache.escrow(escrow_id);
                (escrow.as_ref().map(|e| e.amount.clone()), escrow.map(|e| e.seller))
            }
            Self::AddDeliveryProof { escrow_id, proof_hash } => {
                put("seller", owner.as_str());
                put("escrow_id", escrow_id);
                put("proof_hash", proof_hash);
                (None, cache.escrow(escrow_id).map(|e| e.buyer))
            }
        };
        let payload = UnsignedPayload {
            contract_id: settings.contract_id.clone(),
            method: self.method().to_string(),
            network: settings.network.network.clone(),
            fee: settings.fee,
            parameters: params,
        };
        Ok(PreparedOperation { payload, amount, counterparty })
    }

    /// The local effect of this operation once the ledger confirmed transaction `tx_hash`.
    pub(crate) fn optimistic_update(
        &self,
        owner: &Address,
        tx_hash: &str,
        prepared: &PreparedOperation,
    ) -> OptimisticUpdate {
        match self {
            Self::AddListing(listing) => OptimisticUpdate::Listing(DomainRecord {
                id: tx_hash.to_string(),
                kind: RecordKind::Listing,
                title: listing.title.clone(),
                description: listing.description.clone(),
                price: listing.price.clone(),
                owner: owner.clone(),
                status: LISTING_ACTIVE.to_string(),
                delivery_estimate: listing.delivery_estimate.clone(),
            }),
            Self::AddRequest(request) => OptimisticUpdate::Request(DomainRecord {
                id: tx_hash.to_string(),
                kind: RecordKind::Request,
                title: request.title.clone(),
                description: request.description.clone(),
                price: request.max_price.clone(),
                owner: owner.clone(),
                status: REQUEST_OPEN.to_string(),
                delivery_estimate: request.delivery_date.clone(),
            }),
            Self::Purchase { listing_id, amount } => OptimisticUpdate::Purchase {
                listing_id: listing_id.clone(),
                escrow: EscrowRecord {
                    id: tx_hash.to_string(),
                    listing_id: listing_id.clone(),
                    buyer: owner.clone(),
                    seller: prepared.counterparty.clone().unwrap_or_else(|| Address::new("")),
                    amount: amount.clone(),
                    status: EscrowStatus::Pending,
                    transaction_id: tx_hash.to_string(),
                    delivery_proof: None,
                },
            },
            Self::ConfirmDelivery { escrow_id } => OptimisticUpdate::Escrow {
                escrow_id: escrow_id.clone(),
                status: EscrowStatus::Completed,
                delivery_proof: None,
            },
            Self::AddDeliveryProof { escrow_id, proof_hash } => OptimisticUpdate::Escrow {
                escrow_id: escrow_id.clone(),
                status: EscrowStatus::Delivered,
                delivery_proof: Some(proof_hash.clone()),
            },
        }
    }
}
