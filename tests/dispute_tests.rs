//! Dispute Integration Tests
//!
//! Opening a dispute freezes the escrow without moving money; resolution
//! routes the held funds as a full refund, a full release, or an explicit
//! partial split that always conserves the order amount.

mod common;

use common::*;
use pazar_core::disputes::{
    DisputeResolution, DisputeStatus, OpenDisputeRequest, ResolveDisputeRequest,
};
use pazar_core::orders::{CreateOrderRequest, Order, OrderStatus};
use pazar_core::state::AppState;
use pazar_core::users::{User, UserRole};
use pazar_core::wallet::{TxFilter, TxMeta, TxType};

struct DisputeFixture {
    buyer: User,
    seller: User,
    moderator: User,
    order: Order,
}

/// Buyer with 50 000 on deposit buys a 20 000 listing; the escrow is open
/// and ready to be disputed.
async fn escrowed_order(state: &AppState) -> DisputeFixture {
    let seller = seed_user(state, "seller", UserRole::Member).await;
    let buyer = seed_user(state, "buyer", UserRole::Member).await;
    let moderator = seed_user(state, "moderator", UserRole::Moderator).await;
    let listing = seed_listing(state, seller.id, "Mechanical keyboard", 20_000).await;
    fund_wallet(state, buyer.id, 50_000).await;

    let order = state
        .orders
        .create_order(buyer.id, CreateOrderRequest { listing_id: listing.id })
        .await
        .unwrap();

    DisputeFixture {
        buyer,
        seller,
        moderator,
        order,
    }
}

fn open_request(reason: &str) -> OpenDisputeRequest {
    OpenDisputeRequest {
        reason: reason.to_string(),
        note: None,
    }
}

fn resolve_request(resolution: DisputeResolution, buyer_amount: Option<i64>) -> ResolveDisputeRequest {
    ResolveDisputeRequest {
        resolution,
        buyer_amount,
        meta: None,
    }
}

// ============================================================================
// Opening Disputes
// ============================================================================

#[tokio::test]
async fn test_open_dispute_freezes_escrow_without_moving_funds() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;

    let dispute = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Item never arrived"))
        .await
        .unwrap();

    assert_eq!(dispute.status, DisputeStatus::Open);
    assert_eq!(dispute.order_id, fx.order.id);
    assert_eq!(dispute.opened_by, fx.buyer.id);
    assert_eq!(dispute.reason, "Item never arrived");

    let order = state.orders.get_order(fx.order.id, None).await.unwrap();
    assert_eq!(order.status, OrderStatus::Disputed);
    assert!(order.disputed_at.is_some());

    let wallet = state.wallets.get_or_create_wallet(fx.buyer.id).await.unwrap();
    assert_eq!(wallet.balance_available, 30_000);
    assert_eq!(wallet.balance_held, 20_000, "Opening a dispute moves no money");

    // The hold is the buyer's only ledger row beyond the funding deposit
    assert_eq!(ledger_count(&state, fx.buyer.id, None).await, 2);
}

#[tokio::test]
async fn test_open_dispute_notifies_staff() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let second_mod = seed_user(&state, "second_mod", UserRole::Admin).await;

    state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Item never arrived"))
        .await
        .unwrap();

    assert_eq!(notification_count(&state, fx.moderator.id).await, 1);
    assert_eq!(notification_count(&state, second_mod.id).await, 1);
}

#[tokio::test]
async fn test_open_dispute_buyer_only() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let stranger = seed_user(&state, "stranger", UserRole::Member).await;

    for impostor in [fx.seller.id, stranger.id, fx.moderator.id] {
        let err = state
            .disputes
            .open_dispute(fx.order.id, impostor, open_request("Not my call"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    let order = state.orders.get_order(fx.order.id, None).await.unwrap();
    assert_eq!(order.status, OrderStatus::PendingDelivery);
}

#[tokio::test]
async fn test_open_dispute_requires_pending_delivery() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    state
        .orders
        .confirm_delivery(fx.order.id, fx.buyer.id)
        .await
        .unwrap();

    let err = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Changed my mind"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_STATE");
}

#[tokio::test]
async fn test_open_dispute_twice_rejected() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;

    state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Item never arrived"))
        .await
        .unwrap();

    let err = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Still never arrived"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT", "Second dispute is a duplicate");
}

#[tokio::test]
async fn test_open_dispute_rejects_too_short_reason() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;

    let err = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("no"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    let order = state.orders.get_order(fx.order.id, None).await.unwrap();
    assert_eq!(order.status, OrderStatus::PendingDelivery);
}

// ============================================================================
// Resolution Access Control
// ============================================================================

#[tokio::test]
async fn test_resolution_requires_staff_role() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let dispute = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Item never arrived"))
        .await
        .unwrap();

    let err = state
        .disputes
        .resolve_dispute(
            dispute.id,
            fx.buyer.id,
            resolve_request(DisputeResolution::RefundBuyer, None),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");

    let dispute = state.disputes.get_dispute(dispute.id).await.unwrap();
    assert_eq!(dispute.status, DisputeStatus::Open);
}

// ============================================================================
// Resolution Outcomes
// ============================================================================

#[tokio::test]
async fn test_full_refund_returns_held_funds_to_buyer() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let dispute = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Item never arrived"))
        .await
        .unwrap();

    let dispute = state
        .disputes
        .resolve_dispute(
            dispute.id,
            fx.moderator.id,
            resolve_request(DisputeResolution::RefundBuyer, None),
        )
        .await
        .unwrap();

    assert_eq!(dispute.status, DisputeStatus::Resolved);
    assert_eq!(dispute.resolution, Some(DisputeResolution::RefundBuyer));
    assert_eq!(dispute.resolved_by, Some(fx.moderator.id));
    assert!(dispute.resolved_at.is_some());

    let order = state.orders.get_order(fx.order.id, None).await.unwrap();
    assert_eq!(order.status, OrderStatus::Refunded);

    let buyer_wallet = state.wallets.get_or_create_wallet(fx.buyer.id).await.unwrap();
    assert_eq!(buyer_wallet.balance_available, 50_000);
    assert_eq!(buyer_wallet.balance_held, 0);

    let seller_wallet = state.wallets.get_or_create_wallet(fx.seller.id).await.unwrap();
    assert_eq!(seller_wallet.balance_available, 0);

    assert!(conversation_locked(&state, fx.order.id).await);
    assert_eq!(total_in_system(&state).await, 50_000);
}

#[tokio::test]
async fn test_full_release_pays_seller() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let dispute = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Item never arrived"))
        .await
        .unwrap();

    state
        .disputes
        .resolve_dispute(
            dispute.id,
            fx.moderator.id,
            resolve_request(DisputeResolution::ReleaseSeller, None),
        )
        .await
        .unwrap();

    let order = state.orders.get_order(fx.order.id, None).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);

    let buyer_wallet = state.wallets.get_or_create_wallet(fx.buyer.id).await.unwrap();
    assert_eq!(buyer_wallet.balance_available, 30_000);
    assert_eq!(buyer_wallet.balance_held, 0);

    let seller_wallet = state.wallets.get_or_create_wallet(fx.seller.id).await.unwrap();
    assert_eq!(seller_wallet.balance_available, 20_000);
}

#[tokio::test]
async fn test_partial_resolution_splits_the_escrow() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let dispute = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Arrived damaged"))
        .await
        .unwrap();

    state
        .disputes
        .resolve_dispute(
            dispute.id,
            fx.moderator.id,
            resolve_request(DisputeResolution::Partial, Some(5_000)),
        )
        .await
        .unwrap();

    let order = state.orders.get_order(fx.order.id, None).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);

    let buyer_wallet = state.wallets.get_or_create_wallet(fx.buyer.id).await.unwrap();
    assert_eq!(buyer_wallet.balance_available, 35_000);
    assert_eq!(buyer_wallet.balance_held, 0);

    let seller_wallet = state.wallets.get_or_create_wallet(fx.seller.id).await.unwrap();
    assert_eq!(seller_wallet.balance_available, 15_000);

    assert_eq!(
        total_in_system(&state).await,
        50_000,
        "Split must conserve total funds"
    );

    // Ledger shape: refund to the buyer, release out, deposit to the seller
    assert_eq!(ledger_count(&state, fx.buyer.id, Some("refund")).await, 1);
    assert_eq!(ledger_count(&state, fx.buyer.id, Some("release")).await, 1);
    assert_eq!(ledger_count(&state, fx.seller.id, Some("deposit")).await, 1);
}

#[tokio::test]
async fn test_partial_resolution_meta_records_the_split() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let dispute = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Arrived damaged"))
        .await
        .unwrap();

    let resolved = state
        .disputes
        .resolve_dispute(
            dispute.id,
            fx.moderator.id,
            resolve_request(DisputeResolution::Partial, Some(5_000)),
        )
        .await
        .unwrap();

    let filter = TxFilter {
        tx_type: Some(TxType::Refund),
        ..Default::default()
    };
    let page = state
        .wallets
        .list_transactions(fx.buyer.id, filter)
        .await
        .unwrap();
    match page.data[0].meta.clone().expect("refund should carry meta").0 {
        TxMeta::DisputeResolution {
            dispute_id,
            order_id,
            buyer_amount,
            seller_amount,
        } => {
            assert_eq!(dispute_id, dispute.id);
            assert_eq!(order_id, fx.order.id);
            assert_eq!(buyer_amount, 5_000);
            assert_eq!(seller_amount, 15_000);
        }
        other => panic!("Expected dispute resolution meta, got {:?}", other),
    }

    // The dispute row itself records the exact split even though the
    // resolver supplied no meta of their own
    let meta = resolved.meta.expect("resolved dispute should carry meta").0;
    assert_eq!(meta["buyer_amount"], 5_000);
    assert_eq!(meta["seller_amount"], 15_000);

    let persisted = state.disputes.get_dispute(dispute.id).await.unwrap();
    let meta = persisted.meta.expect("persisted dispute should carry meta").0;
    assert_eq!(meta["buyer_amount"], 5_000);
    assert_eq!(meta["seller_amount"], 15_000);
}

#[tokio::test]
async fn test_partial_requires_amount_strictly_inside_the_order() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let dispute = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Arrived damaged"))
        .await
        .unwrap();

    let bad_requests = [
        resolve_request(DisputeResolution::Partial, None),
        resolve_request(DisputeResolution::Partial, Some(0)),
        resolve_request(DisputeResolution::Partial, Some(-1)),
        resolve_request(DisputeResolution::Partial, Some(20_000)),
        resolve_request(DisputeResolution::Partial, Some(25_000)),
    ];
    for request in bad_requests {
        let err = state
            .disputes
            .resolve_dispute(dispute.id, fx.moderator.id, request)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    // Rejected splits touch nothing
    let dispute = state.disputes.get_dispute(dispute.id).await.unwrap();
    assert_eq!(dispute.status, DisputeStatus::Open);

    let order = state.orders.get_order(fx.order.id, None).await.unwrap();
    assert_eq!(order.status, OrderStatus::Disputed);

    let wallet = state.wallets.get_or_create_wallet(fx.buyer.id).await.unwrap();
    assert_eq!(wallet.balance_held, 20_000);
}

#[tokio::test]
async fn test_resolve_twice_rejected_without_double_payout() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let dispute = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Item never arrived"))
        .await
        .unwrap();

    state
        .disputes
        .resolve_dispute(
            dispute.id,
            fx.moderator.id,
            resolve_request(DisputeResolution::RefundBuyer, None),
        )
        .await
        .unwrap();

    let err = state
        .disputes
        .resolve_dispute(
            dispute.id,
            fx.moderator.id,
            resolve_request(DisputeResolution::ReleaseSeller, None),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_STATE");

    let buyer_wallet = state.wallets.get_or_create_wallet(fx.buyer.id).await.unwrap();
    assert_eq!(buyer_wallet.balance_available, 50_000);

    let seller_wallet = state.wallets.get_or_create_wallet(fx.seller.id).await.unwrap();
    assert_eq!(seller_wallet.balance_available, 0, "No second payout");
}

#[tokio::test]
async fn test_resolution_notifies_both_parties() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let dispute = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Item never arrived"))
        .await
        .unwrap();

    let buyer_before = notification_count(&state, fx.buyer.id).await;
    let seller_before = notification_count(&state, fx.seller.id).await;

    state
        .disputes
        .resolve_dispute(
            dispute.id,
            fx.moderator.id,
            resolve_request(DisputeResolution::Partial, Some(5_000)),
        )
        .await
        .unwrap();

    assert_eq!(notification_count(&state, fx.buyer.id).await, buyer_before + 1);
    assert_eq!(notification_count(&state, fx.seller.id).await, seller_before + 1);
}

// ============================================================================
// Lookup
// ============================================================================

#[tokio::test]
async fn test_get_dispute() {
    let (state, _dir) = setup_state().await;
    let fx = escrowed_order(&state).await;
    let dispute = state
        .disputes
        .open_dispute(fx.order.id, fx.buyer.id, open_request("Item never arrived"))
        .await
        .unwrap();

    let fetched = state.disputes.get_dispute(dispute.id).await.unwrap();
    assert_eq!(fetched.id, dispute.id);

    let err = state
        .disputes
        .get_dispute(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}
