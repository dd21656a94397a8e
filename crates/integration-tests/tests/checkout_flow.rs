//! Checkout orchestration against in-memory collaborators.
//!
//! Every test drives a real `CheckoutOrchestrator` and `CartStore`; only the
//! backend, gateway and verifier are doubles.

#![allow(clippy::unwrap_used)]

use nutriio_core::{AddressId, OrderStatus, PaymentStatus, UserId};
use nutriio_integration_tests::{
    InMemoryPersistence, PersistenceCall, ScriptedGateway, SecretVerifier, ShopperScript,
    TEST_KEY_ID, UnavailableVerifier, manual_form, peanut_bar, ragi_cookies, saved_address,
    settings_serving,
};
use nutriio_storefront::cart::{CartStore, MemoryStorage};
use nutriio_storefront::checkout::{
    CheckoutError, CheckoutField, CheckoutForm, CheckoutOrchestrator, CheckoutOutcome,
    CheckoutRequest, CheckoutState, CheckoutView, FailedPayment,
};
use nutriio_storefront::models::Profile;
use rust_decimal::Decimal;

/// Two peanut bars and one pack of cookies: ₹560 of goods, 1000 g, ₹80 shipping.
fn scenario_cart() -> CartStore<MemoryStorage> {
    let mut cart = CartStore::open(MemoryStorage::new());
    cart.add_item(peanut_bar());
    cart.add_item(peanut_bar());
    cart.add_item(ragi_cookies());
    cart
}

fn manual_request(postal_code: &str) -> CheckoutRequest {
    CheckoutRequest {
        form: manual_form(postal_code),
        ..CheckoutRequest::default()
    }
}

// ============================================================================
// Cart totals
// ============================================================================

#[test]
fn test_scenario_cart_totals() {
    let cart = scenario_cart();
    let totals = cart.snapshot();

    assert_eq!(totals.total_items, 3);
    assert_eq!(totals.total_price, Decimal::from(560));
    assert_eq!(totals.total_weight_grams, 1000);
    assert_eq!(totals.shipping_cost, Decimal::from(80));
    assert_eq!(totals.grand_total, Decimal::from(640));
    assert_eq!(totals.payable_paise().unwrap(), 64_000);
}

#[test]
fn test_cart_survives_reopen() {
    let storage = MemoryStorage::new();
    {
        let mut cart = CartStore::open(storage.clone());
        cart.add_item(peanut_bar());
        cart.add_item(ragi_cookies());
        cart.update_quantity(&peanut_bar().id, 4);
    }

    let reopened = CartStore::open(storage);
    assert_eq!(reopened.item_quantity(&peanut_bar().id), 4);
    assert_eq!(reopened.total_items(), 5);
    assert_eq!(reopened.grand_total(), Decimal::from(1060));
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_empty_form_touches_nothing() {
    let persistence = InMemoryPersistence::new();
    let gateway = ScriptedGateway::paying("pay_unused");
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        gateway.clone(),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();

    let err = orchestrator
        .submit(&mut cart, &CheckoutRequest::default())
        .await
        .unwrap_err();

    let CheckoutError::Validation(errors) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    for field in [
        CheckoutField::FullName,
        CheckoutField::AddressLine1,
        CheckoutField::City,
        CheckoutField::PostalCode,
        CheckoutField::Email,
        CheckoutField::Phone,
    ] {
        assert!(errors.contains(field), "{field:?} not reported");
    }
    let CheckoutView::Checkout { message } = err.view() else {
        panic!("validation stays on checkout");
    };
    assert!(message.starts_with("Please fill in all required fields"));

    assert_eq!(orchestrator.state(), CheckoutState::Validating);
    assert!(persistence.calls().is_empty());
    assert!(gateway.order_requests().is_empty());
    assert_eq!(cart.total_items(), 3);
}

#[tokio::test]
async fn test_malformed_email_is_rejected() {
    let persistence = InMemoryPersistence::new();
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        ScriptedGateway::paying("pay_unused"),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();
    let request = CheckoutRequest {
        form: CheckoutForm {
            email: "asha-at-example".to_string(),
            ..manual_form("560001")
        },
        ..CheckoutRequest::default()
    };

    let err = orchestrator.submit(&mut cart, &request).await.unwrap_err();

    let CheckoutError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert!(errors.contains(CheckoutField::Email));
    assert_eq!(errors.missing().count(), 0);
    assert!(persistence.calls().is_empty());
}

#[tokio::test]
async fn test_empty_cart_is_refused() {
    let gateway = ScriptedGateway::paying("pay_unused");
    let mut orchestrator = CheckoutOrchestrator::new(
        InMemoryPersistence::new(),
        gateway.clone(),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = CartStore::open(MemoryStorage::new());

    let err = orchestrator
        .submit(&mut cart, &manual_request("560001"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert!(gateway.order_requests().is_empty());
}

// ============================================================================
// Payment outcomes
// ============================================================================

#[tokio::test]
async fn test_paid_checkout_records_order_and_clears_cart() {
    let persistence = InMemoryPersistence::new();
    let gateway = ScriptedGateway::paying("pay_29QQoUBi66xm2f");
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        gateway.clone(),
        SecretVerifier::default(),
        settings_serving(&["560001"]),
    );
    let storage = MemoryStorage::new();
    let mut cart = CartStore::open(storage.clone());
    cart.add_item(peanut_bar());
    cart.add_item(peanut_bar());
    cart.add_item(ragi_cookies());

    let outcome = orchestrator
        .submit(&mut cart, &manual_request("560001"))
        .await
        .unwrap();

    let CheckoutOutcome::Paid(paid) = &outcome else {
        panic!("expected a paid order, got {outcome:?}");
    };
    assert_eq!(paid.amount_paise, 64_000);
    assert_eq!(paid.payment_id.as_str(), "pay_29QQoUBi66xm2f");
    assert_eq!(paid.order.status, OrderStatus::Confirmed);
    assert_eq!(paid.order.payment_status, PaymentStatus::Paid);
    assert_eq!(
        paid.order.payment_id.as_ref().map(|p| p.as_str()),
        Some("pay_29QQoUBi66xm2f")
    );
    assert_eq!(outcome.view(), CheckoutView::Success);
    assert_eq!(orchestrator.state(), CheckoutState::Paid);

    // Cart is emptied, including what a fresh session would rehydrate.
    assert!(cart.is_empty());
    assert!(CartStore::open(storage).is_empty());

    assert_eq!(
        persistence.calls(),
        [
            PersistenceCall::GenerateOrderNumber,
            PersistenceCall::InsertOrder,
            PersistenceCall::InsertOrderItems,
            PersistenceCall::UpdateOrderStatus,
        ]
    );

    let inserted = persistence.inserted_orders();
    let header = inserted.first().unwrap();
    assert_eq!(header.status, OrderStatus::Pending);
    assert_eq!(header.payment_status, PaymentStatus::Pending);
    assert_eq!(header.total_amount, Decimal::from(640));
    assert_eq!(header.shipping_cost, Decimal::from(80));
    assert_eq!(header.customer_email, "asha@example.in");
    assert_eq!(header.shipping_address.country, "India");
    assert_eq!(
        header.razorpay_order_id.as_ref().map(|id| id.as_str()),
        Some("order_test_1")
    );

    let items = persistence.order_items();
    assert_eq!(items.len(), 2);
    let bars = items
        .iter()
        .find(|i| i.product_id == peanut_bar().id)
        .unwrap();
    assert_eq!(bars.quantity, 2);
    assert_eq!(bars.unit_price, Decimal::from(210));
    assert_eq!(bars.total_price, Decimal::from(420));

    let requests = gateway.order_requests();
    let order_request = requests.first().unwrap();
    assert_eq!(order_request.amount, 64_000);
    assert!(order_request.receipt.starts_with("receipt_"));

    let sessions = gateway.sessions();
    let session = sessions.first().unwrap();
    assert_eq!(session.key_id, TEST_KEY_ID);
    assert_eq!(session.description, "Healthy Food Products");
    assert_eq!(session.theme_color, "#ea580c");
    assert_eq!(session.prefill.name, "Asha Rao");
    assert_eq!(session.prefill.email, "asha@example.in");
}

#[tokio::test]
async fn test_dismissed_payment_keeps_cart() {
    let persistence = InMemoryPersistence::new();
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        ScriptedGateway::new(ShopperScript::Dismiss),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();

    let outcome = orchestrator
        .submit(&mut cart, &manual_request("560001"))
        .await
        .unwrap();

    assert_eq!(outcome, CheckoutOutcome::Failed(FailedPayment::Dismissed));
    assert!(matches!(outcome.view(), CheckoutView::Failure { .. }));
    assert_eq!(orchestrator.state(), CheckoutState::Failed);
    assert_eq!(cart.total_items(), 3);
    assert!(persistence.calls().is_empty());
    assert!(persistence.orders().is_empty());
}

#[tokio::test]
async fn test_declined_payment_keeps_cart() {
    let persistence = InMemoryPersistence::new();
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        ScriptedGateway::new(ShopperScript::Decline {
            reason: "BAD_REQUEST_ERROR: card declined".to_string(),
        }),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();

    let outcome = orchestrator
        .submit(&mut cart, &manual_request("560001"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        CheckoutOutcome::Failed(FailedPayment::Declined { ref reason }) if reason.contains("declined")
    ));
    assert_eq!(cart.total_items(), 3);
    assert!(persistence.orders().is_empty());
}

#[tokio::test]
async fn test_gateway_order_failure_shows_retry_message() {
    let mut orchestrator = CheckoutOrchestrator::new(
        InMemoryPersistence::new(),
        ScriptedGateway::rejecting_orders(),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();

    let err = orchestrator
        .submit(&mut cart, &manual_request("560001"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Gateway(_)));
    assert!(!err.money_may_have_moved());
    assert_eq!(
        err.view(),
        CheckoutView::Failure {
            message: "Unable to initiate payment. Please try again.".to_string()
        }
    );
    assert_eq!(orchestrator.state(), CheckoutState::Failed);
    assert_eq!(cart.total_items(), 3);
}

// ============================================================================
// Verification
// ============================================================================

#[tokio::test]
async fn test_forged_signature_never_confirms() {
    let persistence = InMemoryPersistence::new();
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        ScriptedGateway::new(ShopperScript::PayWithForgedSignature {
            payment_id: "pay_forged".to_string(),
        }),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();

    let err = orchestrator
        .submit(&mut cart, &manual_request("560001"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::SignatureRejected { ref payment_id } if payment_id.as_str() == "pay_forged"
    ));
    assert!(err.money_may_have_moved());
    assert!(persistence.orders().is_empty());
    assert_eq!(cart.total_items(), 3);
}

#[tokio::test]
async fn test_mismatched_order_reference_is_rejected() {
    let persistence = InMemoryPersistence::new();
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        ScriptedGateway::new(ShopperScript::PayForOtherOrder {
            order_id: "order_someone_else".to_string(),
            payment_id: "pay_other".to_string(),
        }),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();

    let err = orchestrator
        .submit(&mut cart, &manual_request("560001"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::OrderMismatch { .. }));
    assert!(persistence.calls().is_empty());
    assert_eq!(cart.total_items(), 3);
}

#[tokio::test]
async fn test_verifier_outage_writes_nothing() {
    let persistence = InMemoryPersistence::new();
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        ScriptedGateway::paying("pay_pending_check"),
        UnavailableVerifier,
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();

    let err = orchestrator
        .submit(&mut cart, &manual_request("560001"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::VerificationUnavailable { .. }));
    assert!(matches!(
        err.view(),
        CheckoutView::SupportContact { payment_id: Some(ref id), .. } if id.as_str() == "pay_pending_check"
    ));
    assert!(persistence.calls().is_empty());
}

#[tokio::test]
async fn test_recording_failure_after_payment_needs_support() {
    let persistence = InMemoryPersistence::new().failing_on(PersistenceCall::InsertOrderItems);
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        ScriptedGateway::paying("pay_captured"),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();

    let err = orchestrator
        .submit(&mut cart, &manual_request("560001"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::PaidButUnrecorded { ref payment_id, .. } if payment_id.as_str() == "pay_captured"
    ));
    assert_eq!(
        err.view(),
        CheckoutView::SupportContact {
            message: "Please contact support for assistance.".to_string(),
            payment_id: Some("pay_captured".into()),
        }
    );
    assert_eq!(orchestrator.state(), CheckoutState::Failed);

    // The header exists but was never confirmed; the cart is kept for support.
    let orders = persistence.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders.first().unwrap().status, OrderStatus::Pending);
    assert_eq!(cart.total_items(), 3);
}

// ============================================================================
// Saved addresses and WhatsApp routing
// ============================================================================

#[tokio::test]
async fn test_saved_address_uses_profile_email() {
    let user = UserId::new("2f6c1e0a-user");
    let persistence = InMemoryPersistence::new()
        .with_address(saved_address("addr-home", &user, "560025"))
        .with_profile(Profile {
            id: user.clone(),
            full_name: Some("Vikram I.".to_string()),
            email: Some("vikram@example.in".to_string()),
            phone: None,
        });
    let gateway = ScriptedGateway::paying("pay_saved");
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        gateway.clone(),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();
    let request = CheckoutRequest {
        user_id: Some(user),
        selected_address_id: Some(AddressId::new("addr-home")),
        form: CheckoutForm::default(),
    };

    let outcome = orchestrator.submit(&mut cart, &request).await.unwrap();

    assert!(matches!(outcome, CheckoutOutcome::Paid(_)));
    let inserted = persistence.inserted_orders();
    let header = inserted.first().unwrap();
    assert_eq!(header.customer_email, "vikram@example.in");
    assert_eq!(header.customer_name, "Vikram Iyer");
    assert_eq!(header.shipping_address.postal_code, "560025");
    assert_eq!(
        header.user_id.as_ref().map(|u| u.as_str()),
        Some("2f6c1e0a-user")
    );
    assert_eq!(
        persistence.calls().first(),
        Some(&PersistenceCall::ListAddresses)
    );
}

#[tokio::test]
async fn test_unknown_saved_address_is_a_validation_error() {
    let user = UserId::new("2f6c1e0a-user");
    let mut orchestrator = CheckoutOrchestrator::new(
        InMemoryPersistence::new(),
        ScriptedGateway::paying("pay_unused"),
        SecretVerifier::default(),
        settings_serving(&[]),
    );
    let mut cart = scenario_cart();
    let request = CheckoutRequest {
        user_id: Some(user),
        selected_address_id: Some(AddressId::new("addr-deleted")),
        form: CheckoutForm::default(),
    };

    let err = orchestrator.submit(&mut cart, &request).await.unwrap_err();

    let CheckoutError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert!(errors.contains(CheckoutField::SavedAddress));
    assert_eq!(orchestrator.state(), CheckoutState::Validating);
}

#[tokio::test]
async fn test_unserviceable_pincode_routes_to_whatsapp() {
    let persistence = InMemoryPersistence::new();
    let gateway = ScriptedGateway::paying("pay_unused");
    let mut orchestrator = CheckoutOrchestrator::new(
        persistence.clone(),
        gateway.clone(),
        SecretVerifier::default(),
        settings_serving(&["560001", "411001"]),
    );
    let mut cart = scenario_cart();

    let outcome = orchestrator
        .submit(&mut cart, &manual_request("194101"))
        .await
        .unwrap();

    let CheckoutOutcome::WhatsAppBooking(booking) = &outcome else {
        panic!("expected WhatsApp booking, got {outcome:?}");
    };
    assert_eq!(booking.destination, "919000012345");
    assert!(booking.url.starts_with("https://wa.me/919000012345?text="));
    assert!(booking.message.contains("Jaggery Peanut Bar x 2"));
    assert!(booking.message.contains("Total: ₹640"));
    assert_eq!(
        outcome.view(),
        CheckoutView::WhatsApp {
            url: booking.url.clone()
        }
    );
    assert_eq!(orchestrator.state(), CheckoutState::WhatsAppBooking);

    assert!(gateway.order_requests().is_empty());
    assert!(persistence.calls().is_empty());
    assert_eq!(cart.total_items(), 3);
}
