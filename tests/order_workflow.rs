use std::sync::Arc;

use rust_decimal::Decimal;

use order_desk::api::{ApiError, InMemoryOrderApi};
use order_desk::domain::cod::{CodError, VerificationStatus};
use order_desk::domain::order::{
    NoteType, Order, OrderError, OrderId, OrderItem, OrderStatus, PaymentMethod,
};
use order_desk::metrics::Metrics;
use order_desk::workflow::{BulkAction, RecordingNotifier, RefreshSignal, Severity, WorkflowError};
use order_desk::OrderDesk;

const ACTOR: &str = "agent.kampala";

// ============================================================================
// Fixtures
// ============================================================================

fn order(id: u64, payment_method: PaymentMethod, status: OrderStatus) -> Order {
    let mut order = Order::new(
        OrderId(id),
        format!("SHO{id:03}"),
        "Nakato Sarah",
        payment_method,
        vec![OrderItem {
            product_name: "Matooke bunch".to_string(),
            quantity: 2,
            unit_price: Decimal::new(15_000, 0),
        }],
        Decimal::new(5_000, 0),
    );
    order.status = status;
    order
}

fn backend(orders: impl IntoIterator<Item = Order>) -> Arc<InMemoryOrderApi> {
    Arc::new(InMemoryOrderApi::with_actor(ACTOR).with_orders(orders))
}

fn desk(api: &Arc<InMemoryOrderApi>) -> (OrderDesk, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let desk = OrderDesk::new(
        api.clone(),
        notifier.clone(),
        Arc::new(Metrics::new().unwrap()),
        ACTOR,
        20,
    );
    (desk, notifier)
}

// ============================================================================
// Status transitions
// ============================================================================

#[tokio::test]
async fn test_confirm_pending_cod_order_leaves_verification_pending() {
    let sho001 = order(1, PaymentMethod::CashOnDelivery, OrderStatus::Pending);
    let api = backend([sho001.clone()]);
    let (desk, _) = desk(&api);

    let confirmed = desk.confirm(&sho001).await.unwrap();

    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    assert!(confirmed.confirmed_at.is_some());
    assert_eq!(confirmed.cod_status(), Some(VerificationStatus::Pending));
    assert_eq!(confirmed.status_history.len(), 1);
    assert_eq!(confirmed.status_history[0].previous_status, OrderStatus::Pending);
    assert_eq!(confirmed.status_history[0].changed_by, ACTOR);

    // the caller's copy is never patched
    assert_eq!(sho001.status, OrderStatus::Pending);
    assert_eq!(api.snapshot(OrderId(1)).unwrap(), confirmed);
}

#[tokio::test]
async fn test_terminal_orders_reject_every_target_without_network() {
    let orders: Vec<Order> = [OrderStatus::Delivered, OrderStatus::Cancelled, OrderStatus::Refunded]
        .into_iter()
        .enumerate()
        .map(|(i, status)| order(i as u64 + 1, PaymentMethod::MtnMomo, status))
        .collect();
    let api = backend(orders.clone());
    let (desk, notifier) = desk(&api);

    for order in &orders {
        for target in OrderStatus::ALL {
            let err = desk.request_transition(order, target, None).await.unwrap_err();
            assert!(matches!(
                err,
                WorkflowError::Order(OrderError::InvalidTransition { from, to })
                    if from == order.status && to == target
            ));
        }
    }

    assert_eq!(api.request_count(), 0);
    assert_eq!(notifier.count(Severity::Error), orders.len() * OrderStatus::ALL.len());
}

#[tokio::test]
async fn test_happy_path_appends_one_history_entry_per_step() {
    let api = backend([order(1, PaymentMethod::AirtelMoney, OrderStatus::Pending)]);
    let (desk, _) = desk(&api);

    let mut current = desk.fetch_order(OrderId(1)).await.unwrap();
    for target in [
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ] {
        let previous_history = current.status_history.clone();
        let next = desk.request_transition(&current, target, Some("on schedule")).await.unwrap();

        assert_eq!(next.status, target);
        assert_eq!(next.status_history.len(), previous_history.len() + 1);
        assert_eq!(&next.status_history[..previous_history.len()], &previous_history[..]);

        let last = next.status_history.last().unwrap();
        assert_eq!(last.previous_status, current.status);
        assert_eq!(last.new_status, target);
        assert_eq!(last.notes.as_deref(), Some("on schedule"));
        current = next;
    }

    assert!(current.delivered_at.is_some());
    assert!(current.is_terminal());
}

#[tokio::test]
async fn test_cancel_from_every_non_terminal_status() {
    let statuses = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::OutForDelivery,
    ];
    let orders: Vec<Order> = statuses
        .into_iter()
        .enumerate()
        .map(|(i, status)| order(i as u64 + 1, PaymentMethod::MtnMomo, status))
        .collect();
    let api = backend(orders.clone());
    let (desk, _) = desk(&api);

    for order in &orders {
        let cancelled = desk.cancel(order, Some("customer changed mind")).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
    }
}

#[tokio::test]
async fn test_pending_to_delivered_fails_and_notifies() {
    let pending = order(1, PaymentMethod::CashOnDelivery, OrderStatus::Pending);
    let api = backend([pending.clone()]);
    let (desk, notifier) = desk(&api);

    let err = desk.mark_delivered(&pending).await.unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Order(OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Delivered
        })
    ));
    assert_eq!(api.request_count(), 0);
    assert_eq!(api.snapshot(OrderId(1)).unwrap().status, OrderStatus::Pending);

    let (message, severity) = notifier.last().unwrap();
    assert_eq!(severity, Severity::Error);
    assert!(message.contains("SHO001"));
}

#[tokio::test]
async fn test_backend_failure_is_notified_and_returned() {
    let confirmed = order(2, PaymentMethod::MtnMomo, OrderStatus::Confirmed);
    let api = backend([confirmed.clone()]);
    api.fail_mutations_for(OrderId(2), 500, r#"{"detail": "database unavailable"}"#);
    let (desk, notifier) = desk(&api);

    let err = desk
        .request_transition(&confirmed, OrderStatus::Processing, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Api(ApiError::Server { status: 500, ref message }) if message == "database unavailable"
    ));
    assert_eq!(notifier.last().unwrap().1, Severity::Error);
    assert_eq!(api.snapshot(OrderId(2)).unwrap().status, OrderStatus::Confirmed);
    assert_eq!(
        desk.metrics()
            .order_transition_failures
            .with_label_values(&["server"])
            .get(),
        1
    );
}

#[tokio::test]
async fn test_busy_order_rejects_second_mutation() {
    let pending = order(1, PaymentMethod::MtnMomo, OrderStatus::Pending);
    let api = backend([pending.clone()]);
    let (desk, _) = desk(&api);

    let guard = desk.in_flight().acquire(OrderId(1)).unwrap();
    let err = desk.confirm(&pending).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Busy(OrderId(1))));
    assert_eq!(api.request_count(), 0);

    drop(guard);
    assert!(desk.confirm(&pending).await.is_ok());
    assert!(desk.in_flight().is_empty());
}

#[tokio::test]
async fn test_successful_transition_publishes_and_counts() {
    let pending = order(1, PaymentMethod::MtnMomo, OrderStatus::Pending);
    let api = backend([pending.clone()]);
    let (desk, _) = desk(&api);
    let mut signals = desk.bus().subscribe();

    desk.confirm(&pending).await.unwrap();

    assert_eq!(signals.recv().await.unwrap(), RefreshSignal::OrderChanged(OrderId(1)));
    assert_eq!(
        desk.metrics()
            .order_transitions
            .with_label_values(&["pending", "confirmed"])
            .get(),
        1
    );
}

// ============================================================================
// COD verification
// ============================================================================

#[tokio::test]
async fn test_verify_non_cod_fails_for_every_status() {
    let orders: Vec<Order> = OrderStatus::ALL
        .into_iter()
        .enumerate()
        .map(|(i, status)| order(i as u64 + 1, PaymentMethod::MtnMomo, status))
        .collect();
    let api = backend(orders.clone());
    let (desk, _) = desk(&api);

    for order in &orders {
        let err = desk.verify_cod(order, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Cod(CodError::NotCodOrder { .. })));
    }
    assert_eq!(api.request_count(), 0);
}

#[tokio::test]
async fn test_second_verify_fails() {
    let pending = order(1, PaymentMethod::CashOnDelivery, OrderStatus::Confirmed);
    let api = backend([pending.clone()]);
    let (desk, _) = desk(&api);

    let verified = desk.verify_cod(&pending, Some("Customer confirmed by phone")).await.unwrap();
    let verification = verified.cod_verification.as_ref().unwrap();
    assert_eq!(verification.verification_status, VerificationStatus::Verified);
    assert_eq!(verification.verified_by.as_deref(), Some(ACTOR));
    assert!(verification.verification_date.is_some());
    assert_eq!(verified.status, OrderStatus::Confirmed);

    let err = desk.verify_cod(&verified, None).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Cod(CodError::AlreadyVerified {
            current: VerificationStatus::Verified
        })
    ));

    // a stale copy passes the local check but the backend still refuses
    let err = desk.verify_cod(&pending, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Api(ApiError::Server { status: 400, .. })));
}

#[tokio::test]
async fn test_reject_requires_notes() {
    let pending = order(1, PaymentMethod::CashOnDelivery, OrderStatus::Pending);
    let api = backend([pending.clone()]);
    let (desk, _) = desk(&api);

    let err = desk.reject_cod(&pending, "  ").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Cod(CodError::EmptyRejectionNotes)));
    assert_eq!(api.request_count(), 0);

    let rejected = desk.reject_cod(&pending, "Number unreachable").await.unwrap();
    assert_eq!(rejected.cod_status(), Some(VerificationStatus::Rejected));
    assert_eq!(
        rejected.cod_verification.unwrap().verification_notes.as_deref(),
        Some("Number unreachable")
    );
    assert_eq!(rejected.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_mark_paid_after_verify() {
    let delivered = order(1, PaymentMethod::CashOnDelivery, OrderStatus::Delivered);
    let api = backend([delivered.clone()]);
    let (desk, _) = desk(&api);

    let err = desk.mark_cod_paid(&delivered).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Cod(CodError::InvalidTransition { .. })));

    let verified = desk.verify_cod(&delivered, None).await.unwrap();
    let paid = desk.mark_cod_paid(&verified).await.unwrap();
    assert_eq!(paid.cod_status(), Some(VerificationStatus::DeliveredPaid));
    let verification = paid.cod_verification.as_ref().unwrap();
    assert_eq!(verification.paid_by.as_deref(), Some(ACTOR));
    assert!(verification.paid_at.is_some());
    assert_eq!(
        desk.metrics()
            .cod_actions
            .with_label_values(&["mark_paid", "success"])
            .get(),
        1
    );
}

// ============================================================================
// Notes
// ============================================================================

#[tokio::test]
async fn test_add_note() {
    let pending = order(1, PaymentMethod::MtnMomo, OrderStatus::Pending);
    let api = backend([pending.clone()]);
    let (desk, _) = desk(&api);

    let err = desk
        .add_note(&pending, NoteType::General, "   ", false)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Order(OrderError::EmptyNote)));

    let noted = desk
        .add_note(&pending, NoteType::CustomerContact, " Called twice, no answer ", true)
        .await
        .unwrap();
    let note = noted.notes.last().unwrap();
    assert_eq!(note.note, "Called twice, no answer");
    assert_eq!(note.note_type, NoteType::CustomerContact);
    assert!(note.is_internal);
    assert_eq!(note.created_by, ACTOR);
}

// ============================================================================
// Bulk operations
// ============================================================================

#[tokio::test]
async fn test_bulk_with_one_cancelled_order() {
    let a = order(1, PaymentMethod::CashOnDelivery, OrderStatus::OutForDelivery);
    let b = order(2, PaymentMethod::MtnMomo, OrderStatus::Cancelled);
    let c = order(3, PaymentMethod::AirtelMoney, OrderStatus::OutForDelivery);
    let api = backend([a, b, c]);
    let (mut desk, notifier) = desk(&api);
    let action = BulkAction::parse("delivered", None).unwrap();

    let outcome = desk
        .apply_bulk(&[OrderId(1), OrderId(2), OrderId(3)], &action)
        .await
        .unwrap();

    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.error_count, 1);
    assert!(outcome.get(OrderId(1)).unwrap().is_success());
    assert!(matches!(
        outcome.get(OrderId(2)).unwrap().error,
        Some(WorkflowError::Order(OrderError::InvalidTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::Delivered
        }))
    ));
    assert!(outcome.get(OrderId(3)).unwrap().is_success());

    assert_eq!(api.snapshot(OrderId(1)).unwrap().status, OrderStatus::Delivered);
    assert_eq!(api.snapshot(OrderId(2)).unwrap().status, OrderStatus::Cancelled);
    assert_eq!(api.snapshot(OrderId(3)).unwrap().status, OrderStatus::Delivered);

    assert_eq!(
        notifier.last(),
        Some(("updated 2 of 3 orders".to_string(), Severity::Warning))
    );
}

#[tokio::test]
async fn test_bulk_counts_server_failures_without_aborting() {
    let orders: Vec<Order> = (1..=6)
        .map(|id| order(id, PaymentMethod::MtnMomo, OrderStatus::Pending))
        .collect();
    let api = backend(orders);
    api.fail_mutations_for(OrderId(2), 500, "boom");
    api.fail_mutations_for(OrderId(5), 503, "maintenance");
    let (mut desk, _) = desk(&api);

    let ids: Vec<OrderId> = (1..=6).map(OrderId).collect();
    let outcome = desk
        .apply_bulk(&ids, &BulkAction::parse("confirmed", None).unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.success_count + outcome.error_count, ids.len());
    assert_eq!(outcome.error_count, 2);
    assert!(matches!(
        outcome.get(OrderId(5)).unwrap().error,
        Some(WorkflowError::Api(ApiError::Server { status: 503, .. }))
    ));
    assert_eq!(api.snapshot(OrderId(6)).unwrap().status, OrderStatus::Confirmed);
    assert_eq!(
        desk.metrics().bulk_items.with_label_values(&["failure"]).get(),
        2
    );
}

#[tokio::test]
async fn test_empty_bulk_fails_fast() {
    let api = backend([order(1, PaymentMethod::MtnMomo, OrderStatus::Pending)]);
    let (mut desk, _) = desk(&api);

    let err = desk
        .apply_bulk(&[], &BulkAction::parse("confirmed", None).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::EmptySelection));
    assert_eq!(api.request_count(), 0);
}

#[tokio::test]
async fn test_bulk_deduplicates_and_clears_selection() {
    let api = backend([
        order(1, PaymentMethod::CashOnDelivery, OrderStatus::Pending),
        order(2, PaymentMethod::CashOnDelivery, OrderStatus::Pending),
    ]);
    let (mut desk, notifier) = desk(&api);
    let mut signals = desk.bus().subscribe();

    desk.select(OrderId(2));
    desk.select(OrderId(1));
    desk.select(OrderId(2));
    assert_eq!(desk.selection(), &[OrderId(2), OrderId(1)]);

    let outcome = desk
        .apply_bulk(
            &[OrderId(2), OrderId(1), OrderId(2)],
            &BulkAction::VerifyCod { notes: None },
        )
        .await
        .unwrap();

    assert_eq!(outcome.total(), 2);
    assert_eq!(outcome.results[0].order_id, OrderId(2));
    assert!(desk.selection().is_empty());
    assert_eq!(
        notifier.last(),
        Some(("updated 2 of 2 orders".to_string(), Severity::Success))
    );

    let mut saw_bulk_completed = false;
    while let Ok(signal) = signals.try_recv() {
        if let RefreshSignal::BulkCompleted { operation_id, success_count, error_count } = signal {
            assert_eq!(operation_id, outcome.id);
            assert_eq!((success_count, error_count), (2, 0));
            saw_bulk_completed = true;
        }
    }
    assert!(saw_bulk_completed);
}

#[tokio::test]
async fn test_bulk_reject_without_notes_keeps_selection() {
    let orders: Vec<Order> = (1..=5)
        .map(|id| order(id, PaymentMethod::CashOnDelivery, OrderStatus::Pending))
        .collect();
    let api = backend(orders);
    let (mut desk, notifier) = desk(&api);
    let mut signals = desk.bus().subscribe();
    for id in 1..=5 {
        desk.select(OrderId(id));
    }

    let action = BulkAction::parse("reject_cod", None).unwrap();
    let err = desk.apply_bulk_to_selection(&action).await.unwrap_err();

    assert!(matches!(err, WorkflowError::Cod(CodError::EmptyRejectionNotes)));
    assert_eq!(api.request_count(), 0);
    assert_eq!(desk.selection().len(), 5);
    assert!(signals.try_recv().is_err());
    assert_eq!(notifier.last().map(|(_, severity)| severity), Some(Severity::Warning));
    assert_eq!(
        api.snapshot(OrderId(1)).unwrap().cod_status(),
        Some(VerificationStatus::Pending)
    );
}

#[tokio::test]
async fn test_toggle_then_bulk_on_selection() {
    let api = backend([
        order(1, PaymentMethod::CashOnDelivery, OrderStatus::Pending),
        order(2, PaymentMethod::CashOnDelivery, OrderStatus::Pending),
        order(3, PaymentMethod::CashOnDelivery, OrderStatus::Pending),
    ]);
    let (mut desk, notifier) = desk(&api);

    desk.toggle(OrderId(1));
    desk.toggle(OrderId(2));
    desk.toggle(OrderId(3));
    desk.toggle(OrderId(2));
    assert_eq!(desk.selection(), &[OrderId(1), OrderId(3)]);

    desk.deselect(OrderId(3));
    desk.toggle(OrderId(3));
    assert_eq!(desk.selection(), &[OrderId(1), OrderId(3)]);

    let action = BulkAction::parse("reject_cod", Some("Numbers unreachable".to_string())).unwrap();
    let outcome = desk.apply_bulk_to_selection(&action).await.unwrap();

    assert_eq!(outcome.total(), 2);
    assert_eq!(outcome.success_count, 2);
    assert!(desk.selection().is_empty());
    assert_eq!(
        api.snapshot(OrderId(3)).unwrap().cod_status(),
        Some(VerificationStatus::Rejected)
    );
    assert_eq!(
        api.snapshot(OrderId(2)).unwrap().cod_status(),
        Some(VerificationStatus::Pending)
    );
    assert_eq!(
        notifier.last(),
        Some(("updated 2 of 2 orders".to_string(), Severity::Success))
    );

    // an empty selection is refused before anything is sent
    let requests = api.request_count();
    let err = desk.apply_bulk_to_selection(&action).await.unwrap_err();
    assert!(matches!(err, WorkflowError::EmptySelection));
    assert_eq!(api.request_count(), requests);
}

#[tokio::test]
async fn test_unknown_bulk_action() {
    assert!(matches!(
        BulkAction::parse("refund-everything", None),
        Err(WorkflowError::UnknownAction(_))
    ));
}

// ============================================================================
// Order table
// ============================================================================

#[tokio::test]
async fn test_search_change_resets_page_and_keeps_filters() {
    let api = backend([order(1, PaymentMethod::CashOnDelivery, OrderStatus::Pending)]);
    let (mut desk, _) = desk(&api);

    desk.update_query(|q| {
        q.set_status(Some(OrderStatus::Pending));
        q.set_is_cod(Some(true));
        q.set_page(3);
    });
    desk.update_query(|q| q.set_search("SHO"));

    let query = desk.query();
    assert_eq!(query.page(), 1);
    assert_eq!(query.filters().status, Some(OrderStatus::Pending));
    assert_eq!(query.filters().is_cod, Some(true));
    assert_eq!(query.filters().search.as_deref(), Some("SHO"));
}

#[tokio::test]
async fn test_list_refreshes_after_mutation() {
    let pending = order(1, PaymentMethod::CashOnDelivery, OrderStatus::Pending);
    let api = backend([
        pending.clone(),
        order(2, PaymentMethod::MtnMomo, OrderStatus::Processing),
    ]);
    let (mut desk, _) = desk(&api);
    desk.update_query(|q| q.set_status(Some(OrderStatus::Pending)));

    let page = desk.list().await.unwrap();
    assert_eq!(page.count, 1);
    let requests = api.request_count();

    // nothing changed, the cached page is served
    desk.list().await.unwrap();
    assert_eq!(api.request_count(), requests);

    desk.confirm(&pending).await.unwrap();
    let page = desk.list().await.unwrap();
    assert_eq!(page.count, 0);

    desk.update_query(|q| q.set_status(None));
    desk.select_page();
    assert_eq!(desk.selection().len(), 0);
    let page = desk.list().await.unwrap();
    assert_eq!(page.count, 2);
    desk.select_page();
    assert_eq!(desk.selection().len(), 2);
}
