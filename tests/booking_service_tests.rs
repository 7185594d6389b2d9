//! Tests de integración del core de reservas sobre el almacén en memoria

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use boat_marketplace::config::environment::EnvironmentConfig;
use boat_marketplace::models::boat::{
    BlockReason, Boat, BoatCapacity, BoatLocation, BoatPricing, BoatType, NewBoat, ServiceOffer,
};
use boat_marketplace::models::booking::{
    BoatCondition, Booking, BookingStatus, CancelledBy, Participants,
};
use boat_marketplace::models::user::{Actor, User, UserRole};
use boat_marketplace::repositories::{
    BoatRepository, BookingParty, BookingRepository, InMemoryStore, UserRepository,
};
use boat_marketplace::services::boat_service::BoatRemoval;
use boat_marketplace::services::booking_service::{BookingRequest, ServiceSelection};
use boat_marketplace::services::booking_state_machine::{
    BookingStateMachine, BookingTransition, CheckInData, CheckOutData, LedgerEffect,
};
use boat_marketplace::state::AppState;
use boat_marketplace::utils::errors::AppError;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn create_user(state: &AppState, email: &str, role: UserRole) -> Actor {
    let user = User::new(
        email.to_string(),
        "not-a-real-hash".to_string(),
        "Test".to_string(),
        "User".to_string(),
        role,
    );
    state.users.insert(&user).await.expect("insert user");
    Actor::new(user.id, role)
}

fn pricing(daily: i64, weekly: Option<i64>, monthly: Option<i64>, cleaning: i64) -> BoatPricing {
    BoatPricing {
        daily_rate: Decimal::from(daily),
        weekly_rate: weekly.map(Decimal::from),
        monthly_rate: monthly.map(Decimal::from),
        security_deposit: Decimal::from(500),
        cleaning_fee: Decimal::from(cleaning),
        currency: "EUR".to_string(),
    }
}

async fn create_boat(state: &AppState, owner: Actor, pricing: BoatPricing, max_people: i32) -> Boat {
    state
        .boat_service
        .create_boat(
            owner,
            NewBoat {
                name: "Belle Île".to_string(),
                description: Some("Voilier familial".to_string()),
                boat_type: BoatType::Sailboat,
                location: BoatLocation {
                    city: "La Rochelle".to_string(),
                    port: Some("Port des Minimes".to_string()),
                },
                capacity: BoatCapacity { max_people },
                pricing,
                additional_services: vec![ServiceOffer {
                    name: "Paddle".to_string(),
                    price: Decimal::from(20),
                }],
            },
        )
        .await
        .expect("create boat")
}

fn request(boat_id: Uuid, start: NaiveDate, end: NaiveDate, adults: i32) -> BookingRequest {
    BookingRequest {
        boat_id,
        start_date: start,
        end_date: end,
        participants: Participants {
            adults,
            children: 0,
        },
        emergency_contact: None,
        renter_experience: None,
        special_requests: None,
        skipper_requested: false,
        services: Vec::new(),
    }
}

struct Fixture {
    state: AppState,
    store: Arc<InMemoryStore>,
    owner: Actor,
    renter: Actor,
    boat: Boat,
}

async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::new(
        EnvironmentConfig::default(),
        store.clone(),
        store.clone(),
        store.clone(),
    );
    let owner = create_user(&state, "owner@example.com", UserRole::Owner).await;
    let renter = create_user(&state, "renter@example.com", UserRole::Renter).await;
    let boat = create_boat(&state, owner, pricing(100, Some(600), Some(2000), 50), 6).await;
    Fixture {
        state,
        store,
        owner,
        renter,
        boat,
    }
}

async fn completed_booking(f: &Fixture) -> Booking {
    let service = &f.state.booking_service;
    let start = today() + Duration::days(3);
    let booking = service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(2), 2))
        .await
        .expect("create");
    service
        .confirm_booking(f.owner, booking.id)
        .await
        .expect("confirm");
    service
        .record_payment(booking.id, Some("pi_123".to_string()))
        .await
        .expect("pay");
    service
        .check_in(
            f.owner,
            booking.id,
            CheckInData {
                boat_condition: BoatCondition::Excellent,
                fuel_level: 100,
                notes: None,
            },
        )
        .await
        .expect("check in");
    service
        .check_out(
            f.owner,
            booking.id,
            CheckOutData {
                boat_condition: BoatCondition::Good,
                fuel_level: 60,
                damages: Vec::new(),
                notes: Some("RAS".to_string()),
            },
        )
        .await
        .expect("check out")
}

async fn stored_boat(f: &Fixture) -> Boat {
    BoatRepository::find_by_id(f.store.as_ref(), f.boat.id)
        .await
        .expect("load")
        .expect("boat")
}

fn booked_periods(boat: &Boat) -> Vec<(NaiveDate, NaiveDate)> {
    boat.unavailable_periods
        .iter()
        .filter(|p| p.reason == BlockReason::Booked)
        .map(|p| (p.start_date, p.end_date))
        .collect()
}

#[tokio::test]
async fn test_overlapping_booking_is_rejected_and_ledger_stays_disjoint() {
    let f = fixture().await;
    let service = &f.state.booking_service;
    let start = today() + Duration::days(10);

    service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(4), 2))
        .await
        .expect("first booking");

    // Mismo día de fin e inicio: el solapamiento es inclusivo
    let touching = service
        .create_booking(
            f.renter,
            request(
                f.boat.id,
                start + Duration::days(4),
                start + Duration::days(6),
                2,
            ),
        )
        .await;
    assert!(matches!(touching, Err(AppError::Conflict(_))));

    let later = service
        .create_booking(
            f.renter,
            request(
                f.boat.id,
                start + Duration::days(5),
                start + Duration::days(7),
                2,
            ),
        )
        .await
        .expect("disjoint booking");

    let (_, _) = service
        .cancel_booking(f.renter, later.id, None)
        .await
        .expect("cancel");
    service
        .create_booking(
            f.renter,
            request(
                f.boat.id,
                start + Duration::days(5),
                start + Duration::days(7),
                2,
            ),
        )
        .await
        .expect("dates released after cancel");

    let boat = f
        .state
        .boat_service
        .get_boat(Some(f.owner), f.boat.id)
        .await
        .expect("boat");
    let periods = booked_periods(&boat);
    assert_eq!(periods.len(), 2);
    for (i, a) in periods.iter().enumerate() {
        for b in periods.iter().skip(i + 1) {
            assert!(a.1 < b.0 || b.1 < a.0, "{:?} overlaps {:?}", a, b);
        }
    }
}

#[tokio::test]
async fn test_concurrent_requests_reserve_once() {
    let f = fixture().await;
    let start = today() + Duration::days(20);
    let mut handles = Vec::new();

    for i in 0..8 {
        let renter = create_user(&f.state, &format!("racer{}@example.com", i), UserRole::Renter).await;
        let service = Arc::clone(&f.state.booking_service);
        let req = request(f.boat.id, start, start + Duration::days(3), 1);
        handles.push(tokio::spawn(async move {
            service.create_booking(renter, req).await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn test_lifecycle_history_follows_allowed_edges() {
    let f = fixture().await;
    let booking = completed_booking(&f).await;

    assert_eq!(booking.status, BookingStatus::Completed);
    let mut previous = BookingStatus::Pending;
    for change in &booking.status_history {
        assert!(
            BookingStateMachine::can_transition(previous, change.status),
            "{} → {} is not an allowed edge",
            previous,
            change.status
        );
        previous = change.status;
    }
    assert_eq!(booking.status_history.len(), 4);

    // Terminada: no puede volver atrás
    let err = f
        .state
        .booking_service
        .confirm_booking(f.owner, booking.id)
        .await
        .expect_err("confirm after completion");
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            current: BookingStatus::Completed,
            requested: BookingStatus::Confirmed
        }
    ));
    let reloaded = f
        .state
        .booking_service
        .get_booking(f.renter, booking.id)
        .await
        .expect("reload");
    assert_eq!(reloaded.status, BookingStatus::Completed);

    let boat = f
        .state
        .boat_service
        .get_boat(None, f.boat.id)
        .await
        .expect("boat");
    assert_eq!(boat.stats.total_bookings, 1);
    assert_eq!(boat.stats.total_revenue, booking.pricing.total_amount);
}

#[tokio::test]
async fn test_check_in_requires_payment() {
    let f = fixture().await;
    let service = &f.state.booking_service;
    let start = today() + Duration::days(5);
    let booking = service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(1), 1))
        .await
        .expect("create");
    service
        .confirm_booking(f.owner, booking.id)
        .await
        .expect("confirm");

    let err = service
        .check_in(
            f.owner,
            booking.id,
            CheckInData {
                boat_condition: BoatCondition::Good,
                fuel_level: 80,
                notes: None,
            },
        )
        .await
        .expect_err("check in before payment");
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            current: BookingStatus::Confirmed,
            requested: BookingStatus::Active
        }
    ));
}

#[tokio::test]
async fn test_only_owner_confirms() {
    let f = fixture().await;
    let service = &f.state.booking_service;
    let start = today() + Duration::days(5);
    let booking = service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(1), 1))
        .await
        .expect("create");

    let err = service
        .confirm_booking(f.renter, booking.id)
        .await
        .expect_err("renter cannot confirm");
    assert!(matches!(err, AppError::Forbidden(_)));

    let stranger = create_user(&f.state, "stranger@example.com", UserRole::Renter).await;
    let err = service
        .get_booking(stranger, booking.id)
        .await
        .expect_err("stranger cannot view");
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_cancellation_fee_schedule_over_real_bookings() {
    let state = AppState::in_memory(EnvironmentConfig::default());
    let owner = create_user(&state, "owner@example.com", UserRole::Owner).await;
    let renter = create_user(&state, "renter@example.com", UserRole::Renter).await;
    // 1 día a 1000 sin limpieza: total 1000
    let boat = create_boat(&state, owner, pricing(1000, None, None, 0), 4).await;

    let cases = [(30, 0, 0), (29, 10, 100), (13, 25, 250), (6, 50, 500), (0, 100, 1000)];
    for (days_ahead, percentage, fee) in cases {
        let start = today() + Duration::days(days_ahead);
        let booking = state
            .booking_service
            .create_booking(renter, request(boat.id, start, start + Duration::days(1), 1))
            .await
            .expect("create");
        assert_eq!(booking.pricing.total_amount, Decimal::from(1000));

        let (cancelled, quote) = state
            .booking_service
            .cancel_booking(renter, booking.id, Some("Change of plans".to_string()))
            .await
            .expect("cancel");
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(quote.fee_percentage, percentage, "at {} days", days_ahead);
        assert_eq!(quote.cancellation_fee, Decimal::from(fee));
        assert_eq!(quote.refund_amount, Decimal::from(1000 - fee));
    }
}

#[tokio::test]
async fn test_ten_day_booking_uses_weekly_tier() {
    let f = fixture().await;
    let start = today() + Duration::days(40);
    let booking = f
        .state
        .booking_service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(10), 2))
        .await
        .expect("create");

    assert_eq!(booking.pricing.number_of_days, 10);
    assert_eq!(booking.pricing.subtotal, Decimal::from(900));
    assert_eq!(booking.pricing.total_amount, Decimal::from(950));
}

#[tokio::test]
async fn test_skipper_and_services_are_priced_from_catalog() {
    let f = fixture().await;
    let start = today() + Duration::days(40);
    let mut req = request(f.boat.id, start, start + Duration::days(2), 2);
    req.skipper_requested = true;
    req.services = vec![ServiceSelection {
        name: "paddle".to_string(),
        quantity: 2,
    }];

    let booking = f
        .state
        .booking_service
        .create_booking(f.renter, req)
        .await
        .expect("create");
    // 200 base + 50 limpieza + 300 skipper + 40 servicios
    assert_eq!(booking.pricing.total_amount, Decimal::from(590));

    let mut unknown = request(f.boat.id, start + Duration::days(5), start + Duration::days(6), 1);
    unknown.services = vec![ServiceSelection {
        name: "Jacuzzi".to_string(),
        quantity: 1,
    }];
    let err = f
        .state
        .booking_service
        .create_booking(f.renter, unknown)
        .await
        .expect_err("unknown service");
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_review_slots_are_independent_and_single_use() {
    let f = fixture().await;
    let booking = completed_booking(&f).await;
    let service = &f.state.booking_service;

    let reviewed = service
        .add_review(f.renter, booking.id, 5, Some("Superbe".to_string()))
        .await
        .expect("renter review");
    assert_eq!(reviewed.renter_review.as_ref().map(|r| r.rating), Some(5));
    assert!(reviewed.owner_review.is_none());

    let err = service
        .add_review(f.renter, booking.id, 4, None)
        .await
        .expect_err("second renter review");
    assert!(matches!(err, AppError::AlreadyReviewed(_)));

    let both = service
        .add_review(f.owner, booking.id, 4, None)
        .await
        .expect("owner review");
    assert_eq!(both.owner_review.as_ref().map(|r| r.rating), Some(4));
    assert_eq!(both.renter_review.as_ref().map(|r| r.rating), Some(5));

    let boat = f
        .state
        .boat_service
        .get_boat(None, f.boat.id)
        .await
        .expect("boat");
    assert_eq!(boat.rating.count, 1);
    assert_eq!(boat.rating.average(), Decimal::from(5));
}

#[tokio::test]
async fn test_review_requires_completed_booking() {
    let f = fixture().await;
    let start = today() + Duration::days(5);
    let booking = f
        .state
        .booking_service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(1), 1))
        .await
        .expect("create");

    let err = f
        .state
        .booking_service
        .add_review(f.renter, booking.id, 5, None)
        .await
        .expect_err("review on pending");
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_capacity_guard_writes_nothing() {
    let f = fixture().await;
    let start = today() + Duration::days(5);

    let err = f
        .state
        .booking_service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(2), 7))
        .await
        .expect_err("over capacity");
    assert!(matches!(err, AppError::Validation(_)));

    let bookings = f
        .state
        .booking_service
        .list_bookings(f.renter, BookingParty::Renter)
        .await
        .expect("list");
    assert!(bookings.is_empty());

    let boat = f
        .state
        .boat_service
        .get_boat(None, f.boat.id)
        .await
        .expect("boat");
    assert!(boat.unavailable_periods.is_empty());
}

#[tokio::test]
async fn test_owner_cannot_book_own_boat() {
    let f = fixture().await;
    let start = today() + Duration::days(5);
    let err = f
        .state
        .booking_service
        .create_booking(f.owner, request(f.boat.id, start, start + Duration::days(1), 1))
        .await
        .expect_err("self booking");
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_blocked_period_prevents_booking() {
    let f = fixture().await;
    let start = today() + Duration::days(15);
    f.state
        .boat_service
        .add_blocked_period(
            f.owner,
            f.boat.id,
            start,
            start + Duration::days(3),
            BlockReason::Maintenance,
        )
        .await
        .expect("block");

    let availability = f
        .state
        .booking_service
        .check_availability(f.boat.id, start + Duration::days(1), start + Duration::days(2))
        .await
        .expect("availability");
    assert!(!availability.available);
    assert!(availability.pricing.is_none());

    let err = f
        .state
        .booking_service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(1), 1))
        .await
        .expect_err("blocked");
    assert!(matches!(err, AppError::Conflict(_)));

    f.state
        .boat_service
        .remove_blocked_period(f.owner, f.boat.id, start, start + Duration::days(3))
        .await
        .expect("unblock");
    f.state
        .booking_service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(1), 1))
        .await
        .expect("free again");
}

#[tokio::test]
async fn test_stale_pending_bookings_expire_without_fee() {
    let f = fixture().await;
    let service = &f.state.booking_service;
    let start = today() + Duration::days(2);

    let stale = service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(1), 1))
        .await
        .expect("create");
    let confirmed = service
        .create_booking(
            f.renter,
            request(
                f.boat.id,
                start + Duration::days(3),
                start + Duration::days(4),
                1,
            ),
        )
        .await
        .expect("create");
    service
        .confirm_booking(f.owner, confirmed.id)
        .await
        .expect("confirm");

    let expired = service
        .expire_stale_pending(Utc::now() + chrono::Duration::seconds(1))
        .await
        .expect("sweep");
    assert_eq!(expired, 1);

    let stale = service.get_booking(f.renter, stale.id).await.expect("reload");
    assert_eq!(stale.status, BookingStatus::Cancelled);
    let cancellation = stale.cancellation.expect("cancellation data");
    assert_eq!(cancellation.cancellation_fee, Decimal::ZERO);
    assert_eq!(cancellation.refund_amount, stale.pricing.total_amount);

    let confirmed = service
        .get_booking(f.renter, confirmed.id)
        .await
        .expect("reload");
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let boat = f
        .state
        .boat_service
        .get_boat(None, f.boat.id)
        .await
        .expect("boat");
    assert_eq!(booked_periods(&boat).len(), 1);
}

#[tokio::test]
async fn test_delete_boat_without_bookings_removes_it() {
    let f = fixture().await;
    let outcome = f
        .state
        .boat_service
        .delete_boat(f.owner, f.boat.id, false)
        .await
        .expect("delete");
    assert_eq!(outcome, BoatRemoval::Deleted);

    let err = f
        .state
        .boat_service
        .get_boat(None, f.boat.id)
        .await
        .expect_err("gone");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_forced_delete_cancels_upcoming_bookings() {
    let f = fixture().await;
    let start = today() + Duration::days(5);
    let booking = f
        .state
        .booking_service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(2), 2))
        .await
        .expect("create");

    let soft = f
        .state
        .boat_service
        .delete_boat(f.owner, f.boat.id, false)
        .await
        .expect("soft delete");
    assert_eq!(
        soft,
        BoatRemoval::Deactivated {
            cancelled_bookings: 0
        }
    );
    let still_pending = f
        .state
        .booking_service
        .get_booking(f.renter, booking.id)
        .await
        .expect("reload");
    assert_eq!(still_pending.status, BookingStatus::Pending);

    // Oculto para el público, visible para su propietario
    assert!(f.state.boat_service.get_boat(None, f.boat.id).await.is_err());
    f.state
        .boat_service
        .restore_boat(f.owner, f.boat.id)
        .await
        .expect("restore");

    let forced = f
        .state
        .boat_service
        .delete_boat(f.owner, f.boat.id, true)
        .await
        .expect("forced delete");
    assert_eq!(
        forced,
        BoatRemoval::Deactivated {
            cancelled_bookings: 1
        }
    );

    let cancelled = f
        .state
        .booking_service
        .get_booking(f.renter, booking.id)
        .await
        .expect("reload");
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(
        cancelled.cancellation.map(|c| c.refund_amount),
        Some(cancelled.pricing.total_amount)
    );
}

#[tokio::test]
async fn test_renter_cannot_list_boats() {
    let f = fixture().await;
    let err = f
        .state
        .boat_service
        .create_boat(
            f.renter,
            NewBoat {
                name: "Pirate".to_string(),
                description: None,
                boat_type: BoatType::Rib,
                location: BoatLocation {
                    city: "Brest".to_string(),
                    port: None,
                },
                capacity: BoatCapacity { max_people: 4 },
                pricing: pricing(80, None, None, 0),
                additional_services: Vec::new(),
            },
        )
        .await
        .expect_err("renter");
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_huge_participant_counts_are_rejected() {
    let f = fixture().await;
    let start = today() + Duration::days(5);
    let mut req = request(f.boat.id, start, start + Duration::days(2), i32::MAX);
    req.participants.children = 1;

    let err = f
        .state
        .booking_service
        .create_booking(f.renter, req)
        .await
        .expect_err("over capacity");
    assert!(matches!(err, AppError::Validation(_)));

    let bookings = f
        .state
        .booking_service
        .list_bookings(f.renter, BookingParty::Renter)
        .await
        .expect("list");
    assert!(bookings.is_empty());
}

#[tokio::test]
async fn test_owner_unblock_never_releases_booked_dates() {
    let f = fixture().await;
    let start = today() + Duration::days(12);
    let end = start + Duration::days(2);
    f.state
        .booking_service
        .create_booking(f.renter, request(f.boat.id, start, end, 2))
        .await
        .expect("create");

    let err = f
        .state
        .boat_service
        .remove_blocked_period(f.owner, f.boat.id, start, end)
        .await
        .expect_err("booked range");
    assert!(matches!(err, AppError::Conflict(_)));

    // Aunque llegue con las mismas fechas, el borrado va acotado al motivo
    for reason in [BlockReason::OwnerBlocked, BlockReason::Maintenance, BlockReason::Booked] {
        let removed = f
            .store
            .remove_blocked_period(f.boat.id, start, end, reason)
            .await
            .expect("remove");
        assert_eq!(removed, 0, "{:?}", reason);
    }

    let boat = stored_boat(&f).await;
    assert_eq!(booked_periods(&boat), vec![(start, end)]);
}

#[tokio::test]
async fn test_cancellation_releases_only_its_own_booking() {
    let f = fixture().await;
    let service = &f.state.booking_service;
    let start = today() + Duration::days(30);

    let first = service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(2), 1))
        .await
        .expect("first");
    let second = service
        .create_booking(
            f.renter,
            request(f.boat.id, start + Duration::days(5), start + Duration::days(6), 1),
        )
        .await
        .expect("second");
    f.state
        .boat_service
        .add_blocked_period(
            f.owner,
            f.boat.id,
            start + Duration::days(10),
            start + Duration::days(12),
            BlockReason::OwnerBlocked,
        )
        .await
        .expect("block");

    service
        .cancel_booking(f.renter, first.id, None)
        .await
        .expect("cancel");

    let boat = stored_boat(&f).await;
    assert_eq!(
        booked_periods(&boat),
        vec![(second.start_date, second.end_date)]
    );
    assert!(boat
        .unavailable_periods
        .iter()
        .any(|p| p.reason == BlockReason::OwnerBlocked));
}

#[tokio::test]
async fn test_rejected_transition_leaves_ledger_untouched() {
    let f = fixture().await;
    let start = today() + Duration::days(8);
    let booking = f
        .state
        .booking_service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(2), 1))
        .await
        .expect("create");

    // Copia que cree estar en `confirmed` cuando la persistida sigue `pending`
    let mut stale = booking.clone();
    let transition = BookingTransition::Cancel {
        cancelled_by: CancelledBy::Renter,
        reason: None,
        today: today(),
        waive_fee: false,
    };
    let effect = BookingStateMachine::apply(&mut stale, transition, Some(f.renter.user_id), Utc::now())
        .expect("apply");
    assert!(matches!(effect, LedgerEffect::ReleasePeriod { .. }));

    let err = f
        .store
        .save_transition(&stale, BookingStatus::Confirmed, &effect)
        .await
        .expect_err("stale status");
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = BookingRepository::find_by_id(f.store.as_ref(), booking.id)
        .await
        .expect("load")
        .expect("booking");
    assert_eq!(stored.status, BookingStatus::Pending);
    let boat = stored_boat(&f).await;
    assert_eq!(booked_periods(&boat), vec![(booking.start_date, booking.end_date)]);
}

#[tokio::test]
async fn test_failed_revenue_effect_does_not_complete_booking() {
    let f = fixture().await;
    let service = &f.state.booking_service;
    let start = today() + Duration::days(4);
    let booking = service
        .create_booking(f.renter, request(f.boat.id, start, start + Duration::days(1), 1))
        .await
        .expect("create");
    service
        .record_payment(booking.id, None)
        .await
        .expect("pay");
    let active = service
        .check_in(
            f.owner,
            booking.id,
            CheckInData {
                boat_condition: BoatCondition::Good,
                fuel_level: 90,
                notes: None,
            },
        )
        .await
        .expect("check in");

    let mut finished = active.clone();
    let transition = BookingTransition::CheckOut(CheckOutData {
        boat_condition: BoatCondition::Good,
        fuel_level: 50,
        damages: Vec::new(),
        notes: None,
    });
    BookingStateMachine::apply(&mut finished, transition, Some(f.owner.user_id), Utc::now())
        .expect("apply");

    // El barco del efecto no existe: ni estadísticas ni cambio de estado
    let effect = LedgerEffect::RecordRevenue {
        boat_id: Uuid::new_v4(),
        amount: finished.pricing.total_amount,
        at: Utc::now(),
    };
    let err = f
        .store
        .save_transition(&finished, BookingStatus::Active, &effect)
        .await
        .expect_err("missing boat");
    assert!(matches!(err, AppError::NotFound(_)));

    let stored = BookingRepository::find_by_id(f.store.as_ref(), booking.id)
        .await
        .expect("load")
        .expect("booking");
    assert_eq!(stored.status, BookingStatus::Active);
    assert!(stored.check_out.is_none());
}

#[tokio::test]
async fn test_concurrent_reviews_write_once() {
    let f = fixture().await;
    let booking = completed_booking(&f).await;

    let mut handles = Vec::new();
    for rating in [5u8, 3, 4, 2] {
        let service = Arc::clone(&f.state.booking_service);
        let renter = f.renter;
        let booking_id = booking.id;
        handles.push(tokio::spawn(async move {
            service.add_review(renter, booking_id, rating, None).await
        }));
    }

    let mut written = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(_) => written += 1,
            Err(AppError::AlreadyReviewed(_)) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(written, 1);
    assert_eq!(rejected, 3);

    let boat = stored_boat(&f).await;
    assert_eq!(boat.rating.count, 1);
    let owner = UserRepository::find_by_id(f.store.as_ref(), f.owner.user_id)
        .await
        .expect("load")
        .expect("owner");
    assert_eq!(owner.rating.count, 1);
    assert_eq!(owner.rating.total, boat.rating.total);
}
