use super::*;

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::clock::FixedClock;
use crate::model::{NewUser, ReserveRequest};
use crate::store::MemoryStore;

fn tz() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

// 2025-03-10 is a Monday.
fn march(day: u32, h: u32, m: u32) -> DateTime<FixedOffset> {
    tz().with_ymd_and_hms(2025, 3, day, h, m, 0).unwrap()
}

fn setup(mode: Mode) -> (Engine, Arc<FixedClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(march(10, 7, 0)));
    let engine = Engine::new(store.clone(), store, clock.clone(), EngineConfig::new(mode));
    (engine, clock)
}

fn user() -> Requester {
    Requester {
        id: Ulid::new(),
        role: Role::User,
    }
}

fn admin() -> Requester {
    Requester {
        id: Ulid::new(),
        role: Role::Admin,
    }
}

fn recurring_req(day: &str, time: &str, washer: Option<&str>, dryer: Option<&str>) -> ReserveRequest {
    ReserveRequest {
        day: Some(day.into()),
        time: Some(time.into()),
        washing_machine: washer.map(Into::into),
        dryer_machine: dryer.map(Into::into),
        ..Default::default()
    }
}

fn dated_req(machine: &str, date: &str, start: &str, end: &str) -> ReserveRequest {
    ReserveRequest {
        machine: Some(machine.into()),
        date: Some(date.into()),
        time_start: Some(start.into()),
        time_end: Some(end.into()),
        ..Default::default()
    }
}

// ── try_reserve ──────────────────────────────────────────

#[tokio::test]
async fn reserve_recurring_accepted() {
    let (engine, _) = setup(Mode::Recurring);
    let anna = user();

    let saved = engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 1"), None), &anna)
        .await
        .unwrap();
    assert_eq!(saved.user_id, anna.id);

    let all = engine.list_reservations().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, saved.id);
}

#[tokio::test]
async fn fairness_rule_is_global_across_machines() {
    let (engine, _) = setup(Mode::Recurring);
    let anna = user();

    engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 1"), None), &anna)
        .await
        .unwrap();

    // Distinct day, slot and machine class — still one booking per user.
    let second = engine
        .try_reserve(&recurring_req("Monday", "9:00", None, Some("Dryer 1")), &anna)
        .await;
    assert!(matches!(second, Err(EngineError::DuplicateBooking)));
}

#[tokio::test]
async fn fairness_beats_overlap_in_priority() {
    let (engine, _) = setup(Mode::Recurring);
    let anna = user();

    engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 1"), None), &anna)
        .await
        .unwrap();

    // Anna re-requests her own exact slot: the fairness rejection fires
    // before the overlap check ever runs.
    let again = engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 1"), None), &anna)
        .await;
    assert!(matches!(again, Err(EngineError::DuplicateBooking)));
}

#[tokio::test]
async fn recurring_slot_taken() {
    let (engine, _) = setup(Mode::Recurring);

    engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 1"), None), &user())
        .await
        .unwrap();

    let taken = engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 1"), None), &user())
        .await;
    assert!(matches!(taken, Err(EngineError::SlotTaken)));

    // Neighbouring machine is free.
    engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 2"), None), &user())
        .await
        .unwrap();
}

#[tokio::test]
async fn recurring_validation_precedes_store_checks() {
    let (engine, _) = setup(Mode::Recurring);

    let missing = engine
        .try_reserve(&ReserveRequest::default(), &user())
        .await;
    assert!(matches!(missing, Err(EngineError::MissingFields(_))));

    let bad_day = engine
        .try_reserve(&recurring_req("Caturday", "8:00", Some("Washing 1"), None), &user())
        .await;
    assert!(matches!(bad_day, Err(EngineError::InvalidValue("day"))));
}

#[tokio::test]
async fn dated_end_to_end_printer_scenario() {
    let (engine, _) = setup(Mode::Dated);
    let a = user();
    let b = user();

    engine
        .try_reserve(&dated_req("Printer3D 1", "2025-03-10", "9:00", "10:00"), &a)
        .await
        .unwrap();

    let overlapping = engine
        .try_reserve(&dated_req("Printer3D 1", "2025-03-10", "9:30", "10:30"), &b)
        .await;
    assert!(matches!(overlapping, Err(EngineError::SlotTaken)));

    // Adjacent: ends exactly where the next begins.
    engine
        .try_reserve(&dated_req("Printer3D 1", "2025-03-10", "10:00", "11:00"), &b)
        .await
        .unwrap();

    let second_for_a = engine
        .try_reserve(&dated_req("Printer3D 2", "2025-03-12", "9:00", "10:00"), &a)
        .await;
    assert!(matches!(second_for_a, Err(EngineError::DuplicateBooking)));
}

#[tokio::test]
async fn dated_past_date_rejected_against_clock() {
    let (engine, clock) = setup(Mode::Dated);

    let past = engine
        .try_reserve(&dated_req("Printer3D 1", "2025-03-09", "9:00", "10:00"), &user())
        .await;
    assert!(matches!(past, Err(EngineError::PastDate)));

    // Move the clock forward a day and yesterday's "today" is now past.
    clock.set(march(11, 7, 0));
    let stale = engine
        .try_reserve(&dated_req("Printer3D 1", "2025-03-10", "9:00", "10:00"), &user())
        .await;
    assert!(matches!(stale, Err(EngineError::PastDate)));
}

// ── try_cancel ───────────────────────────────────────────

#[tokio::test]
async fn cancel_with_ample_lead_succeeds() {
    let (engine, clock) = setup(Mode::Recurring);
    let anna = user();

    // Monday 07:00 now; slot Monday 20:00.
    let saved = engine
        .try_reserve(&recurring_req("Monday", "20:00", Some("Washing 1"), None), &anna)
        .await
        .unwrap();
    clock.set(march(10, 7, 0));

    engine.try_cancel(saved.id, &anna).await.unwrap();
    assert!(engine.list_reservations().await.unwrap().is_empty());

    // Cancellation frees the fairness slot.
    engine
        .try_reserve(&recurring_req("Tuesday", "8:00", Some("Washing 1"), None), &anna)
        .await
        .unwrap();
}

#[tokio::test]
async fn cancel_lead_time_boundary() {
    let (engine, clock) = setup(Mode::Recurring);
    let anna = user();

    let saved = engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 1"), None), &anna)
        .await
        .unwrap();

    // Exactly 30 minutes of lead: rejected.
    clock.set(march(10, 7, 30));
    let at_limit = engine.try_cancel(saved.id, &anna).await;
    assert!(matches!(
        at_limit,
        Err(EngineError::TooLateToCancel { lead_minutes: 30 })
    ));

    // 31 minutes: allowed.
    clock.set(march(10, 7, 29));
    engine.try_cancel(saved.id, &anna).await.unwrap();
}

#[tokio::test]
async fn cancel_after_start_rejected() {
    let (engine, clock) = setup(Mode::Recurring);
    let anna = user();

    let saved = engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 1"), None), &anna)
        .await
        .unwrap();

    // Wednesday: the Monday slot projected onto the current week has passed.
    clock.set(march(12, 9, 0));
    let late = engine.try_cancel(saved.id, &anna).await;
    assert!(matches!(late, Err(EngineError::TooLateToCancel { .. })));
}

#[tokio::test]
async fn cancel_by_non_owner_denied() {
    let (engine, _) = setup(Mode::Dated);
    let owner = user();

    // Far in the future — ownership is still checked first.
    let saved = engine
        .try_reserve(&dated_req("Printer3D 1", "2025-06-01", "9:00", "10:00"), &owner)
        .await
        .unwrap();

    let denied = engine.try_cancel(saved.id, &user()).await;
    assert!(matches!(denied, Err(EngineError::PermissionDenied)));

    // Even an admin cannot use the owner path.
    let denied = engine.try_cancel(saved.id, &admin()).await;
    assert!(matches!(denied, Err(EngineError::PermissionDenied)));

    assert_eq!(engine.list_reservations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancel_unknown_reservation() {
    let (engine, _) = setup(Mode::Recurring);
    let result = engine.try_cancel(Ulid::new(), &user()).await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

// ── admin bulk clear ─────────────────────────────────────

#[tokio::test]
async fn clear_all_requires_admin() {
    let (engine, _) = setup(Mode::Recurring);
    engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 1"), None), &user())
        .await
        .unwrap();

    let denied = engine.clear_all_reservations(&user()).await;
    assert!(matches!(denied, Err(EngineError::PermissionDenied)));

    let cleared = engine.clear_all_reservations(&admin()).await.unwrap();
    assert_eq!(cleared, 1);
    assert!(engine.list_reservations().await.unwrap().is_empty());
}

// ── accounts ─────────────────────────────────────────────

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: Some(username.into()),
        email: Some(email.into()),
        name: None,
        role: Role::User,
    }
}

#[tokio::test]
async fn register_user_missing_fields() {
    let (engine, _) = setup(Mode::Recurring);

    // Absence is reported as missing, not as a too-short value.
    let no_username = NewUser {
        email: Some("bob@example.com".into()),
        ..Default::default()
    };
    let result = engine.register_user(no_username, None).await;
    assert!(matches!(result, Err(EngineError::MissingFields("username"))));

    let no_email = NewUser {
        username: Some("bob".into()),
        ..Default::default()
    };
    let result = engine.register_user(no_email, None).await;
    assert!(matches!(result, Err(EngineError::MissingFields("email"))));
}

#[tokio::test]
async fn register_user_validation() {
    let (engine, _) = setup(Mode::Recurring);

    let short = engine.register_user(new_user("ab", "ab@example.com"), None).await;
    assert!(matches!(short, Err(EngineError::InvalidValue(_))));

    let bad_mail = engine.register_user(new_user("carol", "not-an-email"), None).await;
    assert!(matches!(bad_mail, Err(EngineError::InvalidValue("email"))));

    let bad_mail = engine.register_user(new_user("carol", "carol@nodot"), None).await;
    assert!(matches!(bad_mail, Err(EngineError::InvalidValue("email"))));

    let ok = engine
        .register_user(new_user("carol", "carol@example.com"), None)
        .await
        .unwrap();
    assert_eq!(ok.username, "carol");
    assert_eq!(ok.role, Role::User);
}

#[tokio::test]
async fn register_user_uniqueness() {
    let (engine, _) = setup(Mode::Recurring);
    engine
        .register_user(new_user("dave", "dave@example.com"), None)
        .await
        .unwrap();

    let dup = engine
        .register_user(new_user("dave", "dave2@example.com"), None)
        .await;
    assert!(matches!(dup, Err(EngineError::AlreadyExists("username"))));
}

#[tokio::test]
async fn registration_can_be_admin_gated() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(march(10, 7, 0)));
    let mut config = EngineConfig::new(Mode::Recurring);
    config.registration_admin_only = true;
    let engine = Engine::new(store.clone(), store, clock, config);

    let anon = engine.register_user(new_user("eve", "eve@example.com"), None).await;
    assert!(matches!(anon, Err(EngineError::PermissionDenied)));

    let by_user = engine
        .register_user(new_user("eve", "eve@example.com"), Some(&user()))
        .await;
    assert!(matches!(by_user, Err(EngineError::PermissionDenied)));

    engine
        .register_user(new_user("eve", "eve@example.com"), Some(&admin()))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_user_cascades_reservations() {
    let (engine, _) = setup(Mode::Recurring);
    let account = engine
        .register_user(new_user("frank", "frank@example.com"), None)
        .await
        .unwrap();
    let frank = Requester {
        id: account.id,
        role: Role::User,
    };
    engine
        .try_reserve(&recurring_req("Monday", "8:00", Some("Washing 1"), None), &frank)
        .await
        .unwrap();

    let denied = engine.delete_user(account.id, &frank).await;
    assert!(matches!(denied, Err(EngineError::PermissionDenied)));

    engine.delete_user(account.id, &admin()).await.unwrap();
    assert!(engine.list_reservations().await.unwrap().is_empty());
    assert!(engine.list_users().await.unwrap().is_empty());

    let gone = engine.delete_user(account.id, &admin()).await;
    assert!(matches!(gone, Err(EngineError::NotFound(_))));
}

// ── machine registry ─────────────────────────────────────

#[tokio::test]
async fn machine_registration_is_admin_gated_and_unique() {
    let (engine, _) = setup(Mode::Recurring);

    let denied = engine.register_machine("Washing 1", &user());
    assert!(matches!(denied, Err(EngineError::PermissionDenied)));

    let root = admin();
    engine.register_machine("Washing 1", &root).unwrap();
    let dup = engine.register_machine("Washing 1", &root);
    assert!(matches!(dup, Err(EngineError::AlreadyExists("machine"))));

    let bad = engine.register_machine("Hot Tub 9", &root);
    assert!(matches!(bad, Err(EngineError::InvalidValue("machine"))));

    assert_eq!(engine.list_machines().len(), 1);
}

#[tokio::test]
async fn machine_removal() {
    let (engine, _) = setup(Mode::Recurring);
    let root = admin();
    let machine = engine.register_machine("Printer3D 1", &root).unwrap();

    let denied = engine.remove_machine(machine.id, &user());
    assert!(matches!(denied, Err(EngineError::PermissionDenied)));

    engine.remove_machine(machine.id, &root).unwrap();
    let gone = engine.remove_machine(machine.id, &root);
    assert!(matches!(gone, Err(EngineError::NotFound(_))));
}
