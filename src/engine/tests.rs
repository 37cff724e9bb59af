use std::path::PathBuf;

use super::*;
use crate::request::{Report, SearchQuery};
use crate::store::{DocumentStore, InMemoryStore};
use crate::time::{TimeOfDay, TimeRange};

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn d() -> Date {
    "2025-09-01".parse().unwrap()
}

fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::new(t(start), t(end))
}

fn slot(start: &str, end: &str) -> Slot {
    Slot::new(t(start), t(end))
}

fn event(start: &str, end: &str, status: EventStatus, title: &str) -> Event {
    Event {
        start_time: t(start),
        end_time: t(end),
        status,
        event_title: title.into(),
        notes: String::new(),
    }
}

fn key(building: &str, room: &str) -> RoomKey {
    RoomKey::new(building, room)
}

/// ECSS 2.101: class 09:00-10:30, cancelled meeting 14:00-15:00.
/// ECSS 2.102: booked 08:00-17:00.
/// ECSS 2.410: empty, with a directions link.
/// JSOM 1.118: booked 09:00-10:30 and 11:00-18:00.
fn campus() -> Vec<Room> {
    let mut ecss_101 = Room::new("ECSS", "2.101");
    ecss_101.insert_event(d(), event("09:00", "10:30", EventStatus::Scheduled, "CS 101"));
    ecss_101.insert_event(d(), event("14:00", "15:00", EventStatus::Cancelled, "Meeting"));

    let mut ecss_102 = Room::new("ECSS", "2.102");
    ecss_102.insert_event(d(), event("08:00", "17:00", EventStatus::Scheduled, "Workshop"));

    let mut jsom = Room::new("JSOM", "1.118");
    jsom.insert_event(d(), event("09:00", "10:30", EventStatus::Scheduled, "ACCT 2301"));
    jsom.insert_event(d(), event("11:00", "18:00", EventStatus::Scheduled, "Career Fair"));

    let ecss_410 = Room::new("ECSS", "2.410").with_location("https://maps.example.edu/ecss-2.410");

    vec![jsom, ecss_102, ecss_410, ecss_101]
}

async fn seeded<S: RoomStore>(mut store: S) -> Engine<S> {
    for room in campus() {
        store.insert_room(room).await.unwrap();
    }
    Engine::new(store)
}

fn test_log_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("roomfinder_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

/// Run one scenario against both backends.
macro_rules! on_both_stores {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(super::seeded(super::InMemoryStore::new()).await).await;
                }
            )*
        }
        mod document {
            $(
                #[tokio::test]
                async fn $name() {
                    let path = super::test_log_path(concat!(stringify!($name), ".log"));
                    let store = super::DocumentStore::open(&path, 0).unwrap();
                    super::$name(super::seeded(store).await).await;
                }
            )*
        }
    };
}

on_both_stores!(
    add_then_read_back_sorted,
    overlapping_add_leaves_schedule_unchanged,
    add_to_unknown_room_fails,
    cancel_then_confirm_round_trip,
    confirm_blocked_by_event_added_meanwhile,
    cancelled_block_is_free_time,
    next_availability_respects_min_duration,
    limit_caps_qualifying_rooms,
    search_pairs_rooms_with_first_slot,
    remove_twice_returns_false,
    unknown_room_is_free_and_untouchable,
    reports_dispatch_to_mutations,
    catalogue_queries,
    empty_room_qualifies_for_short_range,
    empty_date_qualifies_on_other_days,
    confirming_inverted_block_does_not_panic,
);

// ── Scenarios ────────────────────────────────────────────

async fn add_then_read_back_sorted<S: RoomStore>(mut engine: Engine<S>) {
    let k = key("ECSS", "2.101");
    engine
        .add_event(&k, d(), NewEvent::user_reported(t("11:00"), t("12:00"), "Study Group"))
        .await
        .unwrap();
    engine
        .add_event(&k, d(), NewEvent::user_reported(t("07:00"), t("08:00"), "Early Bird"))
        .await
        .unwrap();

    let room = engine.get_room(&k).await.unwrap().unwrap();
    let titles: Vec<_> = room.events_on(d()).iter().map(|e| e.event_title.as_str()).collect();
    assert_eq!(titles, vec!["Early Bird", "CS 101", "Study Group", "Meeting"]);
    assert_eq!(room.events_on(d())[2].status, EventStatus::UserReported);
}

async fn overlapping_add_leaves_schedule_unchanged<S: RoomStore>(mut engine: Engine<S>) {
    let k = key("ECSS", "2.101");
    let before = engine.get_schedule(&k).await.unwrap();

    let err = engine
        .add_event(&k, d(), NewEvent::user_reported(t("10:00"), t("11:00"), "Clash"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Overlap { .. }));
    let err = engine
        .add_event(&k, d(), NewEvent::user_reported(t("12:00"), t("12:00"), "Empty"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRange { .. }));

    assert_eq!(engine.get_schedule(&k).await.unwrap(), before);
}

async fn add_to_unknown_room_fails<S: RoomStore>(mut engine: Engine<S>) {
    let k = key("GR", "4.208");
    let err = engine
        .add_event(&k, d(), NewEvent::user_reported(t("10:00"), t("11:00"), ""))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RoomNotFound(_)));
    assert!(engine.get_room(&k).await.unwrap().is_none());
}

async fn cancel_then_confirm_round_trip<S: RoomStore>(mut engine: Engine<S>) {
    let k = key("ECSS", "2.101");
    assert!(engine.cancel_event(&k, d(), t("09:00"), t("10:30"), "Prof out sick").await.unwrap());
    let cancelled = engine.get_room(&k).await.unwrap().unwrap().events_on(d())[0].clone();
    assert_eq!(cancelled.status, EventStatus::Cancelled);
    assert_eq!(
        cancelled.notes,
        "User reported event as cancelled. Explanation: Prof out sick"
    );

    // Already cancelled.
    assert!(!engine.cancel_event(&k, d(), t("09:00"), t("10:30"), "").await.unwrap());

    assert!(engine.uncancel_event(&k, d(), t("09:00"), t("10:30"), "").await.unwrap());
    let restored = engine.get_room(&k).await.unwrap().unwrap().events_on(d())[0].clone();
    assert_eq!(restored.status, EventStatus::Scheduled);
    assert!(restored.notes.ends_with(CONFIRM_NOTE));
}

async fn confirm_blocked_by_event_added_meanwhile<S: RoomStore>(mut engine: Engine<S>) {
    let k = key("ECSS", "2.101");
    engine
        .add_event(&k, d(), NewEvent::user_reported(t("14:30"), t("15:30"), "Club"))
        .await
        .unwrap();
    let before = engine.get_schedule(&k).await.unwrap();

    let err = engine
        .uncancel_event(&k, d(), t("14:00"), t("15:00"), "")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Overlap { .. }));
    assert_eq!(engine.get_schedule(&k).await.unwrap(), before);
}

async fn cancelled_block_is_free_time<S: RoomStore>(engine: Engine<S>) {
    let slots: Vec<_> = engine
        .find_available_slots(&key("ECSS", "2.101"), d(), range("08:00", "18:00"))
        .await
        .unwrap()
        .collect();
    assert_eq!(slots, vec![slot("08:00", "09:00"), slot("10:30", "18:00")]);
}

async fn next_availability_respects_min_duration<S: RoomStore>(engine: Engine<S>) {
    let k = key("JSOM", "1.118");
    let r = range("10:00", "12:00");
    assert_eq!(engine.get_next_availability_on_date(&k, d(), r, 45).await.unwrap(), None);
    let found = engine.get_next_availability_on_date(&k, d(), r, 15).await.unwrap().unwrap();
    assert_eq!(found.to_string(), "10:30 - 11:00");
}

async fn limit_caps_qualifying_rooms<S: RoomStore>(engine: Engine<S>) {
    let filter = RoomFilter::building("ECSS");
    let r = range("08:00", "18:00");

    let all = engine.get_rooms_with_sufficient_gap(&filter, d(), r, 30, 10).await.unwrap();
    assert_eq!(all.len(), 3);

    let capped = engine.get_rooms_with_sufficient_gap(&filter, d(), r, 30, 2).await.unwrap();
    let keys: Vec<_> = capped.iter().map(Room::key).collect();
    assert_eq!(keys, vec![key("ECSS", "2.101"), key("ECSS", "2.102")]);

    let none = engine.get_rooms_with_sufficient_gap(&filter, d(), r, 30, 0).await.unwrap();
    assert!(none.is_empty());
}

async fn search_pairs_rooms_with_first_slot<S: RoomStore>(engine: Engine<S>) {
    let query = SearchQuery::new(d()).range(range("08:00", "18:00")).min_duration(61);
    let rows = engine.search(&query).await.unwrap();
    let got: Vec<_> = rows
        .iter()
        .map(|r| (format!("{} {}", r.building, r.room), r.next_availability.unwrap().to_string()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("ECSS 2.101".to_string(), "10:30 - 18:00".to_string()),
            ("ECSS 2.410".to_string(), "08:00 - 18:00".to_string()),
        ]
    );

    let query = SearchQuery::new(d()).range(range("08:00", "18:00")).min_duration(60).building("JSOM");
    let rows = engine.search(&query).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].next_availability, Some(slot("08:00", "09:00")));
}

async fn empty_room_qualifies_for_short_range<S: RoomStore>(engine: Engine<S>) {
    let r = range("08:00", "08:30");
    let rooms = engine
        .get_rooms_with_sufficient_gap(&RoomFilter::any(), d(), r, 60, 10)
        .await
        .unwrap();
    let keys: Vec<_> = rooms.iter().map(Room::key).collect();
    assert_eq!(keys, vec![key("ECSS", "2.410")]);

    let query = SearchQuery::new(d()).range(r).min_duration(60);
    let rows = engine.search(&query).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].building.as_str(), rows[0].room.as_str()), ("ECSS", "2.410"));
    assert_eq!(rows[0].next_availability, None);
    assert_eq!(rows[0].location.as_deref(), Some("https://maps.example.edu/ecss-2.410"));
}

async fn empty_date_qualifies_on_other_days<S: RoomStore>(engine: Engine<S>) {
    let other: Date = "2025-09-02".parse().unwrap();
    let query = SearchQuery::new(other).range(range("08:00", "08:30")).min_duration(60);
    let rows = engine.search(&query).await.unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.next_availability.is_none()));
}

async fn confirming_inverted_block_does_not_panic<S: RoomStore>(mut engine: Engine<S>) {
    let k = key("ECSS", "2.102");
    let mut room = engine.get_room(&k).await.unwrap().unwrap();
    room.insert_event(d(), event("10:00", "09:00", EventStatus::Cancelled, "Bad import"));
    engine.store_mut().insert_room(room).await.unwrap();

    assert!(engine.uncancel_event(&k, d(), t("10:00"), t("09:00"), "").await.unwrap());
    let room = engine.get_room(&k).await.unwrap().unwrap();
    let restored = room.events_on(d()).iter().find(|e| e.event_title == "Bad import").unwrap();
    assert_eq!(restored.status, EventStatus::Scheduled);

    // Occupies no time, so the day's free slots are unchanged.
    let slots: Vec<_> = engine
        .find_available_slots(&k, d(), range("08:00", "18:00"))
        .await
        .unwrap()
        .collect();
    assert_eq!(slots, vec![slot("17:00", "18:00")]);
}

async fn remove_twice_returns_false<S: RoomStore>(mut engine: Engine<S>) {
    let k = key("ECSS", "2.410");
    engine
        .add_event(&k, d(), NewEvent::user_reported(t("13:00"), t("14:00"), "Study"))
        .await
        .unwrap();

    // Only user-reported events can be removed.
    assert!(!engine.remove_user_event(&key("ECSS", "2.101"), d(), t("09:00"), t("10:30")).await.unwrap());

    assert!(engine.remove_user_event(&k, d(), t("13:00"), t("14:00")).await.unwrap());
    let after_first = engine.get_schedule(&k).await.unwrap();
    assert!(!engine.remove_user_event(&k, d(), t("13:00"), t("14:00")).await.unwrap());
    assert_eq!(engine.get_schedule(&k).await.unwrap(), after_first);
}

async fn unknown_room_is_free_and_untouchable<S: RoomStore>(mut engine: Engine<S>) {
    let k = key("GR", "4.208");
    let slots: Vec<_> = engine
        .find_available_slots(&k, d(), TimeRange::FULL_DAY)
        .await
        .unwrap()
        .collect();
    assert_eq!(slots, vec![slot("00:00", "23:59")]);

    assert!(!engine.remove_user_event(&k, d(), t("09:00"), t("10:00")).await.unwrap());
    assert!(!engine.cancel_event(&k, d(), t("09:00"), t("10:00"), "").await.unwrap());
    assert!(!engine.uncancel_event(&k, d(), t("09:00"), t("10:00"), "").await.unwrap());
    assert!(engine.get_schedule(&k).await.unwrap().is_none());
}

async fn reports_dispatch_to_mutations<S: RoomStore>(mut engine: Engine<S>) {
    let k = key("ECSS", "2.410");
    let add = Report::parse("add", "10:00", "11:00", Some("Review"), None).unwrap();
    assert!(engine.apply_report(&k, d(), add).await.unwrap());

    let cancel = Report::parse("cancel", "10:00", "11:00", None, None).unwrap();
    assert!(!engine.apply_report(&k, d(), cancel).await.unwrap());

    let remove = Report::parse("remove", "10:00", "11:00", None, None).unwrap();
    assert!(engine.apply_report(&k, d(), remove).await.unwrap());

    let k = key("ECSS", "2.101");
    let cancel = Report::parse("cancel", "09:00", "10:30", None, Some("No show")).unwrap();
    assert!(engine.apply_report(&k, d(), cancel).await.unwrap());
    let confirm = Report::parse("confirm", "09:00", "10:30", None, Some("Back on")).unwrap();
    assert!(engine.apply_report(&k, d(), confirm).await.unwrap());

    let room = engine.get_room(&k).await.unwrap().unwrap();
    assert_eq!(room.events_on(d())[0].notes, "User Confirmed. Explanation: Back on");
}

async fn catalogue_queries<S: RoomStore>(engine: Engine<S>) {
    assert_eq!(engine.buildings().await.unwrap(), vec!["ECSS", "JSOM"]);
    let grouped = engine.rooms_by_building().await.unwrap();
    assert_eq!(grouped["ECSS"], vec!["2.101", "2.102", "2.410"]);
    assert_eq!(grouped["JSOM"], vec!["1.118"]);

    let schedule = engine.get_schedule(&key("ECSS", "2.102")).await.unwrap().unwrap();
    assert_eq!(schedule[&d()].len(), 1);
}

// ── Engine plumbing ──────────────────────────────────────

#[tokio::test]
async fn notes_over_limit_rejected_before_lookup() {
    let mut engine = seeded(InMemoryStore::new()).await;
    let long = "x".repeat(crate::limits::MAX_NOTES_LEN + 1);
    let err = engine
        .cancel_event(&key("ECSS", "2.101"), d(), t("09:00"), t("10:30"), &long)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::LimitExceeded(_)));
    let room = engine.get_room(&key("ECSS", "2.101")).await.unwrap().unwrap();
    assert_eq!(room.events_on(d())[0].status, EventStatus::Scheduled);
}

#[tokio::test]
async fn cleared_store_starts_over() {
    let mut engine = seeded(InMemoryStore::new()).await;
    engine.store_mut().clear();
    assert!(engine.buildings().await.unwrap().is_empty());
    assert_eq!(engine.into_store().room_count(), 0);
}

#[tokio::test]
async fn document_engine_survives_reopen() {
    let path = test_log_path("engine_reopen.log");
    let k = key("ECSS", "2.101");
    {
        let mut engine = seeded(DocumentStore::open(&path, 0).unwrap()).await;
        engine
            .add_event(&k, d(), NewEvent::user_reported(t("16:00"), t("17:00"), "Review"))
            .await
            .unwrap();
        assert!(engine.cancel_event(&k, d(), t("09:00"), t("10:30"), "").await.unwrap());
    }
    let engine = Engine::new(DocumentStore::open(&path, 0).unwrap());
    let slots: Vec<_> = engine
        .find_available_slots(&k, d(), range("08:00", "18:00"))
        .await
        .unwrap()
        .collect();
    assert_eq!(slots, vec![slot("08:00", "16:00"), slot("17:00", "18:00")]);
}
