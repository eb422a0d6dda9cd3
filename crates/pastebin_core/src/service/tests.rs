use super::*;
use crate::clock::ManualClock;
use crate::constants::{DEFAULT_LANGUAGE, DEFAULT_TITLE};
use crate::expiration::ExpirationChoice;
use crate::store::MemoryPasteStore;
use crate::test_support::setup_temp_store;
use chrono::{DateTime, Duration, TimeZone, Utc};
use mockall::mock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

mock! {
    Store {}

    impl PasteStore for Store {
        fn backend_name(&self) -> &'static str;
        fn insert(&self, paste: &Paste, now: DateTime<Utc>) -> Result<(), AppError>;
        fn contains_live(&self, short_id: &str, now: DateTime<Utc>) -> Result<bool, AppError>;
        fn get(&self, short_id: &str, now: DateTime<Utc>) -> Result<Option<Paste>, AppError>;
        fn list_recent(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<Paste>, AppError>;
        fn search(&self, query_lower: &str, now: DateTime<Utc>) -> Result<Vec<Paste>, AppError>;
        fn increment_view(&self, short_id: &str, now: DateTime<Utc>) -> Result<u64, AppError>;
        fn delete(&self, short_id: &str) -> Result<bool, AppError>;
        fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
    }
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid start time")
}

fn memory_service() -> (Pastebin, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_time()));
    let pastebin = Pastebin::new(Arc::new(MemoryPasteStore::default())).with_clock(clock.clone());
    (pastebin, clock)
}

fn content(body: &str) -> NewPaste {
    NewPaste {
        content: body.to_string(),
        ..NewPaste::default()
    }
}

#[test]
fn create_applies_defaults_and_expiry_window() {
    let (pastebin, _clock) = memory_service();
    let paste = pastebin
        .create_paste(NewPaste {
            content: "hello".to_string(),
            expiration: ExpirationChoice::OneHour,
            ..NewPaste::default()
        })
        .expect("create");

    assert_eq!(paste.title, DEFAULT_TITLE);
    assert_eq!(paste.language, DEFAULT_LANGUAGE);
    assert_eq!(paste.view_count, 0);
    assert_eq!(paste.short_id.len(), 6);
    assert!(paste.short_id.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(paste.created_at, start_time());
    assert_eq!(paste.expires_at, Some(start_time() + Duration::hours(1)));

    let fetched = pastebin.get_paste(&paste.short_id).expect("get");
    assert_eq!(fetched, paste);
}

#[test]
fn never_expiring_paste_outlives_any_window() {
    let (pastebin, clock) = memory_service();
    let paste = pastebin
        .create_paste(NewPaste {
            content: "keep".to_string(),
            expiration: ExpirationChoice::Never,
            ..NewPaste::default()
        })
        .expect("create");
    assert_eq!(paste.expires_at, None);

    clock.advance(Duration::days(3650));
    assert!(pastebin.get_paste(&paste.short_id).is_ok());
}

#[test]
fn blank_content_is_rejected_before_touching_storage() {
    // No expectations: any store call would panic.
    let pastebin = Pastebin::new(Arc::new(MockStore::new()));
    for body in ["", "   ", "\n\t"] {
        let err = pastebin.create_paste(content(body)).expect_err("blank");
        assert!(matches!(err, AppError::ContentRequired));
    }
}

#[test]
fn oversized_content_is_truncated_not_rejected() {
    let (pastebin, _clock) = memory_service();
    let max = pastebin.max_paste_size();
    let paste = pastebin
        .create_paste(content(&"a".repeat(max + 1000)))
        .expect("create");
    assert_eq!(paste.content.len(), max);

    let raw = pastebin.get_raw_content(&paste.short_id).expect("raw");
    assert_eq!(raw.len(), max);
}

#[test]
fn expired_paste_is_not_found_and_not_listed() {
    let (pastebin, clock) = memory_service();
    let paste = pastebin
        .create_paste(NewPaste {
            content: "brief".to_string(),
            expiration: ExpirationChoice::FiveMinutes,
            ..NewPaste::default()
        })
        .expect("create");

    clock.advance(Duration::minutes(5));
    assert!(pastebin.get_paste(&paste.short_id).is_ok());

    clock.advance(Duration::minutes(1));
    let err = pastebin.get_paste(&paste.short_id).expect_err("expired");
    assert!(matches!(err, AppError::NotFound));
    assert!(pastebin.list_recent(5).expect("list").is_empty());

    let err = pastebin
        .increment_view(&paste.short_id)
        .expect_err("expired view");
    assert!(matches!(err, AppError::NotFound));
}

#[test]
fn missing_and_expired_pastes_report_the_same_error() {
    let (pastebin, clock) = memory_service();
    let paste = pastebin
        .create_paste(NewPaste {
            content: "brief".to_string(),
            expiration: ExpirationChoice::FiveMinutes,
            ..NewPaste::default()
        })
        .expect("create");
    clock.advance(Duration::hours(1));

    let expired = pastebin.get_paste(&paste.short_id).expect_err("expired");
    let missing = pastebin.get_paste("zzzzzz").expect_err("missing");
    assert_eq!(expired.to_string(), missing.to_string());
}

#[test]
fn list_recent_returns_newest_summaries_first() {
    let (pastebin, clock) = memory_service();
    let mut ids = Vec::new();
    for n in 0..7 {
        ids.push(
            pastebin
                .create_paste(content(&format!("paste {}", n)))
                .expect("create")
                .short_id,
        );
        clock.advance(Duration::seconds(1));
    }

    let recent = pastebin.list_recent(5).expect("list");
    let listed: Vec<&str> = recent.iter().map(|row| row.short_id.as_str()).collect();
    let expected: Vec<&str> = ids.iter().rev().take(5).map(String::as_str).collect();
    assert_eq!(listed, expected);
}

#[test]
fn search_prefers_exact_short_id_match() {
    let (pastebin, clock) = memory_service();
    let target = pastebin
        .create_paste(NewPaste {
            content: "the target".to_string(),
            short_id: Some("aB1cD2".to_string()),
            ..NewPaste::default()
        })
        .expect("create target");
    for n in 0..3 {
        clock.advance(Duration::seconds(1));
        pastebin
            .create_paste(content(&format!("mentions aB1cD2 number {}", n)))
            .expect("create mention");
    }

    let results = pastebin
        .search_pastes("aB1cD2", Pagination::default())
        .expect("search");
    assert_eq!(results.total, 1);
    assert_eq!(results.results.len(), 1);
    assert_eq!(results.results[0].short_id, target.short_id);
}

#[test]
fn short_query_without_id_match_falls_back_to_keywords() {
    let (pastebin, _clock) = memory_service();
    for (short_id, body) in [
        ("kw0001", "fn main() {}"),
        ("kw0002", "FN helper"),
        ("kw0003", "nothing"),
    ] {
        pastebin
            .create_paste(NewPaste {
                content: body.to_string(),
                short_id: Some(short_id.to_string()),
                ..NewPaste::default()
            })
            .expect("create");
    }

    let results = pastebin
        .search_pastes("fn", Pagination::default())
        .expect("search");
    assert_eq!(results.total, 2);
}

#[test]
fn search_paginates_with_pre_pagination_total() {
    let (pastebin, clock) = memory_service();
    for n in 0..25 {
        pastebin
            .create_paste(NewPaste {
                title: Some(format!("needle {}", n)),
                content: "body".to_string(),
                ..NewPaste::default()
            })
            .expect("create");
        clock.advance(Duration::seconds(1));
    }

    let first = pastebin
        .search_pastes("NEEDLE", Pagination::new(Some(1), Some(20)))
        .expect("page one");
    assert_eq!(first.total, 25);
    assert_eq!(first.results.len(), 20);
    assert_eq!(first.results[0].title, "needle 24");

    let second = pastebin
        .search_pastes("needle", Pagination::new(Some(2), Some(20)))
        .expect("page two");
    assert_eq!(second.total, 25);
    assert_eq!(second.results.len(), 5);
    assert_eq!(second.results[4].title, "needle 0");
}

#[test]
fn burst_of_creates_searches_newest_first() {
    let (pastebin, clock) = memory_service();
    let mut ids = Vec::new();
    for n in 0..5 {
        ids.push(
            pastebin
                .create_paste(content(&format!("burst {}", n)))
                .expect("create")
                .short_id,
        );
        clock.advance(Duration::microseconds(100));
    }

    let results = pastebin
        .search_pastes("burst", Pagination::default())
        .expect("search");
    let found: Vec<&str> = results
        .results
        .iter()
        .map(|row| row.short_id.as_str())
        .collect();
    let expected: Vec<&str> = ids.iter().rev().map(String::as_str).collect();
    assert_eq!(found, expected);
}

#[test]
fn blank_query_is_rejected() {
    let (pastebin, _clock) = memory_service();
    let err = pastebin
        .search_pastes("   ", Pagination::default())
        .expect_err("blank query");
    assert!(matches!(err, AppError::QueryRequired));
}

#[test]
fn supplied_short_id_conflict_is_not_retried() {
    let (pastebin, _clock) = memory_service();
    let request = NewPaste {
        content: "one".to_string(),
        short_id: Some("fixed1".to_string()),
        ..NewPaste::default()
    };
    pastebin.create_paste(request.clone()).expect("first");
    let err = pastebin.create_paste(request).expect_err("conflict");
    assert!(matches!(err, AppError::DuplicateKey(ref id) if id == "fixed1"));

    let err = pastebin
        .create_paste(NewPaste {
            content: "bad".to_string(),
            short_id: Some("no!".to_string()),
            ..NewPaste::default()
        })
        .expect_err("malformed id");
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[test]
fn lost_insert_race_is_retried_with_a_new_id() {
    let mut store = MockStore::new();
    store.expect_contains_live().returning(|_, _| Ok(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    store.expect_insert().times(3).returning(move |paste, _| {
        if seen.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(AppError::DuplicateKey(paste.short_id.clone()))
        } else {
            Ok(())
        }
    });

    let pastebin = Pastebin::new(Arc::new(store));
    let paste = pastebin.create_paste(content("retry me")).expect("create");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(paste.short_id.len(), 6);
}

#[test]
fn persistent_collisions_exhaust_generation() {
    let mut store = MockStore::new();
    store.expect_contains_live().returning(|_, _| Ok(false));
    store
        .expect_insert()
        .times(20)
        .returning(|paste, _| Err(AppError::DuplicateKey(paste.short_id.clone())));

    let pastebin = Pastebin::new(Arc::new(store));
    let err = pastebin
        .create_paste(content("never lands"))
        .expect_err("exhausted");
    assert!(matches!(err, AppError::GenerationExhausted { attempts: 20 }));
}

#[test]
fn occupied_candidates_share_the_attempt_budget() {
    let mut store = MockStore::new();
    store
        .expect_contains_live()
        .times(20)
        .returning(|_, _| Ok(true));
    store.expect_insert().never();

    let pastebin = Pastebin::new(Arc::new(store));
    let err = pastebin
        .create_paste(content("crowded"))
        .expect_err("exhausted");
    assert!(matches!(err, AppError::GenerationExhausted { attempts: 20 }));
}

#[test]
fn collisions_and_lost_races_count_against_one_budget() {
    let mut store = MockStore::new();
    let checks = Arc::new(AtomicUsize::new(0));
    let seen_checks = checks.clone();
    // Every other candidate is reported taken; the free ones lose the insert race.
    store.expect_contains_live().returning(move |_, _| {
        Ok(seen_checks.fetch_add(1, Ordering::SeqCst) % 2 == 0)
    });
    store
        .expect_insert()
        .returning(|paste, _| Err(AppError::DuplicateKey(paste.short_id.clone())));

    let pastebin = Pastebin::new(Arc::new(store)).with_id_generator(IdGenerator::new(6));
    let err = pastebin
        .create_paste(content("contended"))
        .expect_err("exhausted");
    assert!(matches!(err, AppError::GenerationExhausted { attempts: 6 }));
    assert_eq!(checks.load(Ordering::SeqCst), 6);
}

#[test]
fn storage_failures_propagate_unchanged() {
    let mut store = MockStore::new();
    store
        .expect_get()
        .returning(|_, _| Err(AppError::StorageUnavailable("disk gone".to_string())));
    store
        .expect_contains_live()
        .returning(|_, _| Err(AppError::StorageUnavailable("disk gone".to_string())));

    let pastebin = Pastebin::new(Arc::new(store));
    let err = pastebin.get_paste("aB1cD2").expect_err("get");
    assert!(err.is_storage_failure());

    let err = pastebin.create_paste(content("x")).expect_err("create");
    assert!(matches!(err, AppError::StorageUnavailable(_)));
}

#[test]
fn delete_and_sweep_report_outcomes() {
    let (pastebin, clock) = memory_service();
    let keep = pastebin
        .create_paste(NewPaste {
            content: "keep".to_string(),
            expiration: ExpirationChoice::OneWeek,
            ..NewPaste::default()
        })
        .expect("create keep");
    let doomed = pastebin
        .create_paste(NewPaste {
            content: "brief".to_string(),
            expiration: ExpirationChoice::FiveMinutes,
            ..NewPaste::default()
        })
        .expect("create brief");

    clock.advance(Duration::hours(1));
    assert_eq!(pastebin.sweep_expired().expect("sweep"), 1);
    assert!(matches!(
        pastebin.delete_paste(&doomed.short_id),
        Err(AppError::NotFound)
    ));

    pastebin.delete_paste(&keep.short_id).expect("delete");
    assert!(matches!(
        pastebin.get_paste(&keep.short_id),
        Err(AppError::NotFound)
    ));
}

#[test]
fn concurrent_creates_get_distinct_ids() {
    let (store, _temp_dir) = setup_temp_store();
    let pastebin = Pastebin::new(Arc::new(store));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let pastebin = pastebin.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|n| {
                        pastebin
                            .create_paste(content(&format!("worker {} paste {}", worker, n)))
                            .expect("create")
                            .short_id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().expect("join") {
            assert!(ids.insert(id), "duplicate short id issued");
        }
    }
    assert_eq!(ids.len(), 200);
}

#[test]
fn concurrent_views_are_all_counted() {
    let (store, _temp_dir) = setup_temp_store();
    let pastebin = Pastebin::new(Arc::new(store));
    let paste = pastebin.create_paste(content("popular")).expect("create");

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let pastebin = pastebin.clone();
            let short_id = paste.short_id.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    pastebin.increment_view(&short_id).expect("increment");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    assert_eq!(
        pastebin.get_paste(&paste.short_id).expect("get").view_count,
        200
    );
}

#[test]
fn from_config_carries_limits() {
    let config = Config {
        max_paste_size: 10,
        max_id_attempts: 3,
        ..Config::default()
    };
    let pastebin = Pastebin::from_config(Arc::new(MemoryPasteStore::default()), &config);
    assert_eq!(pastebin.max_paste_size(), 10);

    let paste = pastebin
        .create_paste(content("0123456789abcdef"))
        .expect("create");
    assert_eq!(paste.content, "0123456789");
}
