use std::sync::Arc;
use std::thread;
use toolgate_infra::SessionRegistry;

#[test]
fn test_concurrent_record_call_loses_no_updates() {
    let registry = Arc::new(SessionRegistry::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..100 {
                    registry.record_call("shared");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.get("shared").unwrap().call_count, 1600);
    assert_eq!(registry.list(), vec!["shared".to_string()]);
}

#[test]
fn test_concurrent_kills_keep_single_reason() {
    let registry = Arc::new(SessionRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.kill("target", &format!("reason-{}", i)))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first_reason = results[0].killed_reason.clone();
    assert!(results.iter().all(|s| s.killed && s.killed_reason == first_reason));
}

#[test]
fn test_concurrent_creation_registers_each_id_once() {
    let registry = Arc::new(SessionRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..10 {
                    registry.get_or_create(&format!("session-{}", (t + i) % 10));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let mut ids = registry.list();
    assert_eq!(ids.len(), 10);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
}
