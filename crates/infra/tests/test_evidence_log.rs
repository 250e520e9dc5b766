use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use toolgate_infra::{ChainedEvidenceLog, EvidenceEntry, EvidenceError, EvidenceRecorder, EvidenceSink};
use toolgate_policy::PolicyDecision;

fn entry(session: &str, tool: &str) -> EvidenceEntry {
    EvidenceEntry::new(
        session,
        tool,
        PolicyDecision::deny(Some("unknown_tool"), "Unknown tool"),
        false,
        None,
    )
}

#[test]
fn test_chain_verifies_after_appends() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");
    let log = ChainedEvidenceLog::open(&path).unwrap();

    log.append(&entry("s1", "a")).unwrap();
    log.append(&entry("s1", "b")).unwrap();
    log.append(&entry("s2", "c")).unwrap();

    log.verify_integrity().unwrap();
    assert_eq!(log.load_entries().unwrap().len(), 3);
}

#[test]
fn test_chain_continues_after_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");

    {
        let log = ChainedEvidenceLog::open(&path).unwrap();
        log.append(&entry("s1", "a")).unwrap();
    }

    let log = ChainedEvidenceLog::open(&path).unwrap();
    log.append(&entry("s1", "b")).unwrap();
    log.verify_integrity().unwrap();
}

#[test]
fn test_tampered_line_detected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");
    let log = ChainedEvidenceLog::open(&path).unwrap();
    log.append(&entry("s1", "db_query")).unwrap();
    log.append(&entry("s1", "db_update")).unwrap();
    drop(log);

    let content = fs::read_to_string(&path).unwrap();
    fs::write(&path, content.replacen("db_query", "db_qu3ry", 1)).unwrap();

    let result = ChainedEvidenceLog::open(&path);
    assert!(matches!(result, Err(EvidenceError::IntegrityViolation(_))));
}

#[test]
fn test_deleted_line_detected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");
    let log = ChainedEvidenceLog::open(&path).unwrap();
    for tool in ["a", "b", "c"] {
        log.append(&entry("s1", tool)).unwrap();
    }
    drop(log);

    let content = fs::read_to_string(&path).unwrap();
    let kept: Vec<&str> = content.lines().enumerate().filter(|(i, _)| *i != 1).map(|(_, l)| l).collect();
    fs::write(&path, kept.join("\n")).unwrap();

    assert!(ChainedEvidenceLog::open(&path).is_err());
}

#[test]
fn test_recorder_persists_and_restores() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");

    {
        let log = Arc::new(ChainedEvidenceLog::open(&path).unwrap());
        let recorder = EvidenceRecorder::with_sink(log);
        recorder.record(entry("s1", "a"));
        recorder.record(entry("s2", "b"));
        recorder.record(entry("s1", "c"));
        assert_eq!(recorder.sink_failures(), 0);
    }

    let log = Arc::new(ChainedEvidenceLog::open(&path).unwrap());
    let restored = log.load_entries().unwrap();
    let recorder = EvidenceRecorder::with_sink(log);
    recorder.restore(restored);

    let pack = recorder.pack("s1");
    assert_eq!(pack.metadata.entry_count, 2);
    assert_eq!(pack.entries[0].tool_name, "a");
    assert_eq!(pack.entries[1].tool_name, "c");

    let next = recorder.record(entry("s1", "d"));
    assert_eq!(next.seq, 4);
}
