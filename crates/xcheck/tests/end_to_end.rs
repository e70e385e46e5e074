use std::fs;
use std::path::Path;
use std::process::Command;

use xcheck::oracle::{CompareConfig, DivergenceKind, Verdict, compare};
use xcheck::{CompareState, load_any};
use xcheck_runtime::codec::{HEADER_SIZE, RECORD_SIZE, read_session, save_session, write_session};
use xcheck_runtime::{
    CrossCheckSink, EventKind, FakeChecks, RuntimeConfig, Session, SiteId, begin_session,
};

/// Simulated instrumented program: entry, one value check per loop
/// iteration, exit.
fn run_program(sink: &dyn CrossCheckSink, input: &[u32], bug_at: Option<usize>) {
    let func = SiteId::from_name("sum");
    let body = SiteId::from_name_index("sum", 1);
    sink.check(func, EventKind::Entry, xcheck_runtime::checksum(input))
        .unwrap();
    let mut total = 0u64;
    for (i, &x) in input.iter().enumerate() {
        total += u64::from(x);
        if bug_at == Some(i) {
            total += 1;
        }
        sink.check(body, EventKind::LoopIter, xcheck_runtime::checksum(&total))
            .unwrap();
    }
    sink.check(func, EventKind::Exit, xcheck_runtime::checksum(&total))
        .unwrap();
}

fn record(input: &[u32], bug_at: Option<usize>) -> Session {
    let handle = begin_session(RuntimeConfig::default().with_shards(2)).unwrap();
    run_program(&handle, input, bug_at);
    handle.end_session().unwrap()
}

#[test]
fn test_ab_scenario() {
    let site = SiteId::from_raw(1);
    let a = Session::from_checks([(site, EventKind::Entry, 0xaa), (site, EventKind::Exit, 0xbb)]);
    let config = CompareConfig::default();

    assert_eq!(compare(&a, &a.clone(), &config), Verdict::Match);

    let b = Session::from_checks([(site, EventKind::Entry, 0xaa), (site, EventKind::Exit, 0xcc)]);
    let verdict = compare(&a, &b, &config);
    assert_eq!(verdict.state(), CompareState::Diverged);
    assert_eq!(verdict.report().map(|r| r.first_mismatched_sequence), Some(1));

    let truncated = Session::from_checks([(site, EventKind::Entry, 0xaa)]);
    let verdict = compare(&a, &truncated, &config);
    assert_eq!(verdict.state(), CompareState::LengthMismatch);
    let report = verdict.report().unwrap();
    assert_eq!(report.first_mismatched_sequence, 1);
    assert_eq!(report.last_common_sequence, Some(0));
}

#[test]
fn test_injected_bug_is_located() {
    let input = [3, 1, 4, 1, 5, 9, 2, 6];
    let reference = record(&input, None);
    let buggy = record(&input, Some(4));

    let verdict = compare(&reference, &buggy, &CompareConfig::default());
    let Verdict::Diverged(report) = verdict else {
        panic!("expected divergence, got {verdict:?}");
    };
    // entry is sequence 0, iteration i is sequence i + 1
    assert_eq!(report.first_mismatched_sequence, 5);
    assert_eq!(report.kind, DivergenceKind::Payload);
    assert_eq!(report.actual.map(|e| e.kind), Some(EventKind::LoopIter));
}

/// Byte offset of the payload hash inside a wire record.
const PAYLOAD_OFFSET: usize = 24;

#[test]
fn test_any_flipped_payload_byte_diverges_at_its_record() {
    let reference = record(&[3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7], None);
    assert_eq!(reference.len(), 16);
    let mut encoded = Vec::new();
    write_session(&mut encoded, &reference, false).unwrap();
    let config = CompareConfig::default();

    for index in 0..reference.len() {
        for byte in 0..8 {
            let mut mutated = encoded.clone();
            mutated[HEADER_SIZE + index * RECORD_SIZE + PAYLOAD_OFFSET + byte] ^= 0x01;
            let actual = read_session(&mutated[..]).unwrap();

            let verdict = compare(&reference, &actual, &config);
            let Verdict::Diverged(report) = verdict else {
                panic!("record {index} byte {byte}: expected divergence, got {verdict:?}");
            };
            assert_eq!(report.first_mismatched_sequence, index as u64);
            assert_eq!(report.kind, DivergenceKind::Payload);
        }
    }
}

#[test]
fn test_dropping_last_event_is_length_mismatch() {
    let reference = record(&[3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7], None);
    let config = CompareConfig::default();

    for len in 1..=reference.len() {
        let full = Session::from_events(reference.events()[..len].to_vec()).unwrap();
        let short = Session::from_events(reference.events()[..len - 1].to_vec()).unwrap();
        let cut = (len - 1) as u64;
        let last = cut.checked_sub(1);

        let verdict = compare(&full, &short, &config);
        assert_eq!(verdict.state(), CompareState::LengthMismatch);
        let report = verdict.report().unwrap();
        assert_eq!(report.kind, DivergenceKind::ExpectedTail);
        assert_eq!((report.first_mismatched_sequence, report.last_common_sequence), (cut, last));

        let verdict = compare(&short, &full, &config);
        let report = verdict.report().unwrap();
        assert_eq!(report.kind, DivergenceKind::ActualTail);
        assert_eq!((report.first_mismatched_sequence, report.last_common_sequence), (cut, last));
    }
}

#[test]
fn test_fakechecks_log_compares_against_session_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("reference.log");
    let session_path = dir.path().join("actual.xck");
    let input = [10, 20, 30];

    let fake = FakeChecks::create(&log_path).unwrap();
    run_program(&fake, &input, None);
    fake.finish().unwrap();
    save_session(&session_path, &record(&input, None), true).unwrap();

    let expected = load_any(&log_path).unwrap();
    let actual = load_any(&session_path).unwrap();
    assert_eq!(expected.len(), input.len() + 2);
    assert_eq!(compare(&expected, &actual, &CompareConfig::default()), Verdict::Match);
}

fn xcheck(args: &[&str]) -> (i32, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_xcheck"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
    )
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_cli_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.xck");
    let bad = dir.path().join("bad.xck");
    let garbage = dir.path().join("garbage.xck");
    let input = [1, 2, 3];

    save_session(&good, &record(&input, None), false).unwrap();
    save_session(&bad, &record(&input, Some(1)), false).unwrap();
    fs::write(&garbage, b"XCHK\x07\x00\x00\x00").unwrap();

    let (code, out) = xcheck(&["compare", path_str(&good), path_str(&good)]);
    assert_eq!(code, 0);
    assert!(out.starts_with("MATCH"));

    let (code, out) = xcheck(&["compare", path_str(&good), path_str(&bad)]);
    assert_eq!(code, 1);
    assert!(out.starts_with("DIVERGED at sequence 2"));

    let (code, _) = xcheck(&["compare", path_str(&good), path_str(&garbage)]);
    assert_eq!(code, 2);

    let missing = dir.path().join("missing.xck");
    let (code, _) = xcheck(&["compare", path_str(&good), path_str(&missing)]);
    assert_eq!(code, 2);
}

#[test]
fn test_cli_convert_then_dump() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("run.log");
    let converted = dir.path().join("run.xck");
    let sites = dir.path().join("sites.txt");

    fs::write(&log, "hello\nXCHECK(1):5/0xaa\nXCHECK(2):5/0xbb\n").unwrap();
    fs::write(&sites, "5 main\n").unwrap();

    let (code, _) = xcheck(&["convert", path_str(&log), path_str(&converted), "--compress"]);
    assert_eq!(code, 0);
    assert_eq!(load_any(&converted).unwrap().len(), 2);

    let (code, out) = xcheck(&["dump", path_str(&converted), "--sites", path_str(&sites)]);
    assert_eq!(code, 0);
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("entry"));
    assert!(lines[1].contains("main"));
    assert!(lines[1].ends_with("0x00000000000000bb"));
}
