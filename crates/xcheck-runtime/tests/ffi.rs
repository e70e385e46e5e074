use std::ffi::CString;
use std::sync::Barrier;
use std::thread;

use xcheck_runtime::codec::load_session;
use xcheck_runtime::ffi::{
    XcheckHandle, xcheck_end_session, xcheck_record, xcheck_record_bytes, xcheck_release,
    xcheck_site_id, xcheck_violations,
};
use xcheck_runtime::{EventKind, RuntimeConfig, SiteId, begin_session, hash_bytes};

fn ledger_handle(output: Option<std::path::PathBuf>) -> *mut XcheckHandle {
    let ledger = begin_session(RuntimeConfig::default().with_shards(2)).unwrap();
    XcheckHandle::new(Box::new(ledger), output, false).into_raw()
}

#[test]
fn test_handle_records_and_writes_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ffi.xck");

    let ledger = begin_session(RuntimeConfig::default().with_shards(2)).unwrap();
    let handle = XcheckHandle::new(Box::new(ledger), Some(path.clone()), true).into_raw();

    let name = CString::new("main").unwrap();
    let site = unsafe { xcheck_site_id(name.as_ptr()) };
    assert_eq!(site, SiteId::from_name("main").raw());

    let payload = b"hello";
    unsafe {
        xcheck_record(handle, site, EventKind::Entry.tag(), 0xaa);
        xcheck_record_bytes(
            handle,
            site,
            EventKind::Arg.tag(),
            payload.as_ptr(),
            payload.len(),
        );
        xcheck_record_bytes(handle, site, EventKind::Value.tag(), std::ptr::null(), 0);
        assert_eq!(xcheck_end_session(handle), 0);
        xcheck_release(handle);
    }

    let session = load_session(&path).unwrap();
    assert_eq!(session.len(), 3);
    assert_eq!(session.events()[0].payload_hash, 0xaa);
    assert_eq!(session.events()[1].payload_hash, hash_bytes(payload));
    assert_eq!(session.events()[2].payload_hash, hash_bytes(&[]));
}

#[test]
fn test_end_without_output_succeeds() {
    let handle = ledger_handle(None);
    unsafe {
        xcheck_record(handle, 1, EventKind::Exit.tag(), 0);
        assert_eq!(xcheck_end_session(handle), 0);
        xcheck_release(handle);
    }
}

#[test]
fn test_unwritable_output_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("out.xck");
    let handle = ledger_handle(Some(path));
    unsafe {
        assert_eq!(xcheck_end_session(handle), 1);
        xcheck_release(handle);
    }
}

#[test]
fn test_record_after_end_is_counted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ended.xck");
    let handle = ledger_handle(Some(path.clone()));
    unsafe {
        xcheck_record(handle, 1, EventKind::Entry.tag(), 0xaa);
        assert_eq!(xcheck_end_session(handle), 0);

        xcheck_record(handle, 1, EventKind::Exit.tag(), 0xbb);
        xcheck_record_bytes(handle, 1, EventKind::Value.tag(), std::ptr::null(), 0);
        assert_eq!(xcheck_violations(handle), 2);

        // ending twice is reported too
        assert_eq!(xcheck_end_session(handle), 1);
        assert_eq!(xcheck_violations(handle), 3);
        xcheck_release(handle);
    }

    let session = load_session(&path).unwrap();
    assert_eq!(session.len(), 1);
    assert_eq!(session.events()[0].payload_hash, 0xaa);
}

#[test]
fn test_records_racing_end_are_stored_or_counted() {
    const RECORDS: u64 = 20_000;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.xck");
    let handle = ledger_handle(Some(path.clone()));
    // Raw pointers are not Send; the handle itself is Sync.
    let addr = handle as usize;
    let start = Barrier::new(2);

    thread::scope(|s| {
        s.spawn(|| {
            let handle = addr as *const XcheckHandle;
            start.wait();
            for i in 0..RECORDS {
                unsafe { xcheck_record(handle, 7, EventKind::LoopIter.tag(), i) };
            }
        });
        start.wait();
        assert_eq!(unsafe { xcheck_end_session(handle) }, 0);
    });

    let stored = load_session(&path).unwrap().len() as u64;
    let violations = unsafe { xcheck_violations(handle) };
    assert_eq!(stored + violations, RECORDS);
    unsafe { xcheck_release(handle) };
}

#[test]
fn test_null_site_name_is_zero() {
    assert_eq!(unsafe { xcheck_site_id(std::ptr::null()) }, 0);
}

#[test]
fn test_release_ignores_null() {
    unsafe { xcheck_release(std::ptr::null_mut()) };
}
