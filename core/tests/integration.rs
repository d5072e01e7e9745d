use std::{
    collections::BTreeSet,
    fs::{self, File, FileTimes},
    io,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, SystemTime},
};

use dirjanitor::{
    perform_cleanup, start, CleanerConfig, Error, MemorySink, SchedulerState, TracingSink,
};
use tracing::Level;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

struct LogWriter(Arc<Mutex<Vec<u8>>>);
impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
struct MakeLogWriter(Arc<Mutex<Vec<u8>>>);
impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for MakeLogWriter {
    type Writer = LogWriter;
    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(self.0.clone())
    }
}

fn write_aged(path: &Path, age: Duration) {
    fs::write(path, b"Test file content").unwrap();
    let modified = SystemTime::now() - age;
    let file = File::options().write(true).open(path).unwrap();
    file.set_times(FileTimes::new().set_modified(modified)).unwrap();
}

/// Five files; even indices are three days old, odd ones one day old.
fn create_test_files(dir: &Path) {
    for i in 0..5 {
        let age = if i % 2 == 0 { 3 * DAY } else { DAY };
        write_aged(&dir.join(format!("file{i}.txt")), age);
    }
}

fn names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn removes_only_entries_past_retention() {
    let tmp = tempfile::tempdir().unwrap();
    create_test_files(tmp.path());
    let cfg = CleanerConfig::new(tmp.path(), 2);

    let report = perform_cleanup(&cfg).unwrap();

    assert_eq!(report.scanned, 5);
    assert_eq!(report.removed, 3);
    assert_eq!(report.kept, 2);
    assert_eq!(report.failures(), 0);
    assert_eq!(names(tmp.path()), set(&["file1.txt", "file3.txt"]));
}

#[test]
fn second_pass_removes_nothing_new() {
    let tmp = tempfile::tempdir().unwrap();
    create_test_files(tmp.path());
    let cfg = CleanerConfig::new(tmp.path(), 2);

    assert_eq!(perform_cleanup(&cfg).unwrap().removed, 3);
    let second = perform_cleanup(&cfg).unwrap();
    assert_eq!(second.removed, 0);
    assert_eq!(second.kept, 2);
    assert_eq!(names(tmp.path()), set(&["file1.txt", "file3.txt"]));
}

#[test]
fn empty_directory_is_a_successful_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let report = perform_cleanup(&CleanerConfig::new(tmp.path(), 0)).unwrap();
    assert_eq!(report.scanned, 0);
    assert_eq!(report.removed, 0);
    assert!(names(tmp.path()).is_empty());
}

#[test]
fn missing_directory_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("nope");
    let err = perform_cleanup(&CleanerConfig::new(&missing, 0)).unwrap_err();
    assert!(matches!(err, Error::DirectoryRead { .. }));
    assert!(err.to_string().contains("nope"));
}

#[test]
fn pass_logs_each_removed_path() {
    let tmp = tempfile::tempdir().unwrap();
    create_test_files(tmp.path());
    let sink = Arc::new(MemorySink::new());
    let cfg = CleanerConfig::new(tmp.path(), 2).with_log_sink(sink.clone());

    perform_cleanup(&cfg).unwrap();

    assert!(sink.contains(Level::INFO, "Starting cleanup."));
    for name in ["file0.txt", "file2.txt", "file4.txt"] {
        assert!(sink.contains(Level::INFO, name), "no line for {name}");
    }
    assert!(!sink.contains(Level::INFO, "file1.txt"));
    assert!(sink.contains(Level::INFO, "Cleanup finished"));
}

#[test]
fn silent_without_sink() {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt()
        .with_writer(MakeLogWriter(buf.clone()))
        .finish();
    let tmp = tempfile::tempdir().unwrap();
    create_test_files(tmp.path());
    let cfg = CleanerConfig::new(tmp.path(), 2);

    tracing::subscriber::with_default(subscriber, || perform_cleanup(&cfg).unwrap());

    assert!(buf.lock().unwrap().is_empty());
}

#[test]
fn tracing_sink_reaches_subscriber() {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt()
        .with_writer(MakeLogWriter(buf.clone()))
        .finish();
    let tmp = tempfile::tempdir().unwrap();
    create_test_files(tmp.path());
    let cfg = CleanerConfig::new(tmp.path(), 2).with_log_sink(Arc::new(TracingSink));

    tracing::subscriber::with_default(subscriber, || perform_cleanup(&cfg).unwrap());

    let logs = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("Successfully cleaned up"), "logs: {logs}");
    assert!(logs.contains("dirjanitor"), "logs: {logs}");
}

#[tokio::test]
async fn scheduler_cleans_periodically() {
    let tmp = tempfile::tempdir().unwrap();
    create_test_files(tmp.path());
    let sink = Arc::new(MemorySink::new());
    let cfg = CleanerConfig::new(tmp.path(), 2)
        .with_frequency(Duration::from_millis(50))
        .with_log_sink(sink.clone());

    let handle = start(cfg);
    tokio::time::sleep(Duration::from_millis(400)).await;
    handle.stop();
    assert_eq!(handle.state(), SchedulerState::Stopped);
    let passes = handle.passes();
    handle.join().await;

    assert!(passes >= 1, "no pass ran");
    assert_eq!(names(tmp.path()), set(&["file1.txt", "file3.txt"]));
    assert!(sink.contains(Level::INFO, "Cleanup interval stopped"));
}

#[tokio::test]
async fn scheduler_survives_missing_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("later");
    let sink = Arc::new(MemorySink::new());
    let cfg = CleanerConfig::new(&missing, 2)
        .with_frequency(Duration::from_millis(30))
        .with_log_sink(sink.clone());

    let handle = start(cfg);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.state(), SchedulerState::Running);
    assert!(handle.passes() >= 1);
    assert!(sink.contains(Level::WARN, "can't read directory"));

    // the directory appears between passes and gets cleaned on the next one
    fs::create_dir(&missing).unwrap();
    create_test_files(&missing);
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.stop();
    handle.join().await;

    assert_eq!(names(&missing), set(&["file1.txt", "file3.txt"]));
}

#[tokio::test]
async fn stop_before_first_period_runs_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    create_test_files(tmp.path());
    let cfg = CleanerConfig::new(tmp.path(), 2).with_frequency(Duration::from_millis(100));

    let handle = start(cfg);
    handle.stop();
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(handle.passes(), 0);
    assert_eq!(names(tmp.path()).len(), 5);
    handle.join().await;
}

#[tokio::test]
async fn passes_never_overlap() {
    let tmp = tempfile::tempdir().unwrap();
    // one fresh file so every pass logs both start and finish
    write_aged(&tmp.path().join("fresh.txt"), Duration::ZERO);

    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let (flight, max) = (in_flight.clone(), max_seen.clone());
    let sink = move |_: Level, msg: &str| {
        if msg.starts_with("Starting cleanup") {
            let now = flight.fetch_add(1, Ordering::SeqCst) + 1;
            max.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
        } else if msg.starts_with("Cleanup finished") {
            flight.fetch_sub(1, Ordering::SeqCst);
        }
    };
    let cfg = CleanerConfig::new(tmp.path(), 1)
        .with_frequency(Duration::from_millis(5))
        .with_log_sink(Arc::new(sink));

    let handle = start(cfg);
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.stop();
    let passes = handle.passes();
    handle.join().await;

    assert!(passes >= 2, "only {passes} passes ran");
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    assert!(tmp.path().join("fresh.txt").exists());
}
