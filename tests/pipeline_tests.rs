//! Integration tests running the full collection pipeline against fake
//! process trees built in a temp directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use psmaps::collector::{reduce, Dispatched};
use psmaps::process::{DataSource, RollupHeader};
use psmaps::{
    merge_rows, render_table, sort_rollups, CollectError, Collector, MemoryRollup, OwnerCache,
    ProcessOwner, ReduceStrategy, SortKey, TableOptions,
};
use tempfile::{tempdir, TempDir};
use tokio::sync::oneshot;

fn rollup_text(rss: u64, pss: u64, private_clean: u64, private_dirty: u64) -> String {
    format!(
        "00400000-7ffd0000 ---p 00000000 00:00 0    [rollup]\n\
         Rss:        {} kB\n\
         Pss:        {} kB\n\
         Private_Clean:  {} kB\n\
         Private_Dirty:  {} kB\n",
        rss, pss, private_clean, private_dirty
    )
}

fn add_process(root: &Path, pid: u32, rollup: Option<&str>, cmdline: &[u8]) {
    let dir = root.join(pid.to_string());
    fs::create_dir_all(&dir).expect("Failed to create pid dir");
    if let Some(text) = rollup {
        fs::write(dir.join("smaps_rollup"), text).expect("Failed to write smaps_rollup");
    }
    fs::write(dir.join("cmdline"), cmdline).expect("Failed to write cmdline");
}

/// pids 1, 2 and 3 with data; 4 is a kernel thread; 5 has only a header;
/// 6 has no rollup file at all.
fn fake_proc() -> TempDir {
    let dir = tempdir().expect("Failed to create temp dir");
    let root = dir.path();
    add_process(root, 1, Some(&rollup_text(4000, 1500, 100, 900)), b"/sbin/init\0splash\0");
    add_process(root, 2, Some(&rollup_text(9000, 7000, 2000, 4000)), b"/usr/bin/python3\0app.py\0");
    add_process(root, 3, Some(&rollup_text(300, 100, 0, 50)), b"sleep\0100\0");
    add_process(root, 4, Some(""), b"");
    add_process(root, 5, Some("00400000-7ffd0000 ---p 00000000 00:00 0    [rollup]\n"), b"zombie\0");
    add_process(root, 6, None, b"vanished\0");
    fs::create_dir_all(root.join("self")).expect("Failed to create non-pid dir");
    dir
}

fn collector(root: &Path) -> Collector {
    Collector::new(root).with_owner_cache(Arc::new(OwnerCache::new()))
}

fn sorted_pids(rollups: &mut [MemoryRollup]) -> Vec<u32> {
    rollups.sort_by_key(|r| r.pid);
    rollups.iter().map(|r| r.pid).collect()
}

// -----------------------------------------------------------------------------
// Tests for the collection pipeline
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_only_processes_with_stats_become_rows() {
    let dir = fake_proc();
    let pids = psmaps::collect_pids(dir.path()).unwrap();
    assert_eq!(pids, vec![1, 2, 3, 4, 5, 6]);

    let mut reduction = collector(dir.path()).collect(&pids).await.unwrap();

    assert_eq!(sorted_pids(&mut reduction.rollups), vec![1, 2, 3]);
    assert!(reduction.rollups.len() <= pids.len());
    assert_eq!(reduction.cmdlines.get(&1).map(String::as_str), Some("/sbin/init splash"));
    // Kernel thread command line is empty and therefore absent
    assert!(!reduction.cmdlines.contains_key(&4));
    // Owners are read from the directory itself, so every pid has one
    assert_eq!(reduction.owners.len(), 6);
}

#[tokio::test]
async fn test_strategies_agree() {
    let dir = fake_proc();
    let pids = vec![3, 1, 6, 2, 5, 4];

    let mut sequential = collector(dir.path())
        .with_strategy(ReduceStrategy::Sequential)
        .collect(&pids)
        .await
        .unwrap();
    let mut multiplexed = collector(dir.path())
        .with_strategy(ReduceStrategy::Multiplexed)
        .collect(&pids)
        .await
        .unwrap();

    sorted_pids(&mut sequential.rollups);
    sorted_pids(&mut multiplexed.rollups);
    assert_eq!(sequential.rollups, multiplexed.rollups);
    assert_eq!(sequential.owners, multiplexed.owners);
    assert_eq!(sequential.cmdlines, multiplexed.cmdlines);
}

#[tokio::test]
async fn test_concurrency_limit_does_not_change_result() {
    let dir = fake_proc();
    let pids = psmaps::collect_pids(dir.path()).unwrap();

    let mut limited = collector(dir.path())
        .with_max_concurrency(Some(1))
        .collect(&pids)
        .await
        .unwrap();
    let mut unbounded = collector(dir.path())
        .with_max_concurrency(Some(0))
        .collect(&pids)
        .await
        .unwrap();

    assert_eq!(sorted_pids(&mut limited.rollups), vec![1, 2, 3]);
    sorted_pids(&mut unbounded.rollups);
    assert_eq!(limited.rollups, unbounded.rollups);
}

#[tokio::test]
async fn test_unknown_and_duplicate_pids() {
    let dir = fake_proc();

    let reduction = collector(dir.path()).collect(&[2, 2, 999]).await.unwrap();

    assert_eq!(reduction.rollups.len(), 1);
    assert_eq!(reduction.rollups[0].pid, 2);
    assert!(!reduction.owners.contains_key(&999));
}

#[tokio::test]
async fn test_empty_pid_list() {
    let dir = tempdir().expect("Failed to create temp dir");
    let reduction = collector(dir.path()).collect(&[]).await.unwrap();
    assert!(reduction.rollups.is_empty());
    assert!(reduction.owners.is_empty());
    assert!(reduction.cmdlines.is_empty());
}

#[tokio::test]
async fn test_malformed_header_is_fatal() {
    let dir = fake_proc();
    add_process(dir.path(), 7, Some("not a header\nRss: 10 kB\n"), b"bad\0");

    for strategy in [ReduceStrategy::Sequential, ReduceStrategy::Multiplexed] {
        let err = collector(dir.path())
            .with_strategy(strategy)
            .collect(&[1, 7, 2])
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.pid(), 7);
    }
}

#[tokio::test]
async fn test_malformed_stat_lines_are_skipped() {
    let dir = tempdir().expect("Failed to create temp dir");
    let text = "00400000-7ffd0000 ---p 00000000 00:00 0    [rollup]\n\
                Rss: 512 kB\n\
                garbage line\n\
                Pss: lots kB\n";
    add_process(dir.path(), 8, Some(text), b"odd\0");

    let reduction = collector(dir.path()).collect(&[8]).await.unwrap();
    assert_eq!(reduction.rollups.len(), 1);
    assert_eq!(reduction.rollups[0].rss(), 512);
    assert_eq!(reduction.rollups[0].stat("pss"), None);
}

#[tokio::test]
async fn test_huge_private_stats_saturate_uss() {
    let dir = tempdir().expect("Failed to create temp dir");
    let text = "00400000-7ffd0000 ---p 00000000 00:00 0    [rollup]\n\
                Rss: 64 kB\n\
                Private_Clean: 18446744073709551615 kB\n\
                Private_Dirty: 1 kB\n";
    add_process(dir.path(), 9, Some(text), b"huge\0");
    add_process(dir.path(), 10, Some(&rollup_text(300, 100, 0, 50)), b"small\0");

    let mut reduction = collector(dir.path()).collect(&[9, 10]).await.unwrap();
    sort_rollups(
        &mut reduction.rollups,
        &reduction.owners,
        &reduction.cmdlines,
        &SortKey::Uss,
        false,
    );
    let rows = merge_rows(&reduction.rollups, &reduction.owners, &reduction.cmdlines);

    assert_eq!(rows.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![10, 9]);
    assert_eq!(rows[1].uss, u64::MAX);
}

// -----------------------------------------------------------------------------
// Tests for joining partial results
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_owner_shows_pid_as_user() {
    let mut dispatched = Dispatched::empty();

    let (tx, rx) = oneshot::channel();
    tx.send(Ok(MemoryRollup::new(42, RollupHeader::default()).with_stat("rss", 10)))
        .unwrap();
    dispatched.rollups.push(42, rx);

    let (tx, rx) = oneshot::channel();
    tx.send(Err(CollectError::NotAccessible { pid: 42 })).unwrap();
    dispatched.owners.push(42, rx);

    // Dropped sender: the reader never reported
    let (tx, rx) = oneshot::channel::<Result<String, CollectError>>();
    drop(tx);
    dispatched.cmdlines.push(42, rx);

    let reduction = reduce(dispatched, ReduceStrategy::Multiplexed).await.unwrap();
    let rows = merge_rows(&reduction.rollups, &reduction.owners, &reduction.cmdlines);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user, "42");
    assert_eq!(rows[0].rss, 10);
    assert_eq!(rows[0].command, "");
}

#[tokio::test]
async fn test_non_fatal_errors_are_absorbed() {
    let mut dispatched = Dispatched::empty();
    for pid in [1, 2] {
        let (tx, rx) = oneshot::channel();
        let result = if pid == 1 {
            Ok(MemoryRollup::new(1, RollupHeader::default()).with_stat("pss", 5))
        } else {
            Err(CollectError::EmptyResult {
                pid,
                source_name: DataSource::Rollup,
            })
        };
        tx.send(result).unwrap();
        dispatched.rollups.push(pid, rx);
    }

    let reduction = reduce(dispatched, ReduceStrategy::Sequential).await.unwrap();
    assert_eq!(reduction.rollups.len(), 1);
    assert_eq!(reduction.rollups[0].pid, 1);
}

// -----------------------------------------------------------------------------
// End-to-end: collect, sort, render
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_sorted_table_output() {
    let dir = fake_proc();
    let pids = psmaps::collect_pids(dir.path()).unwrap();
    let mut reduction = collector(dir.path()).collect(&pids).await.unwrap();

    sort_rollups(
        &mut reduction.rollups,
        &reduction.owners,
        &reduction.cmdlines,
        &SortKey::Uss,
        true,
    );
    let rows = merge_rows(&reduction.rollups, &reduction.owners, &reduction.cmdlines);
    assert_eq!(rows.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![2, 1, 3]);
    assert_eq!(rows[0].uss, 6000);
    assert_eq!(rows[1].uss, 1000);
    assert_eq!(rows[2].uss, 50);

    let mut out = Vec::new();
    render_table(
        &mut out,
        &rows,
        &TableOptions {
            wide: true,
            human_readable: false,
            width: 80,
        },
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].trim_start().starts_with("PID"));
    assert!(lines[1].ends_with("/usr/bin/python3 app.py"));
    assert!(lines[3].ends_with("sleep 100"));
    assert!(lines.iter().all(|l| !l.ends_with(' ')));
}

#[tokio::test]
async fn test_owner_cache_is_filled_by_collection() {
    let dir = fake_proc();
    let cache = Arc::new(OwnerCache::new());
    let reduction = Collector::new(dir.path())
        .with_owner_cache(cache.clone())
        .collect(&[1, 2, 3])
        .await
        .unwrap();

    let owner: &ProcessOwner = reduction.owners.get(&1).unwrap();
    // All fixture dirs belong to the test user; a resolved name is cached once
    if !owner.username.is_empty() {
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(owner.uid).as_deref(), Some(owner.username.as_str()));
    }
}
