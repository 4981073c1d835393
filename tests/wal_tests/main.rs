//! WAL Tests
//!
//! These tests verify:
//! - Writer LSN assignment and sync bookkeeping
//! - Reader framing and checksum verification
//! - Recovery from clean, empty, torn and corrupted logs
//! - Verify mode leaves the file untouched

use std::fs::{self, File, OpenOptions};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use cfkv::config::WalSyncStrategy;
use cfkv::memtable::{MemTableOp, ValueSlot};
use cfkv::wal::{WalEntry, WalReader, WalRecovery, WalWriter, HEADER_SIZE};
use cfkv::CfkvError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put_op(i: usize) -> MemTableOp {
    MemTableOp::Put {
        cf: "default".to_string(),
        key: Bytes::from(format!("key{}", i)),
        slot: ValueSlot::Inline(Bytes::from(format!("value{}", i))),
    }
}

/// Write entries using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &Path, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite, 1).unwrap();
    for i in 0..count {
        writer.append(vec![put_op(i)]).unwrap();
        writer.sync().unwrap();
    }
}

/// Write raw encoded entries directly to a file (for crafting corruption)
fn write_raw_entries(path: &Path, entries: &[WalEntry]) {
    let mut file = File::create(path).unwrap();
    for entry in entries {
        file.write_all(&entry.encode().unwrap()).unwrap();
    }
    file.sync_all().unwrap();
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).unwrap().len()
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_writer_assigns_sequential_lsns() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 1).unwrap();

    assert_eq!(writer.current_lsn(), 0);
    assert_eq!(writer.append(vec![put_op(0)]).unwrap(), 1);
    assert_eq!(writer.append(vec![put_op(1), put_op(2)]).unwrap(), 2);
    assert_eq!(writer.current_lsn(), 2);
    assert_eq!(writer.size(), file_len(&wal_path));
    assert_eq!(writer.path(), wal_path.as_path());
}

#[test]
fn test_writer_continues_from_given_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let before = file_len(&wal_path);

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 3).unwrap();
    assert_eq!(writer.size(), before);
    assert_eq!(writer.append(vec![put_op(2)]).unwrap(), 3);

    let (entries, _) = WalRecovery::recover(&wal_path).unwrap();
    let lsns: Vec<u64> = entries.iter().map(|e| e.lsn).collect();
    assert_eq!(lsns, vec![1, 2, 3]);
}

#[test]
fn test_writer_sync_strategy_every_write() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 1).unwrap();

    assert!(!writer.needs_sync());
    writer.append(vec![put_op(0)]).unwrap();
    assert!(writer.needs_sync());
    writer.sync().unwrap();
    assert!(!writer.needs_sync());
}

#[test]
fn test_writer_sync_strategy_every_n_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 3 }, 1).unwrap();

    writer.append(vec![put_op(0)]).unwrap();
    writer.append(vec![put_op(1)]).unwrap();
    assert!(!writer.needs_sync());

    writer.append(vec![put_op(2)]).unwrap();
    assert!(writer.needs_sync());

    writer.sync().unwrap();
    assert!(!writer.needs_sync());
}

// =============================================================================
// Entry / Reader Tests
// =============================================================================

#[test]
fn test_encoded_entry_header() {
    let entry = WalEntry::new(7, vec![put_op(0)]);
    let record = entry.encode().unwrap();

    let len = u32::from_le_bytes([record[0], record[1], record[2], record[3]]) as usize;
    let crc = u32::from_le_bytes([record[4], record[5], record[6], record[7]]);

    assert_eq!(record.len(), HEADER_SIZE + len);
    assert_eq!(crc, crc32fast::hash(&record[HEADER_SIZE..]));
    assert_eq!(WalEntry::decode(&record[HEADER_SIZE..]).unwrap(), entry);
}

#[test]
fn test_reader_reads_entries_in_order() {
    let entries = vec![
        WalEntry::new(1, vec![put_op(0)]),
        WalEntry::new(2, vec![MemTableOp::Delete {
            cf: "lock".to_string(),
            key: Bytes::from_static(b"key0"),
        }]),
    ];
    let mut bytes = Vec::new();
    for entry in &entries {
        bytes.extend_from_slice(&entry.encode().unwrap());
    }
    let total = bytes.len() as u64;

    let mut reader = WalReader::new(Cursor::new(bytes));
    assert_eq!(reader.next_entry().unwrap(), Some(entries[0].clone()));
    assert_eq!(reader.next_entry().unwrap(), Some(entries[1].clone()));
    assert_eq!(reader.next_entry().unwrap(), None);
    assert_eq!(reader.valid_offset(), total);
}

#[test]
fn test_reader_detects_checksum_mismatch() {
    let mut record = WalEntry::new(1, vec![put_op(0)]).encode().unwrap();
    let last = record.len() - 1;
    record[last] ^= 0xff;

    let mut reader = WalReader::new(Cursor::new(record));
    assert!(matches!(
        reader.next_entry(),
        Err(CfkvError::WalCorruption(msg)) if msg.contains("checksum")
    ));
    assert_eq!(reader.valid_offset(), 0);
}

#[test]
fn test_reader_rejects_oversized_length() {
    let mut record = vec![0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0];
    record.extend_from_slice(&[0u8; 16]);

    let mut reader = WalReader::new(Cursor::new(record));
    assert!(matches!(
        reader.next_entry(),
        Err(CfkvError::WalCorruption(_))
    ));
}

// =============================================================================
// Recover: Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_missing_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 0);
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.valid_bytes, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_clean_wal() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(result.entries_recovered, 5);
    assert_eq!(result.last_lsn, 5);
    assert_eq!(result.valid_bytes, file_len(&wal_path));
    assert!(!result.was_truncated);
    assert_eq!(entries[3].ops, vec![put_op(3)]);
}

// =============================================================================
// Recover: Damaged WAL Tests
// =============================================================================

#[test]
fn test_recover_truncates_partial_write() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);
    let valid_len = file_len(&wal_path);

    let partial = WalEntry::new(4, vec![put_op(3)]).encode().unwrap();
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&partial[..partial.len() / 2]).unwrap();
    drop(file);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(result.last_lsn, 3);
    assert!(result.was_truncated);
    assert_eq!(result.valid_bytes, valid_len);
    assert_eq!(file_len(&wal_path), valid_len);
}

#[test]
fn test_recover_stops_at_corrupted_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let entries: Vec<WalEntry> = (1..=3u64)
        .map(|lsn| WalEntry::new(lsn, vec![put_op(lsn as usize)]))
        .collect();
    write_raw_entries(&wal_path, &entries);

    let first_len = entries[0].encode().unwrap().len() as u64;
    // damage the second record's payload
    let mut bytes = fs::read(&wal_path).unwrap();
    bytes[first_len as usize + HEADER_SIZE] ^= 0xff;
    fs::write(&wal_path, &bytes).unwrap();

    let (recovered, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(recovered, vec![entries[0].clone()]);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
    assert_eq!(file_len(&wal_path), first_len);
}

#[test]
fn test_recover_stops_at_out_of_order_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    let entries = vec![
        WalEntry::new(1, vec![put_op(1)]),
        WalEntry::new(2, vec![put_op(2)]),
        WalEntry::new(2, vec![put_op(3)]),
    ];
    write_raw_entries(&wal_path, &entries);

    let (recovered, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(recovered.len(), 2);
    assert_eq!(result.last_lsn, 2);
    assert!(result.was_truncated);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[1, 2, 3]).unwrap();
    drop(file);
    let damaged_len = file_len(&wal_path);

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert!(result.was_truncated);
    assert_eq!(result.valid_bytes, damaged_len - 3);
    assert_eq!(file_len(&wal_path), damaged_len);
}
