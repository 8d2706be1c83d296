//! Operator tree tests over real table files

use std::sync::{Arc, Mutex, Once};

use tempfile::TempDir;

use super::delete::DELETED_FIELD;
use super::*;
use crate::file::{BufferManager, DiskManager};
use crate::index::{IndexHandle, IndexRef};
use crate::record::{
    Field, FieldType, RecordId, RecordSchema, TableHandle, TableRef, Value, lock,
};

fn student_schema() -> RecordSchema {
    RecordSchema::new(vec![
        Field::new("id", FieldType::Int),
        Field::new("name", FieldType::Char(16)),
        Field::new("score", FieldType::Float),
    ])
}

fn student(id: i32) -> Record {
    Record::new(vec![
        Value::Int(id),
        Value::String(format!("s{}", id)),
        Value::Float(id as f64 * 1.5),
    ])
}

struct Fixture {
    _temp_dir: TempDir,
    table: TableRef,
}

static INIT: Once = Once::new();

fn setup(rows: i32) -> Fixture {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });

    let temp_dir = tempfile::tempdir().unwrap();
    let buffer_manager = Arc::new(Mutex::new(BufferManager::new(DiskManager::new())));
    let path = temp_dir.path().join("student.tbl");

    let mut table = TableHandle::create(buffer_manager, &path, "student", student_schema()).unwrap();
    for id in 0..rows {
        table.insert_record(&student(id)).unwrap();
    }

    Fixture {
        _temp_dir: temp_dir,
        table: table.into_shared(),
    }
}

fn index_on(table: &TableRef, name: &str, columns: &[&str]) -> IndexRef {
    IndexHandle::build(name, &lock(table), columns)
        .unwrap()
        .into_shared()
}

fn id_of(record: &Record) -> i32 {
    record.get(0).and_then(Value::as_int).unwrap()
}

fn deleted_count(records: &[Record]) -> i32 {
    assert_eq!(records.len(), 1);
    id_of(&records[0])
}

#[test]
fn test_seq_scan_visits_every_record() {
    let fx = setup(5);
    let mut scan = Executor::from(SeqScanExecutor::new(fx.table.clone()));
    assert_eq!(scan.executor_type(), ExecutorType::Basic);

    scan.init().unwrap();
    let mut seen = Vec::new();
    let mut false_checks = 0;
    while !scan.is_end() {
        false_checks += 1;
        seen.push(id_of(scan.record().unwrap()));
        scan.next().unwrap();
    }

    assert_eq!(false_checks, 5);
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    assert!(scan.is_end());
    assert!(scan.record().is_none());

    // Further calls stay at the end
    scan.next().unwrap();
    assert!(scan.is_end());
}

#[test]
fn test_seq_scan_empty_table() {
    let fx = setup(0);
    let mut scan = SeqScanExecutor::new(fx.table.clone());

    scan.init().unwrap();
    assert!(scan.is_end());
    assert!(scan.record().is_none());
}

#[test]
fn test_seq_scan_spans_pages() {
    let fx = setup(0);
    let rows = 600;
    {
        let mut table = lock(&fx.table);
        for id in 0..rows {
            table.insert_record(&student(id)).unwrap();
        }
        assert!(table.page_count() > 1);
    }

    let mut scan = Executor::from(SeqScanExecutor::new(fx.table.clone()));
    let ids: Vec<i32> = execute(&mut scan).unwrap().iter().map(id_of).collect();
    assert_eq!(ids, (0..rows).collect::<Vec<_>>());
}

#[test]
fn test_seq_scan_records_carry_rids() {
    let fx = setup(3);
    let mut scan = Executor::from(SeqScanExecutor::new(fx.table.clone()));

    let records = execute(&mut scan).unwrap();
    let rids: Vec<_> = records.iter().map(|r| r.rid().unwrap()).collect();
    assert_eq!(
        rids,
        vec![RecordId::new(0, 0), RecordId::new(0, 1), RecordId::new(0, 2)]
    );
}

#[test]
fn test_seq_scan_next_before_init() {
    let fx = setup(2);
    let mut scan = SeqScanExecutor::new(fx.table.clone());

    let err = scan.next().unwrap_err();
    assert!(matches!(err, ExecutorError::NotInitialized { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_seq_scan_reinit_restarts() {
    let fx = setup(3);
    let mut scan = SeqScanExecutor::new(fx.table.clone());

    scan.init().unwrap();
    scan.next().unwrap();
    scan.next().unwrap();
    assert_eq!(id_of(scan.record().unwrap()), 2);

    scan.init().unwrap();
    assert_eq!(id_of(scan.record().unwrap()), 0);
}

#[test]
fn test_seq_scan_out_schema_is_table_schema() {
    let fx = setup(1);
    let scan = Executor::from(SeqScanExecutor::new(fx.table.clone()));
    assert_eq!(scan.out_schema(), lock(&fx.table).schema());
}

#[test]
fn test_filter_passes_matching_records() {
    let fx = setup(10);
    let scan = SeqScanExecutor::new(fx.table.clone());
    let mut filter = Executor::from(FilterExecutor::new(scan, |r| id_of(r) % 3 == 0));

    let ids: Vec<i32> = execute(&mut filter).unwrap().iter().map(id_of).collect();
    assert_eq!(ids, vec![0, 3, 6, 9]);
    assert_eq!(filter.out_schema(), &student_schema());
}

#[test]
fn test_filter_matching_nothing() {
    let fx = setup(4);
    let scan = SeqScanExecutor::new(fx.table.clone());
    let mut filter = FilterExecutor::new(scan, |_| false);

    filter.init().unwrap();
    assert!(filter.is_end());
}

#[test]
fn test_filter_next_before_init() {
    let fx = setup(1);
    let mut filter = FilterExecutor::new(SeqScanExecutor::new(fx.table.clone()), |_| true);
    assert!(matches!(
        filter.next(),
        Err(ExecutorError::NotInitialized { .. })
    ));
}

#[test]
fn test_delete_all_rows_and_index_entries() {
    let fx = setup(6);
    let by_id = index_on(&fx.table, "student_id", &["id"]);
    let by_name = index_on(&fx.table, "student_name", &["name"]);
    assert_eq!(lock(&by_id).len(), 6);

    let scan = SeqScanExecutor::new(fx.table.clone());
    let mut delete = Executor::from(DeleteExecutor::new(
        scan,
        fx.table.clone(),
        vec![by_id.clone(), by_name.clone()],
    ));
    assert_eq!(delete.executor_type(), ExecutorType::Dml);

    let out = execute(&mut delete).unwrap();
    assert_eq!(deleted_count(&out), 6);
    assert_eq!(lock(&fx.table).record_count().unwrap(), 0);
    assert!(lock(&by_id).is_empty());
    assert!(lock(&by_name).is_empty());
}

#[test]
fn test_delete_filtered_rows() {
    let fx = setup(10);
    let by_id = index_on(&fx.table, "student_id", &["id"]);

    let scan = SeqScanExecutor::new(fx.table.clone());
    let filter = FilterExecutor::new(scan, |r| id_of(r) >= 7);
    let mut delete = Executor::from(DeleteExecutor::new(
        filter,
        fx.table.clone(),
        vec![by_id.clone()],
    ));

    assert_eq!(deleted_count(&execute(&mut delete).unwrap()), 3);

    let remaining: Vec<i32> = lock(&fx.table).scan().unwrap().iter().map(id_of).collect();
    assert_eq!(remaining, (0..7).collect::<Vec<_>>());

    let index = lock(&by_id);
    assert_eq!(index.len(), 7);
    let key = index.key_of(&student(8));
    assert!(index.lookup(&key).is_empty());
    let key = index.key_of(&student(6));
    assert_eq!(index.lookup(&key).len(), 1);
}

#[test]
fn test_delete_nothing_reports_zero() {
    let fx = setup(3);
    let scan = SeqScanExecutor::new(fx.table.clone());
    let filter = FilterExecutor::new(scan, |_| false);
    let mut delete = Executor::from(DeleteExecutor::new(filter, fx.table.clone(), vec![]));

    assert_eq!(deleted_count(&execute(&mut delete).unwrap()), 0);
    assert_eq!(lock(&fx.table).record_count().unwrap(), 3);
}

#[test]
fn test_delete_protocol() {
    let fx = setup(2);
    let mut delete =
        DeleteExecutor::new(SeqScanExecutor::new(fx.table.clone()), fx.table.clone(), vec![]);

    assert_eq!(delete.out_schema().field_count(), 1);
    assert_eq!(delete.out_schema().field(0).unwrap().name(), DELETED_FIELD);
    assert_eq!(
        delete.out_schema().field(0).unwrap().field_type(),
        FieldType::Int
    );

    assert!(!delete.is_end());
    assert!(delete.record().is_none());

    delete.next().unwrap();
    assert!(!delete.is_end());
    assert_eq!(delete.record().unwrap().values(), &[Value::Int(2)]);

    delete.next().unwrap();
    assert!(delete.is_end());
    assert!(delete.record().is_none());

    // Running off the end does not delete again
    delete.next().unwrap();
    assert!(delete.is_end());
}

#[test]
fn test_delete_init_is_unsupported() {
    let fx = setup(2);
    let mut delete = Executor::from(DeleteExecutor::new(
        SeqScanExecutor::new(fx.table.clone()),
        fx.table.clone(),
        vec![],
    ));

    let err = delete.init().unwrap_err();
    assert!(matches!(err, ExecutorError::InitUnsupported { .. }));
    assert!(err.is_fatal());
    assert_eq!(lock(&fx.table).record_count().unwrap(), 2);
}

#[test]
fn test_delete_with_stale_index_is_fatal() {
    let fx = setup(3);
    let by_id = index_on(&fx.table, "student_id", &["id"]);

    // Drop the entry for id 1 behind the operator's back
    {
        let mut index = lock(&by_id);
        let key = index.key_of(&student(1));
        index.delete_entry(&key, RecordId::new(0, 1)).unwrap();
    }

    let mut delete = Executor::from(DeleteExecutor::new(
        SeqScanExecutor::new(fx.table.clone()),
        fx.table.clone(),
        vec![by_id],
    ));

    let err = execute(&mut delete).unwrap_err();
    assert!(err.is_fatal());
    match err {
        ExecutorError::IndexInconsistency { index, rid, .. } => {
            assert_eq!(index, "student_id");
            assert_eq!(rid, RecordId::new(0, 1));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_delete_count_record_has_no_rid() {
    let fx = setup(1);
    let mut delete = Executor::from(DeleteExecutor::new(
        SeqScanExecutor::new(fx.table.clone()),
        fx.table.clone(),
        vec![],
    ));

    delete.next().unwrap();
    let count = delete.record().unwrap();
    assert_eq!(count.rid(), None);
    assert_eq!(count.len(), delete.out_schema().field_count());
}
