//! Tests for on-disk arrays against a recording storage double: resource
//! scoping, error precedence, variable lookup and char decoding

use cfdm::array::index::select_orthogonal;
use cfdm::array::{DType, Indexer, LazyArray, MaskedArray, NetCdfArray, Selector};
use cfdm::errors::{CfError, Result};
use cfdm::reader::CfReader;
use cfdm::storage::{RawArray, Storage, StorageHandle, VariableDescriptor};
use ndarray::{Array2, ArrayD};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Storage that records every open and close and can be told to fail
#[derive(Debug, Default)]
struct RecordingStorage {
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    fail_open: bool,
    fail_read: bool,
    fail_close: bool,
}

impl RecordingStorage {
    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct RecordingHandle {
    closes: Arc<AtomicUsize>,
    fail_read: bool,
    fail_close: bool,
}

fn temperature() -> ArrayD<f64> {
    Array2::from_shape_vec((2, 3), vec![10.0, 11.0, 12.0, 20.0, 21.0, 22.0])
        .expect("valid shape")
        .into_dyn()
}

fn station_names() -> ArrayD<u8> {
    Array2::from_shape_vec((2, 4), b"ab  \0\0\0\0".to_vec())
        .expect("valid shape")
        .into_dyn()
}

fn descriptors() -> Vec<VariableDescriptor> {
    vec![
        VariableDescriptor {
            name: "temp".to_string(),
            id: 0,
            dtype: Some(DType::Float64),
            shape: vec![2, 3],
            dimensions: vec!["station".to_string(), "time".to_string()],
            attributes: vec![("units".to_string(), "K".into())],
        },
        VariableDescriptor {
            name: "station_name".to_string(),
            id: 1,
            dtype: Some(DType::Char),
            shape: vec![2, 4],
            dimensions: vec!["station".to_string(), "strlen".to_string()],
            attributes: Vec::new(),
        },
    ]
}

fn check_group(group: &[String]) -> Result<()> {
    if group.is_empty() || group == ["forecast".to_string()] {
        Ok(())
    } else {
        Err(CfError::GroupNotFound {
            group: group.join("/"),
            path: "recording".to_string(),
        })
    }
}

impl Storage for RecordingStorage {
    fn open(&self, _locator: &Path) -> Result<Box<dyn StorageHandle>> {
        if self.fail_open {
            return Err(CfError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            )));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingHandle {
            closes: Arc::clone(&self.closes),
            fail_read: self.fail_read,
            fail_close: self.fail_close,
        }))
    }
}

impl StorageHandle for RecordingHandle {
    fn variables(&self, group: &[String]) -> Result<Vec<VariableDescriptor>> {
        check_group(group)?;
        Ok(descriptors())
    }

    fn dimensions(&self, group: &[String]) -> Result<Vec<(String, usize)>> {
        check_group(group)?;
        Ok(vec![
            ("station".to_string(), 2),
            ("time".to_string(), 3),
            ("strlen".to_string(), 4),
        ])
    }

    fn read(
        &self,
        group: &[String],
        variable: &str,
        positions: &[Vec<usize>],
        _masked: bool,
    ) -> Result<RawArray> {
        check_group(group)?;
        if self.fail_read {
            return Err(CfError::UnsupportedType("read failure".to_string()));
        }
        match variable {
            "temp" => Ok(RawArray::Numeric(MaskedArray::new(select_orthogonal(
                &temperature(),
                positions,
            )))),
            "station_name" => Ok(RawArray::Chars(select_orthogonal(
                &station_names(),
                positions,
            ))),
            other => Err(CfError::VariableNotFound {
                var: format!("'{other}'"),
            }),
        }
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(CfError::UnsupportedType("close failure".to_string()));
        }
        Ok(())
    }
}

fn on_disk(storage: &Arc<RecordingStorage>, name: Option<&str>, id: Option<usize>) -> NetCdfArray {
    let storage: Arc<dyn Storage> = Arc::clone(storage) as Arc<dyn Storage>;
    NetCdfArray::new(
        storage,
        "recording.nc",
        name.map(str::to_string),
        id,
        vec![2, 3],
        Some(DType::Float64),
    )
    .expect("valid variable reference")
}

#[test]
fn test_read_opens_and_closes() {
    let storage = Arc::new(RecordingStorage::default());
    let array = on_disk(&storage, Some("temp"), None);

    let values = array
        .fetch(&Indexer::from(vec![Selector::Index(1), Selector::range(1, 3)]))
        .expect("Failed to read temp");
    let values = values.into_numeric().unwrap();
    assert_eq!(values.shape(), &[2]);
    assert_eq!(values.value(&[0]), Some(&21.0));
    assert_eq!(values.value(&[1]), Some(&22.0));

    array.fetch(&Indexer::All).expect("Failed to read temp");
    assert_eq!(storage.opens(), 2);
    assert_eq!(storage.closes(), 2);
    assert!(!array.is_open());
}

#[test]
fn test_shape_needs_no_io() {
    let storage = Arc::new(RecordingStorage::default());
    let array = on_disk(&storage, Some("temp"), None);

    assert_eq!(array.shape(), &[2, 3]);
    assert_eq!(array.size(), 6);
    assert_eq!(array.dtype(), Some(DType::Float64));
    assert_eq!(storage.opens(), 0);
}

#[test]
fn test_read_failure_still_closes() {
    let storage = Arc::new(RecordingStorage {
        fail_read: true,
        ..Default::default()
    });
    let array = on_disk(&storage, Some("temp"), None);

    let result = array.fetch(&Indexer::All);
    assert!(matches!(result, Err(CfError::UnsupportedType(_))));
    assert_eq!(storage.opens(), 1);
    assert_eq!(storage.closes(), 1);
}

#[test]
fn test_read_error_wins_over_close_error() {
    let storage = Arc::new(RecordingStorage {
        fail_read: true,
        fail_close: true,
        ..Default::default()
    });
    let array = on_disk(&storage, Some("temp"), None);

    match array.fetch(&Indexer::All) {
        Err(CfError::UnsupportedType(message)) => assert_eq!(message, "read failure"),
        other => panic!("expected the read failure, got {other:?}"),
    }
    assert_eq!(storage.closes(), 1);
}

#[test]
fn test_close_failure_after_read() {
    let storage = Arc::new(RecordingStorage {
        fail_close: true,
        ..Default::default()
    });
    let array = on_disk(&storage, Some("temp"), None);

    assert!(matches!(
        array.fetch(&Indexer::All),
        Err(CfError::ResourceClose { .. })
    ));
    assert_eq!(storage.opens(), storage.closes());
}

#[test]
fn test_open_failure() {
    let storage = Arc::new(RecordingStorage {
        fail_open: true,
        ..Default::default()
    });
    let array = on_disk(&storage, Some("temp"), None);

    match array.fetch(&Indexer::All) {
        Err(CfError::ResourceOpen { locator, .. }) => {
            assert_eq!(locator, Path::new("recording.nc"))
        }
        other => panic!("expected ResourceOpen, got {other:?}"),
    }
    assert_eq!(storage.closes(), 0);
}

#[test]
fn test_keep_open_reuses_handle() {
    let storage = Arc::new(RecordingStorage::default());
    let array = on_disk(&storage, Some("temp"), None).with_keep_open(true);

    array.fetch(&Indexer::All).expect("Failed to read temp");
    array.fetch(&Indexer::All).expect("Failed to read temp");
    assert!(array.is_open());
    assert_eq!(storage.opens(), 1);
    assert_eq!(storage.closes(), 0);

    array.close().expect("Failed to close");
    assert!(!array.is_open());
    assert_eq!(storage.closes(), 1);

    // Closing again is a no-op
    array.close().expect("Failed to close");
    assert_eq!(storage.closes(), 1);
}

#[test]
fn test_duplicate_does_not_share_handle() {
    let storage = Arc::new(RecordingStorage::default());
    let array = on_disk(&storage, Some("temp"), None).with_keep_open(true);
    array.fetch(&Indexer::All).expect("Failed to read temp");

    let copy = array.duplicate();
    copy.fetch(&Indexer::All).expect("Failed to read copy");
    assert_eq!(storage.opens(), 2);
    array.close().expect("Failed to close");
}

#[test]
fn test_variable_by_position() {
    let storage = Arc::new(RecordingStorage::default());
    let by_id = on_disk(&storage, None, Some(0));
    let by_name = on_disk(&storage, Some("temp"), None);

    assert_eq!(
        by_id.fetch(&Indexer::All).unwrap(),
        by_name.fetch(&Indexer::All).unwrap()
    );
    assert_eq!(by_id.file_address().1, "0");
}

#[test]
fn test_missing_variable() {
    let storage = Arc::new(RecordingStorage::default());

    let array = on_disk(&storage, Some("salinity"), None);
    assert!(matches!(
        array.fetch(&Indexer::All),
        Err(CfError::VariableNotFound { .. })
    ));

    let array = on_disk(&storage, None, Some(7));
    assert!(matches!(
        array.fetch(&Indexer::All),
        Err(CfError::VariableNotFound { .. })
    ));
    assert_eq!(storage.opens(), storage.closes());
}

#[test]
fn test_missing_group() {
    let storage = Arc::new(RecordingStorage::default());
    let array = on_disk(&storage, Some("temp"), None).with_group(vec!["hindcast".to_string()]);

    assert!(matches!(
        array.fetch(&Indexer::All),
        Err(CfError::GroupNotFound { .. })
    ));
    assert_eq!(storage.opens(), storage.closes());

    let nested = on_disk(&storage, Some("temp"), None).with_group(vec!["forecast".to_string()]);
    assert!(nested.fetch(&Indexer::All).is_ok());
}

#[test]
fn test_requires_variable_reference() {
    let storage: Arc<dyn Storage> = Arc::new(RecordingStorage::default());
    let result = NetCdfArray::new(storage, "recording.nc", None, None, vec![1], None);
    assert!(matches!(result, Err(CfError::InvalidVariableReference)));
}

#[test]
fn test_char_variable_decoding() {
    let storage = Arc::new(RecordingStorage::default());
    let array = NetCdfArray::new(
        Arc::clone(&storage) as Arc<dyn Storage>,
        "recording.nc",
        Some("station_name".to_string()),
        None,
        vec![2],
        Some(DType::Char),
    )
    .unwrap();

    let names = array.fetch(&Indexer::All).unwrap();
    let names = names.as_text().expect("text values");
    assert_eq!(names.shape(), &[2]);
    assert_eq!(names.value(&[0]).map(String::as_str), Some("ab"));
    assert_eq!(names.value(&[1]), None);
    assert_eq!(names.count_masked(), 1);
}

#[test]
fn test_reader_over_storage() {
    let storage = Arc::new(RecordingStorage::default());
    let reader = CfReader::with_storage(
        Arc::clone(&storage) as Arc<dyn Storage>,
        "recording.nc",
        Vec::new(),
    )
    .expect("Failed to read metadata");
    assert_eq!(storage.opens(), 1);
    assert_eq!(storage.closes(), 1);

    assert_eq!(reader.variable_names(), vec!["temp", "station_name"]);
    assert_eq!(
        reader.properties("temp").unwrap().get_property("units").unwrap().as_str(),
        Some("K")
    );

    let names = reader.data("station_name").unwrap();
    assert_eq!(names.shape().unwrap(), &[2]);
    assert!(names.array().unwrap().is_text());
    assert!(matches!(
        reader.data("salinity"),
        Err(CfError::VariableNotFound { .. })
    ));
    assert_eq!(storage.opens(), storage.closes());
}
