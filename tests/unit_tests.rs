//! Unit tests for the cfdm core: properties, index expressions, array
//! backings, compression, data and constructs

use cfdm::array::{
    ArrayValue, CompressionType, DType, GatheredArray, InMemoryArray, Indexer, LazyArray,
    MaskedArray, RaggedContiguousArray, Selector, NC_FILL_DOUBLE,
};
use cfdm::config::{self, Config, ParallelConfig};
use cfdm::constructs::{
    Bounds, CellType, Construct, Count, DimensionCoordinate, HasBounds, HasData, HasProperties,
    List, NetCdfDimension, NetCdfSampleDimension, NetCdfVariable, PropertiesData, Reconstruct,
};
use cfdm::data::Data;
use cfdm::equals::{is_close, EqualsOptions};
use cfdm::errors::CfError;
use cfdm::properties::{Properties, PropertyValue};
use ndarray::{Array1, Array2, ArrayD, IxDyn};
use std::sync::Arc;

fn array2(rows: usize, cols: usize, values: Vec<f64>) -> ArrayD<f64> {
    Array2::from_shape_vec((rows, cols), values)
        .expect("valid shape")
        .into_dyn()
}

fn vector(values: &[f64]) -> ArrayD<f64> {
    Array1::from(values.to_vec()).into_dyn()
}

fn numeric(value: ArrayValue) -> MaskedArray<f64> {
    value.into_numeric().expect("numeric values")
}

fn select(selectors: Vec<Selector>) -> Indexer {
    Indexer::from(selectors)
}

/// Counts [3, 0, 2] over five stored elements
fn ragged() -> RaggedContiguousArray {
    let compressed = Data::from_f64(vector(&[1.0, 2.0, 3.0, 4.0, 5.0]));
    RaggedContiguousArray::new(compressed, Count::from_counts(&[3, 0, 2]))
        .expect("valid ragged array")
}

/// Two times of five points, of which points 1 and 3 are stored
fn gathered() -> GatheredArray {
    let compressed = Data::from_f64(array2(2, 2, vec![1.0, 2.0, 3.0, 4.0]));
    GatheredArray::new(compressed, vec![2, 5], 1, vec![1], List::from_indices(&[1, 3]))
        .expect("valid gathered array")
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_property_round_trip() {
    let mut props = Properties::new();
    assert!(props.set_property("units", "K").is_none());
    assert_eq!(
        props.set_property("units", "degC"),
        Some(PropertyValue::from("K"))
    );

    assert!(props.has_property("units"));
    assert_eq!(props.get_property("units").unwrap().as_str(), Some("degC"));

    let default = PropertyValue::from(-1);
    assert_eq!(props.get_property_or("missing", &default), &default);

    assert_eq!(props.del_property("units"), Some(PropertyValue::from("degC")));
    assert!(!props.has_property("units"));
    assert!(props.del_property("units").is_none());
}

#[test]
fn test_missing_property_error() {
    let props = Properties::new();
    match props.get_property("standard_name") {
        Err(CfError::PropertyNotFound { name, .. }) => assert_eq!(name, "standard_name"),
        other => panic!("expected PropertyNotFound, got {other:?}"),
    }
}

#[test]
fn test_replace_and_clear_properties() {
    let mut props: Properties = [("units".to_string(), PropertyValue::from("m"))]
        .into_iter()
        .collect();

    let mut replacement = std::collections::BTreeMap::new();
    replacement.insert("long_name".to_string(), PropertyValue::from("height"));
    let old = props.replace_properties(replacement);

    assert_eq!(old.len(), 1);
    assert!(old.contains_key("units"));
    assert_eq!(props.properties().keys().collect::<Vec<_>>(), vec!["long_name"]);

    let cleared = props.clear_properties();
    assert_eq!(cleared.len(), 1);
    assert!(props.is_empty());
}

#[test]
fn test_set_property_moves_value() {
    let mut props = Properties::new();
    let flags = PropertyValue::Ints(vec![1, 2, 4]);
    props.set_property("flag_masks", flags.clone());

    let mut snapshot = props.properties();
    if let Some(PropertyValue::Ints(stored)) = snapshot.get_mut("flag_masks") {
        stored.push(8);
    }
    assert_eq!(props.get_property("flag_masks").unwrap(), &flags);
}

#[test]
fn test_names_order() {
    let mut props = Properties::new();
    props.set_property("units", "K");
    props.set_property("long_name", "Air Temperature");
    props.set_property("standard_name", "air_temperature");
    props.set_property("axis", "T");

    assert_eq!(
        props.names(Some("ta")),
        vec![
            "air_temperature".to_string(),
            "long_name=Air Temperature".to_string(),
            "ncvar%ta".to_string(),
            "axis=T".to_string(),
            "standard_name=air_temperature".to_string(),
            "units=K".to_string(),
        ]
    );
    assert_eq!(props.name(Some("ta"), None).as_deref(), Some("air_temperature"));
}

#[test]
fn test_name_falls_back() {
    let mut props = Properties::new();
    assert_eq!(props.name(None, Some("unknown")).as_deref(), Some("unknown"));
    assert_eq!(props.name(Some("x"), Some("unknown")).as_deref(), Some("ncvar%x"));

    props.set_property("cf_role", "timeseries_id");
    assert_eq!(
        props.name(Some("x"), None).as_deref(),
        Some("cf_role=timeseries_id")
    );
}

#[test]
fn test_properties_equal_within_tolerance() {
    let mut a = Properties::new();
    a.set_property("scale", 1.0);
    a.set_property("valid_max", 10);
    let mut b = Properties::new();
    b.set_property("scale", 1.0 + 1e-10);
    b.set_property("valid_max", 10.0);

    let options = EqualsOptions::new();
    assert!(a.equals(&b, &options));

    b.set_property("scale", 1.1);
    assert!(!a.equals(&b, &options));
}

#[test]
fn test_properties_equal_ignores() {
    let mut a = Properties::new();
    a.set_property("units", "K");
    a.set_property("_FillValue", -999.0);
    a.set_property("comment", "first");
    let mut b = Properties::new();
    b.set_property("units", "K");
    b.set_property("comment", "second");

    assert!(!a.equals(&b, &EqualsOptions::new()));
    assert!(!a.equals(&b, &EqualsOptions::new().ignore_fill_value(true)));
    assert!(a.equals(
        &b,
        &EqualsOptions::new()
            .ignore_fill_value(true)
            .ignore_properties(["comment"])
    ));
}

#[test]
fn test_string_vectors_must_match() {
    let x = PropertyValue::Strs(vec!["a".into(), "b".into()]);
    let y = PropertyValue::Strs(vec!["a".into()]);
    assert!(!x.is_close(&y, 0.0, 0.0));
    assert!(PropertyValue::from("a").is_close(&y, 0.0, 0.0));
}

#[test]
fn test_is_close() {
    assert!(is_close(1.0, 1.0 + 1e-10, 1e-8, 1e-5));
    assert!(!is_close(1.0, 1.1, 1e-8, 1e-5));
    assert!(is_close(f64::NAN, f64::NAN, 0.0, 0.0));
    assert!(!is_close(f64::NAN, 1.0, 0.0, 0.0));
}

// ---------------------------------------------------------------------------
// Index expressions and in-memory arrays
// ---------------------------------------------------------------------------

#[test]
fn test_index_drops_dimension() {
    let array = InMemoryArray::from_f64(array2(2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]));
    let row = numeric(array.fetch(&select(vec![Selector::Index(-1)])).unwrap());
    assert_eq!(row.shape(), &[3]);
    assert_eq!(row.data(), &vector(&[3.0, 4.0, 5.0]));
}

#[test]
fn test_orthogonal_lists() {
    let array = InMemoryArray::from_f64(array2(2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]));
    let values = numeric(
        array
            .fetch(&select(vec![Selector::list([1, 0]), Selector::list([0, 2])]))
            .unwrap(),
    );
    assert_eq!(values.data(), &array2(2, 2, vec![3.0, 5.0, 0.0, 2.0]));
}

#[test]
fn test_slices() {
    let array = InMemoryArray::from_f64(vector(&[0.0, 1.0, 2.0, 3.0, 4.0]));

    let reversed = numeric(
        array
            .fetch(&select(vec![Selector::Slice {
                start: None,
                stop: None,
                step: -2,
            }]))
            .unwrap(),
    );
    assert_eq!(reversed.data(), &vector(&[4.0, 2.0, 0.0]));

    let clamped = numeric(array.fetch(&select(vec![Selector::range(-2, 100)])).unwrap());
    assert_eq!(clamped.data(), &vector(&[3.0, 4.0]));

    let empty = numeric(array.fetch(&select(vec![Selector::range(3, 1)])).unwrap());
    assert_eq!(empty.shape(), &[0]);
}

#[test]
fn test_index_errors() {
    let array = InMemoryArray::from_f64(vector(&[0.0, 1.0]));
    assert!(matches!(
        array.fetch(&select(vec![Selector::Index(2)])),
        Err(CfError::IndexOutOfBounds { .. })
    ));
    assert!(matches!(
        array.fetch(&select(vec![Selector::List(vec![0, -3])])),
        Err(CfError::IndexOutOfBounds { .. })
    ));
    assert!(matches!(
        array.fetch(&select(vec![Selector::Slice {
            start: None,
            stop: None,
            step: 0
        }])),
        Err(CfError::IndexOutOfBounds { .. })
    ));
    assert!(matches!(
        array.fetch(&select(vec![Selector::full(), Selector::full()])),
        Err(CfError::IndexOutOfBounds { .. })
    ));
}

#[test]
fn test_masked_array_mask_shape() {
    let data = vector(&[1.0, 2.0]);
    let mask = ArrayD::from_elem(IxDyn(&[3]), false);
    assert!(matches!(
        MaskedArray::with_mask(data.clone(), mask),
        Err(CfError::ShapeMismatch { .. })
    ));

    let unmasked = MaskedArray::with_mask(data, ArrayD::from_elem(IxDyn(&[2]), false)).unwrap();
    assert!(unmasked.mask().is_none());
}

#[test]
fn test_map_unmasked_keeps_masked_values() {
    let mask = Array1::from(vec![false, true, false]).into_dyn();
    let array = MaskedArray::with_mask(vector(&[2.0, -1.0, 4.0]), mask)
        .unwrap()
        .map_unmasked(|&v| v * 0.5 + 10.0);

    assert_eq!(array.data(), &vector(&[11.0, -1.0, 12.0]));
    assert_eq!(array.count_masked(), 1);
}

// ---------------------------------------------------------------------------
// Compressed backings
// ---------------------------------------------------------------------------

#[test]
fn test_ragged_uncompression() {
    let array = ragged();
    assert_eq!(array.shape(), &[3, 3]);
    assert_eq!(array.counts(), &[3, 0, 2]);

    let values = numeric(array.fetch(&Indexer::All).unwrap());
    assert_eq!(values.value(&[0, 0]), Some(&1.0));
    assert_eq!(values.value(&[0, 2]), Some(&3.0));
    assert_eq!(values.value(&[1, 0]), None);
    assert_eq!(values.value(&[1, 2]), None);
    assert_eq!(values.value(&[2, 0]), Some(&4.0));
    assert_eq!(values.value(&[2, 1]), Some(&5.0));
    assert_eq!(values.value(&[2, 2]), None);
    assert_eq!(values.count_masked(), 4);
    assert_eq!(values.data()[IxDyn(&[2, 2])], NC_FILL_DOUBLE);
}

#[test]
fn test_ragged_subset() {
    let array = ragged();
    let last = numeric(array.fetch(&select(vec![Selector::Index(2)])).unwrap());
    assert_eq!(last.shape(), &[3]);
    assert_eq!(last.value(&[0]), Some(&4.0));
    assert_eq!(last.value(&[1]), Some(&5.0));
    assert_eq!(last.value(&[2]), None);

    let empty_feature = numeric(array.fetch(&select(vec![Selector::Index(1)])).unwrap());
    assert_eq!(empty_feature.count_masked(), 3);
}

#[test]
fn test_ragged_count_mismatch() {
    let compressed = Data::from_f64(vector(&[1.0, 2.0, 3.0]));
    let result = RaggedContiguousArray::new(compressed, Count::from_counts(&[2, 2]));
    assert!(matches!(result, Err(CfError::CompressionIndex { .. })));
}

#[test]
fn test_ragged_invalid_counts() {
    let compressed = Data::from_f64(vector(&[1.0, 2.0, 3.0]));
    let count = Count::new(Properties::new(), Some(Data::from_f64(vector(&[1.5, 1.5]))));
    assert!(matches!(
        RaggedContiguousArray::new(compressed, count),
        Err(CfError::CompressionIndex { .. })
    ));
}

#[test]
fn test_ragged_explicit_shape() {
    let compressed = Data::from_f64(vector(&[1.0, 2.0, 3.0, 4.0, 5.0]));
    let result =
        RaggedContiguousArray::with_shape(compressed, Count::from_counts(&[3, 0, 2]), &[3, 4]);
    assert!(matches!(result, Err(CfError::ShapeMismatch { .. })));
}

#[test]
fn test_ragged_with_trailing_dimension() {
    let compressed = Data::from_f64(array2(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    let array = RaggedContiguousArray::new(compressed, Count::from_counts(&[1, 2])).unwrap();
    assert_eq!(array.shape(), &[2, 2, 2]);

    let values = numeric(array.fetch(&Indexer::All).unwrap());
    assert_eq!(values.value(&[0, 0, 1]), Some(&2.0));
    assert_eq!(values.value(&[0, 1, 0]), None);
    assert_eq!(values.value(&[1, 1, 1]), Some(&6.0));
}

#[test]
fn test_gathered_uncompression() {
    let array = gathered();
    assert_eq!(array.shape(), &[2, 5]);

    let values = numeric(array.fetch(&Indexer::All).unwrap());
    assert_eq!(values.value(&[0, 0]), None);
    assert_eq!(values.value(&[0, 1]), Some(&1.0));
    assert_eq!(values.value(&[0, 3]), Some(&2.0));
    assert_eq!(values.value(&[1, 1]), Some(&3.0));
    assert_eq!(values.value(&[1, 3]), Some(&4.0));
    assert_eq!(values.count_masked(), 6);
}

#[test]
fn test_gathered_subset() {
    let array = gathered();
    let values = numeric(
        array
            .fetch(&select(vec![Selector::Index(1), Selector::list([3, 4])]))
            .unwrap(),
    );
    assert_eq!(values.shape(), &[2]);
    assert_eq!(values.value(&[0]), Some(&4.0));
    assert_eq!(values.value(&[1]), None);
}

#[test]
fn test_gathered_over_two_axes() {
    let compressed = Data::from_f64(vector(&[10.0, 20.0, 30.0]));
    let array = GatheredArray::new(
        compressed,
        vec![2, 3],
        0,
        vec![0, 1],
        List::from_indices(&[0, 4, 5]),
    )
    .unwrap();

    let values = numeric(array.fetch(&Indexer::All).unwrap());
    assert_eq!(values.value(&[0, 0]), Some(&10.0));
    assert_eq!(values.value(&[0, 1]), None);
    assert_eq!(values.value(&[1, 1]), Some(&20.0));
    assert_eq!(values.value(&[1, 2]), Some(&30.0));
}

#[test]
fn test_gathered_invalid_lists() {
    let compressed = || Data::from_f64(array2(2, 2, vec![1.0, 2.0, 3.0, 4.0]));

    let duplicate =
        GatheredArray::new(compressed(), vec![2, 3], 1, vec![1], List::from_indices(&[1, 1]));
    assert!(matches!(duplicate, Err(CfError::CompressionIndex { .. })));

    let out_of_range =
        GatheredArray::new(compressed(), vec![2, 3], 1, vec![1], List::from_indices(&[1, 3]));
    assert!(matches!(out_of_range, Err(CfError::CompressionIndex { .. })));

    let wrong_length =
        GatheredArray::new(compressed(), vec![2, 3], 1, vec![1], List::from_indices(&[0]));
    assert!(matches!(wrong_length, Err(CfError::CompressionIndex { .. })));

    let wrong_shape =
        GatheredArray::new(compressed(), vec![3, 5], 1, vec![1], List::from_indices(&[0, 1]));
    assert!(matches!(wrong_shape, Err(CfError::ShapeMismatch { .. })));
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

#[test]
fn test_data_without_array() {
    let data = Data::default();
    assert!(!data.has_array());
    assert!(matches!(data.shape(), Err(CfError::ArrayNotSet)));
    assert!(matches!(data.array(), Err(CfError::ArrayNotSet)));
    assert!(data.dtype().is_none());
}

#[test]
fn test_data_to_memory_idempotent() {
    let mut data = Data::new(ragged());
    assert_eq!(data.compression_type(), Some(CompressionType::RaggedContiguous));
    let before = data.array().unwrap();

    data.to_memory().unwrap();
    assert!(data.compression_type().is_none());
    let once = data.array().unwrap();

    data.to_memory().unwrap();
    assert_eq!(data.array().unwrap(), once);
    assert_eq!(once, before);
}

#[test]
fn test_data_copy() {
    let data = Data::from_f64(vector(&[1.0, 2.0, 3.0]));

    let shared = data.copy(false);
    assert!(Arc::ptr_eq(
        data.backing_array().unwrap(),
        shared.backing_array().unwrap()
    ));

    let deep = data.copy(true);
    assert!(!Arc::ptr_eq(
        data.backing_array().unwrap(),
        deep.backing_array().unwrap()
    ));
    assert!(data.equals(&deep, &EqualsOptions::new()));
}

#[test]
fn test_data_equals() {
    let a = Data::from_f64(vector(&[1.0, 2.0, 3.0]));
    let b = Data::from_f64(vector(&[1.0, 2.0 + 1e-12, 3.0]));
    let c = Data::from_f64(vector(&[1.0, 2.5, 3.0]));
    let options = EqualsOptions::new();

    assert!(a.equals(&b, &options));
    assert!(!a.equals(&c, &options));
    assert!(a.equals(&c, &EqualsOptions::new().atol(1.0)));
    assert!(!a.equals(&Data::from_f64(vector(&[1.0, 2.0])), &options));
}

#[test]
fn test_data_equals_data_type() {
    let a = Data::from_f64(vector(&[1.0, 2.0]));
    let b = Data::new(InMemoryArray::with_dtype(vector(&[1.0, 2.0]), Some(DType::Float32)));

    assert!(!a.equals(&b, &EqualsOptions::new()));
    assert!(a.equals(&b, &EqualsOptions::new().ignore_data_type(true)));
}

#[test]
fn test_data_equals_masks() {
    let a = Data::new(ragged());
    let mut b = Data::new(ragged());
    b.to_memory().unwrap();
    assert!(a.equals(&b, &EqualsOptions::new()));

    let unmasked = numeric(a.array().unwrap()).filled(0.0);
    assert!(!a.equals(&Data::from_f64(unmasked), &EqualsOptions::new()));
}

#[test]
fn test_data_compression_introspection() {
    let data = Data::new(gathered());
    assert_eq!(data.compression_type(), Some(CompressionType::Gathered));
    assert!(data.count().is_none());
    assert_eq!(data.list().unwrap().indices().unwrap(), vec![1, 3]);
    assert_eq!(data.compressed_array().unwrap().shape().unwrap(), &[2, 2]);

    let ragged = Data::new(ragged());
    assert_eq!(ragged.count().unwrap().counts().unwrap(), vec![3, 0, 2]);
    assert!(ragged.list().is_none());
}

#[test]
fn test_copy_of_compressed_data() {
    let data = Data::new(ragged());
    let deep = data.copy(true);
    assert_eq!(deep.compression_type(), Some(CompressionType::RaggedContiguous));
    assert!(data.equals(&deep, &EqualsOptions::new()));
}

// ---------------------------------------------------------------------------
// Constructs
// ---------------------------------------------------------------------------

fn latitude() -> DimensionCoordinate {
    let mut props = Properties::new();
    props.set_property("standard_name", "latitude");
    props.set_property("units", "degrees_north");

    let bounds = Bounds::new(
        Properties::new(),
        Some(Data::from_f64(array2(3, 2, vec![-90.0, -30.0, -30.0, 30.0, 30.0, 90.0]))),
    );
    let mut coordinate = DimensionCoordinate::new(
        props,
        Some(Data::from_f64(vector(&[-60.0, 0.0, 60.0]))),
        Some(bounds),
    )
    .with_nc_variable("lat");
    coordinate.set_cell_type(CellType::Interval);
    coordinate
}

#[test]
fn test_construct_copy_equals() {
    let coordinate = latitude();
    let copy = coordinate.copy();
    assert!(coordinate.equals(&copy, &EqualsOptions::new()));
    assert_eq!(copy.nc_variable(), Some("lat"));
    assert_eq!(copy.cell_type(), Some(&CellType::Interval));
    assert!(!Arc::ptr_eq(
        coordinate.data().unwrap().backing_array().unwrap(),
        copy.data().unwrap().backing_array().unwrap()
    ));

    let shallow = coordinate.copy_with(false);
    assert!(Arc::ptr_eq(
        coordinate.data().unwrap().backing_array().unwrap(),
        shallow.data().unwrap().backing_array().unwrap()
    ));
}

#[test]
fn test_construct_difference() {
    let coordinate = latitude();

    let mut changed = coordinate.copy();
    changed.set_property("units", PropertyValue::from("degrees"));
    assert!(!coordinate.equals(&changed, &EqualsOptions::new().verbose(true)));

    let mut unbounded = coordinate.copy();
    unbounded.del_bounds();
    assert!(!coordinate.equals(&unbounded, &EqualsOptions::new()));

    let mut point = coordinate.copy();
    point.set_cell_type(CellType::Point);
    assert!(!coordinate.equals(&point, &EqualsOptions::new()));
}

#[test]
fn test_construct_type_mismatch() {
    let data = Data::from_f64(vector(&[0.0, 1.0]));
    let list = List::new(Properties::new(), Some(data.clone()));
    let bounds = Bounds::new(Properties::new(), Some(data));

    assert!(!list.equals(&bounds, &EqualsOptions::new()));
    assert!(list.equals(&bounds, &EqualsOptions::new().ignore_type(true)));
}

#[test]
fn test_validate_bounds_shape() {
    let mut coordinate = latitude();
    assert!(coordinate.validate().is_ok());

    coordinate.set_bounds(Bounds::new(
        Properties::new(),
        Some(Data::from_f64(array2(2, 2, vec![0.0; 4]))),
    ));
    assert!(matches!(
        coordinate.validate(),
        Err(CfError::ShapeMismatch { .. })
    ));

    coordinate.del_bounds();
    coordinate.set_ancillary("interior_ring", Data::from_f64(vector(&[0.0; 4])));
    assert!(matches!(
        coordinate.validate(),
        Err(CfError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_from_source_missing_capabilities() {
    let mut props = Properties::new();
    props.set_property("long_name", "number of observations");
    let source = PropertiesData::new(props, Some(Data::from_f64(vector(&[2.0, 1.0]))))
        .with_nc_variable("row_size");

    let count = Count::from_source(&source, true);
    assert_eq!(count.nc_variable(), Some("row_size"));
    assert!(count.nc_dimension().is_none());
    assert!(count.nc_sample_dimension().is_none());
    assert_eq!(count.counts().unwrap(), vec![2, 1]);

    let coordinate = DimensionCoordinate::from_source(&source, false);
    assert!(!coordinate.has_bounds());
    assert!(coordinate.cell_type().is_none());
}

#[test]
fn test_count_keeps_netcdf_names() {
    let mut count = Count::from_counts(&[1, 2]);
    count.set_nc_dimension("station");
    count.set_nc_sample_dimension("obs");

    let mut copy = count.copy();
    assert_eq!(copy.nc_dimension(), Some("station"));
    assert_eq!(copy.nc_sample_dimension(), Some("obs"));
    assert_eq!(copy.del_nc_dimension(), Some("station".to_string()));
}

#[test]
fn test_construct_names() {
    let coordinate = latitude();
    assert_eq!(coordinate.name(None).as_deref(), Some("latitude"));
    assert_eq!(coordinate.names()[1], "ncvar%lat");

    let anonymous = PropertiesData::default();
    assert_eq!(anonymous.name(Some("default")).as_deref(), Some("default"));
    assert!(anonymous.names().is_empty());
}

#[test]
fn test_construct_without_data() {
    let mut construct = PropertiesData::new(Properties::new(), None);
    assert!(!construct.has_data());
    assert!(matches!(construct.get_data(), Err(CfError::ArrayNotSet)));

    construct.set_data(Data::from_f64(vector(&[1.0])));
    assert!(construct.has_data());
    assert!(construct.del_data().is_some());
}

// ---------------------------------------------------------------------------
// Configuration and errors
// ---------------------------------------------------------------------------

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.atol, config::DEFAULT_ATOL);
    assert_eq!(config.rtol, config::DEFAULT_RTOL);
    assert_eq!(config.log_level, "warn");
    assert!(config.parallel.num_threads.is_none());
}

#[test]
fn test_invalid_tolerance() {
    assert!(matches!(config::set_atol(-1.0), Err(CfError::Config(_))));
    assert!(matches!(config::set_rtol(f64::NAN), Err(CfError::Config(_))));
}

#[test]
fn test_config_from_vars() {
    let vars = [
        ("CFDM_ATOL", "1e-6"),
        ("CFDM_RTOL", " 0.001 "),
        ("CFDM_LOG", "cfdm=debug"),
        ("CFDM_NUM_THREADS", "3"),
    ];
    let config = Config::from_vars(|name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    })
    .expect("Failed to parse configuration");

    assert_eq!(config.atol, 1e-6);
    assert_eq!(config.rtol, 1e-3);
    assert_eq!(config.log_level, "cfdm=debug");
    assert_eq!(config.parallel.num_threads, Some(3));
}

#[test]
fn test_config_from_vars_defaults() {
    let config = Config::from_vars(|_| None).expect("Failed to parse configuration");
    assert_eq!(config.atol, config::DEFAULT_ATOL);
    assert_eq!(config.rtol, config::DEFAULT_RTOL);
    assert_eq!(config.log_level, "warn");
    assert!(config.parallel.num_threads.is_none());
}

#[test]
fn test_config_invalid_values() {
    let lookup = |value: &'static str| {
        move |name: &str| (name == "CFDM_ATOL").then(|| value.to_string())
    };
    match Config::from_vars(lookup("tiny")) {
        Err(CfError::Config(message)) => assert!(message.contains("CFDM_ATOL")),
        other => panic!("expected a configuration error, got {other:?}"),
    }
    assert!(matches!(
        Config::from_vars(lookup("-1")),
        Err(CfError::Config(_))
    ));

    let threads = Config::from_vars(|name| (name == "CFDM_NUM_THREADS").then(|| "many".to_string()));
    assert!(matches!(threads, Err(CfError::Config(_))));
}

#[test]
fn test_config_apply() {
    Config::default().apply().expect("Failed to apply configuration");
    assert_eq!(config::atol(), config::DEFAULT_ATOL);
    assert_eq!(config::rtol(), config::DEFAULT_RTOL);

    let invalid = Config {
        rtol: f64::INFINITY,
        ..Config::default()
    };
    assert!(matches!(invalid.apply(), Err(CfError::Config(_))));
    assert_eq!(config::rtol(), config::DEFAULT_RTOL);
}

#[test]
fn test_parallel_config() {
    let config = ParallelConfig::with_threads(4);
    assert_eq!(config.num_threads, Some(4));

    let all = ParallelConfig::all_cores();
    assert!(all.num_threads.unwrap() > 0);
    assert!(ParallelConfig::default().current_threads() > 0);
}

#[test]
fn test_missing_property_names_construct() {
    let count = Count::from_counts(&[1, 2]);
    match count.get_property("units") {
        Err(err @ CfError::PropertyNotFound { .. }) => {
            assert_eq!(err.to_string(), "Count has no 'units' property")
        }
        other => panic!("expected PropertyNotFound, got {other:?}"),
    }

    match latitude().get_property("axis") {
        Err(CfError::PropertyNotFound { owner, .. }) => {
            assert_eq!(owner, "DimensionCoordinate")
        }
        other => panic!("expected PropertyNotFound, got {other:?}"),
    }

    match PropertiesData::default().get_property("units") {
        Err(CfError::PropertyNotFound { owner, .. }) => assert_eq!(owner, "PropertiesData"),
        other => panic!("expected PropertyNotFound, got {other:?}"),
    }
}

#[test]
fn test_error_messages() {
    let err = CfError::PropertyNotFound {
        owner: "Count".to_string(),
        name: "units".to_string(),
    };
    assert_eq!(err.to_string(), "Count has no 'units' property");

    let err = CfError::VariableNotFound {
        var: "'temp'".to_string(),
    };
    assert!(err.to_string().contains("Variable 'temp' not found"));
}
