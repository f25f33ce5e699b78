use crate::error::DataQualityWarning;
use crate::names::RegionKey;
use crate::types::{GeometryRecord, JoinedRecord, ValueRecord};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct JoinOutcome {
    /// One record per geometry, in geometry input order.
    pub joined: Vec<JoinedRecord>,
    /// Geometry display names whose key matched no value row, in input order.
    pub mismatches: Vec<String>,
    /// Value rows whose key matched no geometry. Dropped from the output.
    pub unused_values: Vec<String>,
}

impl JoinOutcome {
    pub fn present_values(&self) -> Vec<f64> {
        self.joined.iter().filter_map(|r| r.value).collect()
    }

    pub fn warnings(&self) -> impl Iterator<Item = DataQualityWarning> + '_ {
        self.mismatches
            .iter()
            .map(|region| DataQualityWarning::NoMatchingValue { region: region.clone() })
    }
}

/// Left outer join of geometries against values on the normalized key.
///
/// Later value rows overwrite earlier ones with the same key, including when
/// the later row's value is absent. Rows with an empty key never match.
pub fn join(geometries: Vec<GeometryRecord>, values: Vec<ValueRecord>) -> JoinOutcome {
    let mut by_key: HashMap<RegionKey, (String, Option<f64>)> = HashMap::new();
    let mut value_order: Vec<RegionKey> = Vec::new();
    for record in values {
        if record.key.is_empty() {
            warn!(value = ?record.value, "value row has no region name; not joined");
            continue;
        }
        if !by_key.contains_key(&record.key) {
            value_order.push(record.key.clone());
        }
        by_key.insert(record.key, (record.display_name, record.value));
    }

    let mut used: HashSet<RegionKey> = HashSet::new();
    let mut mismatches = Vec::new();

    let joined: Vec<JoinedRecord> = geometries
        .into_iter()
        .map(|geom| {
            let value = match by_key.get(&geom.key) {
                Some((_, value)) => {
                    used.insert(geom.key.clone());
                    *value
                }
                None => {
                    mismatches.push(geom.display_name.clone());
                    None
                }
            };
            JoinedRecord {
                key: geom.key,
                display_name: geom.display_name,
                geometry: geom.geometry,
                value,
            }
        })
        .collect();

    let unused_values: Vec<String> = value_order
        .iter()
        .filter(|key| !used.contains(*key))
        .filter_map(|key| by_key.get(key).map(|(name, _)| name.clone()))
        .collect();
    for name in &unused_values {
        debug!(region = %name, "value row matches no geometry; dropped");
    }

    JoinOutcome { joined, mismatches, unused_values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::normalize;
    use geo::{polygon, MultiPolygon};

    fn geom(name: &str) -> GeometryRecord {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        GeometryRecord {
            key: normalize(name),
            display_name: name.to_string(),
            geometry: MultiPolygon::new(vec![square]),
        }
    }

    fn value(name: &str, value: Option<f64>) -> ValueRecord {
        ValueRecord { key: normalize(name), display_name: name.to_string(), value }
    }

    #[test]
    fn output_matches_geometry_set_regardless_of_coverage() {
        let geoms = vec![geom("Offaly"), geom("Longford"), geom("Cork")];
        let cases = [vec![], vec![value("County Cork", Some(1.0))], vec![value("Mars", Some(2.0))]];
        for values in cases {
            let outcome = join(geoms.clone(), values);
            assert_eq!(outcome.joined.len(), 3);
            let names: Vec<_> = outcome.joined.iter().map(|r| r.display_name.as_str()).collect();
            assert_eq!(names, vec!["Offaly", "Longford", "Cork"]);
        }
    }

    #[test]
    fn later_duplicate_wins() {
        let outcome = join(
            vec![geom("Offaly")],
            vec![value("Offaly", Some(100.0)), value("Kings County", Some(300.0))],
        );
        assert_eq!(outcome.joined[0].value, Some(300.0));

        let outcome = join(
            vec![geom("Offaly")],
            vec![value("Kings County", Some(300.0)), value("County Offaly", Some(100.0))],
        );
        assert_eq!(outcome.joined[0].value, Some(100.0));
    }

    #[test]
    fn mismatches_follow_geometry_order() {
        let outcome = join(
            vec![geom("Wicklow"), geom("Carlow"), geom("Longford")],
            vec![value("Carlow", Some(5.0))],
        );
        assert_eq!(outcome.mismatches, vec!["Wicklow", "Longford"]);
        assert_eq!(outcome.warnings().count(), 2);
    }

    #[test]
    fn matched_row_with_absent_value_is_not_a_mismatch() {
        let outcome = join(vec![geom("Cavan")], vec![value("Cavan", None)]);
        assert_eq!(outcome.joined[0].value, None);
        assert!(outcome.mismatches.is_empty());
    }

    #[test]
    fn nameless_rows_never_join_nameless_geometry() {
        let outcome = join(vec![geom(""), geom("Kerry")], vec![value("", Some(999.0))]);
        assert_eq!(outcome.joined[0].value, None);
        assert_eq!(outcome.mismatches, vec!["", "Kerry"]);
        assert!(outcome.unused_values.is_empty());
    }

    #[test]
    fn value_rows_without_geometry_are_dropped_and_listed() {
        let outcome = join(
            vec![geom("Dublin")],
            vec![value("Antrim", Some(9.0)), value("Dublin", Some(8.0)), value("Down", Some(7.0))],
        );
        assert_eq!(outcome.joined.len(), 1);
        assert_eq!(outcome.present_values(), vec![8.0]);
        assert_eq!(outcome.unused_values, vec!["Antrim", "Down"]);
        assert!(outcome.mismatches.is_empty());
    }
}
