//! Joining annotation records to enumerated measurement files.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::catalog::FileCatalog;
use crate::model::{
    AnnotationRecord, BodyPart, ExternalId, MappedAnnotation, PatientId, SequenceNumber,
};

#[derive(Debug, Error)]
pub enum IngestError {
    /// Record refers to a patient/body part with no enumerated files
    #[error("No measurements enumerated for patient '{patient}', body part '{body_part}'")]
    UnknownLocation {
        patient: PatientId,
        body_part: BodyPart,
    },
}

type Group = BTreeMap<SequenceNumber, MappedAnnotation>;

/// Mapped annotations keyed by external id, then sequence number.
///
/// External ids keep the order in which they were first pushed; this is also
/// the order of the JSON object and of extracted spectra.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationMap {
    groups: Vec<(ExternalId, Group)>,
    index: HashMap<ExternalId, usize>,
}

impl AnnotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn group_mut(&mut self, id: ExternalId) -> &mut Group {
        let slot = match self.index.get(&id) {
            Some(&slot) => slot,
            None => {
                self.groups.push((id.clone(), Group::new()));
                self.index.insert(id, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        &mut self.groups[slot].1
    }

    /// Add an annotation under `id`, returning the sequence number it received.
    ///
    /// The sequence number is the number of annotations already stored for
    /// that id, so entries of one id are numbered 0, 1, 2, ... in insertion order.
    pub fn push(&mut self, id: ExternalId, annotation: MappedAnnotation) -> SequenceNumber {
        let group = self.group_mut(id);
        let sequence = SequenceNumber(group.len() as u32);
        group.insert(sequence, annotation);
        sequence
    }

    pub fn get(&self, id: &str, sequence: SequenceNumber) -> Option<&MappedAnnotation> {
        self.group(id)?.get(&sequence)
    }

    /// All annotations for one external id, in sequence order.
    pub fn group(&self, id: &str) -> Option<&Group> {
        self.index.get(id).map(|&slot| &self.groups[slot].1)
    }

    /// External ids in first-seen order.
    pub fn ids(&self) -> impl Iterator<Item = &ExternalId> {
        self.groups.iter().map(|(id, _)| id)
    }

    /// Iterate `(external_id, sequence, annotation)`, ids in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&ExternalId, SequenceNumber, &MappedAnnotation)> {
        self.groups
            .iter()
            .flat_map(|(id, group)| group.iter().map(move |(seq, ann)| (id, *seq, ann)))
    }

    /// Number of external ids.
    pub fn id_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of annotations across all ids.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, g)| g.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Annotations whose external id matched no measurement file.
    pub fn unresolved(&self) -> impl Iterator<Item = (&ExternalId, SequenceNumber)> {
        self.iter()
            .filter(|(_, _, ann)| ann.image_path.is_none())
            .map(|(id, seq, _)| (id, seq))
    }
}

impl Serialize for AnnotationMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.groups.iter().map(|(id, group)| (id, group)))
    }
}

impl<'de> Deserialize<'de> for AnnotationMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AnnotationMapVisitor)
    }
}

struct AnnotationMapVisitor;

impl<'de> Visitor<'de> for AnnotationMapVisitor {
    type Value = AnnotationMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of external ids to numbered annotations")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = AnnotationMap::new();
        while let Some((id, group)) = access.next_entry::<ExternalId, Group>()? {
            map.group_mut(id).extend(group);
        }
        Ok(map)
    }
}

/// Resolve the measurement file an external id refers to.
///
/// Every candidate whose path contains `id` is a match and the last match in
/// enumeration order wins.
pub fn resolve_image(candidates: &[PathBuf], id: &str) -> Option<PathBuf> {
    let mut matches = candidates
        .iter()
        .filter(|path| path.to_string_lossy().contains(id));

    let first = matches.next()?;
    let mut count = 1;
    let mut chosen = first;
    for path in matches {
        count += 1;
        chosen = path;
    }

    if count > 1 {
        log::debug!(
            "External id '{}' matches {} files, using last match {:?}",
            id,
            count,
            chosen
        );
    }

    Some(chosen.clone())
}

/// Map annotation records onto the measurement files of a catalog.
///
/// Records are processed in order. A record whose patient/body part has no
/// catalog entry aborts the mapping with [`IngestError::UnknownLocation`]; a
/// record whose id matches no file is kept with `image_path: None`.
pub fn map_annotations(
    catalog: &FileCatalog,
    records: &[AnnotationRecord],
) -> Result<AnnotationMap, IngestError> {
    let mut map = AnnotationMap::new();

    for record in records {
        let candidates = catalog
            .files(record.patient_id.as_str(), record.body_part.as_str())
            .ok_or_else(|| IngestError::UnknownLocation {
                patient: record.patient_id.clone(),
                body_part: record.body_part.clone(),
            })?;

        let image_path = resolve_image(candidates, record.external_id.as_str());
        if image_path.is_none() {
            log::warn!(
                "No measurement of {} / {} matches external id '{}'",
                record.patient_id,
                record.body_part,
                record.external_id
            );
        }

        let mapped = MappedAnnotation {
            image_path,
            patient_id: record.patient_id.clone(),
            body_part: record.body_part.clone(),
            annotation_type: record.annotation_type.clone(),
            coordinates: record.coordinate(),
        };

        map.push(record.external_id.clone(), mapped);
    }

    log::info!(
        "Mapped {} annotations onto {} external ids",
        map.len(),
        map.id_count()
    );

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinate;

    fn record(id: &str, x: i64, y: i64, patient: &str, part: &str) -> AnnotationRecord {
        AnnotationRecord {
            external_id: id.into(),
            x,
            y,
            annotation_type: "lesion".into(),
            body_part: part.into(),
            patient_id: patient.into(),
        }
    }

    fn catalog() -> FileCatalog {
        let mut catalog = FileCatalog::new();
        catalog.insert("p1".into(), "arm".into(), PathBuf::from("root/p1/arm/scan_001.cu3s"));
        catalog.insert("p1".into(), "arm".into(), PathBuf::from("root/p1/arm/scan_002.cu3s"));
        catalog
    }

    #[test]
    fn test_maps_record_to_matching_file() {
        let map = map_annotations(&catalog(), &[record("001", 10, 20, "p1", "arm")]).unwrap();

        let mapped = map.get("001", SequenceNumber(0)).unwrap();
        assert_eq!(
            mapped.image_path.as_deref(),
            Some(std::path::Path::new("root/p1/arm/scan_001.cu3s"))
        );
        assert_eq!(mapped.coordinates, Coordinate::new(10, 20));
        assert_eq!(mapped.annotation_type.as_str(), "lesion");
    }

    #[test]
    fn test_last_match_wins() {
        // "scan_00" is contained in both paths
        let map = map_annotations(&catalog(), &[record("scan_00", 0, 0, "p1", "arm")]).unwrap();
        let mapped = map.get("scan_00", SequenceNumber(0)).unwrap();
        assert!(mapped.image_path.as_ref().unwrap().ends_with("scan_002.cu3s"));
    }

    #[test]
    fn test_unmatched_id_maps_to_none() {
        let map = map_annotations(&catalog(), &[record("999", 0, 0, "p1", "arm")]).unwrap();
        assert!(map.get("999", SequenceNumber(0)).unwrap().image_path.is_none());
        assert_eq!(map.unresolved().count(), 1);
    }

    #[test]
    fn test_sequence_numbers_follow_insertion_order() {
        let records = [
            record("001", 1, 1, "p1", "arm"),
            record("002", 2, 2, "p1", "arm"),
            record("001", 3, 3, "p1", "arm"),
        ];
        let map = map_annotations(&catalog(), &records).unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map.id_count(), 2);
        assert_eq!(
            map.get("001", SequenceNumber(1)).unwrap().coordinates,
            Coordinate::new(3, 3)
        );
        assert_eq!(map.group("002").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_location_is_an_error() {
        let err = map_annotations(&catalog(), &[record("001", 0, 0, "p1", "leg")]).unwrap_err();
        assert!(matches!(err, IngestError::UnknownLocation { .. }));

        let err = map_annotations(&catalog(), &[record("001", 0, 0, "p9", "arm")]).unwrap_err();
        assert!(err.to_string().contains("p9"));
    }

    #[test]
    fn test_ids_keep_input_order() {
        let mut catalog = FileCatalog::new();
        catalog.insert("p1".into(), "arm".into(), PathBuf::from("root/p1/arm/s9.cu3s"));
        catalog.insert("p1".into(), "arm".into(), PathBuf::from("root/p1/arm/s10.cu3s"));

        let records = [
            record("s9", 0, 0, "p1", "arm"),
            record("s10", 1, 1, "p1", "arm"),
            record("s9", 2, 2, "p1", "arm"),
        ];
        let map = map_annotations(&catalog, &records).unwrap();

        let ids: Vec<&str> = map.ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, ["s9", "s10"]);

        let order: Vec<(&str, u32)> = map.iter().map(|(id, seq, _)| (id.as_str(), seq.0)).collect();
        assert_eq!(order, [("s9", 0), ("s9", 1), ("s10", 0)]);

        let json = serde_json::to_string(&map).unwrap();
        assert!(json.starts_with(r#"{"s9":{"0":"#));

        let back: AnnotationMap = serde_json::from_str(&json).unwrap();
        let ids: Vec<&str> = back.ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, ["s9", "s10"]);
        assert_eq!(back, map);
    }

    #[test]
    fn test_json_uses_string_sequence_keys() {
        let map = map_annotations(&catalog(), &[record("001", 10, 20, "p1", "arm")]).unwrap();
        let value = serde_json::to_value(&map).unwrap();

        assert_eq!(value["001"]["0"]["coordinates"], serde_json::json!([10, 20]));
        assert_eq!(value["001"]["0"]["patient_id"], "p1");
    }
}
