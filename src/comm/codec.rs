//! JSON codec for communications.
//!
//! Decoding reads the `type` tag first. Unknown tags decode successfully into
//! [`Communication::Unrecognized`] without looking at any other field, so
//! newer peers may reuse field names with other meanings. For known tags only
//! the fields that type reads are type-checked.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::{CommError, Result};
use super::types::{CommType, Communication, DropBoxId, LocationInfo, DROP_BOX_ID_LENGTH};

type Fields = Map<String, Value>;

/// Wire form of an outbound communication.
#[derive(Debug, Default, Serialize)]
struct WireCommunication {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    comm_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    drop_box: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accuracy: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bearing: Option<f32>,
}

impl WireCommunication {
    fn tagged(comm_type: CommType) -> Self {
        Self {
            comm_type: Some(comm_type.as_str().to_string()),
            ..Self::default()
        }
    }
}

impl From<&Communication> for WireCommunication {
    fn from(comm: &Communication) -> Self {
        match comm {
            Communication::SharingGrant { drop_box } => Self {
                drop_box: Some(drop_box.to_hex()),
                ..Self::tagged(CommType::LocationSharingGrant)
            },
            Communication::LocationInfo(info) => Self {
                lat: Some(info.latitude),
                lng: Some(info.longitude),
                time: Some(info.time),
                accuracy: info.accuracy,
                speed: info.speed,
                bearing: info.bearing,
                ..Self::tagged(CommType::LocationInfo)
            },
            Communication::Unrecognized(tag) => Self {
                comm_type: Some(tag.clone()),
                ..Self::default()
            },
            other => other.comm_type().map_or_else(Self::default, Self::tagged),
        }
    }
}

/// Reads an optional field; `null` counts as absent.
fn optional<T: DeserializeOwned>(fields: &Fields, name: &str) -> Result<Option<T>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(T::deserialize(value)?)),
    }
}

fn required<T: DeserializeOwned>(
    fields: &Fields,
    comm_type: CommType,
    name: &'static str,
) -> Result<T> {
    optional(fields, name)?.ok_or(CommError::MissingField {
        comm_type: comm_type.as_str(),
        field: name,
    })
}

/// Decodes decrypted plaintext into a validated communication.
///
/// # Errors
///
/// Returns an error if the payload is not a JSON object, the `type` tag is
/// not a string, or a known type is missing a field it needs or carries one
/// of the wrong JSON type.
///
/// # Example
///
/// ```
/// use zood_core::comm::{decode, Communication};
///
/// let comm = decode(br#"{"type":"location_update_request"}"#).unwrap();
/// assert_eq!(comm, Communication::LocationUpdateRequest);
///
/// let future = decode(br#"{"type":"teleport","time":"tomorrow"}"#).unwrap();
/// assert_eq!(future, Communication::Unrecognized("teleport".to_string()));
/// ```
pub fn decode(plaintext: &[u8]) -> Result<Communication> {
    let fields: Fields = serde_json::from_slice(plaintext)?;
    let tag: String = optional(&fields, "type")?.unwrap_or_default();
    let Some(comm_type) = CommType::parse(&tag) else {
        return Ok(Communication::Unrecognized(tag));
    };

    let communication = match comm_type {
        CommType::LocationSharingGrant => {
            let raw: String = required(&fields, comm_type, "drop_box")?;
            let drop_box = DropBoxId::from_hex(&raw).ok_or_else(|| CommError::InvalidField {
                field: "drop_box",
                reason: format!("expected {DROP_BOX_ID_LENGTH} hex-encoded bytes"),
            })?;
            Communication::SharingGrant { drop_box }
        }
        CommType::LocationSharingRevocation => Communication::SharingRevocation,
        CommType::LocationInfo => Communication::LocationInfo(LocationInfo {
            latitude: required(&fields, comm_type, "lat")?,
            longitude: required(&fields, comm_type, "lng")?,
            time: required(&fields, comm_type, "time")?,
            accuracy: optional(&fields, "accuracy")?,
            speed: optional(&fields, "speed")?,
            bearing: optional(&fields, "bearing")?,
        }),
        CommType::LocationUpdateRequest => Communication::LocationUpdateRequest,
        CommType::LocationSharingRequest => Communication::SharingRequest,
        CommType::LocationSharingRejection => Communication::SharingRejection,
        other => Communication::Unhandled(other),
    };

    Ok(communication)
}

impl Communication {
    /// Serializes this communication to JSON bytes for sealing.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (extremely rare).
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&WireCommunication::from(self))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_hex() -> String {
        "11".repeat(DROP_BOX_ID_LENGTH)
    }

    #[test]
    fn decodes_grant() {
        let json = format!(r#"{{"type":"location_sharing_grant","drop_box":"{}"}}"#, box_hex());
        let comm = decode(json.as_bytes()).unwrap();
        assert_eq!(
            comm,
            Communication::SharingGrant {
                drop_box: DropBoxId::from([0x11; DROP_BOX_ID_LENGTH])
            }
        );
    }

    #[test]
    fn grant_without_drop_box_is_invalid() {
        let err = decode(br#"{"type":"location_sharing_grant"}"#).unwrap_err();
        assert!(matches!(
            err,
            CommError::MissingField {
                field: "drop_box",
                ..
            }
        ));
    }

    #[test]
    fn grant_with_short_drop_box_is_invalid() {
        let err = decode(br#"{"type":"location_sharing_grant","drop_box":"abcd"}"#).unwrap_err();
        assert!(matches!(err, CommError::InvalidField { field: "drop_box", .. }));
    }

    #[test]
    fn decodes_location_info_with_optionals() {
        let json = br#"{"type":"location_info","lat":37.0,"lng":-122.0,"time":1700000000000,"accuracy":5.5,"bearing":90.0}"#;
        let Communication::LocationInfo(info) = decode(json).unwrap() else {
            panic!("expected location info");
        };
        assert_eq!(info.latitude, 37.0);
        assert_eq!(info.longitude, -122.0);
        assert_eq!(info.time, 1_700_000_000_000);
        assert_eq!(info.accuracy, Some(5.5));
        assert_eq!(info.speed, None);
        assert_eq!(info.bearing, Some(90.0));
    }

    #[test]
    fn location_info_missing_time_is_invalid() {
        let err = decode(br#"{"type":"location_info","lat":1.0,"lng":2.0}"#).unwrap_err();
        assert!(matches!(err, CommError::MissingField { field: "time", .. }));
    }

    #[test]
    fn location_info_with_string_latitude_is_malformed() {
        let err =
            decode(br#"{"type":"location_info","lat":"north","lng":2.0,"time":1}"#).unwrap_err();
        assert!(matches!(err, CommError::Malformed(_)));
    }

    #[test]
    fn out_of_range_coordinates_still_decode() {
        let comm = decode(br#"{"type":"location_info","lat":123.0,"lng":2.0,"time":1}"#).unwrap();
        assert!(matches!(comm, Communication::LocationInfo(_)));
    }

    #[test]
    fn unknown_and_missing_tags_are_unrecognized() {
        assert_eq!(
            decode(br#"{"type":"hologram"}"#).unwrap(),
            Communication::Unrecognized("hologram".to_string())
        );
        assert_eq!(
            decode(br#"{"lat":1.0}"#).unwrap(),
            Communication::Unrecognized(String::new())
        );
    }

    #[test]
    fn unknown_tag_ignores_conflicting_fields() {
        let comm = decode(br#"{"type":"avatar_v2","time":"2026-01-01T00:00:00Z","lat":[1]}"#)
            .unwrap();
        assert_eq!(comm, Communication::Unrecognized("avatar_v2".to_string()));
    }

    #[test]
    fn known_tag_checks_only_fields_it_reads() {
        assert_eq!(
            decode(br#"{"type":"location_sharing_revocation","time":"soon"}"#).unwrap(),
            Communication::SharingRevocation
        );
        let comm = decode(br#"{"type":"location_info","lat":1.0,"lng":2.0,"time":3,"speed":null,"drop_box":7}"#)
            .unwrap();
        assert_eq!(comm, Communication::LocationInfo(LocationInfo::new(1.0, 2.0, 3)));
    }

    #[test]
    fn non_string_tag_is_malformed() {
        assert!(matches!(decode(br#"{"type":5}"#).unwrap_err(), CommError::Malformed(_)));
    }

    #[test]
    fn payload_only_types_are_unhandled() {
        assert_eq!(
            decode(br#"{"type":"avatar_request"}"#).unwrap(),
            Communication::Unhandled(CommType::AvatarRequest)
        );
        assert_eq!(
            decode(br#"{"type":"location_sharing_rejection"}"#).unwrap(),
            Communication::SharingRejection
        );
        assert_eq!(
            decode(br#"{"type":"scream_began"}"#).unwrap(),
            Communication::Unhandled(CommType::ScreamBegan)
        );
    }

    #[test]
    fn non_object_payloads_are_malformed() {
        assert!(matches!(decode(b"").unwrap_err(), CommError::Malformed(_)));
        assert!(matches!(decode(b"[1,2]").unwrap_err(), CommError::Malformed(_)));
        assert!(matches!(decode(&[0xff, 0xfe]).unwrap_err(), CommError::Malformed(_)));
    }

    #[test]
    fn encoded_location_omits_absent_optionals() {
        let comm = Communication::LocationInfo(LocationInfo::new(1.5, 2.5, 3));
        let json = String::from_utf8(comm.to_json_bytes().unwrap()).unwrap();
        assert!(json.contains(r#""type":"location_info""#));
        assert!(!json.contains("speed"));
        assert_eq!(decode(json.as_bytes()).unwrap(), comm);
    }
}
