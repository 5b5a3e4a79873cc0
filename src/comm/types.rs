//! Communication data types.
//!
//! A [`Communication`] is the decrypted, validated payload of an envelope.
//! Every variant carries exactly the fields its type requires, so a value of
//! this type is always structurally valid.

use serde::{Deserialize, Serialize};

/// Length in bytes of a drop box identifier.
pub const DROP_BOX_ID_LENGTH: usize = 16;

/// Identifier of the drop box a peer writes its location updates into.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DropBoxId([u8; DROP_BOX_ID_LENGTH]);

impl DropBoxId {
    /// Creates a drop box id from raw bytes.
    ///
    /// Returns `None` unless `bytes` is exactly [`DROP_BOX_ID_LENGTH`] long.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Parses a hex-encoded drop box id.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        hex::decode(s).ok().and_then(|b| Self::from_slice(&b))
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DROP_BOX_ID_LENGTH] {
        &self.0
    }

    /// Returns the id as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; DROP_BOX_ID_LENGTH]> for DropBoxId {
    fn from(bytes: [u8; DROP_BOX_ID_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for DropBoxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DropBoxId({})", self.to_hex())
    }
}

/// Closed set of communication type tags understood by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommType {
    /// Sender grants us access to their location drop box.
    LocationSharingGrant,
    /// Sender withdraws a previous grant.
    LocationSharingRevocation,
    /// A location fix from a friend.
    LocationInfo,
    /// Sender asks us to publish a fresh location.
    LocationUpdateRequest,
    /// Acknowledgement that an update request was received.
    LocationUpdateRequestReceived,
    /// Sender asks us to share our location with them.
    LocationSharingRequest,
    /// Sender declined our sharing request.
    LocationSharingRejection,
    /// Sender asks for our avatar.
    AvatarRequest,
    /// Sender's avatar changed.
    AvatarUpdate,
    /// Device metadata from the sender.
    DeviceInfo,
    /// Diagnostic payload.
    Debug,
    /// Sender asks which devices we are signed in on.
    BrowseDevices,
    /// Sender asks our device to sound an alarm.
    Scream,
    /// Acknowledgement that the alarm started.
    ScreamBegan,
}

impl CommType {
    /// All known types, in tag order.
    pub const ALL: [Self; 14] = [
        Self::LocationSharingGrant,
        Self::LocationSharingRevocation,
        Self::LocationInfo,
        Self::LocationUpdateRequest,
        Self::LocationUpdateRequestReceived,
        Self::LocationSharingRequest,
        Self::LocationSharingRejection,
        Self::AvatarRequest,
        Self::AvatarUpdate,
        Self::DeviceInfo,
        Self::Debug,
        Self::BrowseDevices,
        Self::Scream,
        Self::ScreamBegan,
    ];

    /// Converts to the wire tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LocationSharingGrant => "location_sharing_grant",
            Self::LocationSharingRevocation => "location_sharing_revocation",
            Self::LocationInfo => "location_info",
            Self::LocationUpdateRequest => "location_update_request",
            Self::LocationUpdateRequestReceived => "location_update_request_received",
            Self::LocationSharingRequest => "location_sharing_request",
            Self::LocationSharingRejection => "location_sharing_rejection",
            Self::AvatarRequest => "avatar_request",
            Self::AvatarUpdate => "avatar_update",
            Self::DeviceInfo => "device_info",
            Self::Debug => "debug",
            Self::BrowseDevices => "browse_devices",
            Self::Scream => "scream",
            Self::ScreamBegan => "scream_began",
        }
    }

    /// Parses a wire tag. Unknown tags return `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// A location fix reported by a friend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Fix time in milliseconds since the Unix epoch.
    pub time: i64,
    /// Horizontal accuracy in meters.
    pub accuracy: Option<f32>,
    /// Ground speed in meters/second.
    pub speed: Option<f32>,
    /// Bearing in degrees.
    pub bearing: Option<f32>,
}

impl LocationInfo {
    /// Creates a location fix with no optional metadata.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, time: i64) -> Self {
        Self {
            latitude,
            longitude,
            time,
            accuracy: None,
            speed: None,
            bearing: None,
        }
    }

    /// Returns whether both coordinates are finite and within range.
    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && self.longitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A decoded, structurally valid communication.
#[derive(Debug, Clone, PartialEq)]
pub enum Communication {
    /// Sender granted us location sharing via the given drop box.
    SharingGrant {
        /// Drop box the sender will write location updates into.
        drop_box: DropBoxId,
    },
    /// Sender revoked location sharing.
    SharingRevocation,
    /// A location fix from the sender.
    LocationInfo(LocationInfo),
    /// Sender wants a fresh location from us.
    LocationUpdateRequest,
    /// Sender asks us to share our location.
    SharingRequest,
    /// Sender declined to share.
    SharingRejection,
    /// A known type that carries nothing this client acts on.
    Unhandled(CommType),
    /// A tag outside the known set, kept verbatim.
    Unrecognized(String),
}

impl Communication {
    /// Returns the known type of this communication, if any.
    #[must_use]
    pub const fn comm_type(&self) -> Option<CommType> {
        match self {
            Self::SharingGrant { .. } => Some(CommType::LocationSharingGrant),
            Self::SharingRevocation => Some(CommType::LocationSharingRevocation),
            Self::LocationInfo(_) => Some(CommType::LocationInfo),
            Self::LocationUpdateRequest => Some(CommType::LocationUpdateRequest),
            Self::SharingRequest => Some(CommType::LocationSharingRequest),
            Self::SharingRejection => Some(CommType::LocationSharingRejection),
            Self::Unhandled(t) => Some(*t),
            Self::Unrecognized(_) => None,
        }
    }

    /// Returns the wire tag.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Unrecognized(tag) => tag,
            _ => self.comm_type().map_or("", |t| t.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comm_type_tags_parse_back() {
        for t in CommType::ALL {
            assert_eq!(CommType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn comm_type_parse_unknown() {
        assert_eq!(CommType::parse("hologram"), None);
        assert_eq!(CommType::parse(""), None);
        assert_eq!(CommType::parse("LOCATION_INFO"), None);
    }

    #[test]
    fn drop_box_from_hex() {
        let id = DropBoxId::from_hex(&"0a".repeat(DROP_BOX_ID_LENGTH)).unwrap();
        assert_eq!(id.as_bytes(), &[0x0a; DROP_BOX_ID_LENGTH]);
        assert!(DropBoxId::from_hex("0a0b").is_none());
        assert!(DropBoxId::from_hex("zz").is_none());
    }

    #[test]
    fn location_range_checks() {
        assert!(LocationInfo::new(37.0, -122.0, 0).has_valid_coordinates());
        assert!(LocationInfo::new(90.0, 180.0, 0).has_valid_coordinates());
        assert!(LocationInfo::new(-90.0, -180.0, 0).has_valid_coordinates());
        assert!(!LocationInfo::new(90.1, 0.0, 0).has_valid_coordinates());
        assert!(!LocationInfo::new(0.0, -180.5, 0).has_valid_coordinates());
        assert!(!LocationInfo::new(f64::NAN, 0.0, 0).has_valid_coordinates());
        assert!(!LocationInfo::new(0.0, f64::INFINITY, 0).has_valid_coordinates());
    }

    #[test]
    fn communication_type_tag() {
        assert_eq!(
            Communication::SharingRevocation.type_tag(),
            "location_sharing_revocation"
        );
        assert_eq!(
            Communication::Unrecognized("hologram".to_string()).type_tag(),
            "hologram"
        );
        assert_eq!(Communication::Unhandled(CommType::Debug).type_tag(), "debug");
        assert_eq!(Communication::Unrecognized("x".to_string()).comm_type(), None);
    }
}
