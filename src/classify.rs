//! Classification of AIS objects and human-readable code descriptions.

use std::fmt;

use serde::Serialize;

/// Semantic category of a transmitting object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Vessel,
    Vts,
    Buoy,
    Mob,
    Aircraft,
    Unknown,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Vessel => "VESSEL",
            ObjectType::Vts => "VTS",
            ObjectType::Buoy => "BUOY",
            ObjectType::Mob => "MOB",
            ObjectType::Aircraft => "AIRCRAFT",
            ObjectType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectClassification {
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub category: &'static str,
    pub description: &'static str,
    pub is_vessel: bool,
    pub icon_type: &'static str,
}

const UNKNOWN_OBJECT: ObjectClassification = ObjectClassification {
    object_type: ObjectType::Unknown,
    category: "UNCLASSIFIED",
    description: "Unknown Object Type",
    is_vessel: false,
    icon_type: "unknown",
};

const CLASS_A_VESSEL: ObjectClassification = ObjectClassification {
    object_type: ObjectType::Vessel,
    category: "SHIP",
    description: "Class A Vessel",
    is_vessel: true,
    icon_type: "ship",
};

/// Classify an object by the AIS message type it transmits
pub fn classify(message_type: u16) -> ObjectClassification {
    match message_type {
        1..=3 => CLASS_A_VESSEL,
        18 => ObjectClassification {
            object_type: ObjectType::Vessel,
            category: "SHIP",
            description: "Class B Vessel",
            is_vessel: true,
            icon_type: "ship-small",
        },
        4 => ObjectClassification {
            object_type: ObjectType::Vts,
            category: "BASE_STATION",
            description: "Vessel Traffic Service Base Station",
            is_vessel: false,
            icon_type: "tower",
        },
        21 => ObjectClassification {
            object_type: ObjectType::Buoy,
            category: "AID_TO_NAVIGATION",
            description: "Aid to Navigation",
            is_vessel: false,
            icon_type: "buoy",
        },
        14 => ObjectClassification {
            object_type: ObjectType::Mob,
            category: "SEARCH_RESCUE",
            description: "Man Overboard / Search and Rescue Transmitter",
            is_vessel: false,
            icon_type: "mob",
        },
        9 => ObjectClassification {
            object_type: ObjectType::Aircraft,
            category: "AIRCRAFT",
            description: "Search and Rescue Aircraft",
            is_vessel: false,
            icon_type: "aircraft",
        },
        _ => UNKNOWN_OBJECT,
    }
}

/// Navigational status
///
/// `None` and the "not defined" code 15 both map to "Not defined".
pub fn navigation_status_description(status: Option<u8>) -> &'static str {
    match status {
        Some(0) => "Under way using engine",
        Some(1) => "At anchor",
        Some(2) => "Not under command",
        Some(3) => "Restricted maneuverability",
        Some(4) => "Constrained by her draught",
        Some(5) => "Moored",
        Some(6) => "Aground",
        Some(7) => "Engaged in fishing",
        Some(8) => "Under way sailing",
        Some(9) => "Reserved for HSC",
        Some(10) => "Reserved for WIG",
        Some(11) => "Power-driven vessel towing astern",
        Some(12) => "Power-driven vessel pushing ahead or towing alongside",
        Some(13) => "Reserved for future use",
        Some(14) => "AIS-SART / MOB-AIS / EPIRB-AIS active",
        Some(15) | None => "Not defined",
        Some(_) => "Unknown",
    }
}

pub fn message_type_description(message_type: u16) -> &'static str {
    match message_type {
        1 => "Position Report Class A",
        2 => "Position Report Class A (Assigned schedule)",
        3 => "Position Report Class A (Response to interrogation)",
        4 => "Base Station Report",
        5 => "Static and Voyage Related Data",
        6 => "Binary Addressed Message",
        7 => "Binary Acknowledge",
        8 => "Binary Broadcast Message",
        9 => "Standard SAR Aircraft Position Report",
        10 => "UTC and Date Inquiry",
        11 => "UTC and Date Response",
        12 => "Addressed Safety Related Message",
        13 => "Safety Related Acknowledgement",
        14 => "Safety Related Broadcast Message",
        15 => "Interrogation",
        16 => "Assignment Mode Command",
        17 => "DGNSS Binary Broadcast Message",
        18 => "Standard Class B CS Position Report",
        19 => "Extended Class B Equipment Position Report",
        20 => "Data Link Management",
        21 => "Aid-to-Navigation Report",
        22 => "Channel Management",
        23 => "Group Assignment Command",
        24 => "Static Data Report",
        25 => "Single Slot Binary Message",
        26 => "Multiple Slot Binary Message With Communications State",
        27 => "Position Report For Long-Range Applications",
        _ => "Unknown",
    }
}

/// AIS ship and cargo type
pub fn vessel_type_description(vessel_type: Option<u8>) -> &'static str {
    match vessel_type {
        Some(20..=29) => "Wing in ground (WIG)",
        Some(30) => "Fishing",
        Some(31 | 32) => "Towing",
        Some(33) => "Dredging or underwater ops",
        Some(34) => "Diving ops",
        Some(35) => "Military ops",
        Some(36) => "Sailing",
        Some(37) => "Pleasure Craft",
        Some(40..=49) => "High speed craft (HSC)",
        Some(50) => "Pilot Vessel",
        Some(51) => "Search and Rescue vessel",
        Some(52) => "Tug",
        Some(53) => "Port Tender",
        Some(54) => "Anti-pollution equipment",
        Some(55) => "Law Enforcement",
        Some(58) => "Medical Transport",
        Some(59) => "Noncombatant ship",
        Some(60..=69) => "Passenger",
        Some(70..=79) => "Cargo",
        Some(80..=89) => "Tanker",
        Some(90..=99) => "Other Type",
        _ => "Unknown",
    }
}
