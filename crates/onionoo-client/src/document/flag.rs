//! Relay and bridge flags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flag assigned to a relay or bridge by the directory authorities
///
/// Flags outside the known set are preserved verbatim in [`Flag::Unknown`]
/// so a new flag introduced upstream never breaks deserialization.
///
/// # Examples
/// ```
/// use onionoo_client::Flag;
///
/// assert_eq!(Flag::from("Exit"), Flag::Exit);
/// assert_eq!(Flag::from("Shiny"), Flag::Unknown("Shiny".to_string()));
/// assert_eq!(Flag::HsDir.as_str(), "HSDir");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Flag {
    /// Directory authority
    Authority,
    /// Bad exit
    BadExit,
    /// Exit
    Exit,
    /// Fast
    Fast,
    /// Guard
    Guard,
    /// Hidden service directory
    HsDir,
    /// Only usable in the middle position
    MiddleOnly,
    /// Missing an ed25519 key in the consensus
    NoEdConsensus,
    /// Running
    Running,
    /// Stable
    Stable,
    /// Stale descriptor
    StaleDesc,
    /// Sybil
    Sybil,
    /// V2 directory
    V2Dir,
    /// Valid
    Valid,
    /// A flag this library does not know about
    Unknown(String),
}

impl Flag {
    /// Name of the flag as used by the Onionoo API
    pub fn as_str(&self) -> &str {
        match self {
            Flag::Authority => "Authority",
            Flag::BadExit => "BadExit",
            Flag::Exit => "Exit",
            Flag::Fast => "Fast",
            Flag::Guard => "Guard",
            Flag::HsDir => "HSDir",
            Flag::MiddleOnly => "MiddleOnly",
            Flag::NoEdConsensus => "NoEdConsensus",
            Flag::Running => "Running",
            Flag::Stable => "Stable",
            Flag::StaleDesc => "StaleDesc",
            Flag::Sybil => "Sybil",
            Flag::V2Dir => "V2Dir",
            Flag::Valid => "Valid",
            Flag::Unknown(name) => name,
        }
    }

    /// Whether the flag belongs to the known set
    pub fn is_known(&self) -> bool {
        !matches!(self, Flag::Unknown(_))
    }
}

impl From<&str> for Flag {
    fn from(name: &str) -> Self {
        match name {
            "Authority" => Flag::Authority,
            "BadExit" => Flag::BadExit,
            "Exit" => Flag::Exit,
            "Fast" => Flag::Fast,
            "Guard" => Flag::Guard,
            "HSDir" => Flag::HsDir,
            "MiddleOnly" => Flag::MiddleOnly,
            "NoEdConsensus" => Flag::NoEdConsensus,
            "Running" => Flag::Running,
            "Stable" => Flag::Stable,
            "StaleDesc" => Flag::StaleDesc,
            "Sybil" => Flag::Sybil,
            "V2Dir" => Flag::V2Dir,
            "Valid" => Flag::Valid,
            other => Flag::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Flag {
    fn from(name: String) -> Self {
        Flag::from(name.as_str())
    }
}

impl From<Flag> for String {
    fn from(flag: Flag) -> Self {
        flag.as_str().to_string()
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_flags_round_trip_names() {
        for name in ["Exit", "Guard", "Fast", "Stable", "V2Dir", "HSDir", "Running", "Valid"] {
            let flag = Flag::from(name);
            assert!(flag.is_known(), "{name} should be known");
            assert_eq!(flag.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_flag_is_preserved() {
        let flag = Flag::from("Quantum");
        assert!(!flag.is_known());
        assert_eq!(flag.to_string(), "Quantum");
    }

    #[test]
    fn test_flag_serde() {
        let json = serde_json::to_string(&vec![Flag::Exit, Flag::Unknown("X".into())]).unwrap();
        assert_eq!(json, r#"["Exit","X"]"#);

        let flags: Vec<Flag> = serde_json::from_str(r#"["HSDir","Y"]"#).unwrap();
        assert_eq!(flags, vec![Flag::HsDir, Flag::Unknown("Y".to_string())]);
    }
}
