//! Base types: fish rarity and fishing spots

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Fish rarity the agent waits for before pulling.
///
/// `White` is the wildcard: any bite is pulled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FishType {
    White,
    Blue,
    Yellow,
}

impl FishType {
    pub fn value(&self) -> &'static str {
        match self {
            FishType::White => "white",
            FishType::Blue => "blue",
            FishType::Yellow => "yellow",
        }
    }

    pub fn is_wildcard(&self) -> bool {
        *self == FishType::White
    }
}

impl std::fmt::Display for FishType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for FishType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_lowercase().as_str() {
            "white" => Ok(FishType::White),
            "blue" => Ok(FishType::Blue),
            "yellow" => Ok(FishType::Yellow),
            _ => Err(Error::UnknownFishType(s.to_string())),
        }
    }
}

/// Fishing spot; selects walking keys and the way back after trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Bilefen,
    Ashwold,
    Tundra,
}

impl Location {
    pub fn value(&self) -> &'static str {
        match self {
            Location::Bilefen => "bilefen",
            Location::Ashwold => "ashwold",
            Location::Tundra => "tundra",
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_lowercase().as_str() {
            "bilefen" => Ok(Location::Bilefen),
            "ashwold" => Ok(Location::Ashwold),
            "tundra" => Ok(Location::Tundra),
            _ => Err(Error::UnknownLocation(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fish_type_parse() {
        assert_eq!("Yellow".parse::<FishType>().unwrap(), FishType::Yellow);
        assert!(FishType::White.is_wildcard());
        assert!(matches!("gold".parse::<FishType>(), Err(Error::UnknownFishType(_))));
    }

    #[test]
    fn test_location_parse_and_display() {
        assert_eq!("ashwold".parse::<Location>().unwrap(), Location::Ashwold);
        assert_eq!(Location::Bilefen.to_string(), "bilefen");
        assert!("bilifen".parse::<Location>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&FishType::Blue).unwrap(), "\"blue\"");
        let loc: Location = serde_json::from_str("\"tundra\"").unwrap();
        assert_eq!(loc, Location::Tundra);
    }
}
