#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

/// Identity of a checked program.
///
/// Address locations (`0x1.Foo`) belong to an account; `account` access is
/// granted between locations with the same address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Location {
    Address { address: u64, name: String },
    Named(String),
}

impl Location {
    pub fn named(name: impl Into<String>) -> Self {
        Location::Named(name.into())
    }

    pub fn address(address: u64, name: impl Into<String>) -> Self {
        Location::Address {
            address,
            name: name.into(),
        }
    }

    pub fn account(&self) -> Option<u64> {
        match self {
            Location::Address { address, .. } => Some(*address),
            Location::Named(_) => None,
        }
    }

    /// Named locations only share an account with themselves.
    pub fn same_account(&self, other: &Location) -> bool {
        match (self.account(), other.account()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::Named("main".to_string())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Address { address, name } if name.is_empty() => write!(f, "0x{address:x}"),
            Location::Address { address, name } => write!(f, "0x{address:x}.{name}"),
            Location::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
#[error("invalid location: {message}")]
#[diagnostic(code(sable::location))]
pub struct LocationError {
    pub message: String,
}

impl FromStr for Location {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LocationError {
                message: "empty location".to_string(),
            });
        }
        let Some(hex) = s.strip_prefix("0x") else {
            return Ok(Location::Named(s.to_string()));
        };
        let (digits, name) = match hex.split_once('.') {
            Some((digits, name)) => (digits, name),
            None => (hex, ""),
        };
        let address = u64::from_str_radix(digits, 16).map_err(|e| LocationError {
            message: format!("bad address `{digits}`: {e}"),
        })?;
        Ok(Location::address(address, name))
    }
}

impl TryFrom<String> for Location {
    type Error = LocationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_address_and_named_locations() {
        assert_eq!(
            "0x1.Foo".parse::<Location>().unwrap(),
            Location::address(1, "Foo")
        );
        assert_eq!("0xff".parse::<Location>().unwrap(), Location::address(255, ""));
        assert_eq!("other".parse::<Location>().unwrap(), Location::named("other"));
        assert!("0xzz.Foo".parse::<Location>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let loc = Location::address(0x2a, "Token");
        assert_eq!(loc.to_string(), "0x2a.Token");
        assert_eq!(loc.to_string().parse::<Location>().unwrap(), loc);
    }

    #[test]
    fn accounts_are_shared_by_address() {
        let a = Location::address(1, "A");
        let b = Location::address(1, "B");
        let c = Location::address(2, "A");
        assert!(a.same_account(&b));
        assert!(!a.same_account(&c));
        assert!(!Location::named("x").same_account(&Location::named("y")));
        assert!(Location::named("x").same_account(&Location::named("x")));
    }
}
