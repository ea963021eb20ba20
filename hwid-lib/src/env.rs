use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::UNDEFINED;
use crate::validate::ValidRecord;

pub const BOARD_HEADER: &str = "board_header";
pub const BOARD_MAJOR: &str = "board_major";
pub const BOARD_MINOR: &str = "board_minor";
pub const BOARD_PATCH: &str = "board_patch";

/// Key/value store the board version is exported to.
pub trait Environment {
    fn set_variable(&mut self, name: &str, value: &str);
}

impl Environment for BTreeMap<String, String> {
    fn set_variable(&mut self, name: &str, value: &str) {
        self.insert(name.to_string(), value.to_string());
    }
}

impl<T: Environment + ?Sized> Environment for &mut T {
    fn set_variable(&mut self, name: &str, value: &str) {
        (**self).set_variable(name, value)
    }
}

/// Board revision as exported to the environment.
///
/// The boot scripts were written against signed byte values (`-1` for
/// unknown), so the fields are `i8` and bytes above 127 wrap negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardVersion {
    pub header: i8,
    pub major: i8,
    pub minor: i8,
    pub patch: i8,
}

impl BoardVersion {
    /// Boards without a HWID EEPROM are byteDEVKIT 1.2.
    pub fn legacy() -> Self {
        BoardVersion {
            header: UNDEFINED,
            major: 1,
            minor: 2,
            patch: UNDEFINED,
        }
    }

    pub fn variables(&self) -> [(&'static str, String); 4] {
        [
            (BOARD_HEADER, self.header.to_string()),
            (BOARD_MAJOR, self.major.to_string()),
            (BOARD_MINOR, self.minor.to_string()),
            (BOARD_PATCH, self.patch.to_string()),
        ]
    }

    pub fn apply<E: Environment + ?Sized>(&self, env: &mut E) {
        for (name, value) in self.variables() {
            env.set_variable(name, &value);
        }
    }
}

impl From<&ValidRecord> for BoardVersion {
    fn from(record: &ValidRecord) -> Self {
        BoardVersion {
            header: record.header_version as i8,
            major: record.major as i8,
            minor: record.minor as i8,
            patch: record.patch as i8,
        }
    }
}

impl fmt::Display for BoardVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "header {}, v{}.{}.{}",
            self.header, self.major, self.minor, self.patch
        )
    }
}
