//! Package identifiers and their static policy (mandatory flag, variant
//! pairing, probe ordering).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every optional or mandatory native package the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageId {
    /// The C++ toolchain used to build the analysis core.
    Cxx,
    /// Math / histogramming library.
    Histo,
    /// Jet-clustering library, introspected via its `jetclu-config` helper.
    Jetclu,
    /// Fast detector-simulation backend.
    Fastsim,
    /// Tuned detector-simulation backend, mutually exclusive with [`Fastsim`](Self::Fastsim).
    FastsimTuned,
    /// Compression library.
    Zlib,
}

impl PackageId {
    /// All known packages in detection order: dependencies strictly before
    /// dependents, competing variants last.
    pub const ALL: [Self; 6] = [
        Self::Cxx,
        Self::Zlib,
        Self::Histo,
        Self::Jetclu,
        Self::Fastsim,
        Self::FastsimTuned,
    ];

    /// Stable name used in overrides keys, CLI arguments, directory names
    /// and log lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cxx => "cxx",
            Self::Histo => "histo",
            Self::Jetclu => "jetclu",
            Self::Fastsim => "fastsim",
            Self::FastsimTuned => "fastsim-tuned",
            Self::Zlib => "zlib",
        }
    }

    /// A mandatory package that cannot be detected aborts startup.
    pub fn mandatory(self) -> bool {
        matches!(self, Self::Cxx)
    }

    /// The sibling this package competes with for a logical role, if any.
    /// At most one of a competing pair may be active at a time.
    pub fn competitor(self) -> Option<Self> {
        match self {
            Self::Fastsim => Some(Self::FastsimTuned),
            Self::FastsimTuned => Some(Self::Fastsim),
            _ => None,
        }
    }

    /// Packages that must be present in the snapshot before this one can be
    /// enabled.
    pub fn requires(self) -> &'static [Self] {
        match self {
            Self::Fastsim | Self::FastsimTuned => &[Self::Histo],
            _ => &[],
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown package name.
#[derive(Debug, thiserror::Error)]
#[error("unknown package '{0}'")]
pub struct UnknownPackage(pub String);

impl FromStr for PackageId {
    type Err = UnknownPackage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| UnknownPackage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for pkg in PackageId::ALL {
            assert_eq!(pkg.name().parse::<PackageId>().unwrap(), pkg);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!("pythia".parse::<PackageId>().is_err());
    }

    #[test]
    fn variant_pairing_is_symmetric() {
        assert_eq!(PackageId::Fastsim.competitor(), Some(PackageId::FastsimTuned));
        assert_eq!(PackageId::FastsimTuned.competitor(), Some(PackageId::Fastsim));
        assert_eq!(PackageId::Zlib.competitor(), None);
    }

    #[test]
    fn dependencies_precede_dependents_in_detection_order() {
        let pos = |p| PackageId::ALL.iter().position(|&x| x == p).unwrap();
        for pkg in PackageId::ALL {
            for &dep in pkg.requires() {
                assert!(pos(dep) < pos(pkg), "{dep} must be probed before {pkg}");
            }
        }
    }
}
