//! 점 표기 숫자 버전 비교 유틸리티 (외부 크레이트 없이)

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 배포 매니페스트의 버전 (major.minor[.build[.revision]])
///
/// build/revision이 없는 버전은 있는 버전보다 낮게 정렬되고
/// (`1.2 < 1.2.0`), 동등 비교는 존재하는 구성 요소가 전부 같을 때만
/// 참입니다 (`1.2 != 1.2.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub build: Option<u64>,
    pub revision: Option<u64>,
}

impl Version {
    /// "1.2", "1.2.3", "1.2.3.4" 형식을 파싱
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return None;
        }

        let major = parts[0].parse().ok()?;
        let minor = parts[1].parse().ok()?;
        let build = match parts.get(2) {
            Some(p) => Some(p.parse().ok()?),
            None => None,
        };
        let revision = match parts.get(3) {
            Some(p) => Some(p.parse().ok()?),
            None => None,
        };

        Some(Self {
            major,
            minor,
            build,
            revision,
        })
    }

    /// 4개 구성 요소 전부 지정하는 생성자
    pub fn new(major: u64, minor: u64, build: u64, revision: u64) -> Self {
        Self {
            major,
            minor,
            build: Some(build),
            revision: Some(revision),
        }
    }

    /// 현재 버전보다 새로운 버전인지 확인
    pub fn is_newer_than(&self, other: &Version) -> bool {
        self > other
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{}", revision)?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.major.cmp(&other.major) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.minor.cmp(&other.minor) {
            Ordering::Equal => {}
            ord => return ord,
        }
        // Option<u64>의 기본 순서: None < Some — 구성 요소가 없는 쪽이 낮다
        match self.build.cmp(&other.build) {
            Ordering::Equal => {}
            ord => return ord,
        }
        self.revision.cmp(&other.revision)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// 직렬화 형식은 점 표기 문자열 ("1.2.3.4")
impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid version string '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic() {
        let v = Version::parse("1.2.3.4").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.build, Some(3));
        assert_eq!(v.revision, Some(4));
    }

    #[test]
    fn parse_subsets() {
        let v = Version::parse("1.2").unwrap();
        assert_eq!(v.build, None);
        assert_eq!(v.revision, None);

        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v.build, Some(3));
        assert_eq!(v.revision, None);
    }

    #[test]
    fn parse_rejects_junk() {
        assert!(Version::parse("1").is_none());
        assert!(Version::parse("1.2.3.4.5").is_none());
        assert!(Version::parse("1.x").is_none());
        assert!(Version::parse("").is_none());
        assert!(Version::parse("v1.2.3").is_none());
    }

    #[test]
    fn compare_versions() {
        let v1 = Version::parse("1.0.0.0").unwrap();
        let v2 = Version::parse("1.0.1.0").unwrap();
        assert!(v2.is_newer_than(&v1));

        let v3 = Version::parse("2.0.0.0").unwrap();
        assert!(v3.is_newer_than(&v2));

        assert!(!v1.is_newer_than(&v1.clone()));
    }

    #[test]
    fn missing_component_sorts_below_zero() {
        let short = Version::parse("1.2").unwrap();
        let long = Version::parse("1.2.0").unwrap();
        assert!(short < long);
        assert_ne!(short, long);
    }

    #[test]
    fn display_roundtrip() {
        for s in ["1.2", "1.2.3", "1.2.3.4", "0.1.0"] {
            let v = Version::parse(s).unwrap();
            assert_eq!(v.to_string(), s);
        }
    }

    #[test]
    fn serde_as_string() {
        let v = Version::new(1, 0, 1, 0);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1.0.1.0\"");

        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);

        assert!(serde_json::from_str::<Version>("\"abc\"").is_err());
    }
}
