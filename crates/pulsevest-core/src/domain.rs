//! Closed vocabularies shared by the store and the HTTP layer.
//!
//! Each enum round-trips through its lowercase wire form, both for serde and
//! for the `TEXT` columns that store it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Investor,
    Fan,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Creator => "creator",
            Role::Investor => "investor",
            Role::Fan => "fan",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creator" => Ok(Role::Creator),
            "investor" => Ok(Role::Investor),
            "fan" => Ok(Role::Fan),
            other => Err(CoreError::InvalidRole(other.to_string())),
        }
    }
}

/// A rewardable fan action on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Favorite,
    Playlist,
    Review,
}

impl ActionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Favorite => "favorite",
            ActionKind::Playlist => "playlist",
            ActionKind::Review => "review",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "favorite" => Ok(ActionKind::Favorite),
            "playlist" => Ok(ActionKind::Playlist),
            "review" => Ok(ActionKind::Review),
            other => Err(CoreError::InvalidActionKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            other => Err(CoreError::InvalidMediaKind(other.to_string())),
        }
    }
}

/// One category of the externally computed Pulse Score, with the analysis
/// service's free-text rationale. Stored as opaque JSON alongside the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub score: f64,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_known_values() {
        assert_eq!("creator".parse::<Role>(), Ok(Role::Creator));
        assert_eq!("investor".parse::<Role>(), Ok(Role::Investor));
        assert_eq!("fan".parse::<Role>(), Ok(Role::Fan));
    }

    #[test]
    fn role_rejects_unknown_and_wrong_case() {
        assert_eq!(
            "admin".parse::<Role>(),
            Err(CoreError::InvalidRole("admin".to_string()))
        );
        assert!("Fan".parse::<Role>().is_err());
    }

    #[test]
    fn action_kind_round_trips_through_str() {
        for kind in [ActionKind::Favorite, ActionKind::Playlist, ActionKind::Review] {
            assert_eq!(kind.as_str().parse::<ActionKind>(), Ok(kind));
        }
    }

    #[test]
    fn action_kind_rejects_unknown() {
        assert!(matches!(
            "share".parse::<ActionKind>(),
            Err(CoreError::InvalidActionKind(ref v)) if v == "share"
        ));
    }

    #[test]
    fn action_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ActionKind::Playlist).expect("serialize");
        assert_eq!(json, "\"playlist\"");
    }

    #[test]
    fn media_kind_rejects_unknown() {
        assert!("image".parse::<MediaKind>().is_err());
        assert_eq!("video".parse::<MediaKind>(), Ok(MediaKind::Video));
    }

    #[test]
    fn category_score_deserializes_from_analysis_payload() {
        let score: CategoryScore = serde_json::from_str(
            r#"{"category":"Production","score":82.5,"explanation":"Clean mix"}"#,
        )
        .expect("deserialize");
        assert_eq!(score.category, "Production");
        assert!((score.score - 82.5).abs() < f64::EPSILON);
    }
}
