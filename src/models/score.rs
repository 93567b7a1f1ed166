use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Display band for a score in `[0, 100]`.
///
/// Every view that colors or tags a score goes through this one
/// classification so the thresholds cannot drift between pages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Excellent,
    Good,
    Average,
    Poor,
}

impl ScoreBand {
    pub fn classify(score: f64) -> Self {
        if score >= 90.0 {
            ScoreBand::Excellent
        } else if score >= 70.0 {
            ScoreBand::Good
        } else if score >= 50.0 {
            ScoreBand::Average
        } else {
            ScoreBand::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::Average => "average",
            ScoreBand::Poor => "poor",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "#52c41a",
            ScoreBand::Good => "#1890ff",
            ScoreBand::Average => "#faad14",
            ScoreBand::Poor => "#ff4d4f",
        }
    }

    pub fn tag_label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "优秀",
            ScoreBand::Good => "良好",
            ScoreBand::Average => "一般",
            ScoreBand::Poor => "待改进",
        }
    }

    /// Legend label including the score range, as shown in pie charts.
    pub fn range_label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "优秀 (90-100分)",
            ScoreBand::Good => "良好 (70-89分)",
            ScoreBand::Average => "一般 (50-69分)",
            ScoreBand::Poor => "待改进 (0-49分)",
        }
    }
}

/// Band plus its display attributes, serialized for the webview so no
/// threshold or color logic leaks into page components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBandTag {
    pub band: ScoreBand,
    pub color: String,
    pub label: String,
}

impl ScoreBandTag {
    pub fn for_score(score: f64) -> Self {
        let band = ScoreBand::classify(score);
        Self {
            band,
            color: band.color().to_string(),
            label: band.tag_label().to_string(),
        }
    }
}

/// Medal highlight for the top three leaderboard positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RankMedal {
    Gold,
    Silver,
    Bronze,
    None,
}

impl RankMedal {
    /// `rank` is 1-based.
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            1 => RankMedal::Gold,
            2 => RankMedal::Silver,
            3 => RankMedal::Bronze,
            _ => RankMedal::None,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RankMedal::Gold => "#faad14",
            RankMedal::Silver => "#a0a0a0",
            RankMedal::Bronze => "#cd7f32",
            RankMedal::None => "#666",
        }
    }
}

/// Query window accepted by every dashboard endpoint. The value is passed
/// through to the backend unmodified; anything outside {7, 30, 90} is
/// rejected at deserialization. On the wire this is the plain day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeRange {
    SevenDays,
    ThirtyDays,
    NinetyDays,
}

impl Serialize for TimeRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.days())
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match u32::deserialize(deserializer)? {
            7 => Ok(TimeRange::SevenDays),
            30 => Ok(TimeRange::ThirtyDays),
            90 => Ok(TimeRange::NinetyDays),
            other => Err(serde::de::Error::custom(format!(
                "时间范围仅支持 7、30 或 90 天，收到 {other}"
            ))),
        }
    }
}

impl TimeRange {
    pub fn days(&self) -> u32 {
        match self {
            TimeRange::SevenDays => 7,
            TimeRange::ThirtyDays => 30,
            TimeRange::NinetyDays => 90,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::days(i64::from(self.days()))
    }

    /// The dashboard timeline never widens beyond 30 days.
    pub fn clamped_for_timeline(&self) -> TimeRange {
        match self {
            TimeRange::NinetyDays => TimeRange::ThirtyDays,
            other => *other,
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::ThirtyDays
    }
}

/// Leaderboard ordering requested from the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Overall,
    CodeContribution,
    CodeQuality,
    BugResolution,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Overall => "overall",
            SortKey::CodeContribution => "codecontribution",
            SortKey::CodeQuality => "codequality",
            SortKey::BugResolution => "bugresolution",
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Overall
    }
}
