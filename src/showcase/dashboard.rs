/*
 * ============================================================================
 * PROGRESS DASHBOARD MODULE
 * ============================================================================
 *
 * PURPOSE: Canned communication-progress figures backing the demo dashboard
 *
 * All numbers are fixed demo data. Nothing here is measured.
 *
 * ============================================================================
 */

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyUsage {
    pub day: &'static str,
    pub words: u32,
    pub accuracy: u32,
}

pub const WEEKLY_USAGE: [DailyUsage; 7] = [
    DailyUsage { day: "Mon", words: 120, accuracy: 70 },
    DailyUsage { day: "Tue", words: 180, accuracy: 75 },
    DailyUsage { day: "Wed", words: 150, accuracy: 78 },
    DailyUsage { day: "Thu", words: 220, accuracy: 82 },
    DailyUsage { day: "Fri", words: 250, accuracy: 85 },
    DailyUsage { day: "Sat", words: 190, accuracy: 88 },
    DailyUsage { day: "Sun", words: 280, accuracy: 90 },
];

// One headline card: a value plus its week-over-week delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeadlineStat {
    pub label: &'static str,
    pub value: &'static str,
    pub delta_percent: u32,
    pub comparison: &'static str,
}

pub const HEADLINE_STATS: [HeadlineStat; 3] = [
    HeadlineStat {
        label: "Daily Words",
        value: "285",
        delta_percent: 14,
        comparison: "vs last week",
    },
    HeadlineStat {
        label: "Speech Accuracy",
        value: "92%",
        delta_percent: 5,
        comparison: "vs last week",
    },
    HeadlineStat {
        label: "EEG Detection",
        value: "78%",
        delta_percent: 8,
        comparison: "vs last week",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub text: &'static str,
    pub time_ago: &'static str,
}

pub const RECENT_ACTIVITY: [ActivityEntry; 3] = [
    ActivityEntry {
        text: "Completed 15 assisted conversations today",
        time_ago: "2 hours ago",
    },
    ActivityEntry {
        text: "EEG calibration improved by 5%",
        time_ago: "Yesterday",
    },
    ActivityEntry {
        text: "Average response time reduced to 0.8s",
        time_ago: "2 days ago",
    },
];

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DashboardSnapshot {
    pub weekly_usage: &'static [DailyUsage],
    pub headline_stats: &'static [HeadlineStat],
    pub recent_activity: &'static [ActivityEntry],
}

pub fn snapshot() -> DashboardSnapshot {
    DashboardSnapshot {
        weekly_usage: &WEEKLY_USAGE,
        headline_stats: &HEADLINE_STATS,
        recent_activity: &RECENT_ACTIVITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_is_complete_and_accuracy_climbs() {
        assert_eq!(WEEKLY_USAGE.len(), 7);
        assert_eq!(WEEKLY_USAGE[0].day, "Mon");
        assert_eq!(WEEKLY_USAGE[6].day, "Sun");
        for pair in WEEKLY_USAGE.windows(2) {
            assert!(pair[1].accuracy > pair[0].accuracy);
        }
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["headline_stats"][0]["value"], "285");
        assert_eq!(json["recent_activity"].as_array().unwrap().len(), 3);
    }
}
