use chrono::TimeDelta;

/// Config durations are std; entity timestamp math needs chrono.
pub(crate) fn to_chrono_duration(duration: std::time::Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}
