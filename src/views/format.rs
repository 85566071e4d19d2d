use chrono::{DateTime, Utc};

use crate::models::Comment;

/// Human relative time in the style of "5 minutes ago" / "in a day".
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - then).num_seconds();
    let phrase = humanize(delta.unsigned_abs() as f64);
    if delta < 0 {
        format!("in {phrase}")
    } else {
        format!("{phrase} ago")
    }
}

fn humanize(secs: f64) -> String {
    let days = secs / 86_400.0;
    let seconds = secs.round();
    let minutes = (secs / 60.0).round();
    let hours = (secs / 3_600.0).round();
    let months = (days * 4_800.0 / 146_097.0).round();
    let years = (days * 400.0 / 146_097.0).round();
    let days = days.round();

    if seconds < 45.0 {
        "a few seconds".to_owned()
    } else if minutes <= 1.0 {
        "a minute".to_owned()
    } else if minutes < 45.0 {
        format!("{minutes} minutes")
    } else if hours <= 1.0 {
        "an hour".to_owned()
    } else if hours < 22.0 {
        format!("{hours} hours")
    } else if days <= 1.0 {
        "a day".to_owned()
    } else if days < 26.0 {
        format!("{days} days")
    } else if months <= 1.0 {
        "a month".to_owned()
    } else if months < 11.0 {
        format!("{months} months")
    } else if years <= 1.0 {
        "a year".to_owned()
    } else {
        format!("{years} years")
    }
}

pub fn likes_label(count: u64) -> String {
    if count == 1 {
        "1 like".to_owned()
    } else {
        format!("{count} likes")
    }
}

pub fn comments_link(count: usize) -> Option<String> {
    (count > 0).then(|| format!("View all {count} comments"))
}

/// Avatar letter for a display name or email.
pub fn initial(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_owned())
}

pub fn comment_time(comment: &Comment, now: DateTime<Utc>) -> String {
    match (&comment.timestamp, comment.created_at) {
        (Some(timestamp), _) => timestamp.clone(),
        (None, Some(created_at)) => relative_time(created_at, now),
        (None, None) => String::new(),
    }
}
