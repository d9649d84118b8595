//! ICS feed parsing using the icalendar crate's parser.

use std::collections::BTreeMap;

use icalendar::{
    DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};
use tracing::{debug, warn};

use crate::error::{CalTrackError, CalTrackResult};
use crate::event::{Event, EventTime, MalformedEvent};
use crate::feed::Feed;

/// Parse a whole feed into events keyed by UID.
///
/// VEVENTs without a UID are dropped. VEVENTs without a usable DTSTART or
/// DTEND are returned as malformed events.
pub fn parse_feed(content: &str) -> CalTrackResult<Feed> {
    let unfolded = unfold(content);
    let calendar =
        read_calendar(&unfolded).map_err(|e| CalTrackError::IcsParse(e.to_string()))?;

    let mut feed = Feed {
        name: calendar
            .properties
            .iter()
            .find(|p| p.name == "X-WR-CALNAME")
            .map(|p| unescape(p.val.as_ref())),
        events: BTreeMap::new(),
        malformed: Vec::new(),
    };

    for component in &calendar.components {
        if component.name == "VCALENDAR" && feed.name.is_none() {
            feed.name = component
                .find_prop("X-WR-CALNAME")
                .map(|p| unescape(p.val.as_ref()));
        }
        collect_events(component, &mut feed);
    }

    Ok(feed)
}

fn collect_events(component: &Component<'_>, feed: &mut Feed) {
    if component.name != "VEVENT" {
        for child in &component.components {
            collect_events(child, feed);
        }
        return;
    }

    let Some(uid) = component.find_prop("UID").map(|p| p.val.to_string()) else {
        warn!("dropping VEVENT without UID");
        return;
    };

    // Overrides of single occurrences share the master's UID.
    if component.find_prop("RECURRENCE-ID").is_some() {
        debug!(uid = %uid, "ignoring recurrence override");
        return;
    }

    let summary = component
        .find_prop("SUMMARY")
        .map(|p| unescape(p.val.as_ref()))
        .unwrap_or_default();

    let start = event_time(component, "DTSTART");
    let end = event_time(component, "DTEND");

    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (start, _) => {
            let missing = if start.is_none() { "DTSTART" } else { "DTEND" };
            feed.malformed.push(MalformedEvent {
                uid,
                summary,
                missing: missing.to_string(),
            });
            return;
        }
    };

    let description = component
        .find_prop("DESCRIPTION")
        .map(|p| unescape(p.val.as_ref()));
    let recurrence = component.find_prop("RRULE").map(|p| p.val.to_string());
    let sequence = component
        .find_prop("SEQUENCE")
        .and_then(|p| p.val.as_ref().parse().ok());

    if feed.events.contains_key(&uid) {
        warn!(uid = %uid, "feed contains the same UID twice, keeping the last one");
    }

    feed.events.insert(
        uid.clone(),
        Event {
            uid,
            summary,
            description,
            start,
            end,
            recurrence,
            sequence,
        },
    );
}

fn event_time(component: &Component<'_>, name: &str) -> Option<EventTime> {
    let prop = component.find_prop(name)?;
    DatePerhapsTime::try_from(prop).ok().map(to_event_time)
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::DateTimeZoned {
                    datetime: date_time,
                    tzid,
                }
            }
        },
    }
}

/// Undo RFC 5545 TEXT escaping.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
