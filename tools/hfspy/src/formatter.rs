//! Renders interpreted records as coloured text or JSON lines.

use std::collections::HashSet;

use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};

use crate::interpreter::{Entry, Record, RecordGroup};

pub struct RecordFormatter {
    show_timestamps: bool,
    json_format: bool,
    filters: Option<HashSet<RecordGroup>>,
}

impl RecordFormatter {
    pub fn new(show_timestamps: bool, json_format: bool) -> Self {
        Self {
            show_timestamps,
            json_format,
            filters: None,
        }
    }

    /// Restricts output to the named groups. Unknown names are returned.
    pub fn set_filters(&mut self, names: &[String]) -> Vec<String> {
        let mut filters = HashSet::new();
        let mut unknown = Vec::new();
        for name in names {
            match RecordGroup::parse(name) {
                Some(group) => {
                    filters.insert(group);
                }
                None => unknown.push(name.clone()),
            }
        }
        self.filters = Some(filters);
        unknown
    }

    pub fn accepts(&self, record: &Record) -> bool {
        self.filters
            .as_ref()
            .map_or(true, |filters| filters.contains(&record.entry.group()))
    }

    /// One output line, or `None` when the record is filtered out.
    pub fn format(&self, record: &Record, received: DateTime<Local>) -> Option<String> {
        if !self.accepts(record) {
            return None;
        }
        Some(if self.json_format {
            self.format_json(record, received)
        } else {
            self.format_text(record, received)
        })
    }

    fn format_json(&self, record: &Record, received: DateTime<Local>) -> String {
        let mut value = serde_json::to_value(record).unwrap_or_default();
        if self.show_timestamps {
            if let Some(map) = value.as_object_mut() {
                map.insert("received".into(), received.to_rfc3339().into());
            }
        }
        value.to_string()
    }

    fn format_text(&self, record: &Record, received: DateTime<Local>) -> String {
        let mut line = String::new();
        if self.show_timestamps {
            line.push_str(&format!("{} ", received.format("%H:%M:%S%.3f")).dimmed().to_string());
        }
        match record.timestamp_us {
            Some(ts) => line.push_str(&format!("{ts:010} ")),
            None => line.push_str(&format!("{:>10} ", "")),
        }
        line.push_str(&format!("{:<10} {}", tag(&record.entry), details(&record.entry)));
        line
    }
}

fn tag(entry: &Entry) -> ColoredString {
    let name = match entry {
        Entry::MachineInfo { .. } => "Mach-Info",
        Entry::StateDict { .. } => "St-Dict",
        Entry::EventDict { .. } => "Evt-Dict",
        Entry::TimerDict { .. } => "Tmr-Dict",
        Entry::Dispatch { .. } => "Dispatch",
        Entry::Transition { .. } => "Tran",
        Entry::Ignored { .. } => "Ignored",
        Entry::Unhandled { .. } => "Unhandled",
        Entry::ActionFailed { .. } => "Act-Fail",
        Entry::BadChoice { .. } => "Bad-Choice",
        Entry::Immediate { .. } => "Immediate",
        Entry::Post { .. } => "Post",
        Entry::QueueFull { .. } => "Q-Full",
        Entry::TimerArm { .. } => "Tmr-Arm",
        Entry::TimerDisarm { .. } => "Tmr-Disarm",
        Entry::TimerFire { .. } => "Tmr-Fire",
        Entry::Raw { .. } => "Raw",
    };
    if entry.is_problem() {
        return name.bright_red().bold();
    }
    match entry.group() {
        RecordGroup::StateMachine => name.bright_blue(),
        RecordGroup::Queue => name.bright_cyan(),
        RecordGroup::Timer => name.bright_yellow(),
        RecordGroup::Dictionary => name.yellow(),
        RecordGroup::Unknown => name.white(),
    }
}

fn details(entry: &Entry) -> String {
    match entry {
        Entry::MachineInfo {
            name,
            high_capacity,
            low_capacity,
        } => format!("{name} queues high={high_capacity} low={low_capacity}"),
        Entry::StateDict { id, name }
        | Entry::EventDict { id, name }
        | Entry::TimerDict { id, name } => format!("{id:04}->{name}"),
        Entry::Dispatch { state, event }
        | Entry::Ignored { state, event }
        | Entry::Unhandled { state, event }
        | Entry::ActionFailed { state, event }
        | Entry::Immediate { state, event } => format!("{event} in {state}"),
        Entry::BadChoice { state, event, index } => format!("{event} in {state} branch={index}"),
        Entry::Transition { event, from, to } => {
            format!("{from} --{event}--> {}", to.bright_cyan())
        }
        Entry::Post {
            event,
            priority,
            depth,
        } => format!("{event} [{priority}] depth={depth}"),
        Entry::QueueFull { event, priority } => format!("{event} [{priority}]"),
        Entry::TimerArm {
            timer,
            ticks,
            interval,
        } => format!("{timer} ticks={ticks} interval={interval}"),
        Entry::TimerDisarm { timer } => timer.clone(),
        Entry::TimerFire { timer, periodic } => {
            format!("{timer}{}", if *periodic { " (periodic)" } else { "" })
        }
        Entry::Raw { record_type, data } => format!("rec 0x{record_type:02X} {}", data.dimmed()),
    }
}
