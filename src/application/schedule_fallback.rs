//! Deterministic schedule synthesis used whenever the generated schedule is unavailable.
//!
//! Everything here is a pure function of its inputs: no clock, no storage, no randomness.

use crate::domain::models::{
    FixedEvent, Schedule, ScheduleItem, ScheduleItemKind, SlotPolicy, Task, TimeRange, TimeSlot,
};
use crate::domain::time::{add_minutes, TimeOfDay};
use serde::Serialize;

pub const REVIEW_TITLE: &str = "Review plan";
pub const REVIEW_DURATION_MINUTES: i64 = 30;
pub const BREAK_TITLE: &str = "Break";
pub const BREAK_DURATION_MINUTES: i64 = 10;
pub const BREAK_AFTER_TASK_MINUTES: u32 = 30;

/// Items placed into free time plus the tasks that did not fit anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub items: Vec<ScheduleItem>,
    pub dropped: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackSchedule {
    pub schedule: Schedule,
    pub dropped_tasks: Vec<Task>,
}

pub fn compute_free_slots(range: TimeRange, fixed_events: &[FixedEvent]) -> Vec<TimeSlot> {
    compute_free_slots_with(range, fixed_events, SlotPolicy::Boundary)
}

pub fn compute_free_slots_with(
    range: TimeRange,
    fixed_events: &[FixedEvent],
    policy: SlotPolicy,
) -> Vec<TimeSlot> {
    match policy {
        SlotPolicy::Boundary => boundary_slots(range, fixed_events),
        SlotPolicy::Gaps => gap_slots(range, fixed_events),
    }
}

fn boundary_slots(range: TimeRange, fixed_events: &[FixedEvent]) -> Vec<TimeSlot> {
    if fixed_events.is_empty() {
        return vec![TimeSlot::from(range)];
    }

    let mut sorted = fixed_events.iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| left.start.cmp(&right.start));
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };

    let mut slots = Vec::with_capacity(2);
    if range.start < first.start {
        slots.push(TimeSlot {
            start: range.start,
            end: first.start,
        });
    }
    if last.end < range.end {
        slots.push(TimeSlot {
            start: last.end,
            end: range.end,
        });
    }
    slots
}

fn gap_slots(range: TimeRange, fixed_events: &[FixedEvent]) -> Vec<TimeSlot> {
    if range.end <= range.start {
        return Vec::new();
    }

    let busy = merge_intervals(
        fixed_events
            .iter()
            .filter_map(|event| clip_interval(event.start, event.end, range))
            .collect(),
    );

    let mut slots = Vec::new();
    let mut cursor = range.start;
    for interval in &busy {
        if interval.start > cursor {
            slots.push(TimeSlot {
                start: cursor,
                end: interval.start,
            });
        }
        if interval.end > cursor {
            cursor = interval.end;
        }
    }
    if cursor < range.end {
        slots.push(TimeSlot {
            start: cursor,
            end: range.end,
        });
    }
    slots
}

fn clip_interval(start: TimeOfDay, end: TimeOfDay, range: TimeRange) -> Option<TimeSlot> {
    if end <= range.start || start >= range.end {
        return None;
    }
    let start = start.max(range.start);
    let end = end.min(range.end);
    (end > start).then_some(TimeSlot { start, end })
}

fn merge_intervals(mut intervals: Vec<TimeSlot>) -> Vec<TimeSlot> {
    intervals.sort_unstable_by(|left, right| left.start.cmp(&right.start));
    let mut merged: Vec<TimeSlot> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                if interval.end > last.end {
                    last.end = interval.end;
                }
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Greedy first-fit placement in input order, with a short break after long tasks.
pub fn allocate_tasks(tasks: &[Task], slots: &[TimeSlot]) -> Allocation {
    let mut allocation = Allocation::default();
    let Some(first_slot) = slots.first() else {
        allocation.dropped = tasks.to_vec();
        return allocation;
    };

    let mut slot_index = 0;
    let mut cursor = first_slot.start;

    for (task_index, task) in tasks.iter().enumerate() {
        let duration = task.effective_duration_minutes();
        let placed_end = loop {
            let Some(slot) = slots.get(slot_index) else {
                break None;
            };
            let task_end = add_minutes(cursor, duration as i64);
            if task_end <= slot.end {
                break Some((task_end, slot.end));
            }
            slot_index += 1;
            if let Some(next) = slots.get(slot_index) {
                cursor = next.start;
            }
        };

        let Some((task_end, slot_end)) = placed_end else {
            allocation.dropped.extend_from_slice(&tasks[task_index..]);
            break;
        };

        allocation.items.push(ScheduleItem {
            start_time: cursor,
            end_time: task_end,
            title: task.title.clone(),
            kind: ScheduleItemKind::Task,
        });
        cursor = task_end;

        if duration >= BREAK_AFTER_TASK_MINUTES {
            let break_end = add_minutes(task_end, BREAK_DURATION_MINUTES);
            if break_end <= slot_end {
                allocation.items.push(ScheduleItem {
                    start_time: task_end,
                    end_time: break_end,
                    title: BREAK_TITLE.to_string(),
                    kind: ScheduleItemKind::Break,
                });
                cursor = break_end;
            }
        }
    }

    allocation
}

pub fn synthesize(range: TimeRange, fixed_events: &[FixedEvent], tasks: &[Task]) -> Allocation {
    synthesize_with(range, fixed_events, tasks, SlotPolicy::Boundary)
}

pub fn synthesize_with(
    range: TimeRange,
    fixed_events: &[FixedEvent],
    tasks: &[Task],
    policy: SlotPolicy,
) -> Allocation {
    let slots = compute_free_slots_with(range, fixed_events, policy);
    allocate_tasks(tasks, &slots)
}

/// Review item, then every fixed event in input order, then the placed tasks and breaks.
pub fn compose_fallback_schedule(
    range: TimeRange,
    fixed_events: &[FixedEvent],
    tasks: &[Task],
    policy: SlotPolicy,
) -> FallbackSchedule {
    let allocation = synthesize_with(range, fixed_events, tasks, policy);

    let mut items = Vec::with_capacity(1 + fixed_events.len() + allocation.items.len());
    items.push(ScheduleItem {
        start_time: range.start,
        end_time: add_minutes(range.start, REVIEW_DURATION_MINUTES),
        title: REVIEW_TITLE.to_string(),
        kind: ScheduleItemKind::Task,
    });
    items.extend(fixed_events.iter().map(|event| ScheduleItem {
        start_time: event.start,
        end_time: event.end,
        title: event.title.clone(),
        kind: ScheduleItemKind::Fixed,
    }));
    items.extend(allocation.items);

    FallbackSchedule {
        schedule: Schedule { items },
        dropped_tasks: allocation.dropped,
    }
}
