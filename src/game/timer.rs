//! Tick-Driven Timers
//!
//! All timing in the simulation counts physics steps. Nothing here reads a
//! clock, so a run is reproducible from its command stream.
//!
//! - [`Interval`]: repeating trigger owned by an entity.
//! - [`Cooldown`]: one-shot lockout that cannot be re-armed while active.
//! - [`Scheduler`]: world-level queue of delayed actions, cancelled in bulk
//!   when their owner is removed.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::entity::EntityRef;

/// Fires once every `period` calls to [`Interval::tick`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    period: u32,
    elapsed: u32,
}

impl Interval {
    /// New interval. A zero period is treated as one.
    pub fn new(period: u32) -> Self {
        Self { period: period.max(1), elapsed: 0 }
    }

    /// Advance one tick; true on the firing tick.
    pub fn tick(&mut self) -> bool {
        self.elapsed += 1;
        if self.elapsed >= self.period {
            self.elapsed = 0;
            return true;
        }
        false
    }

    /// Ticks since the last firing.
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }
}

/// Boolean flag that stays set for a fixed number of ticks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    remaining: u32,
}

impl Cooldown {
    /// Arm for `duration` ticks. Refused (returns false) while already armed.
    pub fn arm(&mut self, duration: u32) -> bool {
        if self.is_active() || duration == 0 {
            return false;
        }
        self.remaining = duration;
        true
    }

    /// Count down one tick, clearing itself at zero.
    pub fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Whether the lockout is in force.
    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Ticks left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// Deferred work the world performs when a task comes due.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskAction {
    /// Thief finished its steal pause and runs off.
    ThiefFlee,
    /// Thief retreat lifetime ran out.
    ThiefExpire,
    /// Laundry line drops its rug.
    RugDrop {
        /// Where the rug lands
        position: FixedVec2,
    },
    /// Rolling bucket lifetime ran out.
    BucketExpire,
}

/// A queued task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Entity the task belongs to
    pub owner: EntityRef,
    /// Tick on which it runs
    pub due_tick: u32,
    /// What to do
    pub action: TaskAction,
}

/// World-level task queue ordered by (due tick, insertion order).
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    tasks: BTreeMap<(u32, u64), ScheduledTask>,
    next_seq: u64,
}

impl Scheduler {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `action` for `owner` to run `delay` ticks after `now`.
    ///
    /// A zero delay runs on the next tick: tasks never run in the phase that
    /// scheduled them.
    pub fn schedule(&mut self, now: u32, delay: u32, owner: EntityRef, action: TaskAction) {
        let due_tick = now.saturating_add(delay.max(1));
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.insert((due_tick, seq), ScheduledTask { owner, due_tick, action });
    }

    /// Remove and return every task due at or before `now`, in order.
    pub fn take_due(&mut self, now: u32) -> Vec<ScheduledTask> {
        let later = self.tasks.split_off(&(now.saturating_add(1), 0));
        let due = std::mem::replace(&mut self.tasks, later);
        due.into_values().collect()
    }

    /// Drop every task owned by `owner`. Returns how many were cancelled.
    pub fn cancel_owner(&mut self, owner: EntityRef) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| task.owner != owner);
        before - self.tasks.len()
    }

    /// Whether `owner` has anything queued.
    #[cfg(test)]
    pub fn has_tasks_for(&self, owner: EntityRef) -> bool {
        self.tasks.values().any(|task| task.owner == owner)
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Feed the queue into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.tasks.len() as u32);
        for task in self.tasks.values() {
            hasher.update_u32(task.due_tick);
            hasher.update_u8(match task.action {
                TaskAction::ThiefFlee => 0,
                TaskAction::ThiefExpire => 1,
                TaskAction::RugDrop { .. } => 2,
                TaskAction::BucketExpire => 3,
            });
            hasher.update_u32(task.owner.id().map_or(0, |id| id.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::EntityId;

    #[test]
    fn test_interval_fires_on_period() {
        let mut interval = Interval::new(3);
        let fired: Vec<bool> = (0..7).map(|_| interval.tick()).collect();
        assert_eq!(fired, vec![false, false, true, false, false, true, false]);
    }

    #[test]
    fn test_cooldown_not_rearmable_while_armed() {
        let mut cooldown = Cooldown::default();
        assert!(cooldown.arm(3));
        assert!(!cooldown.arm(10));
        assert_eq!(cooldown.remaining(), 3);

        for _ in 0..3 {
            assert!(cooldown.is_active());
            cooldown.tick();
        }
        assert!(!cooldown.is_active());
        assert!(cooldown.arm(2));
    }

    #[test]
    fn test_scheduler_runs_due_tasks_in_order() {
        let thief = EntityRef::Thief(EntityId(1));
        let bucket = EntityRef::Bucket(EntityId(2));
        let mut scheduler = Scheduler::new();
        scheduler.schedule(10, 5, bucket, TaskAction::BucketExpire);
        scheduler.schedule(10, 1, thief, TaskAction::ThiefFlee);
        scheduler.schedule(10, 5, thief, TaskAction::ThiefExpire);

        assert!(scheduler.take_due(10).is_empty());
        let first = scheduler.take_due(11);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].action, TaskAction::ThiefFlee);

        let later = scheduler.take_due(20);
        assert_eq!(
            later.iter().map(|t| t.action).collect::<Vec<_>>(),
            vec![TaskAction::BucketExpire, TaskAction::ThiefExpire]
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancel_owner_only_touches_owner() {
        let thief = EntityRef::Thief(EntityId(1));
        let bucket = EntityRef::Bucket(EntityId(2));
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0, 1, thief, TaskAction::ThiefFlee);
        scheduler.schedule(0, 9, thief, TaskAction::ThiefExpire);
        scheduler.schedule(0, 9, bucket, TaskAction::BucketExpire);

        assert_eq!(scheduler.cancel_owner(thief), 2);
        assert!(!scheduler.has_tasks_for(thief));
        assert!(scheduler.has_tasks_for(bucket));
        assert_eq!(scheduler.cancel_owner(thief), 0);
    }

    #[test]
    fn test_zero_delay_runs_next_tick() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(4, 0, EntityRef::Player, TaskAction::ThiefFlee);
        assert!(scheduler.take_due(4).is_empty());
        assert_eq!(scheduler.take_due(5).len(), 1);
    }
}
