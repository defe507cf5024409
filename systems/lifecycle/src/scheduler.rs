//! Tick-driven job scheduling pumped by the host.

use std::collections::BTreeMap;

/// Identifier returned when a job is scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle(u64);

impl JobHandle {
    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug)]
struct Entry<J> {
    job: J,
    due: u64,
    period: Option<u64>,
}

/// Runs jobs after a delay, once or repeatedly, counted in ticks.
///
/// Jobs due on the same tick run in the order they were scheduled.
#[derive(Clone, Debug)]
pub struct TickScheduler<J> {
    now: u64,
    next_handle: u64,
    entries: BTreeMap<JobHandle, Entry<J>>,
}

impl<J: Clone> TickScheduler<J> {
    /// Creates a scheduler at tick zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: 0,
            next_handle: 0,
            entries: BTreeMap::new(),
        }
    }

    /// Ticks advanced so far.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Schedules a job first due after `delay` ticks and then every `period` ticks.
    ///
    /// A zero delay runs the job on the next tick; a zero period is treated as one.
    pub fn schedule_repeating(&mut self, job: J, delay: u64, period: u64) -> JobHandle {
        self.insert(job, delay, Some(period.max(1)))
    }

    /// Schedules a job to run once after `delay` ticks.
    pub fn schedule_once(&mut self, job: J, delay: u64) -> JobHandle {
        self.insert(job, delay, None)
    }

    /// Cancels a job, returning `false` when it already ran or was cancelled.
    pub fn cancel(&mut self, handle: JobHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    /// Cancels every job and returns how many were pending.
    ///
    /// No cancelled job runs afterwards, including jobs due on the current tick.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.entries.len();
        self.entries.clear();
        cancelled
    }

    /// Number of scheduled jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no job is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advances one tick and returns the jobs due on it.
    ///
    /// Repeating jobs are rescheduled and one-shot jobs forgotten before the
    /// caller runs anything.
    pub fn advance(&mut self) -> Vec<(JobHandle, J)> {
        self.now = self.now.saturating_add(1);
        let now = self.now;

        let mut due = Vec::new();
        let mut finished = Vec::new();
        for (handle, entry) in &mut self.entries {
            if entry.due > now {
                continue;
            }
            due.push((*handle, entry.job.clone()));
            match entry.period {
                Some(period) => entry.due = now.saturating_add(period),
                None => finished.push(*handle),
            }
        }
        for handle in finished {
            let _ = self.entries.remove(&handle);
        }
        due
    }

    fn insert(&mut self, job: J, delay: u64, period: Option<u64>) -> JobHandle {
        let handle = JobHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        let due = self.now.saturating_add(delay.max(1));
        let _ = self.entries.insert(handle, Entry { job, due, period });
        handle
    }
}

impl<J: Clone> Default for TickScheduler<J> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(scheduler: &mut TickScheduler<&'static str>, ticks: u64) -> Vec<(u64, &'static str)> {
        let mut ran = Vec::new();
        for _ in 0..ticks {
            for (_, job) in scheduler.advance() {
                ran.push((scheduler.now(), job));
            }
        }
        ran
    }

    #[test]
    fn repeating_jobs_honour_delay_and_period() {
        let mut scheduler = TickScheduler::new();
        let _ = scheduler.schedule_repeating("spread", 0, 2);
        let _ = scheduler.schedule_repeating("detail", 3, 4);

        assert_eq!(
            run(&mut scheduler, 8),
            vec![
                (1, "spread"),
                (3, "spread"),
                (3, "detail"),
                (5, "spread"),
                (7, "spread"),
                (7, "detail"),
            ]
        );
    }

    #[test]
    fn one_shot_jobs_run_once() {
        let mut scheduler = TickScheduler::new();
        let _ = scheduler.schedule_once("expire", 2);
        assert_eq!(run(&mut scheduler, 5), vec![(2, "expire")]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn cancelled_jobs_never_run() {
        let mut scheduler = TickScheduler::new();
        let handle = scheduler.schedule_repeating("spread", 0, 1);
        let _ = scheduler.schedule_once("expire", 1);
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        assert_eq!(run(&mut scheduler, 1), vec![(1, "expire")]);

        let _ = scheduler.schedule_repeating("spread", 0, 1);
        let _ = scheduler.schedule_repeating("detail", 0, 1);
        assert_eq!(scheduler.cancel_all(), 2);
        assert!(run(&mut scheduler, 3).is_empty());
    }
}
