use std::fmt;

use log::{debug, warn};
use nix::{
    errno::Errno,
    sys::{
        signal::{self, Signal},
        wait::{self, WaitPidFlag},
    },
    unistd::Pid,
};

use crate::core::job::{Job, JobResult, JobState};

/// Tracks background jobs from launch until they are reaped.
///
/// Growable; there is no limit on the number of concurrent jobs.
#[derive(Default)]
pub struct JobManager {
    jobs: Vec<Job>,
}

impl JobManager {
    /// Starts tracking a running background process.
    pub fn register(&mut self, pid: Pid) {
        self.track(Job::new(pid));
    }

    /// Starts tracking `job`, which may already have finished if the probe
    /// right after launch collected it.
    pub fn track(&mut self, job: Job) {
        debug!("tracking background job {:?}", job);
        // A pid can only come back after it was reaped, so an entry with the
        // same pid is necessarily stale.
        self.jobs.retain(|j| j.pid() != job.pid());
        self.jobs.push(job);
    }

    pub fn has_jobs(&self) -> bool {
        !self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.jobs.iter().map(Job::pid).collect()
    }

    /// Collects every job that has finished, without blocking, and stops
    /// tracking it. Results are in registration order.
    pub fn reap_finished(&mut self) -> Vec<JobResult> {
        let mut lost = Vec::new();
        for job in &mut self.jobs {
            if !job.is_running() {
                continue;
            }

            match wait::waitpid(job.pid(), Some(WaitPidFlag::WNOHANG)) {
                Ok(status) => {
                    let state = JobState::from_wait_status(&status);
                    if !state.is_running() {
                        debug!("background job {} finished: {:?}", job.pid(), state);
                    }
                    *job = job.set_state(state);
                }
                Err(Errno::EINTR) => {}
                Err(Errno::ECHILD) => {
                    // Something else already waited on it; nothing left to report.
                    warn!("background job {} is not a child of this shell", job.pid());
                    lost.push(job.pid());
                }
                Err(e) => warn!("unable to poll background job {}: {}", job.pid(), e),
            }
        }

        let (finished, running): (Vec<Job>, Vec<Job>) =
            self.jobs.drain(..).partition(|j| !j.is_running());
        self.jobs = running
            .into_iter()
            .filter(|j| !lost.contains(&j.pid()))
            .collect();
        finished.iter().filter_map(Job::result).collect()
    }

    /// Sends `SIGKILL` to every job still running and stops tracking all
    /// jobs. Does not wait for the processes to die.
    ///
    /// Returns the number of jobs signaled.
    pub fn kill_all(&mut self) -> usize {
        let mut killed = 0;
        for job in self.jobs.drain(..).filter(Job::is_running) {
            debug!("killing background job {}", job.pid());
            match signal::kill(job.pid(), Signal::SIGKILL) {
                Ok(()) => killed += 1,
                Err(e) => warn!("unable to kill background job {}: {}", job.pid(), e),
            }
        }
        killed
    }
}

impl fmt::Debug for JobManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} jobs", self.jobs.len())?;
        for job in &self.jobs {
            writeln!(f, "{:?}", job)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use std::thread;
    use std::time::{Duration, Instant};

    fn spawn(program: &str, args: &[&str]) -> Pid {
        let child = Command::new(program)
            .args(args)
            .spawn()
            .expect("failed to spawn");
        Pid::from_raw(child.id() as i32)
    }

    /// Polls until `n` results have been collected or the deadline passes.
    fn reap_n(manager: &mut JobManager, n: usize) -> Vec<JobResult> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut results = Vec::new();
        while results.len() < n && Instant::now() < deadline {
            results.extend(manager.reap_finished());
            thread::sleep(Duration::from_millis(10));
        }
        results
    }

    #[test]
    fn test_reap_exited_job() {
        let mut manager = JobManager::default();
        let pid = spawn("sh", &["-c", "exit 3"]);
        manager.register(pid);

        let results = reap_n(&mut manager, 1);
        assert_eq!(results, vec![JobResult::ExitedNormally { pid, code: 3 }]);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_reap_is_idempotent() {
        let mut manager = JobManager::default();
        let pid = spawn("true", &[]);
        manager.register(pid);

        assert_eq!(reap_n(&mut manager, 1).len(), 1);
        assert!(manager.reap_finished().is_empty());
        assert!(!manager.pids().contains(&pid));
    }

    #[test]
    fn test_reap_does_not_block_on_running_job() {
        let mut manager = JobManager::default();
        let pid = spawn("sleep", &["30"]);
        manager.register(pid);

        let start = Instant::now();
        assert!(manager.reap_finished().is_empty());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(manager.pids(), vec![pid]);

        assert_eq!(manager.kill_all(), 1);
        let status = wait::waitpid(pid, None).unwrap();
        assert_eq!(
            JobState::from_wait_status(&status),
            JobState::Terminated(Signal::SIGKILL)
        );
    }

    #[test]
    fn test_reap_signaled_job() {
        let mut manager = JobManager::default();
        let pid = spawn("sleep", &["30"]);
        manager.register(pid);
        signal::kill(pid, Signal::SIGTERM).unwrap();

        let results = reap_n(&mut manager, 1);
        assert_eq!(
            results,
            vec![JobResult::Terminated {
                pid,
                signal: Signal::SIGTERM
            }]
        );
    }

    #[test]
    fn test_track_already_finished_job() {
        let mut manager = JobManager::default();
        let pid = Pid::from_raw(999_999);
        manager.track(Job::with_state(pid, JobState::ExitedNormally(0)));

        assert_eq!(
            manager.reap_finished(),
            vec![JobResult::ExitedNormally { pid, code: 0 }]
        );
        assert!(manager.is_empty());
    }

    #[test]
    fn test_kill_all_leaves_no_survivors() {
        let mut manager = JobManager::default();
        let pids: Vec<Pid> = (0..3).map(|_| spawn("sleep", &["30"])).collect();
        for pid in &pids {
            manager.register(*pid);
        }
        assert_eq!(manager.len(), 3);

        assert_eq!(manager.kill_all(), 3);
        assert!(!manager.has_jobs());
        for pid in pids {
            let status = wait::waitpid(pid, None).unwrap();
            assert_eq!(
                JobState::from_wait_status(&status),
                JobState::Terminated(Signal::SIGKILL)
            );
        }
    }

    #[test]
    fn test_kill_all_skips_finished_jobs() {
        let mut manager = JobManager::default();
        manager.track(Job::with_state(
            Pid::from_raw(999_998),
            JobState::ExitedNormally(0),
        ));
        assert_eq!(manager.kill_all(), 0);
        assert!(manager.is_empty());
    }
}
