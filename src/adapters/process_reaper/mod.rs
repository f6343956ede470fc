// Process reaper adapter - stray transcoder cleanup through sysinfo

use sysinfo::System;
use tracing::{debug, info, warn};

use crate::ports::*;

/// Terminates leftover transcoder processes from earlier runs
pub struct SysinfoProcessReaper;

impl SysinfoProcessReaper {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SysinfoProcessReaper {
    fn default() -> Self {
        Self::new()
    }
}

fn without_exe_suffix(name: &str) -> &str {
    let split = name.len().saturating_sub(4);
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(suffix)) if !stem.is_empty() && suffix.eq_ignore_ascii_case(".exe") => stem,
        _ => name,
    }
}

/// Whether a running process called `candidate` is an instance of `wanted`.
///
/// A trailing `.exe` is ignored on either side; on Windows the comparison
/// is case-insensitive.
pub fn process_name_matches(candidate: &str, wanted: &str) -> bool {
    let candidate = without_exe_suffix(candidate);
    let wanted = without_exe_suffix(wanted);
    if cfg!(windows) {
        candidate.eq_ignore_ascii_case(wanted)
    } else {
        candidate == wanted
    }
}

impl ProcessReaperPort for SysinfoProcessReaper {
    fn reap(&self, name: &str) -> usize {
        if without_exe_suffix(name).is_empty() {
            return 0;
        }

        let sys = System::new_all();
        let mut signalled = 0;
        for process in sys
            .processes()
            .values()
            .filter(|process| process_name_matches(process.name(), name))
        {
            if process.kill() {
                debug!(pid = %process.pid(), name, "Killed stray transcoder");
                signalled += 1;
            } else {
                warn!(pid = %process.pid(), name, "Could not kill stray transcoder");
            }
        }

        if signalled > 0 {
            info!(count = signalled, name, "Terminated stray transcoder processes");
        }
        signalled
    }
}
