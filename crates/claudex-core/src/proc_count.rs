// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory descendant-PID counting. Platform-specific, racy by nature:
//! callers should treat the result as a hint, not a precise snapshot.

/// Count all descendants of `pid` (children, grandchildren, ...).
///
/// Errors reading any individual subtree are swallowed; they simply don't
/// contribute to the count.
pub fn count_descendants(pid: u32) -> usize {
    let mut seen = std::collections::HashSet::new();
    collect_descendants(pid, &mut seen);
    seen.len()
}

#[cfg(target_os = "linux")]
fn collect_descendants(pid: u32, seen: &mut std::collections::HashSet<u32>) {
    let task_dir = format!("/proc/{pid}/task");
    let Ok(tasks) = std::fs::read_dir(&task_dir) else {
        return;
    };

    let mut children = std::collections::HashSet::new();
    for task in tasks.flatten() {
        let children_path = task.path().join("children");
        let Ok(contents) = std::fs::read_to_string(&children_path) else {
            continue;
        };
        for tok in contents.split_whitespace() {
            if let Ok(child) = tok.parse::<u32>() {
                children.insert(child);
            }
        }
    }

    for child in children {
        if seen.insert(child) {
            collect_descendants(child, seen);
        }
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn collect_descendants(pid: u32, seen: &mut std::collections::HashSet<u32>) {
    let output = std::process::Command::new("pgrep").arg("-P").arg(pid.to_string()).output();
    let Ok(output) = output else {
        return;
    };
    // pgrep exits 1 when there are no matching processes; that's not an error.
    if !output.status.success() && output.status.code() != Some(1) {
        return;
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let children: Vec<u32> = text.lines().filter_map(|l| l.trim().parse().ok()).collect();
    for child in children {
        if seen.insert(child) {
            collect_descendants(child, seen);
        }
    }
}

#[cfg(not(unix))]
fn collect_descendants(_pid: u32, _seen: &mut std::collections::HashSet<u32>) {}

#[cfg(test)]
#[path = "proc_count_tests.rs"]
mod tests;
