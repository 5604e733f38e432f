use std::process::Command;

/// Verify if a process with the given PID is running
#[cfg(unix)]
pub fn verify_process_running(pid: u32) -> bool {
    // kill -0 only checks that the process exists
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(windows)]
pub fn verify_process_running(pid: u32) -> bool {
    Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid), "/NH"])
        .output()
        .map(|output| String::from_utf8_lossy(&output.stdout).contains(&pid.to_string()))
        .unwrap_or(false)
}

/// Ask the process to exit, forcing it if `force` is set
#[cfg(unix)]
pub fn terminate_process(pid: u32, force: bool) -> bool {
    let mut command = Command::new("kill");
    if force {
        command.arg("-9");
    }
    command
        .arg(pid.to_string())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(windows)]
pub fn terminate_process(pid: u32, force: bool) -> bool {
    let mut command = Command::new("taskkill");
    if force {
        command.arg("/F");
    }
    command
        .args(["/PID", &pid.to_string()])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
