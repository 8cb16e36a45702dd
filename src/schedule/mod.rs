//! Cron scheduling for recurring scrape runs
//!
//! Manages entries in the user's crontab through the `crontab` binary:
//! adding a job that re-invokes this tool's `run` subcommand, listing
//! current jobs, and removing jobs by command pattern. Unix only.

use crate::{Result, ScrapeError};
use std::process::{Command, Stdio};

/// Log target appended to scheduled commands that do not redirect output
const CRON_LOG_REDIRECT: &str = ">> /tmp/inkcap_cron.log 2>&1";

/// Validates a 5-field cron expression
///
/// Field contents are left to cron itself; this catches the common
/// mistakes (wrong field count, stray characters) before touching the
/// crontab.
pub fn validate_cron_expression(expr: &str) -> Result<()> {
    let fields: Vec<&str> = expr.split_whitespace().collect();

    if fields.len() != 5 {
        return Err(ScrapeError::Schedule(format!(
            "Invalid cron expression '{}': expected 5 fields, got {}",
            expr,
            fields.len()
        )));
    }

    for field in fields {
        if !field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | ',' | '-' | '/'))
        {
            return Err(ScrapeError::Schedule(format!(
                "Invalid cron field '{}' in expression '{}'",
                field, expr
            )));
        }
    }

    Ok(())
}

/// Builds a crontab entry for a command
///
/// Output is redirected to the cron log unless the command already
/// redirects somewhere.
pub fn build_entry(expr: &str, command: &str) -> String {
    if command.contains('>') {
        format!("{} {}", expr, command)
    } else {
        format!("{} {} {}", expr, command, CRON_LOG_REDIRECT)
    }
}

/// Extracts job lines from crontab text, skipping comments and blanks
pub fn parse_job_list(crontab: &str) -> Vec<String> {
    crontab
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Removes lines matching a pattern from crontab text
///
/// Returns the filtered text and the number of removed job lines.
pub fn filter_jobs(crontab: &str, pattern: &str) -> (String, usize) {
    let mut kept = Vec::new();
    let mut removed = 0;

    for line in crontab.lines() {
        if !line.trim_start().starts_with('#') && line.contains(pattern) {
            tracing::info!("Removing cron job: {}", line);
            removed += 1;
        } else {
            kept.push(line);
        }
    }

    let mut text = kept.join("\n");
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    (text, removed)
}

/// Manages scheduled scrape jobs in the user's crontab
pub struct CronScheduler;

impl CronScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Adds a job for `command` at the given schedule
    pub fn add_job(&self, expr: &str, command: &str, comment: Option<&str>) -> Result<()> {
        ensure_unix()?;
        validate_cron_expression(expr)?;

        let current = self.read_crontab()?;
        let entry = build_entry(expr, command);

        let mut new_crontab = current.trim_end().to_string();
        if !new_crontab.is_empty() {
            new_crontab.push('\n');
        }
        if let Some(comment) = comment {
            new_crontab.push_str(&format!("# {}\n", comment));
        }
        new_crontab.push_str(&entry);
        new_crontab.push('\n');

        self.write_crontab(&new_crontab)?;
        tracing::info!("Added cron job: {}", entry);
        Ok(())
    }

    /// Lists current job lines
    pub fn list_jobs(&self) -> Result<Vec<String>> {
        ensure_unix()?;
        let crontab = self.read_crontab()?;
        Ok(parse_job_list(&crontab))
    }

    /// Removes jobs whose command contains `pattern`
    ///
    /// Returns the number of removed jobs; zero is not an error.
    pub fn remove_jobs(&self, pattern: &str) -> Result<usize> {
        ensure_unix()?;
        let current = self.read_crontab()?;
        let (filtered, removed) = filter_jobs(&current, pattern);

        if removed == 0 {
            tracing::warn!("No cron jobs found matching pattern: {}", pattern);
            return Ok(0);
        }

        self.write_crontab(&filtered)?;
        Ok(removed)
    }

    /// Reads the current crontab; a missing crontab reads as empty
    fn read_crontab(&self) -> Result<String> {
        let output = Command::new("crontab")
            .arg("-l")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ScrapeError::Schedule(format!("Failed to run crontab: {}", e)))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no crontab") {
            Ok(String::new())
        } else {
            Err(ScrapeError::Schedule(format!(
                "crontab -l failed: {}",
                stderr.trim()
            )))
        }
    }

    /// Replaces the crontab with the given content
    fn write_crontab(&self, content: &str) -> Result<()> {
        use std::io::Write;

        let mut child = Command::new("crontab")
            .arg("-")
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ScrapeError::Schedule(format!("Failed to run crontab: {}", e)))?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(content.as_bytes())
                .map_err(|e| ScrapeError::Schedule(format!("Failed to write crontab: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ScrapeError::Schedule(format!("Failed to wait on crontab: {}", e)))?;

        if !output.status.success() {
            return Err(ScrapeError::Schedule(format!(
                "crontab update failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Cron scheduling requires a Unix crontab
fn ensure_unix() -> Result<()> {
    if cfg!(unix) {
        Ok(())
    } else {
        Err(ScrapeError::Schedule(
            "Cron scheduling is only supported on Unix; use your platform's task scheduler"
                .to_string(),
        ))
    }
}
