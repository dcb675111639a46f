use std::fs;
use std::io::Write;
use std::path::Path;

/// Appends one structured event to the run log. Best-effort: the log never
/// fails a run.
pub fn append_run_log(run_dir: &Path, event: &str, message: &str) {
    let payload = serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "event": event,
        "message": message,
    });

    let Ok(line) = serde_json::to_string(&payload) else {
        return;
    };

    let path = run_dir.join("logs").join("run.jsonl");
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = writeln!(file, "{line}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn log_lines_accumulate_as_jsonl() {
        let dir = tempdir().expect("tempdir");
        append_run_log(dir.path(), "stage_started", "analysis");
        append_run_log(dir.path(), "stage_finished", "analysis");

        let raw = fs::read_to_string(dir.path().join("logs/run.jsonl")).expect("read");
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(first["event"], "stage_started");
    }
}
