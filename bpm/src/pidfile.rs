//! Pidfile discipline: a single decimal PID, written atomically once the
//! runtime has confirmed it, removed on successful stop.

use std::io::Write;

use crate::error::BpmError;
use crate::layout::Layout;

/// Write `pid` to `layout`'s pidfile via write-temp-then-rename.
pub fn write(layout: &Layout, pid: i64) -> Result<(), BpmError> {
    let run_dir = layout.run_dir();
    std::fs::create_dir_all(&run_dir).map_err(|e| BpmError::io(&run_dir, e))?;

    let pid_path = layout.pid_path();
    let tmp_path = pid_path.with_extension("pid.tmp");
    {
        let mut tmp_file = std::fs::File::create(&tmp_path).map_err(|e| BpmError::io(&tmp_path, e))?;
        writeln!(tmp_file, "{pid}").map_err(|e| BpmError::io(&tmp_path, e))?;
    }
    std::fs::rename(&tmp_path, &pid_path).map_err(|e| BpmError::io(&pid_path, e))
}

/// Read the PID previously written by [`write`].
pub fn read(layout: &Layout) -> Result<i64, BpmError> {
    let pid_path = layout.pid_path();
    let contents = std::fs::read_to_string(&pid_path).map_err(|e| BpmError::io(&pid_path, e))?;
    contents
        .trim()
        .parse()
        .map_err(|_| BpmError::Corrupt(format!("pidfile {} is corrupt", pid_path.display())))
}

/// Remove the pidfile, tolerating its prior absence.
pub fn remove(layout: &Layout) -> Result<(), BpmError> {
    let pid_path = layout.pid_path();
    match std::fs::remove_file(&pid_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BpmError::io(&pid_path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path(), "nginx", "web").unwrap();
        write(&layout, 4242).unwrap();
        assert_eq!(read(&layout).unwrap(), 4242);
    }

    #[test]
    fn remove_tolerates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path(), "nginx", "web").unwrap();
        remove(&layout).unwrap();
    }

    #[test]
    fn write_is_atomic_no_tmp_left_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path(), "nginx", "web").unwrap();
        write(&layout, 1).unwrap();
        assert!(!layout.run_dir().join("web.pid.tmp").exists());
    }
}
