use std::{
    fs::{File, OpenOptions},
    path::Path,
};

use crate::error::Result;

/// Create-or-open a file for appending.
pub(crate) fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

pub(crate) fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents)?;
    Ok(())
}

/// Delete a file. A file that is already gone is not an error.
pub(crate) fn delete_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn open_append_creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.out");

        {
            use std::io::Write;
            let mut file = open_append(&path).unwrap();
            file.write_all(b"first\n").unwrap();
        }
        {
            use std::io::Write;
            let mut file = open_append(&path).unwrap();
            file.write_all(b"second\n").unwrap();
        }

        let mut contents = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn delete_file_tolerates_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ghost.pid");
        delete_file(&path).unwrap();

        write_file(&path, b"42").unwrap();
        delete_file(&path).unwrap();
        assert!(!path.exists());
    }
}
