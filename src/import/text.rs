use std::{fs, path::Path};

use super::ImportError;

/// Reads a UTF-8 text file as a single page.
pub fn read_text(path: &Path) -> Result<String, ImportError> {
    fs::read_to_string(path).map_err(|err| ImportError::Io(path.to_path_buf(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn reads_whole_file() {
        let file = assert_fs::NamedTempFile::new("book.txt").unwrap();
        file.write_str("Line one.\nLine two.").unwrap();
        assert_eq!(read_text(file.path()).unwrap(), "Line one.\nLine two.");
    }

    #[test]
    fn invalid_utf8_is_an_io_error() {
        let file = assert_fs::NamedTempFile::new("book.txt").unwrap();
        file.write_binary(&[0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(read_text(file.path()), Err(ImportError::Io(_, _))));
    }
}
