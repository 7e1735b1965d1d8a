use crate::error::RustySubtableError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

/// A unified reader over spreadsheet bytes held on disk or in memory
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory buffer
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a local file for reading
    ///
    /// # Arguments
    /// * `path` - Path to the file
    ///
    /// # Returns
    /// * `Result<UnifiedReader, RustySubtableError>` - Reader for the file content
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<UnifiedReader, RustySubtableError> {
        let file = File::open(path)?;
        Ok(UnifiedReader::Local(BufReader::new(file)))
    }

    /// Wraps bytes already loaded by the caller
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }

    /// Reads the leading bytes and rewinds, for container sniffing
    pub(crate) fn peek(&mut self, buffer: &mut [u8]) -> Result<usize, RustySubtableError> {
        let mut filled = 0usize;
        while filled < buffer.len() {
            let count = self.read(&mut buffer[filled..])?;
            if count == 0 {
                break;
            }
            filled += count;
        }
        self.rewind()?;
        Ok(filled)
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_local_file() {
        // Cargo.toml sits in the crate root during tests
        let result = UnifiedReader::open("Cargo.toml");
        assert!(result.is_ok(), "Failed to open local file: {:?}", result.err());

        let result = UnifiedReader::open("non_existent_file.xlsx");
        assert!(result.is_err(), "Should fail to open non-existent file");
    }

    #[test]
    fn test_peek_rewinds() {
        let mut reader = UnifiedReader::from_bytes(b"PK\x03\x04rest".to_vec());
        let mut magic = [0u8; 4];
        assert_eq!(reader.peek(&mut magic).unwrap(), 4);
        assert_eq!(&magic, b"PK\x03\x04");

        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"PK\x03\x04rest");
    }

    #[test]
    fn test_peek_short_input() {
        let mut reader = UnifiedReader::from_bytes(b"PK".to_vec());
        let mut magic = [0u8; 8];
        assert_eq!(reader.peek(&mut magic).unwrap(), 2);
    }
}
