use nix::libc;
use std::fs::OpenOptions;
use std::os::unix::prelude::FileExt;
use std::path::Path;
use std::{fs::File, io};

use super::FileIO;

pub struct UnixFileIO;

impl UnixFileIO {
    #[cfg(target_os = "macos")]
    fn open_or_create_file(path: &Path, write: bool, create: bool) -> io::Result<File> {
        use std::os::unix::prelude::AsRawFd;

        let file = OpenOptions::new()
            .read(true)
            .write(write)
            .create(create)
            .open(path)?;

        // On OSX there is no usable O_SYNC open flag, so bypass the page
        // cache with F_NOCACHE on the fd instead.
        unsafe { libc::fcntl(file.as_raw_fd(), libc::F_NOCACHE, 1) };

        Ok(file)
    }

    #[cfg(not(target_os = "macos"))]
    fn open_or_create_file(path: &Path, write: bool, create: bool) -> io::Result<File> {
        use std::os::unix::prelude::OpenOptionsExt;

        // O_SYNC: a completed swap write must be on stable storage.
        // O_DIRECT is out: it needs 512-byte-aligned transfers and swap
        // pages are smaller than a disk sector.
        let flags = libc::O_SYNC;

        OpenOptions::new()
            .custom_flags(flags)
            .read(true)
            .write(write)
            .create(create)
            .open(path)
    }
}

impl FileIO for UnixFileIO {
    fn read(&self, file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
        // pread: positioned read, no lseek, safe under concurrent callers
        file.read_exact_at(buf, offset)
    }

    fn write(&self, file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
        // pwrite, same deal
        file.write_all_at(buf, offset)
    }

    fn open_file(&self, path: &Path, write: bool) -> io::Result<File> {
        UnixFileIO::open_or_create_file(path, write, false)
    }

    fn create_file(&self, path: &Path) -> io::Result<File> {
        UnixFileIO::open_or_create_file(path, true, true)
    }
}

#[cfg(target_family = "unix")]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::definitions::PAGE_SIZE;
    use std::fs;
    use std::io::ErrorKind;

    struct TmpFiles {
        paths: Vec<String>,
    }
    impl Drop for TmpFiles {
        fn drop(&mut self) {
            for path in &self.paths {
                let _ = fs::remove_file(path);
            }
        }
    }

    // use this macro before tests to clean up files after test finishes
    macro_rules! set_up_files {
        ($($x:expr),+ $(,)?) => {
            let _tmp = TmpFiles{paths: vec![$($x.to_string()),+]};
            for path in &_tmp.paths {
                let _ = UnixFileIO {}.create_file(Path::new(path));
            }
        };
    }

    #[test]
    fn open_file_not_found() {
        let file = UnixFileIO {}.open_file(Path::new("fileio_missing"), false);
        assert!(file.is_err() && file.unwrap_err().kind() == ErrorKind::NotFound);
    }

    #[test]
    fn page_write_then_read_at_offset() {
        set_up_files!("fileio_page_rw");

        let io = UnixFileIO {};
        let file = io.open_file(Path::new("fileio_page_rw"), true).unwrap();

        let page = vec![0x5Au8; PAGE_SIZE];
        io.write(&file, &page, 3 * PAGE_SIZE as u64).unwrap();

        let mut out = vec![0u8; PAGE_SIZE];
        io.read(&file, &mut out, 3 * PAGE_SIZE as u64).unwrap();
        assert_eq!(out, page);
    }

    #[test]
    fn read_past_end_is_unexpected_eof() {
        set_up_files!("fileio_eof");

        let io = UnixFileIO {};
        let file = io.open_file(Path::new("fileio_eof"), false).unwrap();

        let mut buf = vec![0u8; PAGE_SIZE];
        let res = io.read(&file, &mut buf, 0);
        assert_eq!(res.unwrap_err().kind(), ErrorKind::UnexpectedEof);
    }
}
