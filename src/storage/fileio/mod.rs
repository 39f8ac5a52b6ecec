use std::{fs::File, io, path::Path};

use self::unix::UnixFileIO;
#[cfg(target_family = "unix")]
mod unix;

pub trait FileIO {
    fn read(&self, file: &File, buf: &mut [u8], offset: u64) -> io::Result<()>;
    fn write(&self, file: &File, buf: &[u8], offset: u64) -> io::Result<()>;
    fn open_file(&self, path: &Path, write: bool) -> io::Result<File>;
    fn create_file(&self, path: &Path) -> io::Result<File>;
}

pub fn default() -> impl FileIO {
    if cfg!(target_family = "unix") {
        UnixFileIO {}
    } else {
        todo!()
    }
}
