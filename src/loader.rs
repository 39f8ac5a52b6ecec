use crate::shared::contracts::{ExecutableImage, Segment};
use crate::storage::fileio::{self, FileIO};
use std::fs::File;
use std::io;
use std::path::Path;

/// Magic number opening a NOFF executable header.
pub const NOFF_MAGIC: u32 = 0xbadfad;

const HEADER_LEN: usize = 40;

/// NOFF executable: a magic word followed by code, initialized-data and
/// uninitialized-data segment descriptors, then the raw segment bytes.
/// The header may be in either byte order; a magic that only matches
/// after swapping means the file came from the other endianness.
#[derive(Debug)]
pub struct NoffImage {
    file: File,
    code: Segment,
    init_data: Segment,
    uninit_data: Segment,
}

impl NoffImage {
    pub fn open(path: &Path) -> io::Result<Self> {
        let io = fileio::default();
        let file = io.open_file(path, false)?;

        let mut header = [0u8; HEADER_LEN];
        io.read(&file, &mut header, 0)?;

        let word = |i: usize| u32::from_le_bytes(header[i * 4..i * 4 + 4].try_into().unwrap());
        let word_be = |i: usize| u32::from_be_bytes(header[i * 4..i * 4 + 4].try_into().unwrap());

        let swapped = match word(0) {
            NOFF_MAGIC => false,
            _ if word_be(0) == NOFF_MAGIC => true,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("bad NOFF magic {:#x}", other),
                ))
            }
        };
        let field = |i: usize| -> usize {
            (if swapped { word_be(i) } else { word(i) }) as usize
        };

        // header layout: magic, then (virtualAddr, inFileAddr, size) per
        // segment in code/initData/uninitData order
        let segment = |base: usize, in_file: bool| Segment {
            virtual_addr: field(base),
            file_offset: if in_file {
                Some(field(base + 1) as u64)
            } else {
                None
            },
            size: field(base + 2),
        };

        Ok(Self {
            file,
            code: segment(1, true),
            init_data: segment(4, true),
            uninit_data: segment(7, false),
        })
    }
}

impl ExecutableImage for NoffImage {
    fn segments(&self) -> Vec<Segment> {
        vec![self.code, self.init_data, self.uninit_data]
    }

    fn read_range(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        fileio::default().read(&self.file, buf, offset)
    }
}

/// In-memory image: code at virtual address zero, initialized data
/// directly after it, then `uninit_size` bytes of zero-filled space.
pub struct BufImage {
    bytes: Vec<u8>,
    code: Segment,
    init_data: Segment,
    uninit_data: Segment,
}

impl BufImage {
    pub fn new(code: Vec<u8>, init_data: Vec<u8>, uninit_size: usize) -> Self {
        let code_seg = Segment {
            virtual_addr: 0,
            size: code.len(),
            file_offset: Some(0),
        };
        let init_seg = Segment {
            virtual_addr: code.len(),
            size: init_data.len(),
            file_offset: Some(code.len() as u64),
        };
        let uninit_seg = Segment {
            virtual_addr: code.len() + init_data.len(),
            size: uninit_size,
            file_offset: None,
        };
        let mut bytes = code;
        bytes.extend_from_slice(&init_data);
        Self {
            bytes,
            code: code_seg,
            init_data: init_seg,
            uninit_data: uninit_seg,
        }
    }
}

impl ExecutableImage for BufImage {
    fn segments(&self) -> Vec<Segment> {
        vec![self.code, self.init_data, self.uninit_data]
    }

    fn read_range(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let offset = offset as usize;
        if offset + buf.len() > self.bytes.len() {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

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

    fn write_noff(path: &str, le: bool, code: &[u8], init: &[u8], uninit_size: u32) {
        let word = |v: u32| {
            if le {
                v.to_le_bytes()
            } else {
                v.to_be_bytes()
            }
        };
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&word(NOFF_MAGIC));
        // code
        bytes.extend_from_slice(&word(0));
        bytes.extend_from_slice(&word(HEADER_LEN as u32));
        bytes.extend_from_slice(&word(code.len() as u32));
        // initData
        bytes.extend_from_slice(&word(code.len() as u32));
        bytes.extend_from_slice(&word((HEADER_LEN + code.len()) as u32));
        bytes.extend_from_slice(&word(init.len() as u32));
        // uninitData
        bytes.extend_from_slice(&word((code.len() + init.len()) as u32));
        bytes.extend_from_slice(&word(0));
        bytes.extend_from_slice(&word(uninit_size));
        bytes.extend_from_slice(code);
        bytes.extend_from_slice(init);
        let mut file = fs::File::create(path).unwrap();
        file.write_all(&bytes).unwrap();
    }

    #[test]
    fn parses_little_endian_header() {
        let _tmp = TmpFiles {
            paths: vec!["noff_le".to_string()],
        };
        write_noff("noff_le", true, &[1, 2, 3, 4], &[9, 9], 64);

        let image = NoffImage::open(Path::new("noff_le")).unwrap();
        let segs = image.segments();
        assert_eq!(segs[0].size, 4);
        assert_eq!(segs[1].virtual_addr, 4);
        assert_eq!(segs[1].size, 2);
        assert_eq!(segs[2].size, 64);
        assert_eq!(segs[2].file_offset, None);

        let mut code = [0u8; 4];
        image
            .read_range(&mut code, segs[0].file_offset.unwrap())
            .unwrap();
        assert_eq!(code, [1, 2, 3, 4]);
    }

    #[test]
    fn parses_swapped_header() {
        let _tmp = TmpFiles {
            paths: vec!["noff_be".to_string()],
        };
        write_noff("noff_be", false, &[5, 6], &[], 0);

        let image = NoffImage::open(Path::new("noff_be")).unwrap();
        assert_eq!(image.segments()[0].size, 2);
    }

    #[test]
    fn rejects_bad_magic() {
        let _tmp = TmpFiles {
            paths: vec!["noff_bad".to_string()],
        };
        let mut file = fs::File::create("noff_bad").unwrap();
        file.write_all(&[0u8; HEADER_LEN]).unwrap();
        drop(file);

        let err = NoffImage::open(Path::new("noff_bad")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn buf_image_lays_out_segments_in_order() {
        let image = BufImage::new(vec![1; 10], vec![2; 6], 20);
        let segs = image.segments();
        assert_eq!(segs[0].virtual_addr, 0);
        assert_eq!(segs[1].virtual_addr, 10);
        assert_eq!(segs[2].virtual_addr, 16);
        assert_eq!(segs[2].size, 20);

        let mut buf = [0u8; 6];
        image
            .read_range(&mut buf, segs[1].file_offset.unwrap())
            .unwrap();
        assert_eq!(buf, [2; 6]);
    }
}
