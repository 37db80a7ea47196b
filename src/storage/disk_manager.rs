//! Disk I/O for one segment's backing file.
//!
//! Pages are addressed by their page-in-segment number; page 0 is the
//! file header (see [`super::file_header`]) and is never handed out to
//! callers. This sits underneath [`crate::buffer`], which is the thing
//! the tree actually talks to.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::RwLock;

use crate::error::{Result, StorageError};
use crate::storage::{FileHeader, FreeList};
use crate::types::PAGE_SIZE;

pub trait DiskManager: Send + Sync {
    fn read_page(&self, page: u64) -> Result<Vec<u8>>;
    fn write_page(&self, page: u64, data: &[u8]) -> Result<()>;
    fn allocate_page(&self) -> Result<u64>;
    fn deallocate_page(&self, page: u64) -> Result<()>;
    fn sync(&self) -> Result<()>;
    fn page_count(&self) -> u64;
    /// Grow the file so `page` is backed by zeroed storage, if it isn't
    /// already. Used when a caller (the tree) hands in a page-in-segment
    /// number it minted itself rather than one `allocate_page` returned.
    fn ensure_page(&self, page: u64) -> Result<()>;
}

pub struct DiskManagerImpl {
    file: RwLock<File>,
    header: RwLock<FileHeader>,
    free_list: RwLock<FreeList>,
    sync_on_write: bool,
}

impl DiskManagerImpl {
    pub fn open(path: &Path, sync_on_write: bool) -> Result<Self> {
        let exists = path.exists();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let header = if exists && file.metadata()?.len() >= PAGE_SIZE as u64 {
            let mut file_ref = &file;
            let mut buf = vec![0u8; PAGE_SIZE];
            file_ref.read_exact(&mut buf)?;
            FileHeader::read(&buf)?
        } else {
            let header = FileHeader::new();
            let mut buf = vec![0u8; PAGE_SIZE];
            header.write(&mut buf);
            let mut file_ref = &file;
            file_ref.seek(SeekFrom::Start(0))?;
            file_ref.write_all(&buf)?;
            file_ref.sync_all()?;
            header
        };

        Ok(Self {
            file: RwLock::new(file),
            header: RwLock::new(header),
            free_list: RwLock::new(FreeList::new()),
            sync_on_write,
        })
    }

    fn flush_header(&self) -> Result<()> {
        let header = self.header.read();
        let mut buf = vec![0u8; PAGE_SIZE];
        header.write(&mut buf);

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&buf)?;
        if self.sync_on_write {
            file.sync_data()?;
        }
        Ok(())
    }

    fn offset(page: u64) -> u64 {
        page * PAGE_SIZE as u64
    }
}

impl DiskManager for DiskManagerImpl {
    fn read_page(&self, page: u64) -> Result<Vec<u8>> {
        if page == 0 {
            return Err(StorageError::invalid_operation(
                "cannot read the header page directly",
            ));
        }
        if page >= self.header.read().page_count {
            return Err(StorageError::invalid_operation(format!(
                "page {} has not been allocated",
                page
            )));
        }

        let mut buf = vec![0u8; PAGE_SIZE];
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(Self::offset(page)))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_page(&self, page: u64, data: &[u8]) -> Result<()> {
        if page == 0 {
            return Err(StorageError::invalid_operation(
                "cannot write the header page directly",
            ));
        }
        if data.len() != PAGE_SIZE {
            return Err(StorageError::invalid_operation(format!(
                "page data must be {} bytes, got {}",
                PAGE_SIZE,
                data.len()
            )));
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(Self::offset(page)))?;
        file.write_all(data)?;
        if self.sync_on_write {
            file.sync_data()?;
        }
        Ok(())
    }

    fn allocate_page(&self) -> Result<u64> {
        if let Some(page) = self.free_list.write().pop() {
            return Ok(page);
        }

        let page = self.header.write().allocate_page();
        let zeros = vec![0u8; PAGE_SIZE];
        {
            let mut file = self.file.write();
            file.seek(SeekFrom::Start(Self::offset(page)))?;
            file.write_all(&zeros)?;
        }
        self.flush_header()?;
        Ok(page)
    }

    fn deallocate_page(&self, page: u64) -> Result<()> {
        if page == 0 {
            return Err(StorageError::invalid_operation(
                "cannot deallocate the header page",
            ));
        }
        self.free_list.write().push(page);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.flush_header()?;
        self.file.write().sync_all()?;
        Ok(())
    }

    fn page_count(&self) -> u64 {
        self.header.read().page_count
    }

    fn ensure_page(&self, page: u64) -> Result<()> {
        let old_count = {
            let header = self.header.read();
            if page < header.page_count {
                return Ok(());
            }
            header.page_count
        };

        {
            let mut header = self.header.write();
            if page < header.page_count {
                return Ok(());
            }
            header.page_count = page + 1;
        }

        let zeros = vec![0u8; PAGE_SIZE];
        let mut file = self.file.write();
        for p in old_count..=page {
            file.seek(SeekFrom::Start(Self::offset(p)))?;
            file.write_all(&zeros)?;
        }
        drop(file);
        self.flush_header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_new_database() -> Result<()> {
        let dir = tempdir().unwrap();
        let dm = DiskManagerImpl::open(&dir.path().join("test.db"), false)?;
        assert_eq!(dm.page_count(), 1);
        Ok(())
    }

    #[test]
    fn test_allocate_and_write_page() -> Result<()> {
        let dir = tempdir().unwrap();
        let dm = DiskManagerImpl::open(&dir.path().join("test.db"), false)?;

        let page = dm.allocate_page()?;
        assert_eq!(page, 1);

        let mut data = vec![0u8; PAGE_SIZE];
        data[0..5].copy_from_slice(b"hello");
        dm.write_page(page, &data)?;

        let read_back = dm.read_page(page)?;
        assert_eq!(&read_back[0..5], b"hello");
        Ok(())
    }

    #[test]
    fn test_reopen_database() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let dm = DiskManagerImpl::open(&path, true)?;
            let page = dm.allocate_page()?;
            let mut data = vec![0u8; PAGE_SIZE];
            data[0..4].copy_from_slice(b"test");
            dm.write_page(page, &data)?;
        }
        {
            let dm = DiskManagerImpl::open(&path, false)?;
            assert_eq!(dm.page_count(), 2);
            let read_back = dm.read_page(1)?;
            assert_eq!(&read_back[0..4], b"test");
        }
        Ok(())
    }

    #[test]
    fn test_ensure_page_grows_file() -> Result<()> {
        let dir = tempdir().unwrap();
        let dm = DiskManagerImpl::open(&dir.path().join("test.db"), false)?;

        dm.ensure_page(5)?;
        assert_eq!(dm.page_count(), 6);
        let page = dm.read_page(5)?;
        assert_eq!(page, vec![0u8; PAGE_SIZE]);

        // idempotent
        dm.ensure_page(3)?;
        assert_eq!(dm.page_count(), 6);
        Ok(())
    }

    #[test]
    fn test_free_list_reuse() -> Result<()> {
        let dir = tempdir().unwrap();
        let dm = DiskManagerImpl::open(&dir.path().join("test.db"), false)?;

        let p1 = dm.allocate_page()?;
        let p2 = dm.allocate_page()?;
        let p3 = dm.allocate_page()?;
        assert_eq!((p1, p2, p3), (1, 2, 3));

        dm.deallocate_page(p2)?;
        let p4 = dm.allocate_page()?;
        assert_eq!(p4, p2);
        Ok(())
    }
}
