// Config Storage - JSON-Dokument im NVS-Bereich des Flash
//
// Layout ab CONFIG_FLASH_OFFSET: [Länge u16 LE][JSON-Bytes]
// Gelöschter Flash (0xFFFF) bedeutet: nichts gespeichert.

use defmt::{error, info};
use embedded_storage::{ReadStorage, Storage};
use esp_storage::FlashStorage;

use cnc_core::config_store::CONFIG_DOCUMENT_CAPACITY;
use cnc_core::{ConfigStorage, StorageError};

use crate::config::CONFIG_FLASH_OFFSET;

const HEADER_LEN: usize = 2;
const ERASED: u16 = 0xFFFF;

pub struct FlashConfigStorage {
    flash: FlashStorage<'static>,
}

impl FlashConfigStorage {
    pub fn new(flash: FlashStorage<'static>) -> Self {
        info!("Storage: Flash capacity {} bytes", flash.capacity());
        Self { flash }
    }
}

impl ConfigStorage for FlashConfigStorage {
    fn load<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b [u8], StorageError> {
        let mut header = [0u8; HEADER_LEN];
        self.flash
            .read(CONFIG_FLASH_OFFSET, &mut header)
            .map_err(|_| StorageError::ReadFailed)?;

        let len = u16::from_le_bytes(header);
        if len == ERASED || len == 0 {
            return Err(StorageError::Empty);
        }
        let document = buf
            .get_mut(..usize::from(len))
            .ok_or(StorageError::TooLarge)?;
        self.flash
            .read(CONFIG_FLASH_OFFSET + HEADER_LEN as u32, document)
            .map_err(|_| StorageError::ReadFailed)?;
        Ok(document)
    }

    fn store(&mut self, document: &[u8]) -> Result<(), StorageError> {
        let mut frame = [0u8; HEADER_LEN + CONFIG_DOCUMENT_CAPACITY];
        let len = u16::try_from(document.len()).map_err(|_| StorageError::TooLarge)?;
        let end = HEADER_LEN + document.len();
        frame
            .get_mut(HEADER_LEN..end)
            .ok_or(StorageError::TooLarge)?
            .copy_from_slice(document);
        frame[..HEADER_LEN].copy_from_slice(&len.to_le_bytes());

        self.flash
            .write(CONFIG_FLASH_OFFSET, &frame[..end])
            .map_err(|e| {
                error!("Storage: Flash write failed: {}", defmt::Debug2Format(&e));
                StorageError::WriteFailed
            })
    }
}
