//! Binary persistence for [`BlockStore`].
//!
//! # File Layout
//! All integers little-endian; floats are raw IEEE-754 bits.
//! ```text
//! Header (16 bytes)
//!   block_size u32 | record_size u32 | total_records u32 | block_count u32
//! Per block, in id order
//!   record_count u32 | record × record_count
//! Record (RECORD_SIZE = 42 bytes)
//!   game_date [u8; 10] NUL-padded | team_id i32 | points i32
//!   fg_pct f32 | ft_pct f32 | fg3_pct f32 | assists i32 | rebounds i32
//!   home_team_wins i32
//! Trailer
//!   crc32 u32 over every preceding byte
//! ```
//! Block boundaries are stored, not recomputed, so every `RecordId` an
//! index holds stays valid across a save and load.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::common::wire::{put_u32, seal, unseal, Decoder, TRAILER_SIZE};
use crate::common::{Error, Result};
use crate::storage::{Block, BlockStore, Record};

const HEADER_SIZE: usize = 4 * 4;

impl BlockStore {
    /// Write the store to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(
            path = %path.as_ref().display(),
            blocks = self.blocks.len(),
            records = self.total_records,
            "saved block store"
        );
        Ok(())
    }

    /// Read a store previously written by [`BlockStore::save`].
    ///
    /// # Errors
    /// `Error::Io` if the file cannot be read, `Error::CorruptFormat` if its
    /// contents are truncated, fail the checksum, or disagree with the
    /// header.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<BlockStore> {
        let file = File::open(path.as_ref())?;
        let store = Self::read_from(BufReader::new(file))?;
        info!(
            path = %path.as_ref().display(),
            blocks = store.blocks.len(),
            records = store.total_records,
            "loaded block store"
        );
        Ok(store)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<BlockStore> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::decode(&bytes)
    }

    /// Serialize into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let body = HEADER_SIZE + 4 * self.blocks.len() + Record::size() * self.total_records;
        let mut buf = Vec::with_capacity(body + TRAILER_SIZE);

        put_u32(&mut buf, self.block_size as u32);
        put_u32(&mut buf, Record::size() as u32);
        put_u32(&mut buf, self.total_records as u32);
        put_u32(&mut buf, self.blocks.len() as u32);

        for block in &self.blocks {
            put_u32(&mut buf, block.len() as u32);
            for record in block.records() {
                record.encode_into(&mut buf);
            }
        }

        seal(&mut buf);
        buf
    }

    /// Deserialize a complete buffer.
    ///
    /// Besides the checksum and counts, the blocks must look like ones
    /// [`BlockStore::push`] fills: none empty, none over budget, and all but
    /// the last full.
    pub fn decode(bytes: &[u8]) -> Result<BlockStore> {
        let body = unseal(bytes, HEADER_SIZE)?;

        let mut dec = Decoder::new(body);
        let block_size = dec.u32()? as usize;
        let record_size = dec.u32()? as usize;
        let total_records = dec.u32()? as usize;
        let block_count = dec.count(4)?;

        if record_size != Record::size() {
            return Err(Error::corrupt(format!(
                "record size {} but this build stores {}-byte records",
                record_size,
                Record::size()
            )));
        }
        if block_size < record_size {
            return Err(Error::corrupt(format!(
                "block size {} cannot hold a {}-byte record",
                block_size, record_size
            )));
        }

        let mut blocks = Vec::with_capacity(block_count);
        let mut seen = 0usize;
        for b in 0..block_count {
            let count = dec.count(record_size)?;
            if count == 0 {
                return Err(Error::corrupt(format!("block {} is empty", b)));
            }

            let mut block = Block::new(block_size);
            for _ in 0..count {
                let record = Record::decode_from(&mut dec)?;
                if block.try_push(record).is_err() {
                    return Err(Error::corrupt(format!(
                        "block {} declares {} records, more than {} bytes hold",
                        b, count, block_size
                    )));
                }
            }
            if b + 1 < block_count && block.has_room() {
                return Err(Error::corrupt(format!("block {} is not full but is not last", b)));
            }

            seen += count;
            blocks.push(block);
        }
        dec.finish()?;

        if seen != total_records {
            return Err(Error::corrupt(format!(
                "header declares {} records, blocks hold {}",
                total_records, seen
            )));
        }

        debug!(blocks = blocks.len(), records = seen, "decoded block store");
        Ok(BlockStore {
            blocks,
            block_size,
            total_records,
        })
    }
}
