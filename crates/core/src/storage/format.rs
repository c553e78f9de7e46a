use super::encryption::KdfParams;
use crate::errors::CoreError;

/// Magic bytes at the start of every snapshot file.
pub const MAGIC: &[u8; 4] = b"FNFO";

pub const CURRENT_VERSION: u16 = 1;

/// magic(4) + version(2) + kdf(12) + salt(16) + nonce(12) + ciphertext_len(8)
pub const HEADER_SIZE: usize = 54;

/// Parsed snapshot header.
#[derive(Debug)]
pub struct FileHeader {
    pub version: u16,
    pub kdf_params: KdfParams,
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
    pub ciphertext_len: u64,
}

/// Assemble a snapshot file.
///
/// ```text
/// [FNFO] [version u16 LE] [memory_cost u32 LE] [time_cost u32 LE]
/// [parallelism u32 LE] [salt 16B] [nonce 12B] [ciphertext_len u64 LE]
/// [ciphertext + tag]
/// ```
pub fn write_file(header: &FileHeader, ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&header.version.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.memory_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.time_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.parallelism.to_le_bytes());
    buf.extend_from_slice(&header.salt);
    buf.extend_from_slice(&header.nonce);
    buf.extend_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    buf.extend_from_slice(ciphertext);
    buf
}

/// Sequential reader over the fixed-size header fields.
struct Fields<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    fn take<const N: usize>(&mut self, what: &str) -> Result<[u8; N], CoreError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + N)
            .ok_or_else(|| CoreError::InvalidFileFormat(format!("Header ends before {what}")))?;
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u16(&mut self, what: &str) -> Result<u16, CoreError> {
        Ok(u16::from_le_bytes(self.take::<2>(what)?))
    }

    fn u32(&mut self, what: &str) -> Result<u32, CoreError> {
        Ok(u32::from_le_bytes(self.take::<4>(what)?))
    }

    fn u64(&mut self, what: &str) -> Result<u64, CoreError> {
        Ok(u64::from_le_bytes(self.take::<8>(what)?))
    }
}

/// Parse and validate the header; returns it with the ciphertext slice.
pub fn read_file(data: &[u8]) -> Result<(FileHeader, &[u8]), CoreError> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(
            "File too small to be a snapshot".into(),
        ));
    }

    let mut fields = Fields { data, pos: 0 };
    if &fields.take::<4>("magic")? != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes, not a snapshot file".into(),
        ));
    }

    let version = fields.u16("version")?;
    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let kdf_params = KdfParams {
        memory_cost: fields.u32("memory_cost")?,
        time_cost: fields.u32("time_cost")?,
        parallelism: fields.u32("parallelism")?,
    };
    kdf_params.validate()?;

    let salt = fields.take::<16>("salt")?;
    let nonce = fields.take::<12>("nonce")?;
    let ciphertext_len = fields.u64("ciphertext length")?;

    let start = fields.pos;
    let remaining = data.len() - start;
    if ciphertext_len > remaining as u64 {
        return Err(CoreError::InvalidFileFormat(format!(
            "File truncated: expected {ciphertext_len} bytes of ciphertext, got {remaining}"
        )));
    }
    let ciphertext = &data[start..start + ciphertext_len as usize];

    Ok((
        FileHeader {
            version,
            kdf_params,
            salt,
            nonce,
            ciphertext_len,
        },
        ciphertext,
    ))
}
