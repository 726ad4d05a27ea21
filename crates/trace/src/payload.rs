//! Little-endian payload assembly for trace records.

/// Incremental builder for record payloads.
///
/// Fields carry no format descriptors: each record type has a fixed layout
/// documented in [`crate::records`].
#[derive(Debug, Default)]
pub struct PayloadBuilder {
    bytes: Vec<u8>,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a NUL-terminated string. Interior NULs are dropped.
    pub fn str(&mut self, value: &str) -> &mut Self {
        self.bytes
            .extend(value.as_bytes().iter().copied().filter(|&b| b != 0));
        self.bytes.push(0);
        self
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_little_endian() {
        let mut builder = PayloadBuilder::new();
        builder.u8(0xAB).u16(0x1234).u32(0x0102_0304);
        assert_eq!(
            builder.into_vec(),
            vec![0xAB, 0x34, 0x12, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn strings_are_nul_terminated() {
        let mut builder = PayloadBuilder::new();
        builder.str("hi").str("a\0b");
        assert_eq!(builder.into_vec(), vec![b'h', b'i', 0, b'a', b'b', 0]);
    }
}
