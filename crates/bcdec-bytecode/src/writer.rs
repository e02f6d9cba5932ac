//! Output of decoded prototype trees

use std::io::Write;

use crate::error::Result;
use crate::proto::Prototype;

/// Writes a decoded prototype tree to a byte sink
pub trait ProtoWriter {
    /// File extension (without the dot) of the produced output
    const EXTENSION: &'static str;

    /// Serialize `proto` into `writer`
    fn write_to<W: Write>(&self, proto: &Prototype, writer: &mut W) -> Result<()>;

    /// Serialize `proto` into a byte vector
    fn to_bytes(&self, proto: &Prototype) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(proto, &mut bytes)?;
        Ok(bytes)
    }
}

/// JSON listing of the whole prototype tree
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonListing {
    /// Indent the output
    pub pretty: bool,
}

impl JsonListing {
    /// Create a listing writer
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl ProtoWriter for JsonListing {
    const EXTENSION: &'static str = "json";

    fn write_to<W: Write>(&self, proto: &Prototype, writer: &mut W) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, proto)?;
        } else {
            serde_json::to_writer(&mut *writer, proto)?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }
}
