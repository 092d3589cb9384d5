use super::{EncodeError, Encoder, WriteIoSnafu};
use crate::consts::FORMAT_VERSION;
use snafu::ResultExt;
use std::io::Write;

impl Encoder {
    /// Writes the stream header followed by every frame encoded so far.
    ///
    /// A failed write leaves the encoder untouched, so the stream can be written again.
    pub fn serialize<W: Write>(&self, mut w: W) -> Result<(), EncodeError> {
        let (width, height) = self.size().unwrap_or((0, 0));
        w.write_all(&[FORMAT_VERSION, width, height])
            .context(WriteIoSnafu)?;

        for cmd in self.commands() {
            cmd.write(&mut w).context(WriteIoSnafu)?;
        }

        w.flush().context(WriteIoSnafu)
    }

    pub fn serialize_to_vec(&self, out: &mut Vec<u8>) {
        self.serialize(out)
            .expect("writing to a Vec never fails");
    }
}
