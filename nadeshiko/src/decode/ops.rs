use super::{decode_error, DecodeError};
use crate::{
    command::{Command, Register},
    consts::*,
    rle,
};
use byteorder::{ByteOrder, LittleEndian};
use snafu::{ensure, OptionExt};

/// A position in the command stream.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    fn u8(&mut self) -> Result<u8, DecodeError> {
        let &b = self
            .data
            .get(self.pos)
            .context(decode_error::UnexpectedEofSnafu)?;
        self.pos += 1;
        Ok(b)
    }

    #[inline]
    fn bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + len)
            .context(decode_error::UnexpectedEofSnafu)?;
        self.pos += len;
        Ok(bytes)
    }

    #[inline]
    fn i16(&mut self) -> Result<i16, DecodeError> {
        self.bytes(2).map(LittleEndian::read_i16)
    }

    fn rle(&mut self) -> Result<Vec<u8>, DecodeError> {
        let rest = self.data.get(self.pos..).unwrap_or_default();
        let (masks, used) = rle::decode(rest)?;
        self.pos += used;
        Ok(masks)
    }
}

/// Reads the next command.
pub(crate) fn read_command(r: &mut Reader) -> Result<Command, DecodeError> {
    let offset = r.pos();
    let op = r.u8()?;

    let cmd = match op {
        OP_END_FRAME => Command::EndFrame,
        OP_SET_BG | OP_SET_FG => Command::SetColor {
            register: if op == OP_SET_BG {
                Register::Bg
            } else {
                Register::Fg
            },
            color: r.u8()?,
        },
        // OP: 0x04, 0x05
        OP_SET | OP_SET_VERTICAL => {
            let (x, y, count) = (r.u8()?, r.u8()?, r.u8()?);
            Command::Set {
                x,
                y,
                masks: r.bytes(usize::from(count))?.to_vec(),
                vertical: op == OP_SET_VERTICAL,
            }
        }
        OP_FILL_BG | OP_FILL_FG => {
            let [x, y, width, height] = [r.u8()?, r.u8()?, r.u8()?, r.u8()?];
            Command::Fill {
                x,
                y,
                width,
                height,
                use_fg: op == OP_FILL_FG,
            }
        }
        OP_COPY => {
            let (x, y) = (r.u8()?, r.u8()?);
            let (dx, dy) = (r.i16()?, r.i16()?);
            let (width, height) = (r.u8()?, r.u8()?);
            Command::Copy {
                x,
                y,
                dx,
                dy,
                width,
                height,
            }
        }
        OP_FILL_COLOR => {
            let [x, y, width, height, color] = [r.u8()?, r.u8()?, r.u8()?, r.u8()?, r.u8()?];
            Command::FillWithColor {
                x,
                y,
                width,
                height,
                color,
            }
        }
        // OP: 0x18, 0x19
        OP_FILL_COLOR_ROW | OP_FILL_COLOR_COLUMN => {
            let [x, y, len, color] = [r.u8()?, r.u8()?, r.u8()?, r.u8()?];
            let (width, height) = if op == OP_FILL_COLOR_ROW {
                (len, 1)
            } else {
                (1, len)
            };
            Command::FillWithColor {
                x,
                y,
                width,
                height,
                color,
            }
        }
        // OP: 0x12, 0x13
        OP_SET_COLOR | OP_SET_COLOR_VERTICAL => {
            let [x, y, count, bg, fg] = [r.u8()?, r.u8()?, r.u8()?, r.u8()?, r.u8()?];
            ensure!(bg != fg, decode_error::InvalidColorPairSnafu { offset });
            Command::SetWithColor {
                x,
                y,
                bg,
                fg,
                masks: r.bytes(usize::from(count))?.to_vec(),
                vertical: op == OP_SET_COLOR_VERTICAL,
            }
        }
        // OP: 0x22, 0x23
        OP_SET_COLOR_RLE | OP_SET_COLOR_RLE_VERTICAL => {
            let [x, y, bg, fg] = [r.u8()?, r.u8()?, r.u8()?, r.u8()?];
            ensure!(bg != fg, decode_error::InvalidColorPairSnafu { offset });
            Command::SetWithColor {
                x,
                y,
                bg,
                fg,
                masks: r.rle()?,
                vertical: op == OP_SET_COLOR_RLE_VERTICAL,
            }
        }
        opcode => return decode_error::UnknownOpcodeSnafu { opcode, offset }.fail(),
    };

    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(data: &[u8]) -> Result<Command, DecodeError> {
        read_command(&mut Reader::new(data, 0))
    }

    #[test]
    fn every_command_reads_back() {
        let commands = [
            Command::EndFrame,
            Command::SetColor {
                register: Register::Bg,
                color: 7,
            },
            Command::Set {
                x: 1,
                y: 2,
                masks: vec![1, 2, 3],
                vertical: true,
            },
            Command::Fill {
                x: 1,
                y: 2,
                width: 3,
                height: 4,
                use_fg: true,
            },
            Command::Copy {
                x: 5,
                y: 6,
                dx: -3,
                dy: 1000,
                width: 7,
                height: 8,
            },
            Command::FillWithColor {
                x: 1,
                y: 2,
                width: 3,
                height: 4,
                color: 5,
            },
            Command::FillWithColor {
                x: 1,
                y: 2,
                width: 1,
                height: 4,
                color: 5,
            },
            Command::set_with_color(3, 4, vec![0x11, 0x22], 20, 30, false),
            Command::set_with_color(3, 4, vec![0x11; 40], 20, 30, true),
        ];

        let mut data = Vec::new();
        for cmd in &commands {
            cmd.write(&mut data).unwrap();
        }

        let mut r = Reader::new(&data, 0);
        for cmd in &commands {
            assert_eq!(&read_command(&mut r).unwrap(), cmd);
        }
        assert!(r.is_empty());
    }

    #[test]
    fn malformed() {
        assert!(matches!(
            read(&[0x42]),
            Err(DecodeError::UnknownOpcode {
                opcode: 0x42,
                offset: 0
            })
        ));
        assert!(matches!(
            read(&[0x12, 0, 0, 1, 9, 9, 0xFF]),
            Err(DecodeError::InvalidColorPair { offset: 0 })
        ));
        assert!(matches!(
            read(&[0x09, 0, 0, 1]),
            Err(DecodeError::UnexpectedEof)
        ));
        assert!(matches!(
            read(&[0x22, 0, 0, 9, 5, 0xA4]),
            Err(DecodeError::UnexpectedEof)
        ));
    }
}
