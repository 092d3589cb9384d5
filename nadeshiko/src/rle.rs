//! Run-length coding of mask runs, as used by
//! [`OP_SET_COLOR_RLE`](crate::consts::OP_SET_COLOR_RLE).

use crate::{
    consts::{RLE_END, RLE_MAX_LITERAL, RLE_REPEAT_BIAS},
    decode::DecodeError,
};
use itertools::Itertools;

/// Runs shorter than this are stored as literals.
const MIN_REPEAT: usize = 4;
const MAX_REPEAT: usize = (u8::MAX - RLE_REPEAT_BIAS) as usize;

/// Appends the RLE body for `masks`, including the terminator, to `out`.
pub fn encode(masks: &[u8], out: &mut Vec<u8>) {
    let mut literals = Vec::new();

    for (count, &mask) in masks.iter().dedup_with_count() {
        if count < MIN_REPEAT {
            literals.extend(std::iter::repeat(mask).take(count));
            continue;
        }

        flush_literals(&mut literals, out);

        let mut left = count;
        while left > 0 {
            let n = left.min(MAX_REPEAT);
            out.extend_from_slice(&[RLE_REPEAT_BIAS + n as u8, mask]);
            left -= n;
        }
    }

    flush_literals(&mut literals, out);
    out.push(RLE_END);
}

fn flush_literals(literals: &mut Vec<u8>, out: &mut Vec<u8>) {
    for chunk in literals.chunks(usize::from(RLE_MAX_LITERAL)) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    literals.clear();
}

/// Decodes an RLE body from the start of `data`.
///
/// Returns the masks and the number of bytes consumed, including the terminator.
pub fn decode(data: &[u8]) -> Result<(Vec<u8>, usize), DecodeError> {
    let mut masks = Vec::new();
    let mut pos = 0;

    loop {
        let &tag = data.get(pos).ok_or(DecodeError::UnexpectedEof)?;
        pos += 1;

        match tag {
            RLE_END => return Ok((masks, pos)),
            1..=RLE_MAX_LITERAL => {
                let len = usize::from(tag);
                let literal = data
                    .get(pos..pos + len)
                    .ok_or(DecodeError::UnexpectedEof)?;
                masks.extend_from_slice(literal);
                pos += len;
            }
            _ => {
                let &mask = data.get(pos).ok_or(DecodeError::UnexpectedEof)?;
                masks.extend(std::iter::repeat(mask).take(usize::from(tag - RLE_REPEAT_BIAS)));
                pos += 1;
            }
        }
    }
}
