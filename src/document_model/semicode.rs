//! Semicode - the linear, length-prefixed text encoding of a block sequence.
//!
//! Grammar, repeated:
//!   EMBED <digits> ':' <digits characters>          nested sequence
//!   EMBED_BYTES <digits> ':' <2 x digits hex chars> node handle payload
//!   LINK | LABEL                                    markers
//!   <any other character>                           literal char
//!
//! Embed lengths count characters, not bytes, so a reader can skip an
//! embed without scanning it.
use super::block::{Block, EMBED, EMBED_BYTES, LABEL, LINK, Sequence, is_reserved_char};
use super::error::SemicodeError;
use super::registry::HandleRegistry;

pub fn encode(sequence: &Sequence, registry: &HandleRegistry) -> Result<String, SemicodeError> {
    encode_blocks(&sequence.blocks(), registry)
}

pub fn encode_blocks(blocks: &[Block], registry: &HandleRegistry) -> Result<String, SemicodeError> {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Char(c) if is_reserved_char(*c) => {
                return Err(SemicodeError::UnsupportedBlockType(format!(
                    "char U+{:04X} collides with a reserved code point",
                    *c as u32
                )));
            }
            Block::Char(c) => out.push(*c),
            Block::LinkMarker => out.push(LINK),
            Block::LabelMarker => out.push(LABEL),
            Block::Sequence(seq) => {
                let inner = encode(seq, registry)?;
                out.push(EMBED);
                out.push_str(&inner.chars().count().to_string());
                out.push(':');
                out.push_str(&inner);
            }
            Block::Node(handle) => {
                let bytes = registry.bytes_of(*handle)?;
                out.push(EMBED_BYTES);
                out.push_str(&bytes.len().to_string());
                out.push(':');
                out.push_str(&to_hex(bytes));
            }
        }
    }
    Ok(out)
}

/// Decodes into a flat list of blocks; the caller wraps it as needed.
pub fn decode(text: &str, registry: &mut HandleRegistry) -> Result<Vec<Block>, SemicodeError> {
    let chars: Vec<char> = text.chars().collect();
    decode_chars(&chars, 0, registry)
}

pub fn decode_sequence(text: &str, registry: &mut HandleRegistry) -> Result<Sequence, SemicodeError> {
    decode(text, registry).map(Sequence::from_blocks)
}

fn decode_chars(
    chars: &[char],
    base_offset: usize,
    registry: &mut HandleRegistry,
) -> Result<Vec<Block>, SemicodeError> {
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            marker @ (EMBED | EMBED_BYTES) => {
                let (declared, colon) = read_length(chars, i + 1, base_offset)?;
                let char_count = if marker == EMBED {
                    declared
                } else {
                    declared
                        .checked_mul(2)
                        .ok_or(SemicodeError::MalformedEmbedLength { offset: base_offset + i })?
                };
                let start = colon + 1;
                let available = chars.len() - start;
                if char_count > available {
                    return Err(SemicodeError::TruncatedEmbed {
                        offset: base_offset + i,
                        declared: char_count,
                        available,
                    });
                }
                let payload = &chars[start..start + char_count];
                if marker == EMBED {
                    let nested = decode_chars(payload, base_offset + start, registry)?;
                    blocks.push(Block::Sequence(Sequence::from_blocks(nested)));
                } else {
                    let bytes = from_hex(payload, base_offset + start)?;
                    blocks.push(Block::Node(registry.handle_for(&bytes)));
                }
                i = start + char_count;
            }
            LINK => {
                blocks.push(Block::LinkMarker);
                i += 1;
            }
            LABEL => {
                blocks.push(Block::LabelMarker);
                i += 1;
            }
            c => {
                blocks.push(Block::Char(c));
                i += 1;
            }
        }
    }
    Ok(blocks)
}

/// Reads `<digits> ':'` starting at `from`; returns the length and the colon index.
fn read_length(chars: &[char], from: usize, base_offset: usize) -> Result<(usize, usize), SemicodeError> {
    let malformed = SemicodeError::MalformedEmbedLength { offset: base_offset + from };
    let colon = chars[from.min(chars.len())..]
        .iter()
        .position(|c| *c == ':')
        .map(|pos| from + pos)
        .ok_or_else(|| malformed.clone())?;
    let digits = &chars[from..colon];
    if digits.is_empty() || !digits.iter().all(char::is_ascii_digit) {
        return Err(malformed);
    }
    let length = digits
        .iter()
        .collect::<String>()
        .parse::<usize>()
        .map_err(|_| malformed)?;
    Ok((length, colon))
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn from_hex(digits: &[char], offset: usize) -> Result<Vec<u8>, SemicodeError> {
    digits
        .chunks(2)
        .enumerate()
        .map(|(n, pair)| {
            let high = pair[0].to_digit(16);
            let low = pair.get(1).and_then(|c| c.to_digit(16));
            match (high, low) {
                (Some(high), Some(low)) => Ok((high * 16 + low) as u8),
                _ => Err(SemicodeError::InvalidHexPayload { offset: offset + n * 2 }),
            }
        })
        .collect()
}
