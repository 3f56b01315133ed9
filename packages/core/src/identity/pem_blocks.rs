//! Split PEM text into individual armored blocks
//!
//! Decoding happens per block so one damaged entry is reported on its own
//! instead of failing the whole file.

const BEGIN_MARKER: &str = "-----BEGIN ";
const END_MARKER: &str = "-----END ";

/// One armored block, with its 1-based position in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PemBlock<'a> {
    pub index: usize,
    pub text: &'a str,
}

impl PemBlock<'_> {
    pub fn decode(&self) -> Result<pem::Pem, String> {
        pem::parse(self.text).map_err(|e| e.to_string())
    }
}

/// Text between BEGIN and END lines is one block. An unterminated block runs
/// to the end of the input and fails to decode. Text outside blocks is ignored.
pub(crate) fn split_blocks(text: &str) -> Vec<PemBlock<'_>> {
    let mut blocks = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with(BEGIN_MARKER) {
            if let Some(open) = start {
                // BEGIN inside an open block: close the broken one here
                push_block(&mut blocks, &text[open..offset]);
            }
            start = Some(offset);
        } else if trimmed.starts_with(END_MARKER) {
            if let Some(open) = start.take() {
                push_block(&mut blocks, &text[open..offset + line.len()]);
            }
        }
        offset += line.len();
    }

    if let Some(open) = start {
        push_block(&mut blocks, &text[open..]);
    }

    blocks
}

fn push_block<'a>(blocks: &mut Vec<PemBlock<'a>>, text: &'a str) {
    blocks.push(PemBlock {
        index: blocks.len() + 1,
        text,
    });
}
