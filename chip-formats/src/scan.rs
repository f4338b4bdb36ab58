//! Locating modules embedded in arbitrary data
//!
//! Ripped memory dumps and archives hold modules at unknown offsets. The
//! scanner jumps between detector matches and tries a full decode only
//! where some format's byte pattern fits.

use crate::Decoder;

/// Module found by [`scan_buffer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub offset: usize,
    pub description: &'static str,
    pub size: usize,
    pub checksum: u32,
    pub fixed_checksum: u32,
}

/// Find every decodable module in `data`
///
/// Hits never overlap: scanning resumes right after each found module.
pub fn scan_buffer(decoders: &[Box<dyn Decoder>], data: &chip_binary::Container) -> Vec<Hit> {
    let mut hits = Vec::new();
    let mut offset = 0;
    while offset < data.size() {
        let rest = &data.data()[offset..];
        match decode_at(decoders, data, offset) {
            Some(hit) => {
                tracing::debug!(offset, size = hit.size, format = hit.description, "Found");
                offset += hit.size.max(1);
                hits.push(hit);
            }
            None => {
                let step = decoders
                    .iter()
                    .map(|decoder| decoder.format().next_match_offset(rest))
                    .min()
                    .unwrap_or(rest.len());
                offset += step.max(1);
            }
        }
    }
    hits
}

fn decode_at(
    decoders: &[Box<dyn Decoder>],
    data: &chip_binary::Container,
    offset: usize,
) -> Option<Hit> {
    let rest = &data.data()[offset..];
    let candidate = data.sub_container(offset, data.size() - offset)?;
    decoders
        .iter()
        .filter(|decoder| decoder.format().matches(rest))
        .find_map(|decoder| {
            let module = decoder.decode(&candidate)?;
            Some(Hit {
                offset,
                description: decoder.description(),
                size: module.size(),
                checksum: module.checksum(),
                fixed_checksum: module.fixed_checksum(),
            })
        })
}
