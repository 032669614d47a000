//! Write-side packet rewriting: PTS/DTS/PCR mutation, continuity-counter
//! rewriting, discontinuity marking and segment validation.
//!
//! Everything here operates on owned 188-byte packets so callers can patch
//! a single field without re-parsing the whole packet into [`crate::packet::TsPacket`].

use std::collections::HashMap;

use tracing::warn;

use crate::adaptation_field::AdaptationField;
use crate::error::TsError;
use crate::pes::{STREAM_ID_AUDIO_MAX, STREAM_ID_AUDIO_MIN, STREAM_ID_VIDEO_MAX, STREAM_ID_VIDEO_MIN};
use crate::{PID_NULL, Result};

const PACKET_LEN: usize = 188;

fn is_video_plausible_pid(pid: u16) -> bool {
    pid == 256 || (0x100..=0x1FF).contains(&pid)
}

fn encode_timestamp(flags_nibble: u8, ts: u64) -> [u8; 5] {
    [
        flags_nibble | (((ts >> 30) as u8 & 0x07) << 1) | 0x01,
        (ts >> 22) as u8,
        (((ts >> 15) as u8 & 0x7F) << 1) | 0x01,
        (ts >> 7) as u8,
        (((ts as u8) & 0x7F) << 1) | 0x01,
    ]
}

fn decode_timestamp(data: &[u8]) -> u64 {
    (((data[0] as u64 >> 1) & 0x07) << 30)
        | ((data[1] as u64) << 22)
        | (((data[2] as u64 >> 1) & 0x7F) << 15)
        | ((data[3] as u64) << 7)
        | ((data[4] as u64 >> 1) & 0x7F)
}

/// Offsets into a raw 188-byte packet at which the PES optional header lives.
struct PesLocation {
    /// offset of the `pts_dts_flags`/header-length byte pair (flags at +0, length at +1)
    flags_offset: usize,
    pts_dts_flags: u8,
    pts_offset: Option<usize>,
    dts_offset: Option<usize>,
    header_end: usize,
}

fn payload_offset(data: &[u8]) -> Result<Option<usize>> {
    if data.len() != PACKET_LEN {
        return Err(TsError::InvalidPacketSize(data.len()));
    }
    if data[0] != 0x47 {
        return Err(TsError::InvalidSyncByte(data[0]));
    }
    let afc = (data[3] >> 4) & 0x03;
    let mut offset = 4;
    if afc == 0x02 || afc == 0x03 {
        let af_len = data[offset] as usize;
        offset += 1 + af_len;
        if offset > PACKET_LEN {
            return Err(TsError::InsufficientData {
                expected: offset,
                actual: PACKET_LEN,
            });
        }
    }
    if afc == 0x01 || afc == 0x03 {
        Ok(Some(offset))
    } else {
        Ok(None)
    }
}

fn locate_pes(data: &[u8]) -> Result<Option<PesLocation>> {
    let Some(payload_off) = payload_offset(data)? else {
        return Ok(None);
    };
    let pusi = (data[1] & 0x40) != 0;
    if !pusi {
        return Ok(None);
    }
    if payload_off + 9 > PACKET_LEN {
        return Ok(None);
    }
    if data[payload_off] != 0x00 || data[payload_off + 1] != 0x00 || data[payload_off + 2] != 0x01 {
        return Ok(None);
    }
    let stream_id = data[payload_off + 3];
    if matches!(
        stream_id,
        0xBC | 0xBE | 0xBF | 0xF0 | 0xF1 | 0xFF | 0xF2 | 0xF8
    ) {
        return Ok(None);
    }
    let pts_dts_flags = (data[payload_off + 7] >> 6) & 0x03;
    let pes_header_data_length = data[payload_off + 8] as usize;
    let header_end = payload_off + 9 + pes_header_data_length;
    if header_end > PACKET_LEN {
        return Ok(None);
    }
    let (pts_offset, dts_offset) = match pts_dts_flags {
        0b10 => (Some(payload_off + 9), None),
        0b11 => (Some(payload_off + 9), Some(payload_off + 14)),
        _ => (None, None),
    };
    Ok(Some(PesLocation {
        flags_offset: payload_off + 7,
        pts_dts_flags,
        pts_offset,
        dts_offset,
        header_end,
    }))
}

/// Rewrite the PTS of a packet that already carries one, preserving the
/// optional-header flag nibble and all marker bits. No-op (byte-identical)
/// when `new_pts == old_pts`.
pub fn write_pts(packet: &[u8], new_pts: i64) -> Result<Vec<u8>> {
    let loc = locate_pes(packet)?.ok_or(TsError::NoPesHeader)?;
    let Some(pts_offset) = loc.pts_offset else {
        return Err(TsError::NoPesHeader);
    };
    let mut out = packet.to_vec();
    let flags_nibble = out[pts_offset] & 0xF0;
    let bytes = encode_timestamp(flags_nibble, new_pts as u64 & 0x1_FFFF_FFFF);
    out[pts_offset..pts_offset + 5].copy_from_slice(&bytes);
    Ok(out)
}

/// Rewrite the DTS of a packet. If the packet currently carries PTS-only and
/// there is stuffing room left in the PES optional header, the header is
/// promoted to carry both PTS and DTS; otherwise an error is returned since
/// growing the optional header would require shifting elementary-stream
/// bytes into the next TS packet, which only the segment-level caller can do.
pub fn write_dts(packet: &[u8], new_dts: i64) -> Result<Vec<u8>> {
    let loc = locate_pes(packet)?.ok_or(TsError::NoPesHeader)?;
    let mut out = packet.to_vec();
    let ts_bytes = new_dts as u64 & 0x1_FFFF_FFFF;

    if let Some(dts_offset) = loc.dts_offset {
        let bytes = encode_timestamp(0x10, ts_bytes);
        out[dts_offset..dts_offset + 5].copy_from_slice(&bytes);
        return Ok(out);
    }

    // Promote PTS-only -> PTS+DTS using available stuffing bytes.
    let Some(pts_offset) = loc.pts_offset else {
        return Err(TsError::NoPesHeader);
    };
    let dts_offset = pts_offset + 5;
    if dts_offset + 5 > loc.header_end {
        return Err(TsError::AdaptationFieldOverflow);
    }
    out[loc.flags_offset] = (out[loc.flags_offset] & 0x3F) | 0xC0;
    let dts_bytes = encode_timestamp(0x10, ts_bytes);
    out[dts_offset..dts_offset + 5].copy_from_slice(&dts_bytes);
    Ok(out)
}

/// Read the PCR adaptation-field extension from a raw packet byte slice,
/// returning `(base, extension)` exactly as [`crate::adaptation_field::Pcr`] would.
fn read_pcr_raw(data: &[u8]) -> Result<Option<(i64, i16)>> {
    if data.len() != PACKET_LEN {
        return Err(TsError::InvalidPacketSize(data.len()));
    }
    if data[0] != 0x47 {
        return Err(TsError::InvalidSyncByte(data[0]));
    }
    let afc = (data[3] >> 4) & 0x03;
    if afc != 0x02 && afc != 0x03 {
        return Ok(None);
    }
    let af_len = data[4] as usize;
    if af_len < 7 || 5 + af_len > PACKET_LEN {
        return Ok(None);
    }
    let flags = data[5];
    if flags & 0x10 == 0 {
        return Ok(None);
    }
    let pcr_bytes = &data[6..12];
    if pcr_bytes[4] & 0x7E != 0x7E {
        return Ok(None);
    }
    let base = ((pcr_bytes[0] as i64) << 25)
        | ((pcr_bytes[1] as i64) << 17)
        | ((pcr_bytes[2] as i64) << 9)
        | ((pcr_bytes[3] as i64) << 1)
        | ((pcr_bytes[4] as i64) >> 7);
    let extension = (((pcr_bytes[4] & 0x01) as i16) << 8) | pcr_bytes[5] as i16;
    Ok(Some((base, extension)))
}

/// Parse the PES PTS of a raw packet, if present.
pub fn read_pts(packet: &[u8]) -> Result<Option<i64>> {
    let Some(loc) = locate_pes(packet)? else {
        return Ok(None);
    };
    Ok(loc
        .pts_offset
        .map(|off| decode_timestamp(&packet[off..off + 5]) as i64))
}

/// Parse the PES DTS of a raw packet, if present (requires `pts_dts_flags == 0b11`).
pub fn read_dts(packet: &[u8]) -> Result<Option<i64>> {
    let Some(loc) = locate_pes(packet)? else {
        return Ok(None);
    };
    if loc.pts_dts_flags != 0b11 {
        return Ok(None);
    }
    Ok(loc
        .dts_offset
        .map(|off| decode_timestamp(&packet[off..off + 5]) as i64))
}

/// Parse the adaptation-field PCR of a raw packet, if present.
pub fn read_pcr(packet: &[u8]) -> Result<Option<(i64, i16)>> {
    read_pcr_raw(packet)
}

/// Canonical adaptation-field field order per ISO/IEC 13818-1 Table 2-6.
struct RebuiltAdaptationField {
    content: Vec<u8>,
}

fn rebuild_adaptation_field(existing: Option<&AdaptationField>, pcr: (i64, i16)) -> RebuiltAdaptationField {
    let mut flags = 0u8;
    if let Some(af) = existing {
        if af.discontinuity_indicator {
            flags |= 0x80;
        }
        if af.random_access_indicator {
            flags |= 0x40;
        }
        if af.elementary_stream_priority_indicator {
            flags |= 0x20;
        }
        if af.opcr.is_some() {
            flags |= 0x08;
        }
        if af.splice_countdown.is_some() {
            flags |= 0x04;
        }
        if af.transport_private_data.is_some() {
            flags |= 0x02;
        }
    }
    flags |= 0x10; // PCR flag always set by write_pcr

    let mut content = vec![flags];
    let base = pcr.0 as u64 & 0x1_FFFF_FFFF;
    let ext = pcr.1 as u16 & 0x1FF;
    content.push((base >> 25) as u8);
    content.push((base >> 17) as u8);
    content.push((base >> 9) as u8);
    content.push((base >> 1) as u8);
    content.push((((base & 0x01) as u8) << 7) | 0x7E | ((ext >> 8) as u8 & 0x01));
    content.push(ext as u8);

    if let Some(af) = existing {
        if let Some(opcr) = af.opcr {
            let ob = opcr.base;
            content.push((ob >> 25) as u8);
            content.push((ob >> 17) as u8);
            content.push((ob >> 9) as u8);
            content.push((ob >> 1) as u8);
            content.push((((ob & 0x01) as u8) << 7) | 0x7E | ((opcr.extension >> 8) as u8 & 0x01));
            content.push(opcr.extension as u8);
        }
        if let Some(countdown) = af.splice_countdown {
            content.push(countdown as u8);
        }
        if let Some(private) = &af.transport_private_data {
            content.push(private.len() as u8);
            content.extend_from_slice(private);
        }
    }

    RebuiltAdaptationField { content }
}

/// Rewrite (or insert) the PCR adaptation field of a packet. Promotes a
/// payload-only packet to carry an adaptation field if necessary, always
/// keeping the total packet length at exactly 188 bytes.
pub fn write_pcr(packet: &[u8], pcr: (i64, i16)) -> Result<Vec<u8>> {
    if packet.len() != PACKET_LEN {
        return Err(TsError::InvalidPacketSize(packet.len()));
    }
    if packet[0] != 0x47 {
        return Err(TsError::InvalidSyncByte(packet[0]));
    }
    let afc = (packet[3] >> 4) & 0x03;

    if afc == 0x00 {
        return Err(TsError::AdaptationFieldOverflow);
    }

    if afc == 0x01 {
        let rebuilt = rebuild_adaptation_field(None, pcr);
        let target_len = rebuilt.content.len().max(7);
        let mut stuffing = vec![0xFFu8; target_len - rebuilt.content.len()];
        let mut af_bytes = rebuilt.content;
        af_bytes.append(&mut stuffing);

        let mut out = Vec::with_capacity(PACKET_LEN);
        out.extend_from_slice(&packet[0..3]);
        out.push((packet[3] & 0x0F) | 0x30); // afc = 3
        out.push(af_bytes.len() as u8);
        out.extend_from_slice(&af_bytes);

        let original_payload = &packet[4..];
        let keep = original_payload.len().saturating_sub(1 + af_bytes.len());
        out.extend_from_slice(&original_payload[..keep]);
        out.resize(PACKET_LEN, 0xFF);
        return Ok(out);
    }

    // afc in {2, 3}: adaptation field already present.
    let existing_af_len = packet[4] as usize;
    let existing = if existing_af_len > 0 {
        AdaptationField::parse(&packet[5..5 + existing_af_len])
    } else {
        None
    };
    let rebuilt = rebuild_adaptation_field(existing.as_ref(), pcr);
    let target_len = rebuilt.content.len().max(existing_af_len).max(7);
    let mut af_bytes = rebuilt.content;
    af_bytes.resize(target_len, 0xFF);

    let grown = target_len.saturating_sub(existing_af_len);
    let mut out = Vec::with_capacity(PACKET_LEN);
    out.extend_from_slice(&packet[0..4]);
    out.push(af_bytes.len() as u8);
    out.extend_from_slice(&af_bytes);

    let payload_start = 5 + existing_af_len;
    let original_payload = if payload_start <= packet.len() {
        &packet[payload_start..]
    } else {
        &[]
    };
    let keep = original_payload.len().saturating_sub(grown);
    out.extend_from_slice(&original_payload[..keep]);
    out.resize(PACKET_LEN, 0xFF);
    Ok(out)
}

fn shift_timestamp(existing: Option<i64>, offset: i64) -> Option<i64> {
    existing.map(|ts| (ts + offset).rem_euclid(1 << 33))
}

/// Apply `shift_pts`/`shift_dts`/`shift_pcr` to every 188-byte packet in a
/// segment. Non-aligned trailing bytes (fewer than 188) pass through unchanged.
pub fn shift_segment(segment: &[u8], offset: i64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(segment.len());
    let mut chunks = segment.chunks_exact(PACKET_LEN);
    for chunk in &mut chunks {
        if chunk[0] != 0x47 {
            out.extend_from_slice(chunk);
            continue;
        }
        let mut packet = chunk.to_vec();
        if let Some(pts) = read_pts(&packet)? {
            packet = write_pts(&packet, shift_timestamp(Some(pts), offset).unwrap())?;
        }
        if let Some(dts) = read_dts(&packet)? {
            packet = write_dts(&packet, shift_timestamp(Some(dts), offset).unwrap())?;
        }
        if let Some((base, ext)) = read_pcr(&packet)? {
            let shifted_base = (base + offset).rem_euclid(1 << 33);
            packet = write_pcr(&packet, (shifted_base, ext))?;
        }
        out.extend_from_slice(&packet);
    }
    out.extend_from_slice(chunks.remainder());
    Ok(out)
}

/// Rewrite the continuity counter of every synced packet to
/// `(cc_map[pid] + 1) & 0x0F`, updating `cc_map` in place.
pub fn update_continuity_counters(
    segment: &[u8],
    cc_map: &mut HashMap<u16, u8>,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(segment.len());
    let mut chunks = segment.chunks_exact(PACKET_LEN);
    for chunk in &mut chunks {
        if chunk[0] != 0x47 {
            out.extend_from_slice(chunk);
            continue;
        }
        let pid = (((chunk[1] as u16) & 0x1F) << 8) | chunk[2] as u16;
        let prev = *cc_map.get(&pid).unwrap_or(&0x0F);
        let next = (prev + 1) & 0x0F;
        cc_map.insert(pid, next);
        let mut packet = chunk.to_vec();
        packet[3] = (packet[3] & 0xF0) | next;
        out.extend_from_slice(&packet);
    }
    out.extend_from_slice(chunks.remainder());
    out
}

/// Set the discontinuity indicator on the first packet that already carries
/// an adaptation field. Returns the segment unchanged (and logs a warning)
/// if no such packet exists.
pub fn set_discontinuity_indicator(segment: &[u8]) -> Vec<u8> {
    let mut out = segment.to_vec();
    let mut chunks = out.chunks_exact_mut(PACKET_LEN);
    for chunk in &mut chunks {
        if chunk[0] != 0x47 {
            continue;
        }
        let afc = (chunk[3] >> 4) & 0x03;
        if (afc == 0x02 || afc == 0x03) && chunk[4] >= 1 {
            chunk[5] |= 0x80;
            return out;
        }
    }
    warn!("set_discontinuity_indicator: no packet with an adaptation field found");
    out
}

/// Heuristic validation of raw segment bytes per the three-part rule:
/// sync-byte density, video-PID share, and at least one parseable PTS.
pub fn is_valid_ts(segment: &[u8]) -> bool {
    let packets: Vec<&[u8]> = segment.chunks_exact(PACKET_LEN).take(20).collect();
    if packets.is_empty() {
        return false;
    }
    let n = packets.len();
    let synced: Vec<&[u8]> = packets.into_iter().filter(|p| p[0] == 0x47).collect();
    let sync_threshold = (3usize).max((0.8 * n as f64).ceil() as usize);
    if synced.len() < sync_threshold {
        return false;
    }

    let video_like: Vec<&[u8]> = synced
        .iter()
        .filter(|p| {
            let pid = (((p[1] as u16) & 0x1F) << 8) | p[2] as u16;
            pid != PID_NULL && is_video_plausible_pid(pid)
        })
        .copied()
        .collect();
    if video_like.len() * 2 < synced.len() {
        return false;
    }

    video_like.iter().any(|p| matches!(read_pts(p), Ok(Some(_))))
}

#[allow(dead_code)]
fn is_audio_stream_id(id: u8) -> bool {
    (STREAM_ID_AUDIO_MIN..=STREAM_ID_AUDIO_MAX).contains(&id)
}

#[allow(dead_code)]
fn is_video_stream_id(id: u8) -> bool {
    (STREAM_ID_VIDEO_MIN..=STREAM_ID_VIDEO_MAX).contains(&id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pts_packet(stream_id: u8, pts: u64) -> Vec<u8> {
        let mut data = vec![0u8; PACKET_LEN];
        data[0] = 0x47;
        data[1] = 0x40; // PUSI set, pid high = 0
        data[2] = 0x41; // pid = 0x141 (video-plausible)
        data[3] = 0x10; // afc = payload only, cc = 0
        data[4] = 0x00;
        data[5] = 0x00;
        data[6] = 0x01;
        data[7] = stream_id;
        data[8] = 0x00;
        data[9] = 0x00;
        data[10] = 0x80;
        data[11] = 0x80; // pts only
        data[12] = 0x05;
        let bytes = encode_timestamp(0x20, pts);
        data[13..18].copy_from_slice(&bytes);
        data
    }

    #[test]
    fn write_pts_roundtrip() {
        let packet = make_pts_packet(0xE0, 90_000);
        let rewritten = write_pts(&packet, 180_000).unwrap();
        assert_eq!(read_pts(&rewritten).unwrap(), Some(180_000));
        assert_eq!(rewritten.len(), PACKET_LEN);
    }

    #[test]
    fn write_pts_identity_is_byte_identical() {
        let packet = make_pts_packet(0xE0, 42_000);
        let rewritten = write_pts(&packet, 42_000).unwrap();
        assert_eq!(rewritten, packet);
    }

    #[test]
    fn write_pts_preserves_flag_nibble() {
        let packet = make_pts_packet(0xE0, 1000);
        let rewritten = write_pts(&packet, 999_999).unwrap();
        assert_eq!(rewritten[13] & 0xF0, packet[13] & 0xF0);
    }

    #[test]
    fn pcr_roundtrip_no_adaptation_field() {
        let mut packet = vec![0u8; PACKET_LEN];
        packet[0] = 0x47;
        packet[3] = 0x10; // afc = payload only
        for (i, b) in packet.iter_mut().enumerate().skip(4) {
            *b = (i % 256) as u8;
        }
        let rewritten = write_pcr(&packet, (90_000, 0)).unwrap();
        assert_eq!(rewritten.len(), PACKET_LEN);
        assert_eq!(read_pcr(&rewritten).unwrap(), Some((90_000, 0)));
    }

    #[test]
    fn pcr_roundtrip_short_adaptation_field() {
        let mut packet = vec![0u8; PACKET_LEN];
        packet[0] = 0x47;
        packet[3] = 0x30; // afc = 3 (adaptation field + payload)
        packet[4] = 1; // af length = 1 (flags only)
        packet[5] = 0x40; // random access indicator
        let rewritten = write_pcr(&packet, (12345, 7)).unwrap();
        assert_eq!(rewritten.len(), PACKET_LEN);
        assert_eq!(read_pcr(&rewritten).unwrap(), Some((12345, 7)));
        // random_access_indicator preserved
        assert_eq!(rewritten[5] & 0x40, 0x40);
    }

    #[test]
    fn update_cc_increments_per_pid() {
        let mut a = vec![0u8; PACKET_LEN];
        a[0] = 0x47;
        a[1] = 0x00;
        a[2] = 0x10;
        a[3] = 0x15;
        let segment = [a.clone(), a.clone()].concat();
        let mut cc_map = HashMap::new();
        let out = update_continuity_counters(&segment, &mut cc_map);
        assert_eq!(out[3] & 0x0F, 0);
        assert_eq!(out[PACKET_LEN + 3] & 0x0F, 1);
        assert_eq!(*cc_map.get(&0x0010).unwrap(), 1);
    }

    #[test]
    fn discontinuity_indicator_first_match() {
        let mut packet = vec![0u8; PACKET_LEN];
        packet[0] = 0x47;
        packet[3] = 0x30;
        packet[4] = 1;
        packet[5] = 0x00;
        let out = set_discontinuity_indicator(&packet);
        assert_eq!(out[5] & 0x80, 0x80);
    }

    #[test]
    fn discontinuity_indicator_missing_is_noop() {
        let mut packet = vec![0u8; PACKET_LEN];
        packet[0] = 0x47;
        packet[3] = 0x10;
        let out = set_discontinuity_indicator(&packet);
        assert_eq!(out, packet);
    }

    #[test]
    fn is_valid_ts_rejects_garbage() {
        let data = vec![0u8; PACKET_LEN * 5];
        assert!(!is_valid_ts(&data));
    }

    #[test]
    fn is_valid_ts_accepts_video_with_pts() {
        let packet = make_pts_packet(0xE0, 1000);
        let segment: Vec<u8> = std::iter::repeat(packet).take(4).flatten().collect();
        assert!(is_valid_ts(&segment));
    }
}
