/*!
 * Snapshot Packer
 * Serializes configuration, space accounting, and allocation records into
 * the wire codec for client consumption
 */

use crate::config::{BbConfig, GresClass};
use crate::core::errors::PackError;
use crate::core::pack::{PackBuffer, UnpackBuffer};
use crate::core::types::UserId;
use crate::state::{AllocState, AllocTable, StateInner};

/// Current snapshot wire layout version.
pub const PROTOCOL_VERSION: u16 = 1;

fn check_version(protocol_version: u16) -> Result<(), PackError> {
    if protocol_version != PROTOCOL_VERSION {
        return Err(PackError::UnsupportedVersion(protocol_version));
    }
    Ok(())
}

fn pack_gres(gres: &[GresClass], buffer: &mut PackBuffer) {
    buffer.pack_u32(gres.len() as u32);
    for class in gres {
        buffer.pack_str(Some(&class.name));
        buffer.pack_u32(class.avail_cnt);
        buffer.pack_u32(class.used_cnt);
    }
}

fn unpack_gres(buffer: &mut UnpackBuffer) -> Result<Vec<GresClass>, PackError> {
    let count = buffer.unpack_u32()?;
    let mut gres = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let name = buffer.unpack_str()?.unwrap_or_default();
        let avail_cnt = buffer.unpack_u32()?;
        let used_cnt = buffer.unpack_u32()?;
        gres.push(GresClass {
            name,
            avail_cnt,
            used_cnt,
        });
    }
    Ok(gres)
}

/// Pack the instance configuration and space accounting.
pub fn pack_state(
    state: &StateInner,
    buffer: &mut PackBuffer,
    protocol_version: u16,
) -> Result<(), PackError> {
    check_version(protocol_version)?;
    let config = &state.config;

    buffer.pack_str(config.allow_users_str.as_deref());
    buffer.pack_str(config.deny_users_str.as_deref());
    buffer.pack_str(config.get_sys_state.as_deref());
    buffer.pack_u32(config.granularity);
    pack_gres(&config.gres, buffer);
    buffer.pack_u16(config.private_data as u16);
    buffer.pack_str(config.start_stage_in.as_deref());
    buffer.pack_str(config.start_stage_out.as_deref());
    buffer.pack_str(config.stop_stage_in.as_deref());
    buffer.pack_str(config.stop_stage_out.as_deref());
    buffer.pack_u32(config.job_size_limit);
    buffer.pack_u32(config.prio_boost_alloc);
    buffer.pack_u32(config.prio_boost_use);
    buffer.pack_u32(config.stage_in_timeout);
    buffer.pack_u32(config.stage_out_timeout);
    buffer.pack_u32(state.total_space);
    buffer.pack_u32(state.used_space);
    buffer.pack_u32(config.user_size_limit);
    Ok(())
}

/// Symmetrical decode of [`pack_state`] output.
///
/// The textual user lists are authoritative on the wire; the resolved
/// identifier vectors are a load-time artifact and come back empty.
/// Returns the configuration with the packed total and used space.
pub fn unpack_state(
    buffer: &mut UnpackBuffer,
    protocol_version: u16,
) -> Result<(BbConfig, u32, u32), PackError> {
    check_version(protocol_version)?;
    let mut config = BbConfig::default();

    config.allow_users_str = buffer.unpack_str()?;
    config.deny_users_str = buffer.unpack_str()?;
    config.get_sys_state = buffer.unpack_str()?;
    config.granularity = buffer.unpack_u32()?;
    config.gres = unpack_gres(buffer)?;
    config.private_data = buffer.unpack_u16()? != 0;
    config.start_stage_in = buffer.unpack_str()?;
    config.start_stage_out = buffer.unpack_str()?;
    config.stop_stage_in = buffer.unpack_str()?;
    config.stop_stage_out = buffer.unpack_str()?;
    config.job_size_limit = buffer.unpack_u32()?;
    config.prio_boost_alloc = buffer.unpack_u32()?;
    config.prio_boost_use = buffer.unpack_u32()?;
    config.stage_in_timeout = buffer.unpack_u32()?;
    config.stage_out_timeout = buffer.unpack_u32()?;
    let total_space = buffer.unpack_u32()?;
    let used_space = buffer.unpack_u32()?;
    config.user_size_limit = buffer.unpack_u32()?;

    Ok((config, total_space, used_space))
}

/// Pack individual allocation records, newest first within each bucket.
///
/// `filter_uid` of 0 packs every record; otherwise only the matching
/// owner's records are emitted. Returns the packed record count.
pub fn pack_bufs(
    filter_uid: UserId,
    allocs: &AllocTable,
    buffer: &mut PackBuffer,
    protocol_version: u16,
) -> Result<u32, PackError> {
    check_version(protocol_version)?;
    let mut rec_count = 0;

    for alloc in allocs.iter() {
        if filter_uid != 0 && filter_uid != alloc.user_id {
            continue;
        }
        buffer.pack_u32(alloc.array_job_id);
        buffer.pack_u32(alloc.array_task_id);
        pack_gres(&alloc.gres, buffer);
        buffer.pack_u32(alloc.job_id);
        buffer.pack_str(alloc.name.as_deref());
        buffer.pack_u32(alloc.size);
        buffer.pack_u16(alloc.state.as_u16());
        buffer.pack_time(alloc.state_time);
        buffer.pack_u32(alloc.user_id);
        rec_count += 1;
    }

    Ok(rec_count)
}

/// Decode one record packed by [`pack_bufs`].
pub fn unpack_buf(
    buffer: &mut UnpackBuffer,
    protocol_version: u16,
) -> Result<crate::state::BbAlloc, PackError> {
    check_version(protocol_version)?;
    let mut alloc = crate::state::BbAlloc::default();

    alloc.array_job_id = buffer.unpack_u32()?;
    alloc.array_task_id = buffer.unpack_u32()?;
    alloc.gres = unpack_gres(buffer)?;
    alloc.job_id = buffer.unpack_u32()?;
    alloc.name = buffer.unpack_str()?;
    alloc.size = buffer.unpack_u32()?;
    alloc.state = AllocState::from_u16(buffer.unpack_u16()?).unwrap_or_default();
    alloc.state_time = buffer.unpack_time()?;
    alloc.user_id = buffer.unpack_u32()?;

    Ok(alloc)
}
