//! Three-way comparison of two feeds: equal, one ahead of the other,
//! diverged from a shared ancestor, or unrelated.
//!
//! The aligner only ever inspects 64-byte `id`/`psig` fields - it never
//! re-verifies signatures or touches bodies.

use crate::errors::{DiffOutcome, Result};
use crate::feed::Feed;

/// Compares `a` against `b`. The returned [`DiffOutcome`] carries a signed
/// delta (see [`DiffOutcome::delta`]): negative when `a` holds unshared
/// blocks `b` lacks, positive the other way around.
pub fn diff(a: &Feed, b: &Feed) -> Result<DiffOutcome> {
    if std::ptr::eq(a, b) {
        return Ok(DiffOutcome::Equal);
    }

    let len_a = a.len()?;
    let len_b = b.len()?;

    if len_a == 0 && len_b == 0 {
        return Ok(DiffOutcome::Equal);
    }
    if len_a == 0 {
        return Ok(DiffOutcome::ABehindBy(len_b as u32));
    }
    if len_b == 0 {
        return Ok(DiffOutcome::AAheadBy(len_a as u32));
    }

    let b0 = b.get(0)?;

    // found: None (no alignment), Some(0) (same parent, case i), Some(1)
    // (B's genesis attaches right after an A block, case ii).
    let mut found: Option<u8> = None;
    let mut match_index = 0usize;
    for i in 0..len_a {
        let ai = a.get(i)?;
        if ai.psig == b0.psig {
            found = Some(0);
            match_index = i;
            break;
        }
        if ai.id == b0.psig {
            found = Some(1);
            match_index = i;
            break;
        }
    }

    let Some(case) = found else {
        return Ok(DiffOutcome::Unrelated);
    };

    let (mut a_idx, mut b_idx) = match case {
        0 => (match_index, 0usize),
        _ => (match_index + 1, 0usize),
    };

    loop {
        if a_idx >= len_a || b_idx >= len_b {
            break;
        }
        let av = a.get(a_idx)?;
        let bv = b.get(b_idx)?;
        if av.id != bv.id {
            return Ok(DiffOutcome::Diverged);
        }
        a_idx += 1;
        b_idx += 1;
    }

    if a_idx == len_a && b_idx == len_b {
        Ok(DiffOutcome::Equal)
    } else if a_idx == len_a {
        Ok(DiffOutcome::ABehindBy((len_b - b_idx) as u32))
    } else {
        Ok(DiffOutcome::AAheadBy((len_a - a_idx) as u32))
    }
}
