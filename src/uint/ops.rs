use crate::{
    bool::{evaluator::BooleanGates, keys::ServerKeyEvaluationDomain, BoolEvaluator, FheBool},
    error::FheResult,
};

/// Ripple-carry addition, LSB first, wrapping mod 2^w.
///
/// Bit 0 spends an XOR and an AND; every interior bit spends two XORs and
/// one single-bootstrap MAJORITY for the carry; the top bit drops the
/// carry. Total 3w - 2 bootstraps.
pub(crate) fn arbitrary_bit_adder(
    e: &mut BoolEvaluator,
    a: &[FheBool],
    b: &[FheBool],
    key: &ServerKeyEvaluationDomain,
) -> FheResult<Vec<FheBool>> {
    debug_assert!(a.len() == b.len());
    let width = a.len();
    let mut sum = Vec::with_capacity(width);

    sum.push(e.xor(&a[0], &b[0], key)?);
    if width == 1 {
        return Ok(sum);
    }

    let mut carry = e.and(&a[0], &b[0], key)?;
    for i in 1..width {
        let half = e.xor(&a[i], &b[i], key)?;
        sum.push(e.xor(&half, &carry, key)?);
        if i + 1 < width {
            carry = e.majority(&a[i], &b[i], &carry, key)?;
        }
    }
    Ok(sum)
}

/// Ripple subtraction a - b mod 2^w. Returns the difference and the final
/// borrow, which doubles as the a < b comparison bit.
///
/// borrow' = majority(!a_i, b_i, borrow); the negation is linear and free.
pub(crate) fn arbitrary_bit_subtractor(
    e: &mut BoolEvaluator,
    a: &[FheBool],
    b: &[FheBool],
    key: &ServerKeyEvaluationDomain,
) -> FheResult<(Vec<FheBool>, FheBool)> {
    debug_assert!(a.len() == b.len());
    let width = a.len();
    let mut diff = Vec::with_capacity(width);

    diff.push(e.xor(&a[0], &b[0], key)?);
    let not_a0 = e.not(&a[0]);
    let mut borrow = e.and(&not_a0, &b[0], key)?;

    for i in 1..width {
        let half = e.xor(&a[i], &b[i], key)?;
        diff.push(e.xor(&half, &borrow, key)?);
        let not_ai = e.not(&a[i]);
        borrow = e.majority(&not_ai, &b[i], &borrow, key)?;
    }
    Ok((diff, borrow))
}

/// Equality as a balanced tree: per-bit XNOR, then pairwise AND folds.
/// The tree shape is fixed so noise growth is deterministic.
pub(crate) fn arbitrary_bit_equality(
    e: &mut BoolEvaluator,
    a: &[FheBool],
    b: &[FheBool],
    key: &ServerKeyEvaluationDomain,
) -> FheResult<FheBool> {
    debug_assert!(a.len() == b.len());
    let mut layer = Vec::with_capacity(a.len());
    for (ai, bi) in a.iter().zip(b.iter()) {
        layer.push(e.xnor(ai, bi, key)?);
    }

    while layer.len() > 1 {
        let mut next = Vec::with_capacity((layer.len() + 1) / 2);
        let mut chunks = layer.chunks_exact(2);
        for pair in chunks.by_ref() {
            next.push(e.and(&pair[0], &pair[1], key)?);
        }
        if let [odd] = chunks.remainder() {
            next.push(odd.clone());
        }
        layer = next;
    }
    Ok(layer.pop().unwrap())
}

/// a < b via the subtractor pattern: the final borrow of a - b.
pub(crate) fn arbitrary_bit_comparator(
    e: &mut BoolEvaluator,
    a: &[FheBool],
    b: &[FheBool],
    key: &ServerKeyEvaluationDomain,
) -> FheResult<FheBool> {
    let (_, borrow) = arbitrary_bit_subtractor(e, a, b, key)?;
    Ok(borrow)
}

/// Per-bit MUX with a shared Boolean selector: out_i = sel ? a_i : b_i.
pub(crate) fn arbitrary_bit_select(
    e: &mut BoolEvaluator,
    sel: &FheBool,
    a: &[FheBool],
    b: &[FheBool],
    key: &ServerKeyEvaluationDomain,
) -> FheResult<Vec<FheBool>> {
    debug_assert!(a.len() == b.len());
    let mut out = Vec::with_capacity(a.len());
    for (ai, bi) in a.iter().zip(b.iter()) {
        out.push(e.mux(sel, ai, bi, key)?);
    }
    Ok(out)
}

/// Adds the public constant `k` (little-endian plaintext bits) to `a`.
///
/// Bits below the lowest set bit of k only need a refresh; from there the
/// ripple costs one XOR/XNOR for the sum bit and one AND/OR for the carry
/// per position, depending on the plaintext bit.
pub(crate) fn arbitrary_bit_scalar_adder(
    e: &mut BoolEvaluator,
    a: &[FheBool],
    k: &[bool],
    key: &ServerKeyEvaluationDomain,
) -> FheResult<Vec<FheBool>> {
    debug_assert!(a.len() == k.len());
    let width = a.len();

    let lowest_set = match k.iter().position(|bit| *bit) {
        Some(p) => p,
        None => {
            // adding zero: refresh everything so repeated scalar adds do
            // not accumulate noise
            let mut out = Vec::with_capacity(width);
            for bit in a {
                out.push(e.refresh(bit, key)?);
            }
            return Ok(out);
        }
    };

    let mut out = Vec::with_capacity(width);
    for bit in a.iter().take(lowest_set) {
        out.push(e.refresh(bit, key)?);
    }

    // at the lowest set bit the carry-in is zero: sum = !a, carry = a
    out.push(e.not(&a[lowest_set]));
    if lowest_set + 1 == width {
        return Ok(out);
    }
    let mut carry = e.refresh(&a[lowest_set], key)?;

    for i in lowest_set + 1..width {
        if k[i] {
            out.push(e.xnor(&a[i], &carry, key)?);
            if i + 1 < width {
                carry = e.or(&a[i], &carry, key)?;
            }
        } else {
            out.push(e.xor(&a[i], &carry, key)?);
            if i + 1 < width {
                carry = e.and(&a[i], &carry, key)?;
            }
        }
    }
    Ok(out)
}

/// Bitwise map over two operands with any of the two-input gates.
pub(crate) fn arbitrary_bitwise_map2<F>(
    e: &mut BoolEvaluator,
    a: &[FheBool],
    b: &[FheBool],
    key: &ServerKeyEvaluationDomain,
    mut gate: F,
) -> FheResult<Vec<FheBool>>
where
    F: FnMut(&mut BoolEvaluator, &FheBool, &FheBool, &ServerKeyEvaluationDomain) -> FheResult<FheBool>,
{
    debug_assert!(a.len() == b.len());
    let mut out = Vec::with_capacity(a.len());
    for (ai, bi) in a.iter().zip(b.iter()) {
        out.push(gate(e, ai, bi, key)?);
    }
    Ok(out)
}
