//! Minimal read-only R1CS description consumed by [`crate::phase2`].
//!
//! A real R1CS compiler and witness solver are out of scope (§1); this
//! module defines the narrow shape Phase2Engine needs from one, modeled
//! closely on the constraint/linear-combination surface a gnark-style
//! constraint system exposes (coefficient tags, wire indices split into
//! public/private/internal). Adapting a real compiler's output to this
//! shape happens at the boundary, outside this crate.

use crate::codec::{Decoder, Encoder, Encoding};
use crate::error::Phase2Error;
use ark_bn254::Fr;
use std::io::{Read, Write};

/// A constraint-term coefficient, dispatched by tag with fast paths for the
/// well-known small values (§9, "Dynamic coefficient dispatch").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coeff {
    /// The additive identity; terms with this coefficient contribute nothing.
    Zero,
    /// The multiplicative identity.
    One,
    /// `-1`.
    MinusOne,
    /// `2`.
    Two,
    /// An arbitrary field element, looked up by index in the constraint
    /// system's coefficient table.
    Other(usize),
}

impl Coeff {
    /// Multiply a scalar by this coefficient using the fast path where
    /// possible, falling back to `table[index]` for [`Coeff::Other`].
    pub fn apply(self, base: Fr, table: &[Fr]) -> Fr {
        match self {
            Coeff::Zero => Fr::from(0u64),
            Coeff::One => base,
            Coeff::MinusOne => -base,
            Coeff::Two => base + base,
            Coeff::Other(idx) => base * table[idx],
        }
    }
}

/// One term of a linear combination: `coeff * wire[index]`.
#[derive(Clone, Copy, Debug)]
pub struct Term {
    /// Index into the flattened wire vector (`0..wires`).
    pub wire: usize,
    /// The term's coefficient.
    pub coeff: Coeff,
}

/// A linear combination over wires, e.g. one side of an R1CS constraint.
pub type LinearCombination = Vec<Term>;

/// One `L * R = O` constraint.
#[derive(Clone, Debug, Default)]
pub struct Constraint {
    /// Left-hand linear combination.
    pub l: LinearCombination,
    /// Right-hand linear combination.
    pub r: LinearCombination,
    /// Output linear combination (unused by Phase2Engine's evaluation step,
    /// kept for completeness of the read-only description).
    pub o: LinearCombination,
}

/// An optional Pedersen-commitment hint: one private wire is committed to
/// and its slot moves from witness to public (§3, §4.6.1).
#[derive(Clone, Debug)]
pub struct CommitmentInfo {
    /// Wire index reserved for the commitment itself (moved to public).
    pub commitment_index: usize,
    /// Indices of the private wires being committed to.
    pub committed_wires: Vec<usize>,
}

/// Read-only circuit description consumed by `Phase2Engine::initialize`.
#[derive(Clone, Debug)]
pub struct R1cs {
    /// Number of public wires (not counting a commitment slot move).
    pub num_public: usize,
    /// Number of internal (non-input) wires.
    pub num_internal: usize,
    /// Number of secret (private input) wires.
    pub num_secret: usize,
    /// Constraints in declaration order.
    pub constraints: Vec<Constraint>,
    /// Coefficient table backing [`Coeff::Other`].
    pub coeff_table: Vec<Fr>,
    /// Pedersen commitment hint, if the circuit uses one.
    pub commitment_info: Option<CommitmentInfo>,
}

impl R1cs {
    /// Total wire count before any commitment-slot move:
    /// `internal + public + secret`.
    pub fn raw_wires(&self) -> usize {
        self.num_internal + self.num_public + self.num_secret
    }

    /// Number of committed-private wires (0 if no commitment hint).
    pub fn num_private_committed(&self) -> usize {
        self.commitment_info
            .as_ref()
            .map(|c| c.committed_wires.len())
            .unwrap_or(0)
    }

    /// Read a circuit description from the crate's own interchange format: a
    /// flat binary dump of the fields above, written by [`R1cs::write`]. Not
    /// a real R1CS compiler's output format (out of scope, §1) — just enough
    /// to let a driver load a fixture or a converted circuit from disk.
    pub fn read<R: Read>(mut r: R) -> Result<Self, Phase2Error> {
        let mut dec = Decoder::new(&mut r, Encoding::Compressed);
        let num_public = dec.decode_u32()? as usize;
        let num_internal = dec.decode_u32()? as usize;
        let num_secret = dec.decode_u32()? as usize;

        let table_len = dec.decode_u32()? as usize;
        let mut coeff_table = Vec::with_capacity(table_len);
        for _ in 0..table_len {
            coeff_table.push(dec.decode_fr()?);
        }

        let num_constraints = dec.decode_u32()? as usize;
        let mut constraints = Vec::with_capacity(num_constraints);
        for _ in 0..num_constraints {
            constraints.push(Constraint {
                l: read_lc(&mut dec)?,
                r: read_lc(&mut dec)?,
                o: read_lc(&mut dec)?,
            });
        }

        let commitment_info = match dec.decode_u8()? {
            0 => None,
            _ => {
                let commitment_index = dec.decode_u32()? as usize;
                let n = dec.decode_u32()? as usize;
                let mut committed_wires = Vec::with_capacity(n);
                for _ in 0..n {
                    committed_wires.push(dec.decode_u32()? as usize);
                }
                Some(CommitmentInfo {
                    commitment_index,
                    committed_wires,
                })
            }
        };

        Ok(R1cs {
            num_public,
            num_internal,
            num_secret,
            constraints,
            coeff_table,
            commitment_info,
        })
    }

    /// Write this circuit description in the interchange format [`R1cs::read`]
    /// consumes.
    pub fn write<W: Write>(&self, mut w: W) -> Result<(), Phase2Error> {
        let mut enc = Encoder::new(&mut w, Encoding::Compressed);
        enc.encode_u32(self.num_public as u32)?;
        enc.encode_u32(self.num_internal as u32)?;
        enc.encode_u32(self.num_secret as u32)?;

        enc.encode_u32(self.coeff_table.len() as u32)?;
        for f in &self.coeff_table {
            enc.encode_fr(f)?;
        }

        enc.encode_u32(self.constraints.len() as u32)?;
        for c in &self.constraints {
            write_lc(&mut enc, &c.l)?;
            write_lc(&mut enc, &c.r)?;
            write_lc(&mut enc, &c.o)?;
        }

        match &self.commitment_info {
            None => enc.encode_u8(0)?,
            Some(info) => {
                enc.encode_u8(1)?;
                enc.encode_u32(info.commitment_index as u32)?;
                enc.encode_u32(info.committed_wires.len() as u32)?;
                for &w in &info.committed_wires {
                    enc.encode_u32(w as u32)?;
                }
            }
        }
        enc.flush()?;
        Ok(())
    }
}

fn coeff_tag(coeff: Coeff) -> (u8, u32) {
    match coeff {
        Coeff::Zero => (0, 0),
        Coeff::One => (1, 0),
        Coeff::MinusOne => (2, 0),
        Coeff::Two => (3, 0),
        Coeff::Other(idx) => (4, idx as u32),
    }
}

fn coeff_from_tag(tag: u8, idx: u32) -> Result<Coeff, Phase2Error> {
    match tag {
        0 => Ok(Coeff::Zero),
        1 => Ok(Coeff::One),
        2 => Ok(Coeff::MinusOne),
        3 => Ok(Coeff::Two),
        4 => Ok(Coeff::Other(idx as usize)),
        _ => Err(Phase2Error::HeaderMismatch("unknown coefficient tag")),
    }
}

fn write_lc<W: Write>(enc: &mut Encoder<W>, lc: &LinearCombination) -> Result<(), Phase2Error> {
    enc.encode_u32(lc.len() as u32)?;
    for term in lc {
        enc.encode_u32(term.wire as u32)?;
        let (tag, idx) = coeff_tag(term.coeff);
        enc.encode_u8(tag)?;
        enc.encode_u32(idx)?;
    }
    Ok(())
}

fn read_lc<R: Read>(dec: &mut Decoder<R>) -> Result<LinearCombination, Phase2Error> {
    let n = dec.decode_u32()? as usize;
    let mut lc = Vec::with_capacity(n);
    for _ in 0..n {
        let wire = dec.decode_u32()? as usize;
        let tag = dec.decode_u8()?;
        let idx = dec.decode_u32()?;
        lc.push(Term {
            wire,
            coeff: coeff_from_tag(tag, idx)?,
        });
    }
    Ok(lc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coeff_fast_paths_match_slow_path() {
        let table = vec![Fr::from(7u64)];
        let base = Fr::from(3u64);
        assert_eq!(Coeff::Zero.apply(base, &table), Fr::from(0u64));
        assert_eq!(Coeff::One.apply(base, &table), base);
        assert_eq!(Coeff::MinusOne.apply(base, &table), -base);
        assert_eq!(Coeff::Two.apply(base, &table), base + base);
        assert_eq!(Coeff::Other(0).apply(base, &table), base * table[0]);
    }

    #[test]
    fn read_write_roundtrip_preserves_shape() {
        let r1cs = R1cs {
            num_public: 2,
            num_internal: 1,
            num_secret: 3,
            constraints: vec![Constraint {
                l: vec![Term { wire: 0, coeff: Coeff::One }],
                r: vec![Term { wire: 1, coeff: Coeff::Other(0) }],
                o: vec![Term { wire: 2, coeff: Coeff::MinusOne }],
            }],
            coeff_table: vec![Fr::from(11u64)],
            commitment_info: Some(CommitmentInfo {
                commitment_index: 5,
                committed_wires: vec![3, 4],
            }),
        };

        let mut buf = Vec::new();
        r1cs.write(&mut buf).unwrap();
        let back = R1cs::read(&buf[..]).unwrap();

        assert_eq!(back.num_public, r1cs.num_public);
        assert_eq!(back.num_internal, r1cs.num_internal);
        assert_eq!(back.num_secret, r1cs.num_secret);
        assert_eq!(back.coeff_table, r1cs.coeff_table);
        assert_eq!(back.constraints.len(), 1);
        assert_eq!(back.constraints[0].l[0].wire, 0);
        assert_eq!(back.constraints[0].r[0].coeff, Coeff::Other(0));
        let info = back.commitment_info.unwrap();
        assert_eq!(info.commitment_index, 5);
        assert_eq!(info.committed_wires, vec![3, 4]);
    }
}
