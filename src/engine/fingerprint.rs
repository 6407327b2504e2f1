use std::fmt;

use xxhash_rust::xxh3::Xxh3;

use crate::graph::param::{ParamSet, ParamValue};

const XXH3_SEED: u64 = 0x4f63_6730_e1a9_2b57;

/// Stable 128-bit identity of a stream payload for one node on one frame.
///
/// Two evaluations with identical inputs, parameters and source resources produce the same
/// fingerprint; the value is independent of process, platform and hash-map ordering.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct StreamFingerprint {
    /// High 64 bits of the digest.
    pub hi: u64,
    /// Low 64 bits of the digest.
    pub lo: u64,
}

impl fmt::Display for StreamFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

pub(crate) struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    pub(crate) fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    pub(crate) fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    /// Length-prefixed so adjacent strings cannot alias.
    pub(crate) fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    pub(crate) fn write_fingerprint(&mut self, fp: StreamFingerprint) {
        self.write_u64(fp.hi);
        self.write_u64(fp.lo);
    }

    pub(crate) fn write_params(&mut self, params: &ParamSet) {
        self.write_u64(params.len() as u64);
        for (name, value) in params.iter() {
            self.write_str(name);
            match value {
                ParamValue::Int(v) => {
                    self.write_u8(0);
                    self.write_i64(*v);
                }
                ParamValue::Float(v) => {
                    self.write_u8(1);
                    self.write_f64(*v);
                }
                ParamValue::Str(s) => {
                    self.write_u8(2);
                    self.write_str(s);
                }
            }
        }
    }

    pub(crate) fn finish(self) -> StreamFingerprint {
        let v = self.inner.digest128();
        StreamFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}
