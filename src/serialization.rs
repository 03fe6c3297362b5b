//! Deterministic byte encoding for keys and ciphertexts.
//!
//! Every frame starts with a two-byte magic, a version byte, the
//! parameter preset id and a type tag; the payload stores coefficients
//! little-endian at the fixed width ceil(bits(modulus) / 8) and secrets
//! bit-packed. Round-tripping is bit-identical.

use crate::{
    backend::Modulus,
    bool::{
        parameters::ParameterPreset,
        ClientKey, FheBool, PublicKey, ServerKey,
    },
    error::{FheError, FheResult},
    lwe::LweSecret,
    rgsw::{rgsw_rows, RlweSecret},
    uint::FheUint,
    Secret,
};

const MAGIC: [u8; 2] = [0x54, 0x47];
const VERSION: u8 = 1;

const TAG_FHE_BOOL: u8 = 1;
const TAG_FHE_UINT: u8 = 2;
const TAG_CLIENT_KEY: u8 = 3;
const TAG_PUBLIC_KEY: u8 = 4;
const TAG_SERVER_KEY: u8 = 5;

pub trait ToBytes {
    fn to_bytes(&self) -> Vec<u8>;
}

pub trait FromBytes: Sized {
    fn from_bytes(bytes: &[u8]) -> FheResult<Self>;
}

fn err(what: impl Into<String>) -> FheError {
    FheError::SerializationError(what.into())
}

fn element_width<M: Modulus>(modulus: &M) -> usize {
    (modulus.log_q() + 7) / 8
}

fn write_header(buf: &mut Vec<u8>, preset: ParameterPreset, tag: u8) {
    buf.extend_from_slice(&MAGIC);
    buf.push(VERSION);
    buf.push(preset.id());
    buf.push(tag);
}

/// Checks magic/version/tag and resolves the preset; returns the preset
/// and the payload.
fn read_header(bytes: &[u8], expected_tag: u8) -> FheResult<(ParameterPreset, &[u8])> {
    if bytes.len() < 5 {
        return Err(err("truncated header"));
    }
    if bytes[0..2] != MAGIC {
        return Err(err("bad magic"));
    }
    if bytes[2] != VERSION {
        return Err(err(format!("unsupported version {}", bytes[2])));
    }
    let preset =
        ParameterPreset::from_id(bytes[3]).ok_or_else(|| err(format!("unknown preset id {}", bytes[3])))?;
    if bytes[4] != expected_tag {
        return Err(err(format!(
            "type tag mismatch: expected {expected_tag}, got {}",
            bytes[4]
        )));
    }
    Ok((preset, &bytes[5..]))
}

fn write_elements(buf: &mut Vec<u8>, values: &[u64], width: usize) {
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes()[..width]);
    }
}

fn read_elements(bytes: &[u8], count: usize, width: usize) -> FheResult<(Vec<u64>, &[u8])> {
    let need = count * width;
    if bytes.len() < need {
        return Err(err("payload too short"));
    }
    let mut out = Vec::with_capacity(count);
    for chunk in bytes[..need].chunks_exact(width) {
        let mut v = [0u8; 8];
        v[..width].copy_from_slice(chunk);
        out.push(u64::from_le_bytes(v));
    }
    Ok((out, &bytes[need..]))
}

fn write_bits(buf: &mut Vec<u8>, values: &[i32]) {
    let mut bytes = vec![0u8; (values.len() + 7) / 8];
    for (i, v) in values.iter().enumerate() {
        if *v != 0 {
            bytes[i >> 3] |= 1 << (i & 7);
        }
    }
    buf.extend_from_slice(&bytes);
}

fn read_bits(bytes: &[u8], count: usize) -> FheResult<(Vec<i32>, &[u8])> {
    let need = (count + 7) / 8;
    if bytes.len() < need {
        return Err(err("payload too short"));
    }
    let out = (0..count)
        .map(|i| ((bytes[i >> 3] >> (i & 7)) & 1) as i32)
        .collect();
    Ok((out, &bytes[need..]))
}

fn expect_consumed(rest: &[u8]) -> FheResult<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(err(format!("{} trailing bytes", rest.len())))
    }
}

impl ToBytes for FheBool {
    fn to_bytes(&self) -> Vec<u8> {
        let params = self.preset().parameters();
        let width = element_width(params.lwe_q());
        let mut buf = Vec::with_capacity(5 + self.data.len() * width);
        write_header(&mut buf, self.preset(), TAG_FHE_BOOL);
        write_elements(&mut buf, &self.data, width);
        buf
    }
}

impl FromBytes for FheBool {
    fn from_bytes(bytes: &[u8]) -> FheResult<Self> {
        let (preset, payload) = read_header(bytes, TAG_FHE_BOOL)?;
        let params = preset.parameters();
        let width = element_width(params.lwe_q());
        let (data, rest) = read_elements(payload, params.lwe_n().0 + 1, width)?;
        expect_consumed(rest)?;
        Ok(FheBool { data, preset })
    }
}

impl ToBytes for FheUint {
    fn to_bytes(&self) -> Vec<u8> {
        let params = self.preset().parameters();
        let width = element_width(params.lwe_q());
        let mut buf = Vec::new();
        write_header(&mut buf, self.preset(), TAG_FHE_UINT);
        buf.extend_from_slice(&(self.width() as u32).to_le_bytes());
        for bit in self.bits() {
            write_elements(&mut buf, &bit.data, width);
        }
        buf
    }
}

impl FromBytes for FheUint {
    fn from_bytes(bytes: &[u8]) -> FheResult<Self> {
        let (preset, payload) = read_header(bytes, TAG_FHE_UINT)?;
        let params = preset.parameters();
        let el_width = element_width(params.lwe_q());

        if payload.len() < 4 {
            return Err(err("missing width"));
        }
        let bit_width = u32::from_le_bytes(payload[..4].try_into().unwrap()) as usize;
        crate::uint::types::check_width(bit_width)
            .map_err(|_| err(format!("unsupported stored width {bit_width}")))?;
        let mut rest = &payload[4..];

        let mut data = Vec::with_capacity(bit_width);
        for _ in 0..bit_width {
            let (bit, tail) = read_elements(rest, params.lwe_n().0 + 1, el_width)?;
            data.push(FheBool { data: bit, preset });
            rest = tail;
        }
        expect_consumed(rest)?;
        FheUint::from_bits(data)
            .map_err(|_| err(format!("unsupported stored width {bit_width}")))
    }
}

impl ToBytes for ClientKey {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_header(&mut buf, self.parameters.preset(), TAG_CLIENT_KEY);
        write_bits(&mut buf, self.sk_lwe.values());
        write_bits(&mut buf, self.sk_rlwe.values());
        buf
    }
}

impl FromBytes for ClientKey {
    fn from_bytes(bytes: &[u8]) -> FheResult<Self> {
        let (preset, payload) = read_header(bytes, TAG_CLIENT_KEY)?;
        let params = preset.parameters();
        let (sk_lwe, rest) = read_bits(payload, params.lwe_n().0)?;
        let (sk_rlwe, rest) = read_bits(rest, params.rlwe_n().0)?;
        expect_consumed(rest)?;
        Ok(ClientKey::new(
            RlweSecret::from_values(sk_rlwe),
            LweSecret::from_values(sk_lwe),
            params,
        ))
    }
}

impl ToBytes for PublicKey {
    fn to_bytes(&self) -> Vec<u8> {
        let width = element_width(self.parameters.lwe_q());
        let mut buf = Vec::new();
        write_header(&mut buf, self.parameters.preset(), TAG_PUBLIC_KEY);
        for row in self.pool.iter() {
            write_elements(&mut buf, row, width);
        }
        buf
    }
}

impl FromBytes for PublicKey {
    fn from_bytes(bytes: &[u8]) -> FheResult<Self> {
        let (preset, payload) = read_header(bytes, TAG_PUBLIC_KEY)?;
        let params = preset.parameters();
        let width = element_width(params.lwe_q());

        let mut rest = payload;
        let mut pool = Vec::with_capacity(params.pk_pool());
        for _ in 0..params.pk_pool() {
            let (row, tail) = read_elements(rest, params.lwe_n().0 + 1, width)?;
            pool.push(row);
            rest = tail;
        }
        expect_consumed(rest)?;
        Ok(PublicKey {
            pool,
            parameters: params,
        })
    }
}

impl ToBytes for ServerKey {
    fn to_bytes(&self) -> Vec<u8> {
        let width = element_width(self.parameters.rlwe_q());
        let mut buf = Vec::new();
        write_header(&mut buf, self.parameters.preset(), TAG_SERVER_KEY);
        for rgsw in self.rgsw_cts.iter() {
            for row in rgsw.iter() {
                write_elements(&mut buf, row, width);
            }
        }
        for row in self.lwe_ksk.iter() {
            write_elements(&mut buf, row, width);
        }
        buf
    }
}

impl FromBytes for ServerKey {
    fn from_bytes(bytes: &[u8]) -> FheResult<Self> {
        let (preset, payload) = read_header(bytes, TAG_SERVER_KEY)?;
        let params = preset.parameters();
        let width = element_width(params.rlwe_q());
        let rlwe_n = params.rlwe_n().0;
        let d = params.rlwe_rgsw_decomposition_params().1 .0;
        let d_ks = params.lwe_decomposition_params().1 .0;

        let mut rest = payload;
        let mut rgsw_cts = Vec::with_capacity(params.lwe_n().0);
        for _ in 0..params.lwe_n().0 {
            let mut rgsw = Vec::with_capacity(rgsw_rows(d));
            for _ in 0..rgsw_rows(d) {
                let (row, tail) = read_elements(rest, rlwe_n, width)?;
                rgsw.push(row);
                rest = tail;
            }
            rgsw_cts.push(rgsw);
        }

        let mut lwe_ksk = Vec::with_capacity(rlwe_n * d_ks);
        for _ in 0..rlwe_n * d_ks {
            let (row, tail) = read_elements(rest, params.lwe_n().0 + 1, width)?;
            lwe_ksk.push(row);
            rest = tail;
        }
        expect_consumed(rest)?;

        Ok(ServerKey {
            rgsw_cts,
            lwe_ksk,
            parameters: params,
        })
    }
}

#[cfg(test)]
mod tests {
    use num_bigint_dig::BigUint;

    use super::*;
    use crate::{
        bool::{gen_keys, gen_public_key, parameters::PN10QP27},
        Encryptor,
    };

    #[test]
    fn fhe_bool_round_trips_bit_identically() {
        let (ck, _) = gen_keys(&PN10QP27).unwrap();
        let ct: FheBool = ck.encrypt(&true);

        let bytes = ct.to_bytes();
        let back = FheBool::from_bytes(&bytes).unwrap();
        assert_eq!(back, ct);
        assert_eq!(back.to_bytes(), bytes);
        assert_eq!(ck.decrypt_bit(&back), true);
    }

    #[test]
    fn fhe_uint_round_trips_bit_identically() {
        let (ck, _) = gen_keys(&PN10QP27).unwrap();
        let v = BigUint::from(0xDEAD_BEEFu64);
        let ct = ck.encrypt_uint(&v, 32).unwrap();

        let bytes = ct.to_bytes();
        let back = FheUint::from_bytes(&bytes).unwrap();
        assert_eq!(back, ct);
        assert_eq!(back.to_bytes(), bytes);
        assert_eq!(ck.decrypt_uint(&back), v);
    }

    #[test]
    fn client_key_round_trips_bit_identically() {
        let (ck, _) = gen_keys(&PN10QP27).unwrap();
        let bytes = ck.to_bytes();
        let back = ClientKey::from_bytes(&bytes).unwrap();
        assert_eq!(back, ck);
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn public_key_round_trips_bit_identically() {
        let (ck, _) = gen_keys(&PN10QP27).unwrap();
        let pk = gen_public_key(&ck).unwrap();
        let bytes = pk.to_bytes();
        let back = PublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(back, pk);
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn server_key_round_trips_bit_identically() {
        let (_, sk) = gen_keys(&PN10QP27).unwrap();
        let bytes = sk.to_bytes();
        let back = ServerKey::from_bytes(&bytes).unwrap();
        assert_eq!(back, sk);
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn malformed_frames_are_rejected() {
        let (ck, _) = gen_keys(&PN10QP27).unwrap();
        let ct: FheBool = ck.encrypt(&false);
        let good = ct.to_bytes();

        // bad magic
        let mut bad = good.clone();
        bad[0] ^= 0xFF;
        assert!(matches!(
            FheBool::from_bytes(&bad),
            Err(FheError::SerializationError(_))
        ));

        // bad version
        let mut bad = good.clone();
        bad[2] = 99;
        assert!(matches!(
            FheBool::from_bytes(&bad),
            Err(FheError::SerializationError(_))
        ));

        // unknown preset
        let mut bad = good.clone();
        bad[3] = 0;
        assert!(matches!(
            FheBool::from_bytes(&bad),
            Err(FheError::SerializationError(_))
        ));

        // wrong tag
        let mut bad = good.clone();
        bad[4] = TAG_CLIENT_KEY;
        assert!(matches!(
            FheBool::from_bytes(&bad),
            Err(FheError::SerializationError(_))
        ));

        // truncated payload
        assert!(matches!(
            FheBool::from_bytes(&good[..good.len() - 1]),
            Err(FheError::SerializationError(_))
        ));

        // trailing garbage
        let mut bad = good.clone();
        bad.push(0);
        assert!(matches!(
            FheBool::from_bytes(&bad),
            Err(FheError::SerializationError(_))
        ));
    }
}
