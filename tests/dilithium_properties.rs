// Property tests for the Dilithium signature engine

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use qasa_dilithium::dilithium::params::{N, Q};
use qasa_dilithium::dilithium::poly::{Normal, Poly};
use qasa_dilithium::dilithium::sampling::{
    sample_challenge, sample_mask, sample_short, sample_uniform,
};
use qasa_dilithium::dilithium::{PublicKey, SecretKey, Signature};
use qasa_dilithium::{verify, DilithiumKeyPair, DilithiumVariant};

fn variant_strategy() -> impl Strategy<Value = DilithiumVariant> {
    prop_oneof![
        Just(DilithiumVariant::Dilithium2),
        Just(DilithiumVariant::Dilithium3),
        Just(DilithiumVariant::Dilithium5),
    ]
}

prop_compose! {
    fn ring_element()(coeffs in prop::collection::vec(-(Q - 1)..Q, N)) -> Poly<Normal> {
        let mut arr = [0i32; N];
        arr.copy_from_slice(&coeffs);
        Poly::from_coeffs(arr)
    }
}

fn schoolbook(a: &Poly, b: &Poly) -> Poly {
    let mut acc = [0i64; N];
    for (i, &x) in a.coeffs().iter().enumerate() {
        for (j, &y) in b.coeffs().iter().enumerate() {
            let prod = x as i64 * y as i64 % Q as i64;
            if i + j < N {
                acc[i + j] += prod;
            } else {
                acc[i + j - N] -= prod;
            }
        }
    }
    let mut out = [0i32; N];
    for (o, a) in out.iter_mut().zip(acc.iter()) {
        *o = a.rem_euclid(Q as i64) as i32;
    }
    Poly::from_coeffs(out)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ntt_roundtrip(x in ring_element()) {
        let back = x.ntt().inverse();
        prop_assert_eq!(back.canonical(), x.canonical());
    }

    #[test]
    fn ntt_product_is_ring_product(x in ring_element(), y in ring_element()) {
        prop_assert_eq!(x.mul(&y), schoolbook(&x, &y));
    }

    #[test]
    fn samplers_are_deterministic(seed in any::<[u8; 32]>(), nonce in any::<u16>()) {
        let mut wide = [0u8; 64];
        wide[..32].copy_from_slice(&seed);
        wide[32..].copy_from_slice(&seed);

        prop_assert_eq!(sample_uniform(&seed, nonce), sample_uniform(&seed, nonce));
        prop_assert_eq!(sample_short(&wide, nonce, 2), sample_short(&wide, nonce, 2));
        prop_assert_eq!(sample_mask(&wide, nonce, 1 << 19), sample_mask(&wide, nonce, 1 << 19));
        prop_assert_eq!(sample_challenge(&seed, 49), sample_challenge(&seed, 49));
    }

    #[test]
    fn challenge_has_exact_weight(seed in any::<[u8; 32]>(), variant in variant_strategy()) {
        let tau = variant.params().tau;
        let c = sample_challenge(&seed, tau);
        prop_assert_eq!(c.coeffs().iter().filter(|&&x| x != 0).count(), tau);
        prop_assert!(c.coeffs().iter().all(|&x| (-1..=1).contains(&x)));
    }

    #[test]
    fn random_bytes_never_panic_on_decode(
        bytes in prop::collection::vec(any::<u8>(), 0..5000),
        variant in variant_strategy(),
    ) {
        let _ = PublicKey::from_bytes(&bytes, variant);
        let _ = SecretKey::from_bytes(&bytes, variant);
        let _ = Signature::from_bytes(&bytes, variant);
    }

    #[test]
    fn wrong_length_is_input_error(len in 0usize..5000, variant in variant_strategy()) {
        prop_assume!(len != variant.signature_size());
        let err = Signature::from_bytes(&vec![0u8; len], variant).unwrap_err();
        prop_assert!(err.is_input_error());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn derive_is_deterministic(seed in any::<[u8; 32]>(), variant in variant_strategy()) {
        let a = DilithiumKeyPair::derive(&seed, variant).unwrap();
        let b = DilithiumKeyPair::derive(&seed, variant).unwrap();
        prop_assert_eq!(&a.public_key, &b.public_key);
        prop_assert_eq!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn sign_then_verify(
        seed in any::<[u8; 32]>(),
        message in prop::collection::vec(any::<u8>(), 0..512),
        variant in variant_strategy(),
    ) {
        let key_pair = DilithiumKeyPair::derive(&seed, variant).unwrap();
        let signature = key_pair.sign(&message).unwrap();
        prop_assert_eq!(signature.len(), variant.signature_size());
        prop_assert!(verify(&signature, &message, &key_pair.public_key));
    }
}

#[test]
fn single_bit_flips_are_rejected() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x5eed);
    let key_pair = DilithiumKeyPair::generate_with_rng(DilithiumVariant::Dilithium2, &mut rng).unwrap();
    let message: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
    let signature = key_pair.sign(&message).unwrap();
    assert!(verify(&signature, &message, &key_pair.public_key));

    for _ in 0..200 {
        let mut sig = signature.clone();
        let bit = rng.gen_range(0..sig.len() * 8);
        sig[bit / 8] ^= 1 << (bit % 8);
        assert!(!verify(&sig, &message, &key_pair.public_key), "signature bit {}", bit);

        let mut msg = message.clone();
        let bit = rng.gen_range(0..msg.len() * 8);
        msg[bit / 8] ^= 1 << (bit % 8);
        assert!(!verify(&signature, &msg, &key_pair.public_key), "message bit {}", bit);

        let mut pk = key_pair.public_key.clone();
        let bit = rng.gen_range(0..pk.len() * 8);
        pk[bit / 8] ^= 1 << (bit % 8);
        assert!(!verify(&signature, &message, &pk), "public key bit {}", bit);
    }
}

#[test]
fn cross_key_rejection() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    for variant in DilithiumVariant::ALL {
        let a = DilithiumKeyPair::generate_with_rng(variant, &mut rng).unwrap();
        let b = DilithiumKeyPair::generate_with_rng(variant, &mut rng).unwrap();
        let signature = a.sign(b"cross").unwrap();
        assert!(verify(&signature, b"cross", &a.public_key));
        assert!(!verify(&signature, b"cross", &b.public_key));
    }
}

#[test]
fn randomized_signing_with_seeded_rng_is_reproducible() {
    let key_pair = DilithiumKeyPair::derive(&[1u8; 32], DilithiumVariant::Dilithium3).unwrap();
    let a = key_pair
        .sign_randomized_with_rng(b"m", &mut ChaCha20Rng::seed_from_u64(99))
        .unwrap();
    let b = key_pair
        .sign_randomized_with_rng(b"m", &mut ChaCha20Rng::seed_from_u64(99))
        .unwrap();
    assert_eq!(a, b);
    assert_ne!(a, key_pair.sign(b"m").unwrap());
    assert!(key_pair.verify(b"m", &a).unwrap());
}
