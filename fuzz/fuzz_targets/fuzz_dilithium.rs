#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use qasa_dilithium::dilithium::{
    self, DilithiumKeyPair, DilithiumPublicKey, DilithiumVariant, PublicKey, SecretKey, Signature,
};

#[derive(Arbitrary, Debug)]
struct DilithiumFuzzInput {
    variant: u8,
    seed: [u8; 32],
    message: Vec<u8>,
    signature: Vec<u8>,
    public_key: Vec<u8>,
}

fuzz_target!(|input: DilithiumFuzzInput| {
    let variant = match input.variant % 3 {
        0 => DilithiumVariant::Dilithium2,
        1 => DilithiumVariant::Dilithium3,
        _ => DilithiumVariant::Dilithium5,
    };

    // Decoders must reject or accept arbitrary bytes without panicking
    let _ = PublicKey::from_bytes(&input.public_key, variant);
    let _ = SecretKey::from_bytes(&input.signature, variant);
    if let Ok(sig) = Signature::from_bytes(&input.signature, variant) {
        assert_eq!(sig.to_bytes(), input.signature);
    }
    let _ = dilithium::verify(&input.signature, &input.message, &input.public_key);
    let _ = DilithiumPublicKey::from_bytes(&input.public_key);

    let key_pair = match DilithiumKeyPair::derive(&input.seed, variant) {
        Ok(key_pair) => key_pair,
        Err(_) => return,
    };

    // A fuzzed signature under a real key must verify as false unless it
    // is the genuine signature
    let genuine = key_pair.sign(&input.message).expect("signing with a derived key");
    assert!(dilithium::verify(&genuine, &input.message, &key_pair.public_key));
    if input.signature != genuine {
        assert!(!dilithium::verify(&input.signature, &input.message, &key_pair.public_key));
    }
});
