use num_bigint_dig::BigUint;

use torus_fhe::{
    bool::{gen_keys, ServerKeyEvaluationDomain},
    parameters::PN10QP27,
    IntegerEvaluator,
};

fn main() {
    println!("generating keys (this dominates startup)...");
    let (ck, sk) = gen_keys(&PN10QP27).unwrap();
    let key = ServerKeyEvaluationDomain::from(&sk);
    let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

    let a = 200u64;
    let b = 55u64;
    let ct_a = ck.encrypt_uint(&BigUint::from(a), 8).unwrap();
    let ct_b = ck.encrypt_uint(&BigUint::from(b), 8).unwrap();

    println!("computing on ciphertexts...");
    let sum = e.add(&ct_a, &ct_b).unwrap();
    let diff = e.sub(&ct_a, &ct_b).unwrap();
    let a_lt_b = e.lt(&ct_a, &ct_b).unwrap();
    let maximum = e.max(&ct_a, &ct_b).unwrap();

    println!("{a} + {b} = {}", ck.decrypt_uint(&sum));
    println!("{a} - {b} = {}", ck.decrypt_uint(&diff));
    println!("{a} < {b} = {}", ck.decrypt_bit(&a_lt_b));
    println!("max({a}, {b}) = {}", ck.decrypt_uint(&maximum));
}
