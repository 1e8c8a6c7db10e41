#[macro_use]
extern crate criterion;
extern crate cl_crypto;

use cl_crypto::bn::BigNumber;
use cl_crypto::cl::manager::CredentialManager;
use cl_crypto::cl::org::{IssuerCapable, Organization};
use cl_crypto::cl::{ClParams, Credential};
use cl_crypto::utils::logger::ClCryptoDefaultLogger;
use cl_crypto::utils::random::{OpenSslRandom, RandomSource};
use criterion::{BatchSize, BenchmarkId, Criterion};

use std::sync::Arc;

fn attrs(values: &[u32]) -> Vec<BigNumber> {
    values.iter().map(|v| BigNumber::from_u32(*v as usize).unwrap()).collect()
}

fn setup_cred_and_issue(rho_bit_len: usize) -> (Organization<IssuerCapable>, CredentialManager, Credential) {
    ClCryptoDefaultLogger::init(None).ok();

    let params = ClParams { rho_bit_len, ..ClParams::default() };
    let rng: Arc<dyn RandomSource> = Arc::new(OpenSslRandom);

    let org = Organization::new(&params, rng.clone()).unwrap();
    let master_secret = org.pub_key().generate_user_master_secret(rng.as_ref()).unwrap();

    let mut manager = CredentialManager::new(&params, org.pub_key(), &master_secret,
                                             &attrs(&[7, 6, 5, 22]), &attrs(&[9, 17]), &attrs(&[11, 13, 19]),
                                             rng).unwrap();
    let nonce = org.get_credential_issue_nonce().unwrap();
    let request = manager.get_credential_request(&nonce).unwrap();
    let (credential, a_proof) = org.issue_credential(&request).unwrap();
    assert!(manager.verify_credential(&credential, &a_proof).unwrap());

    (org, manager, credential)
}

fn bench_issuance(c: &mut Criterion) {
    let mut group = c.benchmark_group("cl issuance");

    for rho_bit_len in [160usize, 256].iter() {
        let (org, mut manager, _) = setup_cred_and_issue(*rho_bit_len);

        group.bench_with_input(BenchmarkId::from_parameter(rho_bit_len), rho_bit_len, |b, _| {
            b.iter(|| {
                let nonce = org.get_credential_issue_nonce().unwrap();
                let request = manager.get_credential_request(&nonce).unwrap();
                let (credential, a_proof) = org.issue_credential(&request).unwrap();
                assert!(manager.verify_credential(&credential, &a_proof).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_presentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cl presentation");
    let (org, manager, credential) = setup_cred_and_issue(160);

    group.bench_function("build", |b| {
        let nonce = org.get_prove_credential_nonce().unwrap();
        b.iter(|| manager.build_credential_proof(&credential, &[1, 2], &[0], &nonce).unwrap());
    });

    group.bench_function("verify", |b| {
        b.iter_batched(
            || {
                let nonce = org.get_prove_credential_nonce().unwrap();
                manager.build_credential_proof(&credential, &[1, 2], &[0], &nonce).unwrap()
            },
            |(randomized, proof)| {
                assert!(org.prove_credential(&randomized, &proof, &[1, 2], &[0],
                                             &attrs(&[6, 5]), &attrs(&[9])).unwrap());
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group! {
    name = cl_issuance;
    config = Criterion::default().sample_size(10);
    targets =
    bench_issuance,
}

criterion_group! {
    name = cl_presentation;
    config = Criterion::default().sample_size(10);
    targets =
    bench_presentation,
}

criterion_main!(cl_issuance, cl_presentation);
