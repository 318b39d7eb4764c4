use std::hint::black_box;

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, Criterion};
use replica_ledger_core::{BlockHeader, ClientRequest};
use replica_ledger_testkit::fixtures::{executed_header, TestFixture};

fn header_bench(c: &mut Criterion) {
    let genesis = BlockHeader::genesis();
    let header = executed_header(1_000, genesis.hash());
    let encoded = header.serialize();

    c.bench_function("header_hash", |b| b.iter(|| black_box(&header).hash()));
    c.bench_function("header_serialize", |b| b.iter(|| black_box(&header).serialize()));
    c.bench_function("header_deserialize", |b| {
        b.iter(|| BlockHeader::deserialize(black_box(&encoded)).expect("decode"))
    });
}

fn request_bench(c: &mut Criterion) {
    let fixture = TestFixture::new(1);
    let payload = vec![0x5a; 1024];
    let unsigned: Bytes = fixture.unsigned_request(0, 1, &payload).expect("build").into_bytes();
    let signed: Bytes = fixture.signed_request(0, 2, &payload).expect("build").into_bytes();

    let plain_ctx = fixture.validation_context(false);
    let signed_ctx = fixture.validation_context(true);

    c.bench_function("request_parse_validate_unsigned", |b| {
        b.iter(|| {
            let request = ClientRequest::from_bytes(black_box(unsigned.clone())).expect("parse");
            request.validate(&plain_ctx).expect("valid")
        })
    });
    c.bench_function("request_parse_validate_ed25519", |b| {
        b.iter(|| {
            let request = ClientRequest::from_bytes(black_box(signed.clone())).expect("parse");
            request.validate(&signed_ctx).expect("valid")
        })
    });
    c.bench_function("request_build_signed", |b| {
        b.iter(|| fixture.signed_request(0, 3, black_box(&payload)).expect("build"))
    });
}

criterion_group!(benches, header_bench, request_bench);
criterion_main!(benches);
