use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use vehicle_protocol::core::codec;
use vehicle_protocol::core::message::{Message, MessageType};

fn bench_message_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_codec");
    let messages = vec![
        Message::builder(MessageType::Command).command("info").build(),
        Message::builder(MessageType::Command)
            .command("insert")
            .args(vec![
                "\"car1\"".into(),
                "3.0".into(),
                "4.0".into(),
                "0.7".into(),
                "20.0".into(),
                "CAR".into(),
                "ALCOHOL".into(),
            ])
            .login("clay")
            .password("secret")
            .build(),
        Message::builder(MessageType::Response)
            .message("x".repeat(1024))
            .build(),
    ];

    group.bench_function("encode", |b| {
        b.iter_batched(
            || messages.clone(),
            |msgs| {
                for m in msgs {
                    let _ = codec::encode(&m).unwrap();
                }
            },
            BatchSize::SmallInput,
        )
    });

    let blob = codec::encode(
        &Message::builder(MessageType::Response)
            .message("x".repeat(1024))
            .build(),
    )
    .unwrap();
    group.bench_function("decode", |b| {
        b.iter(|| {
            let _ = codec::decode(&blob, None).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_message_codec);
criterion_main!(benches);
