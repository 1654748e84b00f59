use brrtschema::params::{HeaderParameter, ParameterDescriptor, PathParameter, QueryParameter};
use brrtschema::request::{ParsedRequest, RouteCaptures};
use brrtschema::types::TypeDescriptor;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;

fn bench_parameter_retrieval(c: &mut Criterion) {
    let params: Vec<ParameterDescriptor> = vec![
        PathParameter::new("id", TypeDescriptor::integer()).into(),
        QueryParameter::new("limit", TypeDescriptor::integer()).into(),
        QueryParameter::new("tags", TypeDescriptor::array(TypeDescriptor::string())).into(),
        HeaderParameter::new("trace", TypeDescriptor::uuid())
            .header_name("X-Trace-Id")
            .into(),
    ];
    let mut captures = RouteCaptures::new();
    captures.push((Arc::from("id"), "12345".to_string()));
    let request = ParsedRequest::new()
        .with_query("limit=50&tags=a&tags=b&tags=c&unused=1")
        .with_header("X-Trace-Id", "6f9619ff-8b86-d011-b42d-00cf4fc964ff");

    c.bench_function("retrieve_mixed_parameters", |b| {
        b.iter(|| {
            for p in &params {
                black_box(p.retrieve(&request, &captures).expect("valid"));
            }
        })
    });

    let long_query: String = (0..1_000).map(|i| format!("k{i}={i}&")).collect::<String>() + "limit=7";
    let wide = ParsedRequest::new().with_query(long_query);
    let limit = &params[1];
    c.bench_function("retrieve_from_wide_query", |b| {
        b.iter(|| black_box(limit.retrieve(&wide, &captures).expect("valid")))
    });
}

criterion_group!(benches, bench_parameter_retrieval);
criterion_main!(benches);
