//! Benchmarks for the link resolution pass.
//!
//! Two shapes matter in practice: the first pass over a freshly rendered
//! document (every link emits), and re-resolution of an already-bound
//! document (every triple hits the dedup guard).

use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use trellis_links::{Link, Registry, process_callbacks};
use trellis_model::{Model, PropertyType, View};

struct Document {
    root_view: View,
    root: Model,
    // Links stay registered for as long as their source views live here.
    _links: Vec<std::rc::Rc<Link>>,
}

/// A root with `pairs` linked widget pairs, each pair carrying one link.
fn build_document(pairs: usize) -> Document {
    Registry::with(|r| r.clear());
    let root_view = View::new("column");
    let root = Model::new("document");
    let mut links = Vec::with_capacity(pairs);
    for idx in 0..pairs {
        let slider = View::new("slider");
        let text = View::new("text");
        root_view.add_child(slider.clone());
        root_view.add_child(text.clone());

        let slider_model = Model::new("slider");
        slider_model.define("value", PropertyType::Int, idx as i64);
        let text_model = Model::new("text");
        text_model.define("text", PropertyType::Any, trellis_model::Value::Null);
        root.set_sub(&format!("slider_{idx}"), slider_model.clone());
        root.set_sub(&format!("text_{idx}"), text_model.clone());
        slider.set_model(root.ref_id(), slider_model);
        text.set_model(root.ref_id(), text_model);

        links.push(
            Link::builder()
                .source(&slider)
                .target(&text)
                .property("value", "text")
                .build()
                .expect("link builds"),
        );
    }
    Document {
        root_view,
        root,
        _links: links,
    }
}

fn bench_first_pass(c: &mut Criterion) {
    c.bench_function("process_callbacks/first_pass/64_links", |b| {
        b.iter_batched(
            || build_document(64),
            |doc| {
                black_box(process_callbacks(&doc.root_view, Some(&doc.root)).expect("pass"));
                doc
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_reresolution(c: &mut Criterion) {
    let doc = build_document(64);
    process_callbacks(&doc.root_view, Some(&doc.root)).expect("first pass");
    c.bench_function("process_callbacks/reresolution/64_links", |b| {
        b.iter(|| black_box(process_callbacks(&doc.root_view, Some(&doc.root)).expect("pass")));
    });
}

criterion_group!(benches, bench_first_pass, bench_reresolution);
criterion_main!(benches);
