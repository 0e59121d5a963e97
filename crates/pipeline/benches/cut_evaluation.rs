//! Benchmarks for cut evaluation
//!
//! Run with: cargo bench --package pipeline
//!
//! Measures CutRangeFilter, the jet validator and a full pipeline pass
//! on synthetic events.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use event_data::{CandidateKind, Event, EventId, Jet, LorentzVector, Muon};
use pipeline::cut_range::pt;
use pipeline::filters::{MinObjectsFilter, ObjectCutsFilter};
use pipeline::producers::{ValidJetsProducer, ValidMuonsProducer};
use pipeline::product::valid_jet_p4;
use pipeline::{
    CutDirection, CutFlowConsumer, CutRangeFilter, GlobalMetadata, Pipeline, PipelineContext, Producer,
    Product, QuantityRegistry,
};
use serde_json::json;
use settings::{PropertyTree, Settings};
use std::sync::Arc;

fn bench_settings() -> (Arc<PropertyTree>, Arc<GlobalMetadata>) {
    let tree = Arc::new(PropertyTree::from_value(json!({
        "Pipelines": {
            "bench": {
                "MuonID": "tight",
                "MuonLowerPtCuts": ["0:20", "1:10"],
                "NMuons": 1,
                "JetID": "loose",
                "JetLowerPtCuts": ["0:30", "default:20"],
                "JetUpperAbsEtaCuts": ["default:4.7"]
            }
        }
    })));
    let global = GlobalMetadata::from_settings(&Settings::global(tree.clone())).expect("global settings");
    (tree, Arc::new(global))
}

fn synthetic_events(count: u64) -> Vec<Event> {
    (0..count)
        .map(|n| {
            let mut event = Event::new(EventId {
                run: 1,
                lumi: n / 100,
                event: n,
            });
            let jets = (0..8)
                .map(|i| Jet {
                    p4: LorentzVector::new(
                        15.0 + ((n * 7 + i * 13) % 90) as f64,
                        -3.0 + ((n + i) % 12) as f64 * 0.5,
                        -3.0 + i as f64 * 0.75,
                        5.0,
                    ),
                    neutral_hadron_fraction: 0.2,
                    charged_hadron_fraction: 0.4,
                    photon_fraction: 0.3,
                    electron_fraction: 0.02,
                    n_constituents: 20,
                    n_charged: 9,
                    ..Default::default()
                })
                .collect();
            event.jets.insert("jets".to_string(), jets);
            let muons = (0..2)
                .map(|i| Muon {
                    p4: LorentzVector::new(5.0 + ((n * 3 + i * 17) % 40) as f64, 0.3 * i as f64, 0.1, 0.105),
                    id_tight: (n + i) % 3 != 0,
                    ..Default::default()
                })
                .collect();
            event.muons.insert("muons".to_string(), muons);
            event
        })
        .collect()
}

fn bench_cut_range_filter(c: &mut Criterion) {
    let events = synthetic_events(1);
    let jets: Vec<&Jet> = events[0].jets["jets"].iter().collect();
    let mut product = Product::new();
    product.valid_jets = jets;

    let mut filter = CutRangeFilter::new();
    filter
        .initialise(
            &["0:30".to_string(), "1:20".to_string(), "default:15".to_string()],
            CutDirection::Lower,
            valid_jet_p4,
            pt,
        )
        .expect("valid cuts");

    c.bench_function("cut_range_filter_passes", |b| {
        b.iter(|| black_box(filter.passes(black_box(&events[0]), black_box(&product))))
    });
}

fn bench_valid_jets_producer(c: &mut Criterion) {
    let (tree, global) = bench_settings();
    let ctx = PipelineContext::new(Settings::pipeline(tree, "bench"), global);
    let mut producer = ValidJetsProducer::jets();
    producer
        .init(&ctx, &mut QuantityRegistry::new())
        .expect("producer init");
    let events = synthetic_events(1);

    c.bench_function("valid_jets_produce", |b| {
        b.iter(|| {
            let mut product = Product::new();
            producer
                .produce(black_box(&events[0]), &mut product, &ctx)
                .expect("produce");
            black_box(product.valid_jets.len())
        })
    });
}

fn bench_pipeline_process(c: &mut Criterion) {
    let (tree, global) = bench_settings();
    let events = synthetic_events(1000);
    let mut pipeline = Pipeline::new("bench")
        .add_producer(ValidMuonsProducer::muons())
        .add_producer(ValidJetsProducer::jets())
        .add_filter(MinObjectsFilter::new(CandidateKind::Muon))
        .add_filter(ObjectCutsFilter::lower_pt(CandidateKind::Jet))
        .add_consumer(CutFlowConsumer::new());
    pipeline
        .init(Settings::pipeline(tree, "bench"), global)
        .expect("pipeline init");

    c.bench_function("pipeline_process_1000_events", |b| {
        b.iter(|| {
            for event in &events {
                black_box(pipeline.process(event).expect("process"));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_cut_range_filter,
    bench_valid_jets_producer,
    bench_pipeline_process
);
criterion_main!(benches);
