#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use logseal_core::{Aggregator, AggregatorConfig, ChunkingConfig, LookupStrategy, Tree, TreeConfig};

#[derive(Debug, Arbitrary)]
struct Input {
    events: Vec<Vec<u8>>,
    cuts: Vec<u8>,
    chunk_shift: u8,
    search: bool,
}

fuzz_target!(|input: Input| {
    if input.events.is_empty() || input.events.len() > 512 {
        return;
    }
    let lookup = if input.search {
        LookupStrategy::Search
    } else {
        LookupStrategy::Indexed
    };
    let config = TreeConfig::default().lookup(lookup);

    let tree = Tree::from_events(config.clone(), &input.events).expect("non-empty tree builds");
    assert_eq!(tree.leaf_count(), input.events.len() as u64);
    for event in &input.events {
        assert!(tree.is_valid_event(event).expect("inserted event resolves"));
    }

    // Any contiguous split must reproduce the sequential root.
    let chunk_size = 1usize << (input.chunk_shift % 7);
    let aggregator_config = AggregatorConfig::new(config, ChunkingConfig::default())
        .chunk_size(chunk_size)
        .workers(2);
    let mut aggregator = Aggregator::new(aggregator_config).expect("valid aggregator config");

    let mut start = 0;
    for cut in &input.cuts {
        let end = (start + usize::from(*cut)).min(input.events.len());
        aggregator.submit_chunk(input.events[start..end].iter().cloned());
        start = end;
    }
    aggregator.submit_chunk(input.events[start..].iter().cloned());

    let aggregated = aggregator.end_batch().expect("aggregation succeeds");
    assert_eq!(aggregated.root_digest(), tree.root_digest());
});
