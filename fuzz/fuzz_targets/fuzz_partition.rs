#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vrfgen_prover::partition;

#[derive(Debug, Arbitrary)]
struct Input {
    start: u64,
    end: u64,
    workers: u16,
}

fuzz_target!(|input: Input| {
    let Ok(ranges) = partition(input.start, input.end, input.workers as usize) else {
        return;
    };

    // Exact cover of [start, end], ascending, no empty ranges
    assert!(!ranges.is_empty());
    assert!(ranges.len() <= input.workers as usize);
    assert_eq!(ranges[0].start, input.start);
    assert_eq!(ranges[ranges.len() - 1].end, input.end);
    for pair in ranges.windows(2) {
        assert_eq!(pair[0].end + 1, pair[1].start);
    }
    for range in &ranges {
        assert!(range.start <= range.end);
    }
});
