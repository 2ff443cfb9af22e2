#![no_main]

use libfuzzer_sys::fuzz_target;
use vrfgen_core::{Address, H256};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(hash) = H256::from_hex(s) {
        let rendered = hash.to_string();
        assert_eq!(rendered.len(), 66);
        assert_eq!(H256::from_hex(&rendered).unwrap(), hash);
    }

    if let Ok(address) = Address::from_hex(s) {
        let checksum = address.to_checksum();
        assert_eq!(checksum.len(), 42);
        assert_eq!(Address::from_hex(&checksum).unwrap(), address);
    }
});
