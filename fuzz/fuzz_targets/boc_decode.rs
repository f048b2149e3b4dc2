#![no_main]
use libfuzzer_sys::fuzz_target;

use ton_boc::Boc;

fuzz_target!(|data: &[u8]| {
    if let Ok(cell) = Boc::decode(data) {
        let mut slice = cell.as_slice();
        _ = slice.load_bit();
        _ = slice.load_small_uint(8);
        _ = slice.load_uint(64);
        _ = slice.load_coins();
        _ = slice.load_address();
        while let Ok(child) = slice.load_ref() {
            _ = child.cell().repr_hash();
        }
    }
});
