#![no_main]

use arbitrary::Arbitrary;
use commonware_wire::{
    schema::{Field, FloatKind, IntKind, Kind, Len},
    Bits, Packet, ReaderCfg, Truncation,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FuzzInput<'a> {
    tolerant: bool,
    start: u8,
    finish: u8,
    data: &'a [u8],
}

fn fuzz(input: FuzzInput) {
    let truncation = if input.tolerant {
        Truncation::Tolerant
    } else {
        Truncation::Strict
    };
    let cfg = ReaderCfg::default().truncation(truncation);
    let layout = [
        Field::new("head", Kind::Int(IntKind::U32)),
        Field::new("len", Kind::Int(IntKind::U8)).temp(),
        Field::new("name", Kind::Ascii(Len::temp("len"))),
        Field::new("weight", Kind::Float(FloatKind::F16)),
        Field::new("body_len", Kind::Int(IntKind::U16)),
        Field::new("body", Kind::Bytes(Len::field("body_len"))),
        Field::new("rest", Kind::Unused),
    ];
    let mut packet = Packet::from_bytes(input.data.to_vec(), cfg).unwrap();
    let result = packet.fields(&layout);
    if input.tolerant {
        result.unwrap();
        assert_eq!(packet.is_truncated(), !packet.record().contains_key("rest"));
    } else if result.is_err() {
        return;
    }

    let bits = Bits::range("head", "bits", input.start as u32, input.finish as u32);
    let high = input.start.max(input.finish) as u32;
    match packet.bits(&bits).map(|_| ()) {
        Ok(_) if packet.is_truncated() => {}
        Ok(_) => assert!(high < 32),
        Err(_) => assert!(high >= 32),
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
