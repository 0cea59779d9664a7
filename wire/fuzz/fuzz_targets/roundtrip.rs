#![no_main]

use arbitrary::Arbitrary;
use commonware_wire::{half, Endian, Reader, ReaderCfg, Writer, WriterCfg};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug, Clone)]
enum Op {
    U8(u8),
    I8(i8),
    U16(u16, bool),
    U32(u32, bool),
    U64(u64, bool),
    I16(i16, bool),
    I32(i32, bool),
    I64(i64, bool),
    F16(u16, bool),
    F32(f32, bool),
    F64(f64, bool),
    Bytes(Vec<u8>),
    Owned(Vec<u8>),
    Utf8(String),
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    chunk_size: u16,
    copy: bool,
    little: bool,
    ops: Vec<Op>,
}

fn endian(little: bool) -> Endian {
    Endian::from(little)
}

fn write(writer: &mut Writer, op: &Op) {
    match op {
        Op::U8(v) => writer.u8(*v),
        Op::I8(v) => writer.i8(*v),
        Op::U16(v, le) => writer.u16_endian(*v, endian(*le)),
        Op::U32(v, le) => writer.u32_endian(*v, endian(*le)),
        Op::U64(v, le) => writer.u64_endian(*v, endian(*le)),
        Op::I16(v, le) => writer.i16_endian(*v, endian(*le)),
        Op::I32(v, le) => writer.i32_endian(*v, endian(*le)),
        Op::I64(v, le) => writer.i64_endian(*v, endian(*le)),
        Op::F16(bits, le) => writer
            .f16_endian(half::from_bits(*bits), endian(*le))
            .expect("decoded halves are exact"),
        Op::F32(v, le) => writer.f32_endian(*v, endian(*le)),
        Op::F64(v, le) => writer.f64_endian(*v, endian(*le)),
        Op::Bytes(v) => writer.write(v),
        Op::Owned(v) => writer.write_owned(v.clone().into()),
        Op::Utf8(v) => writer.utf8(v),
    }
}

fn check(reader: &mut Reader, op: &Op) {
    match op {
        Op::U8(v) => assert_eq!(reader.u8().unwrap(), *v),
        Op::I8(v) => assert_eq!(reader.i8().unwrap(), *v),
        Op::U16(v, le) => assert_eq!(reader.u16_endian(endian(*le)).unwrap(), *v),
        Op::U32(v, le) => assert_eq!(reader.u32_endian(endian(*le)).unwrap(), *v),
        Op::U64(v, le) => assert_eq!(reader.u64_endian(endian(*le)).unwrap(), *v),
        Op::I16(v, le) => assert_eq!(reader.i16_endian(endian(*le)).unwrap(), *v),
        Op::I32(v, le) => assert_eq!(reader.i32_endian(endian(*le)).unwrap(), *v),
        Op::I64(v, le) => assert_eq!(reader.i64_endian(endian(*le)).unwrap(), *v),
        Op::F16(bits, le) => {
            let expected = half::from_bits(*bits);
            let decoded = reader.f16_endian(endian(*le)).unwrap();
            if expected.is_nan() {
                assert!(decoded.is_nan());
            } else {
                assert_eq!(decoded.to_bits(), expected.to_bits());
            }
        }
        Op::F32(v, le) => {
            assert_eq!(reader.f32_endian(endian(*le)).unwrap().to_bits(), v.to_bits())
        }
        Op::F64(v, le) => {
            assert_eq!(reader.f64_endian(endian(*le)).unwrap().to_bits(), v.to_bits())
        }
        Op::Bytes(v) | Op::Owned(v) => assert_eq!(&reader.bytes(v.len()).unwrap()[..], &v[..]),
        Op::Utf8(v) => assert_eq!(&reader.utf8(v.len()).unwrap(), v),
    }
}

fn fuzz(input: FuzzInput) {
    let cfg = WriterCfg::default()
        .chunk_size(input.chunk_size as usize)
        .copy(input.copy)
        .endian(endian(input.little));
    let Ok(mut writer) = Writer::new(cfg) else {
        assert!((input.chunk_size as usize) < commonware_wire::config::MIN_CHUNK_SIZE);
        return;
    };
    for op in &input.ops {
        write(&mut writer, op);
    }
    let length = writer.len();
    let peeked = writer.peek();
    let buf = writer.read();
    assert_eq!(buf.len(), length);
    assert_eq!(peeked, buf);
    assert!(writer.is_empty());

    let mut reader = Reader::new(buf, ReaderCfg::default()).unwrap();
    for op in &input.ops {
        check(&mut reader, op);
    }
    reader.complete().unwrap();

    // Every half pattern survives decode then encode, with NaNs collapsing to one pattern.
    for op in &input.ops {
        if let Op::F16(bits, _) = op {
            let value = half::from_bits(*bits);
            let encoded = half::encode_half(value).unwrap();
            if value.is_nan() {
                assert!(half::from_bits(encoded).is_nan());
            } else {
                assert_eq!(encoded, *bits);
            }
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
