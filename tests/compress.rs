
//! End-to-end frame scenarios: emitted bytes, header fields and boundary
//! behavior of single compression passes.

mod common;

use airspace::header::{HDR_MAX_SIZE, HDR_SIZE};
use airspace::prelude::*;
use common::{compress_once, AlignedBuffer};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};


#[test]
fn uncompressed_roundtrip_of_u16_samples() {
    let (frame, header) = compress_once(&Params::default(), &[0x0001, 0x0203]);

    assert_eq!(frame.len(), HDR_SIZE as usize + 4);
    assert_eq!(&frame[HDR_SIZE as usize ..], &[0x00, 0x01, 0x02, 0x03][..]);

    assert_eq!(header.size(), HDR_SIZE);
    assert_eq!(header.compressed_size, HDR_SIZE + 4);
    assert_eq!(header.original_size, 4);
    assert_eq!(header.sequence_number, 0);
    assert_eq!(header.preprocessing, Preprocessing::None);
    assert_eq!(header.encoder_type, EncoderKind::Uncompressed);
    assert!(!header.checksum_enabled);
    assert!(header.version_flag);
    assert_eq!(u32::from(header.version_id), airspace::VERSION_NUMBER);
}

#[test]
fn diff_preprocessing_with_uncompressed_encoder() {
    let params = Params {
        primary_preprocessing: Preprocessing::Diff,
        primary_encoder_type: EncoderKind::Uncompressed,
        ..Params::default()
    };
    let src = [0x0001, 0x0003, 0x0000, 0xFFFF, 0x0000, 0x7FFF, 0x8000, 0xFFFB];

    let (frame, header) = compress_once(&params, &src);

    let expected_payload = [
        0x00, 0x01, 0x00, 0x02, 0xFF, 0xFD, 0xFF, 0xFF,
        0x00, 0x01, 0x7F, 0xFF, 0x00, 0x01, 0x7F, 0xFB,
    ];
    assert_eq!(header.size(), HDR_MAX_SIZE);
    assert_eq!(&frame[HDR_MAX_SIZE as usize ..], &expected_payload[..]);

    assert_eq!(header.preprocessing, Preprocessing::Diff);
    assert_eq!(header.encoder_type, EncoderKind::Uncompressed);
    assert_eq!(header.model_rate, 0);
    assert_eq!(header.encoder_param, 0);
    assert_eq!(header.encoder_outlier, 0);
}

#[test]
fn golomb_zero_encodes_signed_residuals() {
    let params = Params {
        primary_encoder_type: EncoderKind::GolombZero,
        primary_encoder_param: 1,
        ..Params::default()
    };
    let src: [i16; 4] = [-8, 7, -1, 0];

    let mut dst = AlignedBuffer::zeroed(compress_bound(8).unwrap() as usize);
    let mut context = Context::initialise(&params, None).unwrap();
    let size = context.compress_i16(dst.bytes(), &src).unwrap() as usize;

    let frame = &dst.bytes()[.. size];
    assert_eq!(&frame[HDR_MAX_SIZE as usize ..], &[0xFF, 0xFF, 0x7F, 0xFF, 0x68][..]);

    let header = Header::deserialize(frame).unwrap();
    assert_eq!(header.compressed_size as usize, size);
    assert_eq!(header.encoder_param, 1);
    assert_eq!(header.encoder_outlier, 16); // derived for the zero escape
}

#[test]
fn golomb_multi_encodes_with_configured_outlier() {
    let params = Params {
        primary_encoder_type: EncoderKind::GolombMulti,
        primary_encoder_param: 1,
        primary_encoder_outlier: 5,
        ..Params::default()
    };
    let src: [i16; 2] = [0, 2];

    let mut dst = AlignedBuffer::zeroed(compress_bound(4).unwrap() as usize);
    let mut context = Context::initialise(&params, None).unwrap();
    let size = context.compress_i16(dst.bytes(), &src).unwrap() as usize;

    let frame = &dst.bytes()[.. size];
    assert_eq!(&frame[HDR_MAX_SIZE as usize ..], &[0x78][..]);

    let header = Header::deserialize(frame).unwrap();
    assert_eq!(header.encoder_outlier, 5);
}

#[test]
fn uncompressed_fallback_replaces_bloated_frames() {
    let params = Params {
        uncompressed_fallback_enabled: true,
        primary_preprocessing: Preprocessing::Diff,
        primary_encoder_type: EncoderKind::GolombZero,
        primary_encoder_param: 1,
        ..Params::default()
    };
    let src = [0xAAAA_u16, 0xBBBB, 0xCCCC];

    // a destination of uncompressed_bound is always sufficient with fallback
    let mut dst = AlignedBuffer::zeroed(uncompressed_bound(6).unwrap() as usize);
    let mut context = Context::initialise(&params, None).unwrap();
    let size = context.compress_u16(dst.bytes(), &src).unwrap();

    assert_eq!(size, HDR_SIZE + 6);
    let frame = &dst.bytes()[.. size as usize];
    assert_eq!(&frame[HDR_SIZE as usize ..], &[0xAA, 0xAA, 0xBB, 0xBB, 0xCC, 0xCC][..]);

    let header = Header::deserialize(frame).unwrap();
    assert_eq!(header.preprocessing, Preprocessing::None);
    assert_eq!(header.encoder_type, EncoderKind::Uncompressed);
    assert_eq!(header.size(), HDR_SIZE);
    assert_eq!(header.compressed_size, HDR_SIZE + 6);
}

#[test]
fn fallback_keeps_frames_within_the_uncompressed_bound() {
    let params = Params {
        uncompressed_fallback_enabled: true,
        primary_preprocessing: Preprocessing::Diff,
        primary_encoder_type: EncoderKind::GolombZero,
        primary_encoder_param: 4,
        checksum_enabled: true,
        ..Params::default()
    };

    let mut random = StdRng::seed_from_u64(3141);
    let mut context_storage = AlignedBuffer::zeroed(uncompressed_bound(64).unwrap() as usize);

    for _ in 0 .. 50 {
        let src: Vec<u16> = (0 .. 32).map(|_| random.random()).collect();
        let mut context = Context::initialise(&params, None).unwrap();

        let size = context.compress_u16(context_storage.bytes(), &src).unwrap();
        assert!(size <= uncompressed_bound(64).unwrap());
    }
}

#[test]
fn checksum_trailer_hashes_the_input_samples() {
    let params = Params { checksum_enabled: true, ..Params::default() };
    let src = [0xCA75_u16, 0xCAFE, 0xC0DE];

    let (frame, header) = compress_once(&params, &src);

    assert!(header.checksum_enabled);
    assert_eq!(header.compressed_size as usize, frame.len());
    assert_eq!(frame.len(), HDR_SIZE as usize + 6 + 4);

    let trailer = &frame[frame.len() - 4 ..];
    assert_eq!(trailer, &checksum(Samples::U16(&src)).to_be_bytes()[..]);
}

#[test]
fn fallback_frames_still_carry_the_checksum() {
    let params = Params {
        uncompressed_fallback_enabled: true,
        checksum_enabled: true,
        primary_preprocessing: Preprocessing::Diff,
        primary_encoder_type: EncoderKind::GolombZero,
        primary_encoder_param: 1,
        ..Params::default()
    };
    let src = [0xAAAA_u16, 0xBBBB, 0xCCCC];

    let (frame, header) = compress_once(&params, &src);

    assert_eq!(header.encoder_type, EncoderKind::Uncompressed);
    assert_eq!(frame.len(), HDR_SIZE as usize + 6 + 4);
    let trailer = &frame[frame.len() - 4 ..];
    assert_eq!(trailer, &checksum(Samples::U16(&src)).to_be_bytes()[..]);
}

#[test]
fn all_input_flavors_produce_the_same_frame() {
    let params = Params {
        primary_preprocessing: Preprocessing::Diff,
        primary_encoder_type: EncoderKind::GolombZero,
        primary_encoder_param: 4,
        ..Params::default()
    };

    let from_u16 = {
        let mut dst = AlignedBuffer::zeroed(compress_bound(8).unwrap() as usize);
        let mut context = Context::initialise(&params, None).unwrap();
        let size = context.compress_u16(dst.bytes(), &[400, 407, 65533, 2]).unwrap();
        dst.bytes()[.. size as usize].to_vec()
    };

    let from_i16 = {
        let mut dst = AlignedBuffer::zeroed(compress_bound(8).unwrap() as usize);
        let mut context = Context::initialise(&params, None).unwrap();
        let size = context.compress_i16(dst.bytes(), &[400, 407, -3, 2]).unwrap();
        dst.bytes()[.. size as usize].to_vec()
    };

    let from_i32 = {
        let mut dst = AlignedBuffer::zeroed(compress_bound(8).unwrap() as usize);
        let mut context = Context::initialise(&params, None).unwrap();
        let size = context
            .compress_i16_in_i32(dst.bytes(), &[400, 0x7070_0000 + 407, 0x0001_FFFD, 2])
            .unwrap();
        dst.bytes()[.. size as usize].to_vec()
    };

    // identical apart from the identifier stamp
    let strip_identifier = |frame: &[u8]| {
        let mut stripped = frame.to_vec();
        stripped[8 .. 14].fill(0);
        stripped
    };

    assert_eq!(strip_identifier(&from_u16), strip_identifier(&from_i16));
    assert_eq!(strip_identifier(&from_u16), strip_identifier(&from_i32));

    // the i32 flavor still records the packed 16-bit size
    assert_eq!(Header::deserialize(&from_i32).unwrap().original_size, 8);
}

#[test]
fn empty_input_is_rejected() {
    let mut dst = AlignedBuffer::zeroed(64);
    let mut context = Context::initialise(&Params::default(), None).unwrap();

    assert_eq!(context.compress_u16(dst.bytes(), &[]), Err(Error::SrcSizeWrong));
}

#[test]
fn misaligned_destination_is_rejected() {
    let mut dst = AlignedBuffer::zeroed(64);
    let mut context = Context::initialise(&Params::default(), None).unwrap();

    let result = context.compress_u16(&mut dst.bytes()[1 ..], &[1, 2]);
    assert_eq!(result, Err(Error::DstUnaligned));
}

#[test]
fn undersized_destination_is_rejected() {
    let mut dst = AlignedBuffer::zeroed(HDR_SIZE as usize + 2);
    let mut context = Context::initialise(&Params::default(), None).unwrap();

    let result = context.compress_u16(dst.bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(result, Err(Error::DstTooSmall));
}

#[test]
fn invalid_golomb_parameters_are_rejected_at_initialisation() {
    for invalid_param in [0, 65536] {
        let params = Params {
            primary_encoder_type: EncoderKind::GolombZero,
            primary_encoder_param: invalid_param,
            ..Params::default()
        };

        assert!(matches!(
            Context::initialise(&params, None),
            Err(Error::ParamsInvalid)
        ));
    }
}

#[test]
fn deinitialised_contexts_reject_all_operations() {
    let mut dst = AlignedBuffer::zeroed(64);
    let mut context = Context::initialise(&Params::default(), None).unwrap();
    context.deinitialise();

    assert_eq!(context.compress_u16(dst.bytes(), &[1, 2]), Err(Error::ContextInvalid));
    assert_eq!(context.reset(), Err(Error::ContextInvalid));
}

#[test]
fn compressed_size_never_exceeds_the_bound() {
    let parameter_sets = [
        Params::default(),
        Params {
            primary_preprocessing: Preprocessing::Diff,
            primary_encoder_type: EncoderKind::GolombZero,
            primary_encoder_param: 2,
            checksum_enabled: true,
            ..Params::default()
        },
        Params {
            primary_preprocessing: Preprocessing::Iwt,
            primary_encoder_type: EncoderKind::GolombMulti,
            primary_encoder_param: 8,
            primary_encoder_outlier: 100,
            ..Params::default()
        },
    ];

    let mut random = StdRng::seed_from_u64(1234);

    for params in &parameter_sets {
        for _ in 0 .. 20 {
            let length = random.random_range(1 ..= 200);
            let src: Vec<u16> = (0 .. length).map(|_| random.random()).collect();
            let src_size = src.len() as u32 * 2;

            let (frame, header) = common::compress_once(params, &src);

            assert!(frame.len() as u32 <= compress_bound(src_size).unwrap());
            assert_eq!(header.compressed_size as usize, frame.len());
            assert_eq!(header.original_size, src_size);
        }
    }
}
