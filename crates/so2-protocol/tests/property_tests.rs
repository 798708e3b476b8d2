//! Property tests for keyer byte classification and command framing

use proptest::prelude::*;
use so2_protocol::keyer::speed_in_range;
use so2_protocol::{EncodeCommand, HostCodec, InboundByte, KeyerCommand, ProtocolCodec};

fn direct_command() -> impl Strategy<Value = KeyerCommand> {
    prop_oneof![
        any::<u8>().prop_map(KeyerCommand::EchoTest),
        Just(KeyerCommand::HostOpen),
        Just(KeyerCommand::HostClose),
        (5u8..=99).prop_map(KeyerCommand::SetSpeed),
        any::<u8>().prop_map(KeyerCommand::Sidetone),
        any::<u8>().prop_map(KeyerCommand::SetPort),
        any::<u8>().prop_map(KeyerCommand::Options),
        (any::<u8>(), any::<u8>())
            .prop_map(|(min, range)| KeyerCommand::SpeedPotSetup { min, range }),
        Just(KeyerCommand::Cancel),
        Just(KeyerCommand::Null),
        (0x20u8..=0x7e).prop_map(KeyerCommand::Char),
    ]
}

proptest! {
    #[test]
    fn status_bytes_always_status(low in 0u8..0x40) {
        let byte = 0xc0 | low;
        prop_assert!(matches!(InboundByte::classify(byte), InboundByte::Status(_)));
    }

    #[test]
    fn telemetry_bytes_carry_low_six_bits(low in 0u8..0x40) {
        let byte = 0x80 | low;
        prop_assert_eq!(InboundByte::classify(byte), InboundByte::SpeedPot(low));
    }

    #[test]
    fn other_bytes_are_echo(byte in 0u8..0x80) {
        prop_assert_eq!(InboundByte::classify(byte), InboundByte::Echo(byte));
    }

    #[test]
    fn classification_ignores_history(prefix in proptest::collection::vec(any::<u8>(), 0..32), byte: u8) {
        // Classifying other bytes first must not change the verdict
        let fresh = InboundByte::classify(byte);
        for b in prefix {
            let _ = InboundByte::classify(b);
        }
        prop_assert_eq!(InboundByte::classify(byte), fresh);
    }

    #[test]
    fn speed_range_is_5_to_99(wpm in 0u32..300) {
        prop_assert_eq!(speed_in_range(wpm), (5..=99).contains(&wpm));
    }

    #[test]
    fn host_codec_frames_command_sequences(
        commands in proptest::collection::vec(direct_command(), 1..16),
        split in 1usize..8,
    ) {
        let wire: Vec<u8> = commands.iter().flat_map(|c| c.encode()).collect();

        let mut codec = HostCodec::new();
        let mut parsed = Vec::new();
        for chunk in wire.chunks(split) {
            codec.push_bytes(chunk);
            while let Some(cmd) = codec.next_command() {
                parsed.push(cmd);
            }
        }

        prop_assert_eq!(parsed, commands);
    }
}
